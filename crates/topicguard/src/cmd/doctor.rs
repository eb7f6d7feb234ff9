use std::path::Path;

use serde::Serialize;
use topicguard_schema::SchemaRegistry;

use crate::cmd::DoctorArgs;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Info,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let mut checks = vec![compiled_features_check()];

    match args.schemas.as_deref() {
        Some(path) => match schema_dir_check(path) {
            (check, Some(registry)) => {
                checks.push(check);
                checks.push(dangling_reference_check(&registry));
            }
            (check, None) => checks.push(check),
        },
        None => checks.push(CheckResult::new(
            "schema_dir",
            CheckStatus::Skip,
            "TOPICGUARD_SCHEMA_DIR not set",
        )),
    }

    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    let overall = if has_fail { "fail" } else { "pass" };

    let output = DoctorOutput { checks, overall };
    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("topicguard doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<20} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Warn => "WARN",
        CheckStatus::Info => "INFO",
        CheckStatus::Skip => "SKIP",
    }
}

fn compiled_features_check() -> CheckResult {
    let mut features = Vec::new();
    if cfg!(feature = "cli") {
        features.push("cli");
    }
    CheckResult::new("compiled_features", CheckStatus::Info, features.join(", "))
}

fn schema_dir_check(path: &Path) -> (CheckResult, Option<SchemaRegistry>) {
    if !path.is_dir() {
        let check = CheckResult::new(
            "schema_dir",
            CheckStatus::Fail,
            format!("{} is not a directory", path.display()),
        );
        return (check, None);
    }

    match SchemaRegistry::from_directory(path) {
        Ok(registry) => {
            let check = CheckResult::new(
                "schema_dir",
                CheckStatus::Pass,
                format!("{} loaded {} schemas", path.display(), registry.len()),
            );
            (check, Some(registry))
        }
        Err(err) => {
            let check = CheckResult::new(
                "schema_dir",
                CheckStatus::Fail,
                format!("{} failed schema load: {err}", path.display()),
            );
            (check, None)
        }
    }
}

/// References to unregistered schemas make `ref` and `all-of` fail and
/// silently drop `any-of` alternatives, so they are worth surfacing.
fn dangling_reference_check(registry: &SchemaRegistry) -> CheckResult {
    let mut dangling = Vec::new();
    for id in registry.list() {
        let Some(definition) = registry.get(id.as_str()) else {
            continue;
        };
        for target in definition.spec().referenced_ids() {
            if !registry.contains(target.as_str()) {
                dangling.push(format!("{id} -> {target}"));
            }
        }
    }

    if dangling.is_empty() {
        CheckResult::new("references", CheckStatus::Pass, "all references resolve")
    } else {
        CheckResult::new("references", CheckStatus::Warn, dangling.join(", "))
    }
}
