use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use topicguard_schema::{FieldError, SchemaId};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<&'a str>,
    pub schema: Option<&'a str>,
    pub valid: bool,
    pub errors: &'a [FieldError],
}

pub fn print_check(output: &CheckOutput<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            println!("{}", summary_line(output));
            if output.errors.is_empty() {
                return;
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PATH", "KIND", "EXPECTED", "VALUE"]);
            for err in output.errors {
                table.add_row(vec![
                    display_path(&err.path).to_string(),
                    err.kind.to_string(),
                    err.expected.clone(),
                    err.value
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "-".to_string()),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{}", summary_line(output));
            for err in output.errors {
                println!("  {err}");
            }
        }
        OutputFormat::Raw => {
            println!("{}", if output.valid { "valid" } else { "invalid" });
        }
    }
}

#[derive(Serialize)]
struct ListOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<&'a str>,
    schemas: &'a [SchemaId],
}

pub fn print_ids(ids: &[SchemaId], topic: Option<&str>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ListOutput {
                topic,
                schemas: ids,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SCHEMA", "NAMESPACE"]);
            for id in ids {
                table.add_row(vec![
                    id.to_string(),
                    id.namespace().unwrap_or("-").to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for id in ids {
                println!("{id}");
            }
        }
    }
}

fn summary_line(output: &CheckOutput<'_>) -> String {
    let verdict = if output.valid { "valid" } else { "invalid" };
    let mut line = verdict.to_string();
    if let Some(topic) = output.topic {
        line.push_str(&format!(" topic={topic}"));
    }
    line.push_str(&format!(" schema={}", output.schema.unwrap_or("(none)")));
    if !output.errors.is_empty() {
        line.push_str(&format!(" errors={}", output.errors.len()));
    }
    line
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use topicguard_schema::ErrorKind;

    use super::*;

    #[test]
    fn check_output_serializes_errors() {
        let errors = vec![FieldError {
            path: "id".to_string(),
            kind: ErrorKind::Missing,
            value: None,
            expected: "int".to_string(),
        }];
        let output = CheckOutput {
            topic: Some("orders"),
            schema: Some("orders/default"),
            valid: false,
            errors: &errors,
        };
        let json = serde_json::to_value(&output).expect("check output should serialize");
        assert_eq!(
            json,
            json!({
                "topic": "orders",
                "schema": "orders/default",
                "valid": false,
                "errors": [{"path": "id", "kind": "missing", "expected": "int"}]
            })
        );
    }

    #[test]
    fn summary_line_mentions_topic_and_schema() {
        let output = CheckOutput {
            topic: Some("payments"),
            schema: None,
            valid: true,
            errors: &[],
        };
        assert_eq!(summary_line(&output), "valid topic=payments schema=(none)");
    }
}
