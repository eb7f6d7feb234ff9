use std::fs;
use std::sync::Arc;

use serde_json::Value;
use topicguard_schema::{MissingSchemaPolicy, SchemaError, SchemaRegistry, TopicGate};

use crate::cmd::CheckArgs;
use crate::exit::{io_error, schema_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_check, CheckOutput, OutputFormat};

pub fn run(args: CheckArgs, format: OutputFormat) -> CliResult<i32> {
    let registry = SchemaRegistry::from_directory(&args.schemas)
        .map_err(|err| schema_error("failed loading schemas", err))?;
    let message = resolve_message(&args)?;

    let (schema, errors) = match (&args.schema, &args.topic) {
        (Some(id), _) => {
            let result = registry
                .explain(&message, id)
                .map_err(|err| schema_error("check failed", err))?;
            (Some(id.clone()), result.errors)
        }
        (None, Some(topic)) => {
            let schema = registry
                .schema_for_topic(topic)
                .map(|definition| definition.id().to_string());
            let policy = if args.strict {
                MissingSchemaPolicy::Strict
            } else {
                MissingSchemaPolicy::Lenient
            };
            let gate = TopicGate::with_policy(Arc::new(registry), policy);
            let errors = match gate.check(topic, &message) {
                Ok(()) => Vec::new(),
                Err(SchemaError::Rejected { errors, .. }) => errors,
                Err(err) => return Err(schema_error("check failed", err)),
            };
            (schema, errors)
        }
        (None, None) => {
            return Err(CliError::new(USAGE, "one of --schema or --topic is required"));
        }
    };

    let valid = errors.is_empty();
    let output = CheckOutput {
        topic: args.topic.as_deref(),
        schema: schema.as_deref(),
        valid,
        errors: &errors,
    };
    print_check(&output, format);

    Ok(if valid { SUCCESS } else { DATA_INVALID })
}

fn resolve_message(args: &CheckArgs) -> CliResult<Value> {
    if let Some(json) = &args.json {
        return serde_json::from_str(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")));
    }
    if let Some(path) = &args.file {
        let bytes = fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
        return serde_json::from_slice(&bytes).map_err(|err| {
            CliError::new(
                DATA_INVALID,
                format!("{} is not valid JSON: {err}", path.display()),
            )
        });
    }
    Err(CliError::new(USAGE, "one of --json or --file is required"))
}
