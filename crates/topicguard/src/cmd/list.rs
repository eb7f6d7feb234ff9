use topicguard_schema::SchemaRegistry;

use crate::cmd::ListArgs;
use crate::exit::{schema_error, CliResult, SUCCESS};
use crate::output::{print_ids, OutputFormat};

pub fn run(args: ListArgs, format: OutputFormat) -> CliResult<i32> {
    let registry = SchemaRegistry::from_directory(&args.schemas)
        .map_err(|err| schema_error("failed loading schemas", err))?;

    let ids = match &args.topic {
        Some(topic) => registry.schemas_for_topic(topic),
        None => registry.list(),
    };
    print_ids(&ids, args.topic.as_deref(), format);

    Ok(SUCCESS)
}
