use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod check;
pub mod doctor;
pub mod list;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate one JSON message against a schema or topic.
    Check(CheckArgs),
    /// List registered schemas.
    List(ListArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Check that the schema directory loads and its references resolve.
    Doctor(DoctorArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Check(args) => check::run(args, format),
        Command::List(args) => list::run(args, format),
        Command::Version(args) => version::run(args),
        Command::Doctor(args) => doctor::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Directory of `*.spec.json` schema documents.
    #[arg(long, value_name = "DIR", env = "TOPICGUARD_SCHEMA_DIR")]
    pub schemas: PathBuf,
    /// Explicit schema id; fails if it is not registered.
    #[arg(long, conflicts_with = "topic", required_unless_present = "topic")]
    pub schema: Option<String>,
    /// Topic name; resolves `{topic}/default`, then `{topic}`.
    #[arg(long)]
    pub topic: Option<String>,
    /// With --topic, reject messages on topics that have no schema.
    #[arg(long, requires = "topic")]
    pub strict: bool,
    /// JSON message.
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub json: Option<String>,
    /// Read the JSON message from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Directory of `*.spec.json` schema documents.
    #[arg(long, value_name = "DIR", env = "TOPICGUARD_SCHEMA_DIR")]
    pub schemas: PathBuf,
    /// Only schemas belonging to this topic.
    #[arg(long)]
    pub topic: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    /// Directory of `*.spec.json` schema documents.
    #[arg(long, value_name = "DIR", env = "TOPICGUARD_SCHEMA_DIR")]
    pub schemas: Option<PathBuf>,
}
