//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Herald - alert normalization and routing.
#[derive(Parser, Debug, Clone)]
#[command(name = "herald")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Routing configuration file (groups, users, rules, templates).
    #[arg(short, long, env = "HERALD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Emit logs as JSON lines on stderr.
    #[arg(long)]
    pub log_json: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Normalize a payload (or a JSON array of payloads with --batch).
    Parse(InputArgs),

    /// Check whether a payload can be normalized.
    Validate(InputArgs),

    /// Decide rule, recipients and template for a payload sent to a group.
    Route(RouteArgs),

    /// List the templates: custom templates from the configuration, then presets.
    Templates,

    /// List the registered parsers in dispatch order.
    Parsers,
}

/// Where to read a payload from.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Payload file; `-` or nothing reads stdin.
    pub input: Option<PathBuf>,

    /// Treat the input as a JSON array of payloads.
    #[arg(short, long)]
    pub batch: bool,
}

/// Arguments for the route command.
#[derive(Args, Debug, Clone)]
pub struct RouteArgs {
    /// Identifier of the group the payload is addressed to.
    #[arg(short, long)]
    pub group: String,

    /// Payload file; `-` or nothing reads stdin.
    pub input: Option<PathBuf>,
}
