//! # herald-cli
//!
//! Herald command-line interface.
//!
//! Provides commands for:
//! - Normalizing alert payloads from files or stdin
//! - Routing a payload to a group's rules, recipients and template
//! - Listing templates and parsers
//!
//! # Architecture
//!
//! The CLI is a thin layer over `herald-route`. A routing configuration
//! (groups, users, rules, custom templates) is read from the file given by
//! `--config` or `HERALD_CONFIG`; every command runs synchronously in
//! process.
//!
//! ```text
//! payload ─► ParserEngine ─► ParsedMessage ─► rules + templates ─► decision
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format, InputArgs, RouteArgs};
pub use error::CliError;
pub use output::OutputFormat;
