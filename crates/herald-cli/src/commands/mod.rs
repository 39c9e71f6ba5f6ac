//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`parse`] - Payload normalization and validation
//! - [`route`] - Routing decisions for a group
//! - [`catalog`] - Template and parser listings

pub mod catalog;
pub mod parse;
pub mod route;

use std::io::Read;
use std::path::Path;

use serde_json::Value;

pub use catalog::{ParsersCommand, TemplatesCommand};
pub use parse::ParseCommand;
pub use route::RouteCommand;

use crate::error::CliError;

/// Reads a payload from `path`, or from stdin when `path` is `None` or `-`.
///
/// Input that is valid JSON is decoded; anything else is kept as text.
///
/// # Errors
///
/// Returns an error if the input cannot be read.
pub fn read_payload(path: Option<&Path>) -> Result<Value, CliError> {
    let text = match path {
        Some(p) if p.as_os_str() != "-" => std::fs::read_to_string(p)?,
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    Ok(decode_payload(&text))
}

/// Decodes JSON input, falling back to the trimmed text as a string payload.
#[must_use]
pub fn decode_payload(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.trim_end().to_string()))
}
