//! Parse and validate command implementations.

use std::io::Write;

use serde_json::Value;
use tracing::debug;

use herald_route::SharedParserEngine;

use crate::cli::InputArgs;
use crate::error::CliError;
use crate::output::{BatchResults, OutputFormat};

use super::read_payload;

/// Handler for the parse and validate commands.
pub struct ParseCommand<'a> {
    engine: &'a SharedParserEngine,
}

impl<'a> ParseCommand<'a> {
    /// Creates a new parse command handler.
    #[must_use]
    pub const fn new(engine: &'a SharedParserEngine) -> Self {
        Self { engine }
    }

    /// Normalizes the payload (or each payload of a batch) and prints it.
    ///
    /// # Errors
    ///
    /// Returns error if the input cannot be read, a single payload cannot be
    /// normalized, or a batch input is not a JSON array.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &InputArgs,
    ) -> Result<(), CliError> {
        let payload = read_payload(args.input.as_deref())?;
        self.parse(out, format, &payload, args.batch)
    }

    /// Reports whether the payload can be normalized.
    ///
    /// # Errors
    ///
    /// Returns error if the input cannot be read or writing fails.
    pub fn validate<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &InputArgs,
    ) -> Result<(), CliError> {
        let payload = read_payload(args.input.as_deref())?;
        let validation = self.engine.validate_message(&payload);
        format.write(out, &validation)
    }

    fn parse<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        payload: &Value,
        batch: bool,
    ) -> Result<(), CliError> {
        if batch {
            let Value::Array(items) = payload else {
                return Err(CliError::InvalidArgument(
                    "--batch expects a JSON array of payloads".into(),
                ));
            };
            debug!(count = items.len(), "parsing batch");
            let results = BatchResults {
                results: self.engine.parse_messages(items),
            };
            return format.write(out, &results);
        }

        let message = self.engine.parse_message(payload).into_result()?;
        format.write(out, &message)
    }
}
