//! Source parsers.
//!
//! This module provides the [`SourceParser`] trait and the built-in parsers
//! for the upstream formats Herald understands out of the box:
//!
//! | Parser | Format | Exact parse | Text fallback |
//! |--------|--------|-------------|---------------|
//! | [`TencentClsParser`] | log-service alarm envelopes | 0.9 | 0.6 |
//! | [`PrometheusParser`] | Alertmanager webhooks and single alerts | 0.9 | 0.6 |
//! | [`CodingCiParser`] | CI/CD build and event envelopes | 0.9 | 0.6 |
//! | [`GenericTextParser`] | anything (catch-all) | 0.3 | 0.3 |
//!
//! Custom formats are supported by implementing [`SourceParser`] and
//! registering the implementation with
//! [`ParserEngine::add_parser`](crate::engine::ParserEngine::add_parser).

use std::fmt;

use serde_json::Value;

use crate::config::EngineConfig;
use crate::types::ParseResult;

mod cls;
mod coding;
pub mod extract;
mod generic;
mod prometheus;

pub use cls::TencentClsParser;
pub use coding::CodingCiParser;
pub use generic::GenericTextParser;
pub use prometheus::PrometheusParser;

/// Confidence reported for a parse of the exact structured format.
pub const CONFIDENCE_EXACT: f64 = 0.9;
/// Confidence reported for a best-effort labeled-field text parse.
pub const CONFIDENCE_TEXT: f64 = 0.6;
/// Confidence reported by the catch-all parser.
pub const CONFIDENCE_GENERIC: f64 = 0.3;

/// Trait for source parsers.
///
/// Implement this trait to teach the engine a new upstream format. The
/// engine calls [`recognizes`](Self::recognizes) with the stringified
/// payload and, on a hit, [`parse`](Self::parse) with the payload itself.
pub trait SourceParser: Send + Sync + fmt::Debug {
    /// Returns the name of this parser, recorded in every message it produces.
    fn name(&self) -> &str;

    /// Returns a one-line description.
    fn description(&self) -> &str;

    /// Returns true if the stringified payload looks like this parser's format.
    fn recognizes(&self, input: &str) -> bool;

    /// Returns true if the engine should try this parser regardless of
    /// [`recognizes`](Self::recognizes).
    fn is_catch_all(&self) -> bool {
        false
    }

    /// Parses a payload (a decoded value or a JSON/text string).
    ///
    /// A recognized but sparse payload succeeds with defaulted fields;
    /// failure is reserved for data whose shape the parser cannot work with.
    fn parse(&self, raw: &Value) -> ParseResult;
}

/// Returns the built-in parsers in dispatch order, catch-all last.
#[must_use]
pub fn builtin_parsers(config: &EngineConfig) -> Vec<Box<dyn SourceParser>> {
    vec![
        Box::new(TencentClsParser::with_config(config)),
        Box::new(PrometheusParser::with_config(config)),
        Box::new(CodingCiParser::with_config(config)),
        Box::new(GenericTextParser::with_config(config)),
    ]
}
