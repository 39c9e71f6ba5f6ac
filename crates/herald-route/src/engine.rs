//! Parser engine.
//!
//! This module provides the [`ParserEngine`] which owns an ordered list of
//! [`SourceParser`]s and dispatches each payload to the first one that
//! recognizes it and produces a message. The generic text parser sits at the
//! end of the default list, so every payload yields a message.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::RouteError;
use crate::parsers::{SourceParser, builtin_parsers, extract};
use crate::types::ParseResult;

/// Name and description of a registered parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserInfo {
    /// Parser name.
    pub name: String,
    /// One-line description.
    pub description: String,
}

/// Outcome of [`ParserEngine::validate_message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    /// True when the payload parsed.
    pub valid: bool,
    /// Why it did not.
    pub errors: Vec<String>,
}

/// Dispatches payloads to source parsers.
///
/// The engine holds no state between calls beyond its parser list, so a
/// single instance can serve any number of concurrent readers. Registration
/// takes `&mut self`; use [`SharedParserEngine`] when parsers must be added
/// while other threads are parsing.
#[derive(Debug)]
pub struct ParserEngine {
    config: EngineConfig,
    parsers: Vec<Box<dyn SourceParser>>,
}

impl ParserEngine {
    /// Creates an engine with the built-in parsers and default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine with the built-in parsers.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let parsers = builtin_parsers(&config);
        Self { config, parsers }
    }

    /// Creates an engine with exactly the given parsers, in order.
    #[must_use]
    pub fn with_parsers(config: EngineConfig, parsers: Vec<Box<dyn SourceParser>>) -> Self {
        Self { config, parsers }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registers a parser ahead of all existing ones.
    pub fn add_parser(&mut self, parser: Box<dyn SourceParser>) {
        info!(parser = %parser.name(), "registered parser");
        self.parsers.insert(0, parser);
    }

    /// Returns the registered parsers in dispatch order.
    #[must_use]
    pub fn parsers(&self) -> Vec<ParserInfo> {
        self.parsers
            .iter()
            .map(|p| ParserInfo {
                name: p.name().to_string(),
                description: p.description().to_string(),
            })
            .collect()
    }

    /// Returns the number of registered parsers.
    #[must_use]
    pub fn parser_count(&self) -> usize {
        self.parsers.len()
    }

    /// Parses a payload: a decoded JSON value, or a string holding JSON or text.
    ///
    /// Parsers are tried in order; one is attempted when it recognizes the
    /// stringified payload or is a catch-all. The first success wins.
    pub fn parse_message(&self, raw: &Value) -> ParseResult {
        let input = extract::stringify(raw);

        for parser in &self.parsers {
            if !(parser.is_catch_all() || parser.recognizes(&input)) {
                continue;
            }

            debug!(parser = %parser.name(), "attempting parse");
            let result = parser.parse(raw);
            if result.is_success() {
                if let Some(message) = &result.message {
                    debug!(
                        parser = %parser.name(),
                        level = %message.level,
                        confidence = message.confidence,
                        "payload parsed"
                    );
                }
                return result;
            }

            warn!(
                parser = %parser.name(),
                error = result.error.as_deref().unwrap_or_default(),
                "parser failed, trying next"
            );
        }

        ParseResult::failure(RouteError::UnrecognizedFormat.to_string())
    }

    /// Parses a raw string payload.
    pub fn parse_str(&self, payload: &str) -> ParseResult {
        self.parse_message(&Value::String(payload.to_string()))
    }

    /// Parses each payload independently, preserving order.
    ///
    /// Batches above [`EngineConfig::parallel_batch_threshold`] are split
    /// across scoped worker threads.
    pub fn parse_messages(&self, raws: &[Value]) -> Vec<ParseResult> {
        let workers = self.config.max_batch_workers.max(1);
        if raws.len() <= self.config.parallel_batch_threshold || workers == 1 {
            return raws.iter().map(|raw| self.parse_message(raw)).collect();
        }

        let chunk_size = raws.len().div_ceil(workers);
        debug!(batch = raws.len(), workers, chunk_size, "parsing batch in parallel");

        std::thread::scope(|scope| {
            let handles: Vec<_> = raws
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|raw| self.parse_message(raw))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .zip(raws.chunks(chunk_size))
                .flat_map(|(handle, chunk)| {
                    handle.join().unwrap_or_else(|_| {
                        chunk
                            .iter()
                            .map(|_| ParseResult::failure("parser worker panicked"))
                            .collect()
                    })
                })
                .collect()
        })
    }

    /// Reports whether a payload parses, without changing engine state.
    pub fn validate_message(&self, raw: &Value) -> Validation {
        let result = self.parse_message(raw);
        let errors = if result.is_success() {
            Vec::new()
        } else {
            vec![result.error.unwrap_or_else(|| "parse failed".to_string())]
        };
        Validation {
            valid: errors.is_empty(),
            errors,
        }
    }
}

impl Default for ParserEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`ParserEngine`] behind a read/write lock.
///
/// Parsing takes the read lock, registration the write lock, so parsers can
/// be added while other threads are parsing.
#[derive(Debug, Clone, Default)]
pub struct SharedParserEngine {
    inner: Arc<RwLock<ParserEngine>>,
}

impl SharedParserEngine {
    /// Wraps an engine.
    #[must_use]
    pub fn new(engine: ParserEngine) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    /// Registers a parser ahead of all existing ones.
    pub fn add_parser(&self, parser: Box<dyn SourceParser>) {
        self.inner.write().add_parser(parser);
    }

    /// See [`ParserEngine::parse_message`].
    pub fn parse_message(&self, raw: &Value) -> ParseResult {
        self.inner.read().parse_message(raw)
    }

    /// See [`ParserEngine::parse_messages`].
    pub fn parse_messages(&self, raws: &[Value]) -> Vec<ParseResult> {
        self.inner.read().parse_messages(raws)
    }

    /// See [`ParserEngine::validate_message`].
    pub fn validate_message(&self, raw: &Value) -> Validation {
        self.inner.read().validate_message(raw)
    }

    /// See [`ParserEngine::parsers`].
    #[must_use]
    pub fn parsers(&self) -> Vec<ParserInfo> {
        self.inner.read().parsers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::{CONFIDENCE_EXACT, GenericTextParser, PrometheusParser};
    use crate::types::{Level, ParsedMessage};
    use proptest::prelude::*;
    use serde_json::json;

    /// A parser that recognizes everything and always fails.
    #[derive(Debug)]
    struct FailingParser;

    impl SourceParser for FailingParser {
        fn name(&self) -> &str {
            "failing"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        fn recognizes(&self, _input: &str) -> bool {
            true
        }

        fn parse(&self, _raw: &Value) -> ParseResult {
            ParseResult::failure("failing parse failed: boom")
        }
    }

    /// A parser for `MYFMT|title|service` lines.
    #[derive(Debug)]
    struct PipeParser;

    impl SourceParser for PipeParser {
        fn name(&self) -> &str {
            "pipe"
        }

        fn description(&self) -> &str {
            "pipe-delimited test format"
        }

        fn recognizes(&self, input: &str) -> bool {
            input.starts_with("MYFMT|")
        }

        fn parse(&self, raw: &Value) -> ParseResult {
            let text = extract::stringify(raw);
            let parts: Vec<_> = text.split('|').collect();
            let mut message = GenericTextParser::new()
                .parse(raw)
                .into_result()
                .unwrap_or_else(|_| unreachable!());
            message.title = parts.get(1).copied().unwrap_or("pipe").to_string();
            message.service = parts.get(2).copied().unwrap_or("svc").to_string();
            message.parser = "pipe".to_string();
            message.confidence = 1.0;
            ParseResult::success(message)
        }
    }

    fn prometheus_payload() -> Value {
        json!({"alerts":[{"labels":{"alertname":"HighCPU","severity":"critical","job":"api"},
            "annotations":{"summary":"CPU > 90%"},"startsAt":"2024-01-01T00:00:00Z",
            "fingerprint":"abc123"}]})
    }

    fn message(result: ParseResult) -> ParsedMessage {
        assert!(result.is_success(), "{:?}", result.error);
        result.into_result().unwrap()
    }

    mod dispatch_tests {
        use super::*;

        #[test]
        fn default_parsers() {
            let engine = ParserEngine::new();
            assert_eq!(engine.parser_count(), 4);
            assert_eq!(engine.parsers().last().unwrap().name, "generic-text");
        }

        #[test]
        fn prometheus_end_to_end() {
            let msg = message(ParserEngine::new().parse_message(&prometheus_payload()));
            assert_eq!(msg.parser, "prometheus");
            assert_eq!(msg.level, Level::P0);
            assert_eq!(msg.service, "api");
            assert_eq!(msg.title, "CPU > 90%");
            assert_eq!(msg.id, "abc123");
        }

        #[test]
        fn prometheus_as_json_string() {
            let raw = Value::String(prometheus_payload().to_string());
            let msg = message(ParserEngine::new().parse_message(&raw));
            assert_eq!(msg.parser, "prometheus");
            assert!((msg.confidence - CONFIDENCE_EXACT).abs() < f64::EPSILON);
        }

        #[test]
        fn cls_payload() {
            let msg = message(ParserEngine::new().parse_message(&json!({
                "AlarmId": "a-1",
                "AlarmInfo": {"Level": "Warning"}
            })));
            assert_eq!(msg.parser, "tencent-cls");
            assert_eq!(msg.level, Level::P1);
        }

        #[test]
        fn coding_payload() {
            let msg = message(ParserEngine::new().parse_message(&json!({
                "event": {"eventType": "Build", "projectName": "Coding demo"},
                "build": {"status": "SUCCESS"}
            })));
            assert_eq!(msg.parser, "coding-ci");
            assert_eq!(msg.level, Level::P3);
            assert_eq!(msg.title, "Coding demo - Build");
        }

        #[test]
        fn free_text_goes_to_catch_all() {
            let msg = message(ParserEngine::new().parse_str("服务：payment-svc 数据库连接超时"));
            assert_eq!(msg.parser, "generic-text");
            assert_eq!(msg.service, "payment-svc");
        }

        #[test]
        fn recognized_but_failing_parser_falls_through() {
            // Recognized by prometheus via "alerts", rejected for being empty.
            let msg = message(ParserEngine::new().parse_message(&json!({"alerts": []})));
            assert_eq!(msg.parser, "generic-text");
        }

        #[test]
        fn failing_parser_falls_through_to_next() {
            let mut engine = ParserEngine::new();
            engine.add_parser(Box::new(FailingParser));
            let msg = message(engine.parse_message(&prometheus_payload()));
            assert_eq!(msg.parser, "prometheus");
        }

        #[test]
        fn no_catch_all_reports_unrecognized() {
            let engine = ParserEngine::with_parsers(
                EngineConfig::default(),
                vec![Box::new(PrometheusParser::new())],
            );
            let result = engine.parse_str("hello");
            assert!(!result.success);
            assert_eq!(result.error.as_deref(), Some("unrecognized format"));
        }

        #[test]
        fn empty_engine_reports_unrecognized() {
            let engine = ParserEngine::with_parsers(EngineConfig::default(), Vec::new());
            assert!(!engine.parse_message(&json!({})).success);
        }
    }

    mod registration_tests {
        use super::*;

        #[test]
        fn added_parser_takes_precedence() {
            let mut engine = ParserEngine::new();
            engine.add_parser(Box::new(PipeParser));
            assert_eq!(engine.parsers()[0].name, "pipe");
            assert_eq!(engine.parser_count(), 5);

            let msg = message(engine.parse_str("MYFMT|disk full|storage"));
            assert_eq!(msg.parser, "pipe");
            assert_eq!(msg.title, "disk full");
            assert_eq!(msg.service, "storage");
        }

        #[test]
        fn unrecognized_input_skips_added_parser() {
            let mut engine = ParserEngine::new();
            engine.add_parser(Box::new(PipeParser));
            let msg = message(engine.parse_str("plain text"));
            assert_eq!(msg.parser, "generic-text");
        }

        #[test]
        fn shared_engine_registration() {
            let shared = SharedParserEngine::new(ParserEngine::new());
            let reader = shared.clone();
            shared.add_parser(Box::new(PipeParser));
            assert_eq!(reader.parsers().len(), 5);
            let msg = message(reader.parse_message(&json!("MYFMT|t|s")));
            assert_eq!(msg.parser, "pipe");
        }

        #[test]
        fn shared_engine_across_threads() {
            let shared = SharedParserEngine::default();
            std::thread::scope(|scope| {
                for _ in 0..4 {
                    let engine = shared.clone();
                    scope.spawn(move || {
                        let result = engine.parse_message(&json!("warning: queue backlog"));
                        assert!(result.is_success());
                    });
                }
                shared.add_parser(Box::new(PipeParser));
            });
            assert_eq!(shared.parsers()[0].name, "pipe");
        }
    }

    mod batch_tests {
        use super::*;

        #[test]
        fn batch_preserves_order() {
            let engine = ParserEngine::new();
            let raws = vec![prometheus_payload(), json!("just text"), json!({"alerts": []})];
            let results = engine.parse_messages(&raws);
            assert_eq!(results.len(), 3);
            let parsers: Vec<_> = results
                .iter()
                .map(|r| r.message.as_ref().unwrap().parser.as_str())
                .collect();
            assert_eq!(parsers, vec!["prometheus", "generic-text", "generic-text"]);
        }

        #[test]
        fn batch_with_failures_never_aborts() {
            let engine = ParserEngine::with_parsers(
                EngineConfig::default(),
                vec![Box::new(PrometheusParser::new())],
            );
            let results = engine.parse_messages(&[json!("x"), prometheus_payload(), json!("y")]);
            let ok: Vec<_> = results.iter().map(ParseResult::is_success).collect();
            assert_eq!(ok, vec![false, true, false]);
        }

        #[test]
        fn parallel_batch_preserves_order() {
            let config = EngineConfig {
                parallel_batch_threshold: 2,
                max_batch_workers: 3,
                ..EngineConfig::default()
            };
            let engine = ParserEngine::with_config(config);
            let raws: Vec<Value> = (0..10).map(|i| json!(format!("line {i}"))).collect();
            let results = engine.parse_messages(&raws);
            assert_eq!(results.len(), 10);
            for (i, result) in results.iter().enumerate() {
                assert_eq!(result.message.as_ref().unwrap().title, format!("line {i}"));
            }
        }

        #[test]
        fn empty_batch() {
            assert!(ParserEngine::new().parse_messages(&[]).is_empty());
        }
    }

    mod validation_tests {
        use super::*;

        #[test]
        fn valid_payload() {
            let validation = ParserEngine::new().validate_message(&prometheus_payload());
            assert!(validation.valid);
            assert!(validation.errors.is_empty());
        }

        #[test]
        fn invalid_payload_without_catch_all() {
            let engine = ParserEngine::with_parsers(
                EngineConfig::default(),
                vec![Box::new(FailingParser)],
            );
            let validation = engine.validate_message(&json!("anything"));
            assert!(!validation.valid);
            assert_eq!(validation.errors, vec!["unrecognized format".to_string()]);
            assert_eq!(engine.parser_count(), 1);
        }
    }

    mod property_tests {
        use super::*;

        fn strip_generated(mut msg: ParsedMessage) -> ParsedMessage {
            msg.id = String::new();
            msg.timestamp = chrono::DateTime::<chrono::Utc>::MIN_UTC;
            msg
        }

        proptest! {
            #[test]
            fn parse_is_total_with_catch_all(text in "\\PC*") {
                let result = ParserEngine::new().parse_message(&Value::String(text));
                prop_assert!(result.is_success());
            }

            #[test]
            fn parse_is_total_for_objects(key in "[a-zA-Z]{1,8}", value in "\\PC{0,20}") {
                let raw = json!({ key: value });
                prop_assert!(ParserEngine::new().parse_message(&raw).is_success());
            }

            #[test]
            fn parse_is_idempotent(text in "\\PC{0,80}") {
                let engine = ParserEngine::new();
                let raw = Value::String(text);
                let first = strip_generated(engine.parse_message(&raw).into_result().unwrap());
                let second = strip_generated(engine.parse_message(&raw).into_result().unwrap());
                prop_assert_eq!(first, second);
            }
        }

        #[test]
        fn structured_parse_is_idempotent() {
            let engine = ParserEngine::new();
            let first = message(engine.parse_message(&prometheus_payload()));
            let second = message(engine.parse_message(&prometheus_payload()));
            assert_eq!(first, second);
        }
    }
}
