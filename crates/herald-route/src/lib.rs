//! Alert normalization and routing for Herald.
//!
//! `herald-route` ingests alert and event payloads from heterogeneous
//! monitoring and CI/CD sources, normalizes them into one
//! [`ParsedMessage`] schema, and decides which notification rule and which
//! presentation template apply.
//!
//! # Features
//!
//! - **Format detection**: log-service alarms, Alertmanager webhooks, CI/CD
//!   build events and free text, each with a text fallback
//! - **Pluggable parsers**: implement [`SourceParser`] and register it ahead
//!   of the built-ins
//! - **Keyword rules**: case-insensitive keyword rules with priorities
//! - **Templates**: condition-based selection where custom templates beat
//!   the built-in presets, with a guaranteed fallback
//!
//! # Example
//!
//! ```rust
//! use herald_route::{Level, ParserEngine};
//! use serde_json::json;
//!
//! let engine = ParserEngine::new();
//!
//! let result = engine.parse_message(&json!({
//!     "alerts": [{
//!         "labels": {"alertname": "HighCPU", "severity": "critical", "job": "api"},
//!         "annotations": {"summary": "CPU > 90%", "description": "cpu at 97%"},
//!         "fingerprint": "abc123"
//!     }]
//! }));
//!
//! let message = result.into_result().unwrap();
//! assert_eq!(message.parser, "prometheus");
//! assert_eq!(message.level, Level::P0);
//! assert_eq!(message.service, "api");
//! ```
//!
//! # Routing
//!
//! A [`Router`] combines parsing, rule matching and template selection for
//! a payload addressed to a group:
//!
//! ```rust
//! use herald_route::{Router, RoutingConfig};
//! use serde_json::json;
//!
//! let config = RoutingConfig::from_json(r#"{
//!     "groups": [{"id": "g1", "name": "Ops", "identifier": "ops"}],
//!     "users": [{"id": "u1", "name": "Ada"}],
//!     "rules": [{"id": "r1", "group_id": "g1", "name": "db",
//!                "keywords": ["mysql"], "user_ids": ["u1"], "priority": 10}]
//! }"#).unwrap();
//!
//! let decision = Router::new()
//!     .route(&config, "ops", &json!("严重: MySQL connection refused"))
//!     .unwrap();
//!
//! assert_eq!(decision.rule.unwrap().name, "db");
//! assert_eq!(decision.users[0].name, "Ada");
//! assert_eq!(decision.template.id, "preset_p0");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod fields;
pub mod parsers;
pub mod presets;
pub mod router;
pub mod rules;
pub mod source;
pub mod templates;
pub mod types;

// Re-export main types at crate root
pub use config::EngineConfig;
pub use engine::{ParserEngine, ParserInfo, SharedParserEngine, Validation};
pub use error::{Result, RouteError};
pub use fields::FieldMap;
pub use parsers::{
    CodingCiParser, GenericTextParser, PrometheusParser, SourceParser, TencentClsParser,
};
pub use presets::preset_templates;
pub use router::{Router, RoutingDecision};
pub use rules::find_matching_rules;
pub use source::{ConfigSource, RoutingConfig};
pub use templates::{
    ConditionOperator, RenderedTemplate, Template, TemplateCondition, TemplateContent,
    TemplateKind, TemplateMatcher, TemplateStyle, find_matching_template,
};
pub use types::{
    Channel, Color, Group, Level, ParseResult, ParsedMessage, Platform, Rule, RuleBuilder, User,
};
