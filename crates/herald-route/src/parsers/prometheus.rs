//! Prometheus / Alertmanager parser.

use std::collections::BTreeMap;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};
use serde_json::{Map, Value};
use tracing::debug;

use super::extract::{self, Payload};
use super::{CONFIDENCE_EXACT, CONFIDENCE_TEXT, SourceParser};
use crate::config::EngineConfig;
use crate::error::{Result, RouteError};
use crate::types::{Level, ParseResult, ParsedMessage};

const NAME: &str = "prometheus";
const SOURCE: &str = "Prometheus";
const DEFAULT_TITLE: &str = "Prometheus告警";

static PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)prometheus",
        r"(?i)alertmanager",
        r#""alerts"\s*:"#,
        r#""labels"\s*:\s*\{"#,
        r#""annotations"\s*:\s*\{"#,
        r#""startsAt"\s*:"#,
        r#""fingerprint"\s*:"#,
        r#""receiver"\s*:"#,
        r"(?i)severity\s*=",
    ])
    .unwrap_or_else(|_| unreachable!())
});

static TEXT_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Alert[：:]\s*([^\n]+)").unwrap_or_else(|_| unreachable!()));
static TEXT_SEVERITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)severity[=:]\s*(critical|warning|info|error)")
        .unwrap_or_else(|_| unreachable!())
});
static TEXT_JOB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"job[=:]\s*(\S+)").unwrap_or_else(|_| unreachable!()));

/// Parser for Alertmanager webhook payloads and single Prometheus alerts.
///
/// Only the first alert of an `alerts` array is normalized. Labels and
/// annotations are copied through as-is.
#[derive(Debug, Clone)]
pub struct PrometheusParser {
    unknown_service: String,
}

impl PrometheusParser {
    /// Creates a parser using the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    /// Creates a parser using the given configuration.
    #[must_use]
    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            unknown_service: config.unknown_service.clone(),
        }
    }

    /// Maps a Prometheus `severity` label onto a level.
    #[must_use]
    pub fn map_level(severity: &str) -> Level {
        match severity.trim().to_ascii_lowercase().as_str() {
            "critical" | "error" => Level::P0,
            "warning" => Level::P1,
            "info" => Level::P3,
            _ => Level::Unknown,
        }
    }

    fn select_alert(data: &Value) -> Result<&Value> {
        if !data.is_object() {
            return Err(RouteError::unexpected_shape(NAME, "payload is not an object"));
        }
        let alert = match data.get("alerts") {
            Some(Value::Array(alerts)) => alerts
                .first()
                .ok_or_else(|| RouteError::unexpected_shape(NAME, "alerts array is empty"))?,
            Some(alerts) => alerts,
            None => data,
        };
        if alert.is_object() {
            Ok(alert)
        } else {
            Err(RouteError::unexpected_shape(NAME, "alert is not an object"))
        }
    }

    fn extract(&self, raw: &Value) -> Result<ParsedMessage> {
        let data = match extract::decode(raw) {
            Payload::Text(text) => return Ok(self.parse_text(text, raw)),
            Payload::Structured(data) => data,
        };
        let alert = Self::select_alert(&data)?;

        let empty = Map::new();
        let labels = extract::object(alert, "labels").unwrap_or(&empty);
        let annotations = extract::object(alert, "annotations").unwrap_or(&empty);
        let label_values = alert.get("labels").filter(|v| v.is_object());
        let annotation_values = alert.get("annotations").filter(|v| v.is_object());

        let label = |keys: &[&str]| label_values.and_then(|l| extract::first_text(l, keys));
        let annotation =
            |keys: &[&str]| annotation_values.and_then(|a| extract::first_text(a, keys));

        let id = extract::text(alert, "fingerprint")
            .or_else(|| label(&["alertname"]))
            .unwrap_or_else(|| extract::fallback_id("prom"));

        let title = annotation(&["summary"])
            .or_else(|| label(&["alertname"]))
            .or_else(|| annotation(&["description"]))
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        let content = annotation(&["description", "message"]).unwrap_or_else(|| {
            annotation_values
                .or(label_values)
                .map_or_else(|| "{}".to_string(), extract::pretty)
        });

        let level = label(&["severity"]).map_or(Level::Unknown, |s| Self::map_level(&s));

        let service = label(&["job", "service", "app"])
            .unwrap_or_else(|| self.unknown_service.clone());

        let labels = extract::scalar_entries(labels);
        let mut tags = vec!["prometheus".to_string(), "alert".to_string()];
        tags.extend(labels.iter().map(|(k, v)| format!("{k}:{v}")));

        Ok(ParsedMessage {
            id,
            title,
            content,
            level,
            source: SOURCE.to_string(),
            service,
            timestamp: extract::timestamp(alert, "startsAt").unwrap_or_else(Utc::now),
            labels,
            annotations: extract::scalar_entries(annotations),
            tags,
            raw: raw.clone(),
            parser: NAME.to_string(),
            confidence: CONFIDENCE_EXACT,
        })
    }

    fn parse_text(&self, text: &str, raw: &Value) -> ParsedMessage {
        debug!(parser = NAME, "payload is not JSON, using labeled-field extraction");
        ParsedMessage {
            id: extract::fallback_id("prom_text"),
            title: extract::capture(&TEXT_TITLE, text).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            content: text.to_string(),
            level: extract::capture(&TEXT_SEVERITY, text)
                .map_or(Level::Unknown, |s| Self::map_level(&s)),
            source: SOURCE.to_string(),
            service: extract::capture(&TEXT_JOB, text)
                .unwrap_or_else(|| self.unknown_service.clone()),
            timestamp: Utc::now(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            tags: Vec::new(),
            raw: raw.clone(),
            parser: NAME.to_string(),
            confidence: CONFIDENCE_TEXT,
        }
    }
}

impl Default for PrometheusParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceParser for PrometheusParser {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Prometheus Alertmanager webhooks and single alerts"
    }

    fn recognizes(&self, input: &str) -> bool {
        PATTERNS.is_match(input)
    }

    fn parse(&self, raw: &Value) -> ParseResult {
        self.extract(raw).into()
    }
}
