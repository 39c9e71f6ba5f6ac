//! Tencent Cloud log service (CLS) alarm parser.

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

const NAME: &str = "tencent-cls";
const SOURCE: &str = "腾讯云CLS";
const DEFAULT_TITLE: &str = "腾讯云CLS告警";
const DEFAULT_TEXT_TITLE: &str = "CLS告警";

static PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([r"腾讯云", r"(?i)CLS", r"日志服务", r"(?i)AlarmId"])
        .unwrap_or_else(|_| unreachable!())
});

static TEXT_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"标题[：:]\s*([^\n]+)").unwrap_or_else(|_| unreachable!()));
static TEXT_LEVEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"级别[：:]\s*(P[0-4])").unwrap_or_else(|_| unreachable!()));
static TEXT_SERVICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"服务[：:]\s*([^\n]+)").unwrap_or_else(|_| unreachable!()));

/// Parser for CLS alarm notifications.
///
/// Accepts both the `AlarmNoticeInfo` envelope and a bare alarm object.
/// Severity comes from `AlarmInfo.Level` (or `AlarmInfo.Severity`):
/// `Critical` -> P0, `Warning` -> P1, `Info` -> P3, `0`..`4` -> P0..P4.
#[derive(Debug, Clone)]
pub struct TencentClsParser {
    unknown_service: String,
}

impl TencentClsParser {
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

    /// Maps a CLS severity onto a level.
    #[must_use]
    pub fn map_level(severity: &Value) -> Level {
        match severity {
            Value::Number(n) => n.as_u64().and_then(Level::from_index).unwrap_or_default(),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "critical" => Level::P0,
                "warning" => Level::P1,
                "info" => Level::P3,
                digit => digit
                    .parse::<u64>()
                    .ok()
                    .and_then(Level::from_index)
                    .unwrap_or_default(),
            },
            _ => Level::Unknown,
        }
    }

    fn extract(&self, raw: &Value) -> Result<ParsedMessage> {
        let data = match extract::decode(raw) {
            Payload::Text(text) => return Ok(self.parse_text(text, raw)),
            Payload::Structured(data) => data,
        };
        let data = &*data;

        if !data.is_object() {
            return Err(RouteError::unexpected_shape(NAME, "payload is not an object"));
        }

        let alert = data
            .get("AlarmNoticeInfo")
            .filter(|v| v.is_object())
            .unwrap_or(data);
        let empty = Map::new();
        let info = alert.get("AlarmInfo").filter(|v| v.is_object());
        let info_map = extract::object(alert, "AlarmInfo").unwrap_or(&empty);

        let from_info = |keys: &[&str]| info.and_then(|i| extract::first_text(i, keys));

        let level = info
            .and_then(|i| ["Level", "Severity"].iter().find_map(|k| i.get(*k)))
            .map_or(Level::Unknown, Self::map_level);

        let timestamp = info
            .and_then(|i| extract::timestamp(i, "CreateTime"))
            .or_else(|| extract::timestamp(alert, "CreateTime"))
            .unwrap_or_else(Utc::now);

        let service = from_info(&["Service", "LogSetId", "TopicId"])
            .or_else(|| extract::text(alert, "LogSet"))
            .unwrap_or_else(|| self.unknown_service.clone());

        let content = from_info(&["Description", "Content"])
            .unwrap_or_else(|| extract::pretty(alert));

        let mut annotations = BTreeMap::new();
        annotations.insert("source".to_string(), NAME.to_string());
        annotations.insert("type".to_string(), "alarm".to_string());
        annotations.insert(
            "region".to_string(),
            extract::text(alert, "Region").unwrap_or_else(|| "unknown".to_string()),
        );

        let mut tags = vec!["tencent".to_string(), "cls".to_string(), "alarm".to_string()];
        if let Some(extra) = info_map.get("Tags").and_then(Value::as_array) {
            tags.extend(extra.iter().filter_map(Value::as_str).map(str::to_string));
        }

        Ok(ParsedMessage {
            id: extract::first_text(alert, &["AlarmId", "AlarmNoticeId"])
                .unwrap_or_else(|| extract::fallback_id("cls")),
            title: extract::first_text(alert, &["AlarmName", "TopicName", "Title"])
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            content,
            level,
            source: SOURCE.to_string(),
            service,
            timestamp,
            labels: extract::string_entries(info_map),
            annotations,
            tags,
            raw: raw.clone(),
            parser: NAME.to_string(),
            confidence: CONFIDENCE_EXACT,
        })
    }

    fn parse_text(&self, text: &str, raw: &Value) -> ParsedMessage {
        debug!(parser = NAME, "payload is not JSON, using labeled-field extraction");
        ParsedMessage {
            id: extract::fallback_id("cls_text"),
            title: extract::capture(&TEXT_TITLE, text)
                .unwrap_or_else(|| DEFAULT_TEXT_TITLE.to_string()),
            content: text.to_string(),
            level: extract::capture(&TEXT_LEVEL, text)
                .and_then(|l| Level::from_label(&l))
                .unwrap_or_default(),
            source: SOURCE.to_string(),
            service: extract::capture(&TEXT_SERVICE, text)
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

impl Default for TencentClsParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceParser for TencentClsParser {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Tencent Cloud log service alarm notifications"
    }

    fn recognizes(&self, input: &str) -> bool {
        PATTERNS.is_match(input)
    }

    fn parse(&self, raw: &Value) -> ParseResult {
        self.extract(raw).into()
    }
}
