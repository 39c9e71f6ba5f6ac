//! Coding CI/CD event parser.

use std::collections::BTreeMap;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};
use serde_json::Value;
use tracing::debug;

use super::extract::{self, Payload};
use super::{CONFIDENCE_EXACT, CONFIDENCE_TEXT, SourceParser};
use crate::config::EngineConfig;
use crate::error::{Result, RouteError};
use crate::types::{Level, ParseResult, ParsedMessage};

const NAME: &str = "coding-ci";
const SOURCE: &str = "Coding CI/CD";
const DEFAULT_ACTION: &str = "构建";
const UNKNOWN_PROJECT: &str = "未知项目";
const DEFAULT_TEXT_TITLE: &str = "CI/CD通知";

static PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([r"(?i)coding", r"(?i)devops", r"构建", r"部署", r"(?i)CI/CD"])
        .unwrap_or_else(|_| unreachable!())
});

static TEXT_PROJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"项目[：:]\s*([^\n]+)").unwrap_or_else(|_| unreachable!()));
static TEXT_STATUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"状态[：:]\s*(成功|失败|进行中)").unwrap_or_else(|_| unreachable!()));

/// Parser for Coding DevOps build and pipeline events.
///
/// The title is always synthesized as `"{project} - {action}"`. Build
/// status drives the level; unrecognized statuses count as in-progress (P2).
#[derive(Debug, Clone)]
pub struct CodingCiParser {
    unknown_service: String,
}

impl CodingCiParser {
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

    /// Maps a build status onto a level.
    #[must_use]
    pub fn map_level(status: &str) -> Level {
        match status.trim().to_ascii_uppercase().as_str() {
            "FAILED" | "FAILURE" | "ERROR" => Level::P0,
            "WARNING" => Level::P1,
            "SUCCESS" | "SUCCEEDED" => Level::P3,
            "PENDING" => Level::P4,
            _ => Level::P2,
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

        let event = data.get("event").filter(|v| v.is_object()).unwrap_or(data);
        let build = data.get("build").filter(|v| v.is_object()).unwrap_or(event);

        let either = |key: &str| extract::text(event, key).or_else(|| extract::text(build, key));

        let project = either("projectName");
        let event_type = extract::text(event, "eventType");
        let status = extract::first_text(build, &["status", "result"]);

        let action = event_type
            .clone()
            .or_else(|| extract::text(build, "action"))
            .unwrap_or_else(|| DEFAULT_ACTION.to_string());
        let title = format!(
            "{} - {action}",
            project.as_deref().unwrap_or(UNKNOWN_PROJECT)
        );

        let content = extract::first_text(build, &["statusMessage", "errorMessage"])
            .or_else(|| extract::text(event, "eventMessage"))
            .unwrap_or_else(|| {
                format!(
                    "项目: {}\n操作: {}\n状态: {}",
                    extract::text(event, "projectName").as_deref().unwrap_or(UNKNOWN_PROJECT),
                    event_type.as_deref().unwrap_or("未知操作"),
                    extract::text(build, "status").as_deref().unwrap_or("未知状态"),
                )
            });

        let service = project
            .clone()
            .or_else(|| either("depotName"))
            .unwrap_or_else(|| self.unknown_service.clone());

        let unknown = || "unknown".to_string();
        let mut labels = BTreeMap::new();
        labels.insert("project".to_string(), project.unwrap_or_else(unknown));
        labels.insert(
            "branch".to_string(),
            extract::text(build, "branch")
                .or_else(|| extract::text(event, "branch"))
                .unwrap_or_else(unknown),
        );
        labels.insert(
            "commit".to_string(),
            extract::text(build, "commitId")
                .or_else(|| extract::text(event, "commitId"))
                .unwrap_or_else(unknown),
        );
        labels.insert(
            "build".to_string(),
            extract::first_text(build, &["buildNumber", "buildId"]).unwrap_or_else(unknown),
        );

        let mut annotations = BTreeMap::new();
        annotations.insert("source".to_string(), NAME.to_string());
        annotations.insert(
            "type".to_string(),
            event_type.clone().unwrap_or_else(|| "build".to_string()),
        );
        annotations.insert(
            "trigger".to_string(),
            extract::text(build, "triggerBy")
                .or_else(|| extract::text(event, "triggerBy"))
                .unwrap_or_else(|| "manual".to_string()),
        );
        annotations.insert(
            "duration".to_string(),
            extract::text(build, "duration").map_or_else(unknown, |d| format!("{d}s")),
        );

        let mut tags = vec!["coding".to_string(), "ci-cd".to_string()];
        if let Some(status) = extract::text(build, "status") {
            tags.push(status.to_lowercase());
        }
        if let Some(event_type) = &event_type {
            tags.push(event_type.to_lowercase());
        }

        Ok(ParsedMessage {
            id: extract::text(build, "buildId")
                .or_else(|| extract::text(event, "eventId"))
                .unwrap_or_else(|| extract::fallback_id("coding")),
            title,
            content,
            level: status.map_or(Level::P2, |s| Self::map_level(&s)),
            source: SOURCE.to_string(),
            service,
            timestamp: extract::first_timestamp(build, &["endTime", "startTime"])
                .unwrap_or_else(Utc::now),
            labels,
            annotations,
            tags,
            raw: raw.clone(),
            parser: NAME.to_string(),
            confidence: CONFIDENCE_EXACT,
        })
    }

    fn parse_text(&self, text: &str, raw: &Value) -> ParsedMessage {
        debug!(parser = NAME, "payload is not JSON, using labeled-field extraction");
        let project = extract::capture(&TEXT_PROJECT, text);
        let level = match extract::capture(&TEXT_STATUS, text).as_deref() {
            Some("失败") => Level::P0,
            Some("成功") => Level::P3,
            _ => Level::P2,
        };
        ParsedMessage {
            id: extract::fallback_id("coding_text"),
            title: project
                .clone()
                .unwrap_or_else(|| DEFAULT_TEXT_TITLE.to_string()),
            content: text.to_string(),
            level,
            source: SOURCE.to_string(),
            service: project.unwrap_or_else(|| self.unknown_service.clone()),
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

impl Default for CodingCiParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceParser for CodingCiParser {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Coding DevOps CI/CD build and pipeline events"
    }

    fn recognizes(&self, input: &str) -> bool {
        PATTERNS.is_match(input)
    }

    fn parse(&self, raw: &Value) -> ParseResult {
        self.extract(raw).into()
    }
}
