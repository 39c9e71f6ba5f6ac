//! Catch-all free-text parser.

use std::collections::BTreeMap;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::extract;
use super::{CONFIDENCE_GENERIC, SourceParser};
use crate::config::EngineConfig;
use crate::types::{Level, ParseResult, ParsedMessage};

const NAME: &str = "generic-text";
const SOURCE: &str = "通用消息";
const DEFAULT_TITLE: &str = "消息通知";

static SERVICE_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"服务[：:]\s*([^\n\s]+)").unwrap_or_else(|_| unreachable!()),
        Regex::new(r"(?i)service[：:]\s*([^\n\s]+)").unwrap_or_else(|_| unreachable!()),
        Regex::new(r"项目[：:]\s*([^\n\s]+)").unwrap_or_else(|_| unreachable!()),
    ]
});

/// Level keywords, checked in order; the first group with a hit wins.
const LEVEL_KEYWORDS: &[(Level, &[&str])] = &[
    (Level::P0, &["紧急", "严重", "critical", "urgent", "error"]),
    (Level::P1, &["警告", "warning", "warn"]),
    (Level::P3, &["通知", "info", "成功"]),
];

/// Tag dictionary: a tag is added when any of its words occurs.
const TAG_KEYWORDS: &[(&str, &[&str])] = &[
    ("error", &["error", "错误"]),
    ("warning", &["warning", "警告"]),
    ("info", &["info", "信息"]),
    ("success", &["success", "成功"]),
    ("failed", &["failed", "失败"]),
    ("alarm", &["alarm", "告警"]),
    ("test", &["test", "测试"]),
    ("deploy", &["deploy", "部署"]),
];

/// The catch-all parser.
///
/// Always tried, never fails. Everything is inferred from the text: the first
/// line becomes the title, keywords decide the level (defaulting to P2) and
/// the tags, and a `服务:`/`service:`/`项目:` token names the service.
#[derive(Debug, Clone)]
pub struct GenericTextParser {
    unknown_service: String,
    max_title_chars: usize,
}

impl GenericTextParser {
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
            max_title_chars: config.max_title_chars,
        }
    }

    /// Infers a level from keywords in the text.
    #[must_use]
    pub fn infer_level(text: &str) -> Level {
        let lower = text.to_lowercase();
        LEVEL_KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
            .map_or(Level::P2, |(level, _)| *level)
    }

    /// Derives tags from the keyword dictionary, always starting with `generic`.
    #[must_use]
    pub fn infer_tags(text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        std::iter::once("generic")
            .chain(
                TAG_KEYWORDS
                    .iter()
                    .filter(|(_, words)| words.iter().any(|w| lower.contains(w)))
                    .map(|(tag, _)| *tag),
            )
            .map(str::to_string)
            .collect()
    }

    fn title(&self, text: &str) -> String {
        let first_line = text.lines().next().unwrap_or_default().trim();
        if first_line.is_empty() {
            return DEFAULT_TITLE.to_string();
        }
        if first_line.chars().count() > self.max_title_chars {
            let cut: String = first_line.chars().take(self.max_title_chars).collect();
            format!("{cut}...")
        } else {
            first_line.to_string()
        }
    }

    fn service(&self, text: &str) -> String {
        SERVICE_PATTERNS
            .iter()
            .find_map(|re| extract::capture(re, text))
            .unwrap_or_else(|| self.unknown_service.clone())
    }
}

impl Default for GenericTextParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceParser for GenericTextParser {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Catch-all parser for free-text messages"
    }

    fn recognizes(&self, _input: &str) -> bool {
        true
    }

    fn is_catch_all(&self) -> bool {
        true
    }

    fn parse(&self, raw: &Value) -> ParseResult {
        let text = extract::stringify(raw);
        let title = self.title(&text);
        let content = if text.trim().is_empty() {
            title.clone()
        } else {
            text.clone()
        };

        ParseResult::success(ParsedMessage {
            id: extract::fallback_id("generic"),
            title,
            content,
            level: Self::infer_level(&text),
            source: SOURCE.to_string(),
            service: self.service(&text),
            timestamp: Utc::now(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            tags: Self::infer_tags(&text),
            raw: raw.clone(),
            parser: NAME.to_string(),
            confidence: CONFIDENCE_GENERIC,
        })
    }
}
