//! Core types for the routing engine.
//!
//! This module provides the fundamental types used throughout the herald-route crate:
//! - [`Level`]: The normalized severity of a message
//! - [`ParsedMessage`]: The canonical form every source payload is normalized into
//! - [`ParseResult`]: The outcome of running a parser over a payload
//! - [`Group`], [`Channel`], [`User`]: Notification targets owned by the storage layer
//! - [`Rule`]: A keyword-triggered notification directive scoped to one group

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Result, RouteError};

/// The normalized severity of a message.
///
/// Source severities (numeric, textual, build status) collapse onto this
/// five-level scale. `Unknown` is a legitimate outcome, not an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    /// Outage-grade, page immediately.
    P0,
    /// Degradation that needs prompt attention.
    P1,
    /// Routine operational event.
    P2,
    /// Informational.
    P3,
    /// Lowest urgency.
    P4,
    /// The source severity did not map onto the scale.
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl Level {
    /// Returns the level as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::P0 => "P0",
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
            Self::P4 => "P4",
            Self::Unknown => "unknown",
        }
    }

    /// Maps a numeric priority (0 = most urgent) onto a level.
    #[must_use]
    pub const fn from_index(index: u64) -> Option<Self> {
        match index {
            0 => Some(Self::P0),
            1 => Some(Self::P1),
            2 => Some(Self::P2),
            3 => Some(Self::P3),
            4 => Some(Self::P4),
            _ => None,
        }
    }

    /// Parses the canonical spelling (`P0`..`P4`, case-insensitive).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "P0" => Some(Self::P0),
            "P1" => Some(Self::P1),
            "P2" => Some(Self::P2),
            "P3" => Some(Self::P3),
            "P4" => Some(Self::P4),
            _ => None,
        }
    }

    /// Returns true for the two levels that warrant paging someone.
    #[must_use]
    pub const fn is_urgent(&self) -> bool {
        matches!(self, Self::P0 | Self::P1)
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A source payload normalized into the canonical schema.
///
/// Every message handed out by a successful parse has a non-empty `title`,
/// `content` and `service`, and a concrete `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedMessage {
    /// Source-provided identifier or a generated fallback.
    pub id: String,
    /// Short human-readable headline.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Normalized severity.
    pub level: Level,
    /// Origin label, e.g. a platform name.
    pub source: String,
    /// Service or project the message is about.
    pub service: String,
    /// When the event happened (parse time when the source did not say).
    pub timestamp: DateTime<Utc>,
    /// Structured dimensions.
    pub labels: BTreeMap<String, String>,
    /// Descriptive key/values.
    pub annotations: BTreeMap<String, String>,
    /// Free-form tags, in extraction order.
    pub tags: Vec<String>,
    /// The payload exactly as received.
    pub raw: Value,
    /// Name of the parser that produced this message.
    pub parser: String,
    /// How certain the parser is about its extraction, in `[0, 1]`.
    pub confidence: f64,
}

impl ParsedMessage {
    /// Returns the text rules are matched against: title and content.
    #[must_use]
    pub fn match_text(&self) -> String {
        format!("{}\n{}", self.title, self.content)
    }
}

/// The outcome of running a parser (or the whole engine) over a payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    /// Whether a message was produced.
    pub success: bool,
    /// The normalized message, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<ParsedMessage>,
    /// Failure description, present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ParseResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(message: ParsedMessage) -> Self {
        Self {
            success: true,
            message: Some(message),
            error: None,
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }

    /// Returns true if a message was produced.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success && self.message.is_some()
    }

    /// Converts into a plain [`Result`].
    ///
    /// # Errors
    ///
    /// Returns `RouteError::UnrecognizedFormat` for a failed result.
    pub fn into_result(self) -> Result<ParsedMessage> {
        match self.message {
            Some(message) if self.success => Ok(message),
            _ => Err(RouteError::UnrecognizedFormat),
        }
    }
}

impl From<Result<ParsedMessage>> for ParseResult {
    fn from(result: Result<ParsedMessage>) -> Self {
        match result {
            Ok(message) => Self::success(message),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

/// Chat platforms a group can be notified on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Feishu / Lark.
    Feishu,
    /// WeCom.
    Wechat,
    /// DingTalk.
    Dingtalk,
    /// Slack.
    Slack,
    /// Discord.
    Discord,
    /// Microsoft Teams.
    Teams,
    /// A generic HTTP webhook.
    Webhook,
}

impl Platform {
    /// Returns the platform as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Feishu => "feishu",
            Self::Wechat => "wechat",
            Self::Dingtalk => "dingtalk",
            Self::Slack => "slack",
            Self::Discord => "discord",
            Self::Teams => "teams",
            Self::Webhook => "webhook",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A notification channel attached to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Unique identifier.
    pub id: String,
    /// Target platform.
    pub platform: Platform,
    /// Display name.
    pub name: String,
    /// Delivery endpoint.
    pub url: String,
    /// Whether deliveries go out on this channel.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// A notification group (for example an on-call rotation or a team chat).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Unique machine identifier, used in inbound webhook paths.
    pub identifier: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Notification channels, in delivery order.
    #[serde(default, alias = "webhooks")]
    pub channels: Vec<Channel>,
    /// Whether the group accepts messages.
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Group {
    /// Returns the enabled channels in order.
    pub fn enabled_channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter().filter(|c| c.enabled)
    }
}

/// A person that can be mentioned in notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// External identifier per platform (at most one each).
    #[serde(default)]
    pub platform_ids: BTreeMap<Platform, String>,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Whether the user should be notified.
    #[serde(default = "default_true")]
    pub active: bool,
}

impl User {
    /// Returns the user's identifier on `platform`, if any.
    #[must_use]
    pub fn platform_id(&self, platform: Platform) -> Option<&str> {
        self.platform_ids.get(&platform).map(String::as_str)
    }
}

/// Accent color attached to a rule or template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// Red.
    Red,
    /// Yellow.
    Yellow,
    /// Green.
    Green,
    /// Blue.
    #[default]
    Blue,
}

impl Color {
    /// Returns the color as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A keyword-triggered notification directive scoped to one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier.
    pub id: String,
    /// The group this rule belongs to.
    pub group_id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Keywords, any of which triggers the rule.
    pub keywords: Vec<String>,
    /// Users to notify, in mention order.
    #[serde(default)]
    pub user_ids: Vec<String>,
    /// Accent color for the notification.
    #[serde(default, alias = "template_color")]
    pub color: Color,
    /// Higher wins when several rules match.
    #[serde(default)]
    pub priority: i64,
    /// Whether the rule is considered at all.
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Rule {
    /// Maximum allowed length for rule names.
    pub const MAX_NAME_LENGTH: usize = 256;

    /// Creates a new rule builder.
    pub fn builder(group_id: impl Into<String>, name: impl Into<String>) -> RuleBuilder {
        RuleBuilder::new(group_id, name)
    }
}

/// Builder for creating [`Rule`] instances.
#[derive(Debug)]
pub struct RuleBuilder {
    group_id: String,
    name: String,
    keywords: Vec<String>,
    user_ids: Vec<String>,
    color: Color,
    priority: i64,
    active: bool,
}

impl RuleBuilder {
    fn new(group_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            name: name.into(),
            keywords: Vec::new(),
            user_ids: Vec::new(),
            color: Color::default(),
            priority: 0,
            active: true,
        }
    }

    /// Adds a trigger keyword.
    #[must_use]
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    /// Adds several trigger keywords.
    #[must_use]
    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.extend(keywords.into_iter().map(Into::into));
        self
    }

    /// Adds a user to notify.
    #[must_use]
    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_ids.push(user_id.into());
        self
    }

    /// Sets the accent color.
    #[must_use]
    pub const fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Sets whether the rule is active.
    #[must_use]
    pub const fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Builds the [`Rule`].
    ///
    /// # Errors
    ///
    /// Returns `RouteError::InvalidRule` if:
    /// - The group id is empty
    /// - The name exceeds the maximum length
    pub fn build(self) -> Result<Rule> {
        if self.group_id.is_empty() {
            return Err(RouteError::InvalidRule {
                reason: "group id cannot be empty".to_string(),
            });
        }

        if self.name.len() > Rule::MAX_NAME_LENGTH {
            return Err(RouteError::InvalidRule {
                reason: format!(
                    "rule name exceeds maximum length of {} characters",
                    Rule::MAX_NAME_LENGTH
                ),
            });
        }

        Ok(Rule {
            id: Uuid::new_v4().to_string(),
            group_id: self.group_id,
            name: self.name,
            keywords: self.keywords,
            user_ids: self.user_ids,
            color: self.color,
            priority: self.priority,
            active: self.active,
        })
    }
}

const fn default_true() -> bool {
    true
}
