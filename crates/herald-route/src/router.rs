//! Routing decisions.
//!
//! The [`Router`] ties the pipeline together: a payload addressed to a group
//! is normalized by the parser engine, matched against the group's rules to
//! pick who gets notified, and matched against the templates to pick how.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::engine::{ParserInfo, SharedParserEngine};
use crate::error::{Result, RouteError};
use crate::fields::FieldMap;
use crate::parsers::SourceParser;
use crate::rules::find_matching_rules;
use crate::source::ConfigSource;
use crate::templates::{
    PRESET_ID_PREFIX, RenderedTemplate, Template, TemplateKind, TemplateMatcher,
};
use crate::types::{Group, ParsedMessage, Platform, Rule, User};

/// Everything downstream delivery needs to notify about one payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// The group the payload was addressed to.
    pub group: Group,
    /// The normalized message.
    pub message: ParsedMessage,
    /// All rules that fired, highest priority first.
    pub matched_rules: Vec<Rule>,
    /// The winning rule, if any fired.
    pub rule: Option<Rule>,
    /// Active users of the winning rule, in the rule's order.
    pub users: Vec<User>,
    /// The selected template.
    pub template: Template,
    /// The template rendered against the message.
    pub rendered: RenderedTemplate,
}

impl RoutingDecision {
    /// Returns true if a rule fired.
    #[must_use]
    pub const fn is_matched(&self) -> bool {
        self.rule.is_some()
    }

    /// Returns true if the message is severe enough to page someone.
    #[must_use]
    pub const fn is_urgent(&self) -> bool {
        self.message.level.is_urgent()
    }
}

/// Normalizes payloads and decides rule, recipients and template.
#[derive(Debug, Clone, Default)]
pub struct Router {
    engine: SharedParserEngine,
    templates: TemplateMatcher,
}

impl Router {
    /// Creates a router with the built-in parsers and presets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a router over an existing engine and template matcher.
    #[must_use]
    pub const fn with_parts(engine: SharedParserEngine, templates: TemplateMatcher) -> Self {
        Self { engine, templates }
    }

    /// Returns the parser engine.
    #[must_use]
    pub const fn engine(&self) -> &SharedParserEngine {
        &self.engine
    }

    /// Returns the template matcher.
    #[must_use]
    pub const fn templates(&self) -> &TemplateMatcher {
        &self.templates
    }

    /// Registers a parser ahead of all existing ones.
    pub fn add_parser(&self, parser: Box<dyn SourceParser>) {
        self.engine.add_parser(parser);
    }

    /// Returns the registered parsers in dispatch order.
    #[must_use]
    pub fn parsers(&self) -> Vec<ParserInfo> {
        self.engine.parsers()
    }

    /// Routes a payload addressed to the group with `group_identifier`.
    ///
    /// A payload that matches no rule still produces a decision carrying
    /// the message and template, with no rule and no users.
    ///
    /// # Errors
    ///
    /// - `RouteError::GroupNotFound` if no group has the identifier.
    /// - `RouteError::GroupInactive` if the group is switched off.
    /// - `RouteError::UnrecognizedFormat` if no parser produced a message.
    pub fn route<S>(&self, source: &S, group_identifier: &str, raw: &Value) -> Result<RoutingDecision>
    where
        S: ConfigSource + ?Sized,
    {
        let group = source
            .groups()
            .into_iter()
            .find(|g| g.identifier == group_identifier)
            .ok_or_else(|| RouteError::GroupNotFound {
                identifier: group_identifier.to_string(),
            })?;
        if !group.active {
            return Err(RouteError::GroupInactive {
                identifier: group_identifier.to_string(),
            });
        }

        let message = self.engine.parse_message(raw).into_result()?;

        let rules = source.rules_by_group(&group.id);
        let matched_rules: Vec<Rule> = find_matching_rules(&group.id, &message.match_text(), &rules)
            .into_iter()
            .cloned()
            .collect();
        let rule = matched_rules.first().cloned();

        let users = rule
            .as_ref()
            .map(|r| resolve_users(r, &source.users()))
            .unwrap_or_default();

        let mut fields = FieldMap::from_message(&message);
        fields.insert("group", &group.name);
        fields.insert("mentions", mentions(&group, &users));
        if let Some(rule) = &rule {
            fields.insert("rule", &rule.name);
        }

        let custom = custom_templates(source.templates());
        let template = self.templates.find(&fields, &custom).clone();
        let rendered = template.render(&fields);

        info!(
            group = %group.identifier,
            message_id = %message.id,
            parser = %message.parser,
            level = %message.level,
            urgent = message.level.is_urgent(),
            rule = rule.as_ref().map_or("-", |r| r.name.as_str()),
            users = users.len(),
            template = %template.id,
            "routed message"
        );

        Ok(RoutingDecision {
            group,
            message,
            matched_rules,
            rule,
            users,
            template,
            rendered,
        })
    }
}

/// Treats every stored template as custom.
///
/// Templates in the preset namespace are dropped so they cannot shadow a
/// built-in preset; the rest are marked custom whatever they claim.
fn custom_templates(templates: Vec<Template>) -> Vec<Template> {
    templates
        .into_iter()
        .filter_map(|mut template| {
            if template.id.starts_with(PRESET_ID_PREFIX) {
                warn!(template_id = %template.id, "ignoring stored template in the preset namespace");
                return None;
            }
            template.kind = TemplateKind::Custom;
            Some(template)
        })
        .collect()
}

/// Resolves a rule's user ids to active users, keeping the rule's order.
///
/// Unknown ids are skipped.
#[must_use]
pub fn resolve_users(rule: &Rule, users: &[User]) -> Vec<User> {
    rule.user_ids
        .iter()
        .filter_map(|id| {
            let user = users.iter().find(|u| &u.id == id);
            if user.is_none() {
                debug!(rule = %rule.name, user_id = %id, "rule references unknown user");
            }
            user
        })
        .filter(|u| u.active)
        .cloned()
        .collect()
}

/// Builds the mention text for `users` on the group's enabled channels.
///
/// Each user is mentioned by the id of the first enabled channel platform
/// they have one for, or by name otherwise.
#[must_use]
pub fn mentions(group: &Group, users: &[User]) -> String {
    let platforms: Vec<Platform> = group.enabled_channels().map(|c| c.platform).collect();
    users
        .iter()
        .map(|user| {
            let handle = platforms
                .iter()
                .find_map(|p| user.platform_id(*p))
                .unwrap_or(user.name.as_str());
            format!("@{handle}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}
