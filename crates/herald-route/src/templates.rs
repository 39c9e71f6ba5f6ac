//! Presentation templates and condition-based template selection.
//!
//! A [`Template`] couples a list of [`TemplateCondition`]s with a style and
//! a content layout. Selection evaluates custom templates and the built-in
//! presets against a [`FieldMap`]; a matching custom template always beats a
//! matching preset, and when nothing matches the first preset is used.

use once_cell::sync::Lazy;
use regex::{Captures, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, RouteError};
use crate::fields::FieldMap;
use crate::presets;
use crate::types::Color;

/// Id prefix reserved for built-in presets.
pub const PRESET_ID_PREFIX: &str = "preset_";

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z0-9_.\-]+)\}").unwrap_or_else(|_| unreachable!())
});

/// How a condition compares a field with its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionOperator {
    /// Whole-value equality.
    Equals,
    /// Substring test.
    Contains,
    /// Case-insensitive regular expression search.
    Regex,
}

impl ConditionOperator {
    /// Returns the operator as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::Contains => "contains",
            Self::Regex => "regex",
        }
    }
}

impl std::fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single `field operator value` test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateCondition {
    /// The field to look up.
    pub field: String,
    /// The comparison.
    pub operator: ConditionOperator,
    /// The value (or pattern) to compare against.
    pub value: String,
}

impl TemplateCondition {
    /// Creates a new condition.
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Evaluates the condition against a field map.
    ///
    /// Absent fields fail. Both sides are lowercased before comparison; a
    /// malformed regex never matches.
    #[must_use]
    pub fn matches(&self, fields: &FieldMap) -> bool {
        let Some(value) = fields.get(&self.field) else {
            return false;
        };
        let value = value.to_lowercase();
        let expected = self.value.to_lowercase();

        match self.operator {
            ConditionOperator::Equals => value == expected,
            ConditionOperator::Contains => value.contains(&expected),
            ConditionOperator::Regex => match RegexBuilder::new(&self.value)
                .case_insensitive(true)
                .build()
            {
                Ok(re) => re.is_match(&value),
                Err(e) => {
                    debug!(pattern = %self.value, error = %e, "invalid condition regex");
                    false
                }
            },
        }
    }
}

impl std::fmt::Display for TemplateCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {:?}", self.field, self.operator, self.value)
    }
}

/// Visual styling of a rendered notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateStyle {
    /// Title with `{field}` placeholders.
    pub title_template: String,
    /// Accent color.
    #[serde(alias = "template_color")]
    pub color: Color,
    /// Icon token understood by the chat platform.
    #[serde(default, alias = "icon_token")]
    pub icon: String,
    /// Tag label.
    #[serde(default)]
    pub tag_text: String,
    /// Tag color.
    #[serde(default)]
    pub tag_color: String,
}

/// Text layout of a rendered notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateContent {
    /// Left column lines with `{field}` placeholders.
    #[serde(default)]
    pub left_content: Vec<String>,
    /// Right column lines with `{field}` placeholders.
    #[serde(default)]
    pub right_content: Vec<String>,
    /// Label of the detail button.
    #[serde(default)]
    pub button_text: String,
}

/// Where a template comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    /// Created by users through the storage layer.
    #[default]
    Custom,
    /// Shipped with Herald; immutable.
    Preset,
}

impl TemplateKind {
    /// Returns the kind as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::Preset => "preset",
        }
    }
}

/// A presentation template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// All must match for the template to apply; none means always.
    #[serde(default)]
    pub conditions: Vec<TemplateCondition>,
    /// Styling.
    pub style: TemplateStyle,
    /// Content layout.
    #[serde(default)]
    pub content: TemplateContent,
    /// Custom or preset.
    #[serde(default)]
    pub kind: TemplateKind,
}

impl Template {
    /// Returns true for built-in presets.
    #[must_use]
    pub fn is_preset(&self) -> bool {
        self.kind == TemplateKind::Preset
    }

    /// Returns true if every condition matches (vacuously true with none).
    #[must_use]
    pub fn matches(&self, fields: &FieldMap) -> bool {
        self.conditions.iter().all(|c| c.matches(fields))
    }

    /// Checks that the id agrees with the kind.
    ///
    /// # Errors
    ///
    /// Returns `RouteError::InvalidTemplate` if the id is empty, if a
    /// custom template uses the reserved preset prefix, or if a preset does
    /// not.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(RouteError::InvalidTemplate {
                reason: "template id cannot be empty".to_string(),
            });
        }
        if self.is_preset() != self.id.starts_with(PRESET_ID_PREFIX) {
            return Err(RouteError::InvalidTemplate {
                reason: format!(
                    "template id '{}' does not match kind '{}' (prefix '{PRESET_ID_PREFIX}' is reserved for presets)",
                    self.id,
                    self.kind.as_str()
                ),
            });
        }
        Ok(())
    }

    /// Checks a template coming from storage.
    ///
    /// Presets only ship with Herald, so a stored template may neither be
    /// marked as one nor take an id from the preset namespace.
    ///
    /// # Errors
    ///
    /// Returns `RouteError::InvalidTemplate` if the template is marked as a
    /// preset, or for anything [`Template::validate`] rejects.
    pub fn validate_custom(&self) -> Result<()> {
        if self.is_preset() {
            return Err(RouteError::InvalidTemplate {
                reason: format!("stored template '{}' cannot be a preset", self.id),
            });
        }
        self.validate()
    }

    /// Fills the placeholders of the title and content from `fields`.
    ///
    /// Placeholders without a matching field are left as written.
    #[must_use]
    pub fn render(&self, fields: &FieldMap) -> RenderedTemplate {
        let fill = |lines: &[String]| -> Vec<String> {
            lines.iter().map(|l| render_text(l, fields)).collect()
        };
        RenderedTemplate {
            template_id: self.id.clone(),
            title: render_text(&self.style.title_template, fields),
            color: self.style.color,
            icon: self.style.icon.clone(),
            tag_text: self.style.tag_text.clone(),
            tag_color: self.style.tag_color.clone(),
            left: fill(&self.content.left_content),
            right: fill(&self.content.right_content),
            button_text: self.content.button_text.clone(),
        }
    }
}

/// A template with its placeholders filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedTemplate {
    /// The template that was rendered.
    pub template_id: String,
    /// Rendered title.
    pub title: String,
    /// Accent color.
    pub color: Color,
    /// Icon token.
    pub icon: String,
    /// Tag label.
    pub tag_text: String,
    /// Tag color.
    pub tag_color: String,
    /// Rendered left column.
    pub left: Vec<String>,
    /// Rendered right column.
    pub right: Vec<String>,
    /// Button label.
    pub button_text: String,
}

/// Replaces `{field}` placeholders with values from `fields`.
#[must_use]
pub fn render_text(text: &str, fields: &FieldMap) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| {
            fields
                .get(&caps[1])
                .map_or_else(|| caps[0].to_string(), str::to_string)
        })
        .into_owned()
}

/// Finds the template to use among `custom` and `presets`.
///
/// All templates are evaluated, customs first. Among the matches, the first
/// custom template wins; failing that, the first matching preset. Returns
/// `None` only when nothing matches and `presets` is empty.
#[must_use]
pub fn find_matching_template<'a>(
    fields: &FieldMap,
    custom: &'a [Template],
    presets: &'a [Template],
) -> Option<&'a Template> {
    let matching: Vec<&Template> = custom
        .iter()
        .chain(presets)
        .filter(|t| t.matches(fields))
        .collect();

    matching
        .iter()
        .find(|t| !t.is_preset())
        .or_else(|| matching.first())
        .copied()
        .or_else(|| presets.first())
}

/// Template selection with a guaranteed fallback.
#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    presets: Vec<Template>,
}

impl TemplateMatcher {
    /// Creates a matcher over the built-in presets.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            presets: presets::preset_templates().to_vec(),
        }
    }

    /// Creates a matcher over the given presets.
    ///
    /// # Errors
    ///
    /// Returns `RouteError::InvalidTemplate` if `presets` is empty.
    pub fn with_presets(presets: Vec<Template>) -> Result<Self> {
        if presets.is_empty() {
            return Err(RouteError::InvalidTemplate {
                reason: "at least one preset template is required".to_string(),
            });
        }
        Ok(Self { presets })
    }

    /// Returns the presets.
    #[must_use]
    pub fn presets(&self) -> &[Template] {
        &self.presets
    }

    /// Returns the template for `fields`, never failing.
    #[must_use]
    pub fn find<'a>(&'a self, fields: &FieldMap, custom: &'a [Template]) -> &'a Template {
        match find_matching_template(fields, custom, &self.presets) {
            Some(template) if template.matches(fields) => template,
            fallback => {
                let template = fallback.unwrap_or(&self.presets[0]);
                warn!(template_id = %template.id, "no template matched, using default preset");
                template
            }
        }
    }
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> TemplateStyle {
        TemplateStyle {
            title_template: "{service} alert".to_string(),
            color: Color::Blue,
            icon: String::new(),
            tag_text: String::new(),
            tag_color: String::new(),
        }
    }

    fn template(id: &str, kind: TemplateKind, conditions: Vec<TemplateCondition>) -> Template {
        Template {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            conditions,
            style: style(),
            content: TemplateContent::default(),
            kind,
        }
    }

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs.iter().copied().collect()
    }

    mod condition_tests {
        use super::*;

        #[test]
        fn equals_ignores_case() {
            let c = TemplateCondition::new("level", ConditionOperator::Equals, "p0");
            assert!(c.matches(&fields(&[("level", "P0")])));
            assert!(!c.matches(&fields(&[("level", "P01")])));
        }

        #[test]
        fn contains() {
            let c = TemplateCondition::new("description", ConditionOperator::Contains, "Timeout");
            assert!(c.matches(&fields(&[("description", "db TIMEOUT on read")])));
            assert!(!c.matches(&fields(&[("description", "ok")])));
        }

        #[test]
        fn regex_is_case_insensitive() {
            let c = TemplateCondition::new("service", ConditionOperator::Regex, "^API-(GW|EDGE)$");
            assert!(c.matches(&fields(&[("service", "api-gw")])));
            assert!(!c.matches(&fields(&[("service", "payments")])));
        }

        #[test]
        fn malformed_regex_is_non_match() {
            let c = TemplateCondition::new("service", ConditionOperator::Regex, "([unclosed");
            assert!(!c.matches(&fields(&[("service", "([unclosed")])));
        }

        #[test]
        fn absent_field_fails_but_empty_field_is_present() {
            let c = TemplateCondition::new("tag", ConditionOperator::Equals, "");
            assert!(!c.matches(&FieldMap::new()));
            assert!(c.matches(&fields(&[("tag", "")])));
        }

        #[test]
        fn operator_serialization() {
            assert_eq!(serde_json::to_string(&ConditionOperator::Regex).unwrap(), "\"regex\"");
            let op: ConditionOperator = serde_json::from_str("\"contains\"").unwrap();
            assert_eq!(op, ConditionOperator::Contains);
        }
    }

    mod template_tests {
        use super::*;

        #[test]
        fn no_conditions_match_vacuously() {
            assert!(template("t", TemplateKind::Custom, vec![]).matches(&FieldMap::new()));
        }

        #[test]
        fn all_conditions_must_match() {
            let t = template(
                "t",
                TemplateKind::Custom,
                vec![
                    TemplateCondition::new("level", ConditionOperator::Equals, "P0"),
                    TemplateCondition::new("service", ConditionOperator::Contains, "pay"),
                ],
            );
            assert!(t.matches(&fields(&[("level", "P0"), ("service", "payments")])));
            assert!(!t.matches(&fields(&[("level", "P0"), ("service", "search")])));
            assert!(!t.matches(&fields(&[("level", "P0")])));
        }

        #[test]
        fn validate_reserved_prefix() {
            assert!(template("preset_mine", TemplateKind::Custom, vec![]).validate().is_err());
            assert!(template("preset_p0", TemplateKind::Preset, vec![]).validate().is_ok());
            assert!(template("mine", TemplateKind::Preset, vec![]).validate().is_err());
            assert!(template("mine", TemplateKind::Custom, vec![]).validate().is_ok());
            assert!(template("", TemplateKind::Custom, vec![]).validate().is_err());
        }

        #[test]
        fn stored_templates_cannot_claim_preset_kind() {
            assert!(template("mine", TemplateKind::Custom, vec![]).validate_custom().is_ok());
            assert!(template("mine", TemplateKind::Preset, vec![]).validate_custom().is_err());
            assert!(template("preset_p0", TemplateKind::Preset, vec![]).validate_custom().is_err());
            assert!(template("preset_p0", TemplateKind::Custom, vec![]).validate_custom().is_err());
        }

        #[test]
        fn render_fills_known_placeholders() {
            let mut t = template("t", TemplateKind::Custom, vec![]);
            t.content.left_content = vec!["服务: {service}".into(), "at {timestamp}".into()];
            t.content.right_content = vec!["{mentions}".into()];
            t.content.button_text = "Open".into();
            let rendered = t.render(&fields(&[("service", "api"), ("mentions", "@ada")]));
            assert_eq!(rendered.title, "api alert");
            assert_eq!(rendered.left, vec!["服务: api", "at {timestamp}"]);
            assert_eq!(rendered.right, vec!["@ada"]);
            assert_eq!(rendered.button_text, "Open");
            assert_eq!(rendered.template_id, "t");
        }

        #[test]
        fn render_text_dotted_fields() {
            let f = fields(&[("labels.job", "api")]);
            assert_eq!(render_text("job={labels.job} {missing}", &f), "job=api {missing}");
        }

        #[test]
        fn deserializes_storage_shape() {
            let t: Template = serde_json::from_str(
                r#"{"id":"t1","name":"db","conditions":[{"field":"level","operator":"equals","value":"P0"}],
                   "style":{"title_template":"{service}","template_color":"red","icon_token":"alert"},
                   "content":{"left_content":["a"],"right_content":[],"button_text":"go"}}"#,
            )
            .unwrap();
            assert_eq!(t.kind, TemplateKind::Custom);
            assert_eq!(t.style.color, Color::Red);
            assert_eq!(t.style.icon, "alert");
            assert_eq!(t.conditions.len(), 1);
        }
    }

    mod selection_tests {
        use super::*;

        fn level_is(value: &str) -> Vec<TemplateCondition> {
            vec![TemplateCondition::new("level", ConditionOperator::Equals, value)]
        }

        #[test]
        fn custom_beats_preset() {
            let custom = vec![template("mine", TemplateKind::Custom, level_is("P0"))];
            let presets = vec![template("preset_a", TemplateKind::Preset, level_is("P0"))];
            let chosen = find_matching_template(&fields(&[("level", "P0")]), &custom, &presets);
            assert_eq!(chosen.unwrap().id, "mine");
        }

        #[test]
        fn custom_beats_earlier_listed_preset() {
            // Presets handed in the custom slice still lose to real customs.
            let custom = vec![
                template("preset_x", TemplateKind::Preset, vec![]),
                template("mine", TemplateKind::Custom, vec![]),
            ];
            let chosen = find_matching_template(&FieldMap::new(), &custom, &[]);
            assert_eq!(chosen.unwrap().id, "mine");
        }

        #[test]
        fn first_matching_custom_wins() {
            let custom = vec![
                template("a", TemplateKind::Custom, level_is("P1")),
                template("b", TemplateKind::Custom, level_is("P0")),
                template("c", TemplateKind::Custom, vec![]),
            ];
            let chosen = find_matching_template(&fields(&[("level", "P0")]), &custom, &[]);
            assert_eq!(chosen.unwrap().id, "b");
        }

        #[test]
        fn matching_preset_when_no_custom_matches() {
            let custom = vec![template("mine", TemplateKind::Custom, level_is("P3"))];
            let presets = vec![
                template("preset_a", TemplateKind::Preset, level_is("P0")),
                template("preset_b", TemplateKind::Preset, level_is("P1")),
            ];
            let chosen = find_matching_template(&fields(&[("level", "P1")]), &custom, &presets);
            assert_eq!(chosen.unwrap().id, "preset_b");
        }

        #[test]
        fn falls_back_to_first_preset() {
            let presets = vec![
                template("preset_a", TemplateKind::Preset, level_is("P0")),
                template("preset_b", TemplateKind::Preset, level_is("P1")),
            ];
            let chosen = find_matching_template(&fields(&[("level", "P4")]), &[], &presets);
            assert_eq!(chosen.unwrap().id, "preset_a");
        }

        #[test]
        fn none_without_presets() {
            assert!(find_matching_template(&FieldMap::new(), &[], &[]).is_none());
        }

        #[test]
        fn matcher_requires_presets() {
            assert!(TemplateMatcher::with_presets(Vec::new()).is_err());
        }

        #[test]
        fn builtin_matcher_never_empty() {
            let matcher = TemplateMatcher::builtin();
            let chosen = matcher.find(&FieldMap::new(), &[]);
            assert_eq!(chosen.id, matcher.presets()[0].id);
        }

        #[test]
        fn builtin_matcher_prefers_custom() {
            let matcher = TemplateMatcher::builtin();
            let custom = vec![template("mine", TemplateKind::Custom, level_is("P0"))];
            let chosen = matcher.find(&fields(&[("level", "P0")]), &custom);
            assert_eq!(chosen.id, "mine");
        }
    }
}
