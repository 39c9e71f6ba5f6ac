//! Built-in preset templates.
//!
//! Presets are constants: they are built once, live in the `preset_` id
//! namespace and are never mutated at runtime. The first entry doubles as
//! the fallback when no template matches.

use once_cell::sync::Lazy;

use crate::templates::{
    ConditionOperator, Template, TemplateCondition, TemplateContent, TemplateKind, TemplateStyle,
};
use crate::types::Color;

/// Id of the P0 preset, the default fallback.
pub const PRESET_P0: &str = "preset_p0";
/// Id of the P1 preset.
pub const PRESET_P1: &str = "preset_p1";
/// Id of the CI/CD success preset.
pub const PRESET_CICD_SUCCESS: &str = "preset_cicd_success";

static PRESETS: Lazy<Vec<Template>> = Lazy::new(|| {
    vec![
        alert_preset(
            PRESET_P0,
            "P0紧急告警模板",
            "用于P0级别紧急告警",
            "^(p0|critical)$",
            Style {
                title: "【P0紧急】{service}",
                color: Color::Red,
                icon: "alert-circle_outlined",
                tag: "P0紧急",
                tag_color: "red",
            },
            "请立即处理",
        ),
        alert_preset(
            PRESET_P1,
            "P1警告告警模板",
            "用于P1级别警告告警",
            "^(p1|warning)$",
            Style {
                title: "【P1警告】{service}",
                color: Color::Yellow,
                icon: "warning_outlined",
                tag: "P1警告",
                tag_color: "yellow",
            },
            "请及时处理",
        ),
        Template {
            id: PRESET_CICD_SUCCESS.to_string(),
            name: "CI/CD成功模板".to_string(),
            description: "用于CI/CD部署成功通知".to_string(),
            conditions: vec![
                TemplateCondition::new("type", ConditionOperator::Equals, "coding_cicd"),
                TemplateCondition::new("level", ConditionOperator::Equals, "P3"),
            ],
            style: Style {
                title: "🚀 部署成功",
                color: Color::Green,
                icon: "check-circle_outlined",
                tag: "部署成功",
                tag_color: "green",
            }
            .into(),
            content: TemplateContent {
                left_content: lines(&[
                    "触发时间: {timestamp}",
                    "项目名称: {service}",
                    "触发类型: {source}",
                    "部署状态: 成功",
                ]),
                right_content: lines(&["恭喜！部署成功", "查看部署详情"]),
                button_text: "查看详情".to_string(),
            },
            kind: TemplateKind::Preset,
        },
    ]
});

/// Returns the built-in presets; never empty.
#[must_use]
pub fn preset_templates() -> &'static [Template] {
    &PRESETS
}

/// Looks up a preset by id.
#[must_use]
pub fn preset(id: &str) -> Option<&'static Template> {
    PRESETS.iter().find(|t| t.id == id)
}

struct Style {
    title: &'static str,
    color: Color,
    icon: &'static str,
    tag: &'static str,
    tag_color: &'static str,
}

impl From<Style> for TemplateStyle {
    fn from(style: Style) -> Self {
        Self {
            title_template: style.title.to_string(),
            color: style.color,
            icon: style.icon.to_string(),
            tag_text: style.tag.to_string(),
            tag_color: style.tag_color.to_string(),
        }
    }
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn alert_preset(
    id: &str,
    name: &str,
    description: &str,
    level_pattern: &str,
    style: Style,
    call_to_action: &str,
) -> Template {
    Template {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        conditions: vec![TemplateCondition::new(
            "level",
            ConditionOperator::Regex,
            level_pattern,
        )],
        style: style.into(),
        content: TemplateContent {
            left_content: lines(&[
                "报警时间: {timestamp}",
                "报警类型: {source}",
                "服务名称: {service}",
                "故障描述: {description}",
            ]),
            right_content: lines(&["@相关用户: {mentions}", call_to_action]),
            button_text: "查看详情".to_string(),
        },
        kind: TemplateKind::Preset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldMap;
    use crate::templates::{PRESET_ID_PREFIX, find_matching_template};
    use test_case::test_case;

    fn level(value: &str) -> FieldMap {
        [("level", value)].into_iter().collect()
    }

    #[test]
    fn presets_are_well_formed() {
        let presets = preset_templates();
        assert!(presets.len() >= 3);
        for t in presets {
            assert!(t.is_preset());
            assert!(t.id.starts_with(PRESET_ID_PREFIX));
            assert!(!t.conditions.is_empty());
            assert!(t.validate().is_ok());
        }
        assert_eq!(presets[0].id, PRESET_P0);
    }

    #[test_case("P0", PRESET_P0 ; "p0")]
    #[test_case("critical", PRESET_P0 ; "critical")]
    #[test_case("CRITICAL", PRESET_P0 ; "critical upper")]
    #[test_case("P1", PRESET_P1 ; "p1")]
    #[test_case("warning", PRESET_P1 ; "warning")]
    fn level_presets(value: &str, expected: &str) {
        let chosen = find_matching_template(&level(value), &[], preset_templates()).unwrap();
        assert_eq!(chosen.id, expected);
    }

    #[test]
    fn p01_is_not_p0() {
        assert!(!preset(PRESET_P0).unwrap().matches(&level("P01")));
    }

    #[test]
    fn cicd_success() {
        let fields: FieldMap = [("type", "coding_cicd"), ("level", "P3")].into_iter().collect();
        let chosen = find_matching_template(&fields, &[], preset_templates()).unwrap();
        assert_eq!(chosen.id, PRESET_CICD_SUCCESS);
        assert_eq!(chosen.style.color, Color::Green);
    }

    #[test]
    fn unmatched_falls_back_to_first_preset() {
        let chosen = find_matching_template(&level("P4"), &[], preset_templates()).unwrap();
        assert_eq!(chosen.id, PRESET_P0);
    }

    #[test]
    fn p0_renders_title() {
        let fields: FieldMap = [("service", "payment-svc")].into_iter().collect();
        let rendered = preset(PRESET_P0).unwrap().render(&fields);
        assert_eq!(rendered.title, "【P0紧急】payment-svc");
        assert_eq!(rendered.button_text, "查看详情");
    }

    #[test]
    fn unknown_preset() {
        assert!(preset("preset_missing").is_none());
    }
}
