//! Keyword rule matching.
//!
//! A [`Rule`] fires for a message when it is active and any of its keywords
//! occurs in the message text, compared case-insensitively. When several
//! rules in a group fire, the highest priority wins; equal priorities keep
//! their storage order.

use tracing::debug;

use crate::types::Rule;

impl Rule {
    /// Returns true if this rule fires for `text`.
    ///
    /// Inactive rules never fire, and neither do rules without keywords.
    /// An empty keyword is a substring of any text, so it fires for every
    /// message.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        if !self.active {
            return false;
        }
        let text = text.to_lowercase();
        self.keywords
            .iter()
            .any(|k| text.contains(&k.to_lowercase()))
    }
}

/// Returns the rules of `group_id` that fire for `text`, highest priority first.
///
/// The sort is stable: rules with equal priority keep their input order.
#[must_use]
pub fn find_matching_rules<'a>(group_id: &str, text: &str, rules: &'a [Rule]) -> Vec<&'a Rule> {
    let mut matched: Vec<&Rule> = rules
        .iter()
        .filter(|r| r.group_id == group_id && r.matches(text))
        .collect();
    matched.sort_by(|a, b| b.priority.cmp(&a.priority));

    debug!(
        group_id = %group_id,
        candidates = rules.len(),
        matched = matched.len(),
        "rule matching complete"
    );
    matched
}

/// Returns the rules that belong to `group_id`, in input order.
#[must_use]
pub fn rules_by_group<'a>(group_id: &str, rules: &'a [Rule]) -> Vec<&'a Rule> {
    rules.iter().filter(|r| r.group_id == group_id).collect()
}

/// Returns the active rules, in input order.
#[must_use]
pub fn active_rules(rules: &[Rule]) -> Vec<&Rule> {
    rules.iter().filter(|r| r.active).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rule(group: &str, name: &str, keywords: &[&str], priority: i64) -> Rule {
        Rule::builder(group, name)
            .keywords(keywords.iter().copied())
            .priority(priority)
            .build()
            .unwrap()
    }

    mod match_tests {
        use super::*;

        #[test]
        fn case_insensitive() {
            let r = rule("g", "db", &["MySQL"], 1);
            assert!(r.matches("mysql connection refused"));
            assert!(r.matches("MYSQL DOWN"));
        }

        #[test]
        fn any_keyword_suffices() {
            let r = rule("g", "db", &["数据库", "超时"], 8);
            assert!(r.matches("服务：payment-svc 数据库连接超时"));
            assert!(r.matches("请求超时"));
            assert!(!r.matches("一切正常"));
        }

        #[test]
        fn inactive_never_matches() {
            let mut r = rule("g", "db", &["mysql"], 1);
            r.active = false;
            assert!(!r.matches("mysql down"));
        }

        #[test]
        fn empty_keyword_list_never_matches() {
            let r = rule("g", "none", &[], 1);
            assert!(!r.matches("anything"));
            assert!(!r.matches(""));
        }

        #[test]
        fn empty_keyword_matches_everything() {
            let r = rule("g", "blank", &[""], 1);
            assert!(r.matches("anything"));
            assert!(r.matches(""));
            let r = rule("g", "mixed", &["", "disk"], 1);
            assert!(r.matches("cpu high"));
        }

        #[test]
        fn empty_keyword_still_needs_active_rule() {
            let mut r = rule("g", "blank", &[""], 1);
            r.active = false;
            assert!(!r.matches("anything"));
        }
    }

    mod find_tests {
        use super::*;

        #[test]
        fn sorted_by_descending_priority() {
            let rules = vec![
                rule("g", "five", &["cpu"], 5),
                rule("g", "ten", &["cpu"], 10),
                rule("g", "three", &["cpu"], 3),
            ];
            let matched = find_matching_rules("g", "CPU high", &rules);
            let priorities: Vec<_> = matched.iter().map(|r| r.priority).collect();
            assert_eq!(priorities, vec![10, 5, 3]);
        }

        #[test]
        fn ties_keep_input_order() {
            let rules = vec![
                rule("g", "first", &["cpu"], 5),
                rule("g", "high", &["cpu"], 9),
                rule("g", "second", &["cpu"], 5),
                rule("g", "third", &["cpu"], 5),
            ];
            let names: Vec<_> = find_matching_rules("g", "cpu", &rules)
                .iter()
                .map(|r| r.name.as_str())
                .collect();
            assert_eq!(names, vec!["high", "first", "second", "third"]);
        }

        #[test]
        fn filters_other_groups_and_non_matching() {
            let rules = vec![
                rule("g1", "db", &["数据库", "MySQL"], 10),
                rule("g1", "api", &["API", "timeout"], 5),
                rule("g2", "deploy", &["部署", "数据库"], 3),
            ];
            let matched = find_matching_rules("g1", "MySQL数据库连接超时，请检查网络配置", &rules);
            assert_eq!(matched.len(), 1);
            assert_eq!(matched[0].name, "db");
        }

        #[test]
        fn no_rules() {
            assert!(find_matching_rules("g", "text", &[]).is_empty());
        }

        #[test]
        fn group_and_active_helpers() {
            let mut rules = vec![rule("g1", "a", &["x"], 1), rule("g2", "b", &["x"], 1)];
            rules[1].active = false;
            assert_eq!(rules_by_group("g1", &rules).len(), 1);
            assert_eq!(active_rules(&rules).len(), 1);
            assert_eq!(active_rules(&rules)[0].name, "a");
        }
    }

    proptest! {
        #[test]
        fn output_is_sorted_and_matching(priorities in prop::collection::vec(-50i64..50, 0..20)) {
            let rules: Vec<Rule> = priorities
                .iter()
                .enumerate()
                .map(|(i, p)| rule("g", &format!("r{i}"), &["alert"], *p))
                .collect();
            let matched = find_matching_rules("g", "ALERT fired", &rules);
            prop_assert_eq!(matched.len(), rules.len());
            for pair in matched.windows(2) {
                prop_assert!(pair[0].priority >= pair[1].priority);
            }
        }

        #[test]
        fn matching_ignores_case(word in "[a-zA-Z]{1,12}") {
            let r = rule("g", "w", &[word.as_str()], 0);
            let upper = format!("prefix {} suffix", word.to_uppercase());
            let lower = format!("prefix {} suffix", word.to_lowercase());
            prop_assert!(r.matches(&upper));
            prop_assert!(r.matches(&lower));
        }
    }
}
