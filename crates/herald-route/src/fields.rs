//! Field maps: the named string values templates are matched and rendered against.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::ParsedMessage;

/// A mapping from field name to string value.
///
/// A field that was never inserted is absent, which is distinct from a field
/// holding the empty string: conditions on absent fields always fail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, String>);

impl FieldMap {
    /// Creates an empty field map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the field map for a parsed message.
    ///
    /// Besides the message's own fields this exposes `description` (the
    /// content), `type` (the message family, e.g. `coding_cicd`) and every
    /// label and annotation as `labels.<key>` / `annotations.<key>`.
    #[must_use]
    pub fn from_message(message: &ParsedMessage) -> Self {
        let mut fields = Self::new();
        fields.insert("id", &message.id);
        fields.insert("title", &message.title);
        fields.insert("content", &message.content);
        fields.insert("description", &message.content);
        fields.insert("level", message.level.as_str());
        fields.insert("source", &message.source);
        fields.insert("service", &message.service);
        fields.insert("timestamp", message.timestamp.to_rfc3339());
        fields.insert("parser", &message.parser);
        fields.insert("type", message_type(&message.parser));
        fields.insert("tags", message.tags.join(","));
        for (k, v) in &message.labels {
            fields.insert(format!("labels.{k}"), v);
        }
        for (k, v) in &message.annotations {
            fields.insert(format!("annotations.{k}"), v);
        }
        fields
    }

    /// Sets a field, replacing any previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    /// Returns a field's value, or `None` if it is absent.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Returns true if the field is present (possibly empty).
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for FieldMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Returns the message family for a parser name.
#[must_use]
pub fn message_type(parser: &str) -> &'static str {
    match parser {
        "tencent-cls" => "tencent_cls",
        "prometheus" => "prometheus",
        "coding-ci" => "coding_cicd",
        _ => "custom_alert",
    }
}
