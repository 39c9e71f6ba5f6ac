//! Read-only configuration snapshots consumed by the router.
//!
//! The router never writes configuration. Anything that can hand out
//! groups, users, rules and custom templates implements [`ConfigSource`];
//! [`RoutingConfig`] is the in-memory implementation, loadable from the JSON
//! export format.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{Result, RouteError};
use crate::templates::Template;
use crate::types::{Group, Rule, User};

/// A provider of configuration snapshots.
///
/// Each call returns an ordered snapshot that is only assumed valid for the
/// duration of one routing decision.
pub trait ConfigSource {
    /// Returns all groups.
    fn groups(&self) -> Vec<Group>;

    /// Returns all users.
    fn users(&self) -> Vec<User>;

    /// Returns all rules, in storage order.
    fn rules(&self) -> Vec<Rule>;

    /// Returns the rules that belong to `group_id`, in storage order.
    fn rules_by_group(&self, group_id: &str) -> Vec<Rule> {
        self.rules()
            .into_iter()
            .filter(|r| r.group_id == group_id)
            .collect()
    }

    /// Returns the custom templates, in storage order.
    fn templates(&self) -> Vec<Template>;
}

/// Export metadata carried alongside the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Format version.
    pub version: String,
    /// When the export was first created.
    pub created_at: String,
    /// When the export was last written.
    pub updated_at: String,
}

/// A complete routing configuration held in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Notification groups.
    pub groups: Vec<Group>,
    /// Users.
    pub users: Vec<User>,
    /// Keyword rules.
    pub rules: Vec<Rule>,
    /// Custom templates.
    pub templates: Vec<Template>,
    /// Export metadata.
    pub settings: Settings,
    /// Parser engine settings.
    pub engine: EngineConfig,
}

impl RoutingConfig {
    /// Parses and validates a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns `RouteError::SerializationError` for malformed JSON, or the
    /// error reported by [`RoutingConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        debug!(
            groups = config.groups.len(),
            users = config.users.len(),
            rules = config.rules.len(),
            templates = config.templates.len(),
            "routing configuration parsed"
        );
        Ok(config)
    }

    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `RouteError::Io` if the file cannot be read, otherwise as
    /// [`RoutingConfig::from_json`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        info!(path = %path.display(), "loaded routing configuration");
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `RouteError::SerializationError` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks cross-references and namespaces.
    ///
    /// # Errors
    ///
    /// - `RouteError::InvalidRule` if a rule names an unknown group or has an
    ///   over-long name.
    /// - `RouteError::InvalidTemplate` if a template is invalid, is marked
    ///   as a preset, or uses the preset namespace.
    pub fn validate(&self) -> Result<()> {
        let group_ids: HashSet<&str> = self.groups.iter().map(|g| g.id.as_str()).collect();

        for rule in &self.rules {
            if !group_ids.contains(rule.group_id.as_str()) {
                return Err(RouteError::InvalidRule {
                    reason: format!("rule '{}' references unknown group '{}'", rule.id, rule.group_id),
                });
            }
            if rule.name.len() > Rule::MAX_NAME_LENGTH {
                return Err(RouteError::InvalidRule {
                    reason: format!("rule '{}' name is too long", rule.id),
                });
            }
        }

        for template in &self.templates {
            template.validate_custom()?;
        }
        Ok(())
    }

    /// Looks up a group by its machine identifier.
    #[must_use]
    pub fn group_by_identifier(&self, identifier: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.identifier == identifier)
    }
}

impl ConfigSource for RoutingConfig {
    fn groups(&self) -> Vec<Group> {
        self.groups.clone()
    }

    fn users(&self) -> Vec<User> {
        self.users.clone()
    }

    fn rules(&self) -> Vec<Rule> {
        self.rules.clone()
    }

    fn templates(&self) -> Vec<Template> {
        self.templates.clone()
    }
}
