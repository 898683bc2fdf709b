//! Translation profile documents.
//!
//! The persisted form of a profile is a JSON object:
//!
//! ```json
//! {
//!   "ver": "2",
//!   "name": "ldap-in",
//!   "description": "",
//!   "type": "INPUT",
//!   "rules": [
//!     {
//!       "condition": { "conditionValue": "true" },
//!       "action": { "name": "mapIdentity", "parameters": ["userName", "attr['uid']", null, "CREATE_OR_MATCH"] }
//!     }
//!   ]
//! }
//! ```
//!
//! Rule order is significant and is preserved through (de)serialization.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use super::ConfigError;

/// The only accepted value of the `ver` field.
pub const PROFILE_FORMAT_VERSION: &str = "2";

/// Kind of a translation profile. Constrains which action types may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileKind {
    /// Maps a remote authentication response into local identity state.
    #[default]
    Input,
    /// Shapes what is released to a relying party.
    Output,
    /// Registration form processing.
    Registration,
    /// Enquiry form processing.
    Enquiry,
    /// Scheduled bulk entity operations.
    BulkEntityOps,
}

impl ProfileKind {
    pub const ALL: [ProfileKind; 5] = [
        ProfileKind::Input,
        ProfileKind::Output,
        ProfileKind::Registration,
        ProfileKind::Enquiry,
        ProfileKind::BulkEntityOps,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::Input => "INPUT",
            ProfileKind::Output => "OUTPUT",
            ProfileKind::Registration => "REGISTRATION",
            ProfileKind::Enquiry => "ENQUIRY",
            ProfileKind::BulkEntityOps => "BULK_ENTITY_OPS",
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProfileKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::Config(format!("unknown profile kind '{}'", s)))
    }
}

/// Persisted translation profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDefinition {
    /// Document format version. Documents without it use the legacy format.
    #[serde(default)]
    pub ver: String,

    /// Profile name, unique within a repository.
    pub name: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,

    /// Profile kind. Missing means `INPUT`.
    #[serde(rename = "type", default)]
    pub kind: ProfileKind,

    /// Ordered rules.
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

/// One persisted rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub condition: ConditionDefinition,
    pub action: ActionDefinition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionDefinition {
    #[serde(rename = "conditionValue")]
    pub condition_value: String,
}

/// Action reference: type name plus positional, loosely typed parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub name: String,

    #[serde(default)]
    pub parameters: Vec<Option<String>>,
}

impl RuleDefinition {
    /// Build a rule whose parameters are all present.
    pub fn new(condition: impl Into<String>, action: impl Into<String>, parameters: &[&str]) -> Self {
        Self {
            condition: ConditionDefinition {
                condition_value: condition.into(),
            },
            action: ActionDefinition {
                name: action.into(),
                parameters: parameters.iter().map(|p| Some(p.to_string())).collect(),
            },
        }
    }
}

impl ProfileDefinition {
    pub fn new(name: impl Into<String>, kind: ProfileKind, rules: Vec<RuleDefinition>) -> Self {
        Self {
            ver: PROFILE_FORMAT_VERSION.to_string(),
            name: name.into(),
            description: String::new(),
            kind,
            rules,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Load a profile document from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Parse a profile document, rejecting any format version other than `2`.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let definition: ProfileDefinition = serde_json::from_str(content)?;
        definition.check_version()?;
        Ok(definition)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string(self).map_err(ConfigError::from)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(ConfigError::from)
    }

    pub fn check_version(&self) -> Result<(), ConfigError> {
        if self.ver.is_empty() {
            return Err(ConfigError::Config(format!(
                "profile '{}' uses the legacy format without 'ver'; re-save it in format {}",
                self.name, PROFILE_FORMAT_VERSION
            )));
        }
        if self.ver != PROFILE_FORMAT_VERSION {
            return Err(ConfigError::Config(format!(
                "profile '{}' has unsupported format version '{}'",
                self.name, self.ver
            )));
        }
        Ok(())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
