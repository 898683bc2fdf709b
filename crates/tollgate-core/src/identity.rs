//! Identity data model shared by translation contexts, results and directories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

/// Local entity identifier.
pub type EntityId = u64;

/// Path of the root group every entity belongs to.
pub const ROOT_GROUP: &str = "/";

/// A multi-valued attribute, scoped to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(default = "root_group")]
    pub group: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, group: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            values,
        }
    }

    /// Attribute in the root group.
    pub fn root(name: impl Into<String>, values: &[&str]) -> Self {
        Self::new(
            name,
            ROOT_GROUP,
            values.iter().map(|v| v.to_string()).collect(),
        )
    }

    pub fn first_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

fn root_group() -> String {
    ROOT_GROUP.to_string()
}

/// An identity (login name, email, persistent id ...) of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "type")]
    pub type_id: String,
    pub value: String,
}

impl Identity {
    pub fn new(type_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            value: value.into(),
        }
    }
}

/// Administrative state of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityState {
    #[default]
    Valid,
    AuthenticationDisabled,
    Disabled,
    OnlyLoginPermitted,
}

impl EntityState {
    pub const ALL: [EntityState; 4] = [
        EntityState::Valid,
        EntityState::AuthenticationDisabled,
        EntityState::Disabled,
        EntityState::OnlyLoginPermitted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityState::Valid => "valid",
            EntityState::AuthenticationDisabled => "authenticationDisabled",
            EntityState::Disabled => "disabled",
            EntityState::OnlyLoginPermitted => "onlyLoginPermitted",
        }
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityState {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityState::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| ConfigError::Config(format!("unknown entity state '{}'", s)))
    }
}

/// Operation that can be scheduled against an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduledOperation {
    Remove,
    Disable,
}

impl ScheduledOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduledOperation::Remove => "REMOVE",
            ScheduledOperation::Disable => "DISABLE",
        }
    }
}

impl fmt::Display for ScheduledOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduledOperation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REMOVE" => Ok(ScheduledOperation::Remove),
            "DISABLE" => Ok(ScheduledOperation::Disable),
            other => Err(ConfigError::Config(format!(
                "unknown scheduled operation '{}'",
                other
            ))),
        }
    }
}

/// A scheduled operation with its due time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityScheduledChange {
    pub operation: ScheduledOperation,
    pub due: DateTime<Utc>,
}

/// A local entity as returned by the identity data provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(default)]
    pub state: EntityState,
    #[serde(default)]
    pub identities: Vec<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_requirement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_change: Option<EntityScheduledChange>,
}

impl Entity {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            state: EntityState::Valid,
            identities: Vec::new(),
            credential_requirement: None,
            scheduled_change: None,
        }
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identities.push(identity);
        self
    }
}

/// Group path helpers. Paths are `/`-separated and absolute; `/` is the root.
pub mod group_path {
    /// `/`, or `/a/b` with no empty or surrounding-whitespace segments.
    pub fn is_valid(path: &str) -> bool {
        if path == super::ROOT_GROUP {
            return true;
        }
        match path.strip_prefix('/') {
            Some(rest) => rest
                .split('/')
                .all(|seg| !seg.is_empty() && seg.trim() == seg),
            None => false,
        }
    }

    /// True when `child` is strictly below `parent`.
    pub fn is_descendant(child: &str, parent: &str) -> bool {
        if child == parent {
            return false;
        }
        if parent == super::ROOT_GROUP {
            return child.starts_with('/') && child.len() > 1;
        }
        child
            .strip_prefix(parent)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
    }

    /// True when `child` is exactly one level below `parent`.
    pub fn is_direct_child(child: &str, parent: &str) -> bool {
        if !is_descendant(child, parent) {
            return false;
        }
        let rest = if parent == super::ROOT_GROUP {
            &child[1..]
        } else {
            &child[parent.len() + 1..]
        };
        !rest.contains('/')
    }
}
