//! Translation result accumulated by actions.

use serde::{Deserialize, Serialize};
use tollgate_core::EntityScheduledChange;

/// How an input attribute mapping treats an existing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeEffect {
    CreateOnly,
    CreateOrUpdate,
    UpdateOnly,
}

/// Whether a mapped attribute is visible outside the local system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeVisibility {
    Full,
    Local,
}

/// How a mapped identity is reconciled with local entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityEffect {
    CreateOrMatch,
    Match,
    RequireMatch,
    UpdateOrMatch,
}

/// What to do when a mapped group does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupEffect {
    RequireExistingGroup,
    CreateGroupIfMissing,
    AddIfExists,
}

/// Automatic decision on a registration or enquiry request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutomaticRequestAction {
    Accept,
    Reject,
    Drop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedAttribute {
    pub name: String,
    pub group: String,
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<AttributeEffect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<AttributeVisibility>,
    /// Also store the attribute on the local entity.
    #[serde(default)]
    pub persistent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedIdentity {
    #[serde(rename = "type")]
    pub type_id: String,
    pub value: String,
    pub effect: IdentityEffect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_requirement: Option<String>,
    #[serde(default)]
    pub persistent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedGroup {
    pub path: String,
    pub effect: GroupEffect,
}

/// Everything the actions of one translation produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationResult {
    pub attributes: Vec<MappedAttribute>,
    pub identities: Vec<MappedIdentity>,
    pub groups: Vec<MappedGroup>,
    /// Group paths dropped from `groups` by a filter, in removal order.
    pub removed_groups: Vec<String>,
    /// Patterns of attribute names withheld from the released set.
    pub attribute_filters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_change: Option<EntityScheduledChange>,
    pub remove_stale_data: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_action: Option<AutomaticRequestAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    /// Set by an action to skip the remaining rules.
    pub stop: bool,
}

impl TranslationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute, replacing one with the same name and group.
    pub fn put_attribute(&mut self, attribute: MappedAttribute) {
        match self
            .attributes
            .iter_mut()
            .find(|a| a.name == attribute.name && a.group == attribute.group)
        {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
    }

    /// Add an identity unless the same type and value is already present.
    pub fn put_identity(&mut self, identity: MappedIdentity) {
        match self
            .identities
            .iter_mut()
            .find(|i| i.type_id == identity.type_id && i.value == identity.value)
        {
            Some(existing) => *existing = identity,
            None => self.identities.push(identity),
        }
    }

    pub fn put_group(&mut self, group: MappedGroup) {
        match self.groups.iter_mut().find(|g| g.path == group.path) {
            Some(existing) => *existing = group,
            None => self.groups.push(group),
        }
    }

    /// Drop the groups whose path satisfies `filter` and record them as removed.
    pub fn remove_groups(&mut self, mut filter: impl FnMut(&str) -> bool) -> usize {
        let before = self.groups.len();
        let mut removed = Vec::new();
        self.groups.retain(|g| {
            if filter(&g.path) {
                removed.push(g.path.clone());
                false
            } else {
                true
            }
        });
        for path in removed {
            if !self.removed_groups.contains(&path) {
                self.removed_groups.push(path);
            }
        }
        before - self.groups.len()
    }

    pub fn attribute(&self, name: &str) -> Option<&MappedAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attribute_values(&self, name: &str) -> Option<&[String]> {
        self.attribute(name).map(|a| a.values.as_slice())
    }

    pub fn identity_values(&self, type_id: &str) -> Vec<&str> {
        self.identities
            .iter()
            .filter(|i| i.type_id == type_id)
            .map(|i| i.value.as_str())
            .collect()
    }

    pub fn group_paths(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.path.as_str()).collect()
    }
}
