//! Scheduled processing rule documents.
//!
//! A scheduled rule pairs a condition with an entity action and a cron trigger.
//! The `id` is assigned by the server when the rule is first stored and survives edits.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ConfigError;

/// Editable part of a scheduled rule, as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledRuleParam {
    pub cron_expression: String,
    pub condition: String,
    pub action: String,
    #[serde(default)]
    pub action_params: Vec<String>,
}

/// Persisted scheduled rule.
///
/// Equality compares every persisted field including `id`, so two rules with the
/// same definition but different ids are not equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledRuleDefinition {
    pub id: String,
    pub cron_expression: String,
    pub condition: String,
    pub action: String,
    #[serde(default)]
    pub action_params: Vec<String>,
}

impl ScheduledRuleParam {
    pub fn new(
        cron_expression: impl Into<String>,
        condition: impl Into<String>,
        action: impl Into<String>,
        action_params: Vec<String>,
    ) -> Self {
        Self {
            cron_expression: cron_expression.into(),
            condition: condition.into(),
            action: action.into(),
            action_params,
        }
    }
}

impl ScheduledRuleDefinition {
    /// Store a new rule under a freshly generated id.
    pub fn assign(param: ScheduledRuleParam) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), param)
    }

    pub fn with_id(id: impl Into<String>, param: ScheduledRuleParam) -> Self {
        Self {
            id: id.into(),
            cron_expression: param.cron_expression,
            condition: param.condition,
            action: param.action,
            action_params: param.action_params,
        }
    }

    /// Replace the editable fields, keeping the id.
    pub fn update(&self, param: ScheduledRuleParam) -> Self {
        Self::with_id(self.id.clone(), param)
    }

    pub fn param(&self) -> ScheduledRuleParam {
        ScheduledRuleParam {
            cron_expression: self.cron_expression.clone(),
            condition: self.condition.clone(),
            action: self.action.clone(),
            action_params: self.action_params.clone(),
        }
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(ConfigError::from)
    }

    pub fn list_from_json(content: &str) -> Result<Vec<Self>, ConfigError> {
        serde_json::from_str(content).map_err(ConfigError::from)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string(self).map_err(ConfigError::from)
    }
}
