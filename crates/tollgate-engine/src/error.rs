//! Error types for the translation engine.
//!
//! - [`InvalidActionParameters`]: raw parameters rejected by an action type
//! - [`RegistryError`]: action registry construction and lookup
//! - [`ConfigurationError`]: a profile or scheduled rule could not be loaded
//! - [`ActionExecutionError`]: an action failed while running
//! - [`TranslationError`]: a translation was aborted
//! - [`BulkError`]: one entity of a bulk run failed

use std::fmt;

use tollgate_core::{ConfigError, EntityId, ProfileKind};
use tollgate_expr::{EvalError, ParseError};

use crate::condition::ConditionError;

/// Error returned when raw action parameters do not fit the action type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidActionParameters {
    /// The kind of failure.
    pub kind: ParameterErrorKind,
    /// Human-readable error message.
    pub message: String,
}

impl InvalidActionParameters {
    pub fn new(kind: ParameterErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    // =========================================================================
    // SHAPE ERRORS
    // =========================================================================

    pub fn wrong_arity(action: &str, expected: usize, actual: usize, variadic: bool) -> Self {
        let expected = if variadic {
            format!("at least {}", expected)
        } else {
            expected.to_string()
        };
        Self::new(
            ParameterErrorKind::Arity,
            format!(
                "Action '{}' expects {} parameter(s), got {}",
                action, expected, actual
            ),
        )
    }

    pub fn missing_mandatory(action: &str, param: &str) -> Self {
        Self::new(
            ParameterErrorKind::MissingMandatory,
            format!("Parameter '{}' of action '{}' is mandatory", param, action),
        )
    }

    // =========================================================================
    // SYNTAX ERRORS
    // =========================================================================

    pub fn invalid_expression(action: &str, param: &str, err: &ParseError) -> Self {
        Self::new(
            ParameterErrorKind::InvalidExpression,
            format!(
                "Parameter '{}' of action '{}' is not a valid expression: {}",
                param, action, err
            ),
        )
    }

    pub fn invalid_pattern(action: &str, param: &str, err: &regex::Error) -> Self {
        Self::new(
            ParameterErrorKind::InvalidPattern,
            format!(
                "Parameter '{}' of action '{}' is not a valid regular expression: {}",
                param, action, err
            ),
        )
    }

    pub fn invalid_group_path(action: &str, param: &str, value: &str) -> Self {
        Self::new(
            ParameterErrorKind::InvalidGroupPath,
            format!(
                "Parameter '{}' of action '{}' is not a valid group path: '{}'",
                param, action, value
            ),
        )
    }

    pub fn invalid_integer(action: &str, param: &str, value: &str) -> Self {
        Self::new(
            ParameterErrorKind::InvalidInteger,
            format!(
                "Parameter '{}' of action '{}' must be a positive integer, got '{}'",
                param, action, value
            ),
        )
    }

    pub fn invalid_boolean(action: &str, param: &str, value: &str) -> Self {
        Self::new(
            ParameterErrorKind::InvalidBoolean,
            format!(
                "Parameter '{}' of action '{}' must be 'true' or 'false', got '{}'",
                param, action, value
            ),
        )
    }

    pub fn invalid_choice(action: &str, param: &str, value: &str, allowed: &[&str]) -> Self {
        Self::new(
            ParameterErrorKind::InvalidChoice,
            format!(
                "Parameter '{}' of action '{}' must be one of [{}], got '{}'",
                param,
                action,
                allowed.join(", "),
                value
            ),
        )
    }

    pub fn invalid_profile_name(action: &str, param: &str, value: &str) -> Self {
        Self::new(
            ParameterErrorKind::InvalidProfileName,
            format!(
                "Parameter '{}' of action '{}' is not a valid profile name: '{}'",
                param, action, value
            ),
        )
    }

    // =========================================================================
    // CATALOG ERRORS
    // =========================================================================

    pub fn unknown_attribute_type(action: &str, param: &str, value: &str) -> Self {
        Self::new(
            ParameterErrorKind::UnknownAttributeType,
            format!(
                "Parameter '{}' of action '{}' names an unknown attribute type '{}'",
                param, action, value
            ),
        )
    }

    pub fn unknown_identity_type(action: &str, param: &str, value: &str) -> Self {
        Self::new(
            ParameterErrorKind::UnknownIdentityType,
            format!(
                "Parameter '{}' of action '{}' names an unknown identity type '{}'",
                param, action, value
            ),
        )
    }

    /// A parameter was requested with an accessor that does not match its kind.
    pub fn wrong_kind(action: &str, index: usize, expected: &str) -> Self {
        Self::new(
            ParameterErrorKind::WrongKind,
            format!(
                "Parameter #{} of action '{}' is not {}",
                index, action, expected
            ),
        )
    }
}

impl fmt::Display for InvalidActionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for InvalidActionParameters {}

/// Categories of parameter validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterErrorKind {
    // =========================================================================
    // Shape
    // =========================================================================
    /// Parameter count does not match the action type.
    Arity,
    /// A mandatory parameter is null or blank.
    MissingMandatory,

    // =========================================================================
    // Syntax
    // =========================================================================
    InvalidExpression,
    InvalidPattern,
    InvalidGroupPath,
    InvalidInteger,
    InvalidBoolean,
    InvalidChoice,
    InvalidProfileName,

    // =========================================================================
    // Catalog
    // =========================================================================
    UnknownAttributeType,
    UnknownIdentityType,

    /// Internal mismatch between an action and its declared parameters.
    WrongKind,
}

/// Action registry errors. Both are fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("action type '{0}' is registered more than once")]
    DuplicateActionType(String),

    #[error("unknown action type '{0}'")]
    UnknownActionType(String),
}

/// A profile or scheduled rule was rejected at load time.
///
/// Scheduled rules carry a single rule and report `rule_index` 0.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("malformed document: {0}")]
    Document(#[from] ConfigError),

    #[error("profile name must not be empty")]
    EmptyName,

    #[error("{0} profiles cannot be translated; use scheduled rules")]
    UnsupportedKind(ProfileKind),

    #[error("rule {rule_index}: condition '{expression}' does not compile: {cause}")]
    InvalidCondition {
        rule_index: usize,
        expression: String,
        #[source]
        cause: ParseError,
    },

    #[error("rule {rule_index}: {source}")]
    UnknownAction {
        rule_index: usize,
        #[source]
        source: RegistryError,
    },

    #[error("rule {rule_index}: action '{action}' is not applicable to {kind} profiles")]
    ActionNotApplicable {
        rule_index: usize,
        action: String,
        kind: ProfileKind,
    },

    #[error("rule {rule_index}: {cause}")]
    InvalidParameters {
        rule_index: usize,
        action: String,
        #[source]
        cause: InvalidActionParameters,
    },

    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidSchedule { expression: String, reason: String },
}

impl ConfigurationError {
    /// Index of the offending rule, for errors tied to one rule.
    pub fn rule_index(&self) -> Option<usize> {
        match self {
            ConfigurationError::InvalidCondition { rule_index, .. }
            | ConfigurationError::UnknownAction { rule_index, .. }
            | ConfigurationError::ActionNotApplicable { rule_index, .. }
            | ConfigurationError::InvalidParameters { rule_index, .. } => Some(*rule_index),
            ConfigurationError::Document(_)
            | ConfigurationError::EmptyName
            | ConfigurationError::UnsupportedKind(_)
            | ConfigurationError::InvalidSchedule { .. } => None,
        }
    }
}

/// Failure of a single action invocation.
#[derive(Debug, thiserror::Error)]
pub enum ActionExecutionError {
    #[error("parameter '{parameter}' could not be evaluated: {source}")]
    Expression {
        parameter: &'static str,
        #[source]
        source: EvalError,
    },

    #[error("invalid value for '{parameter}': {message}")]
    InvalidValue {
        parameter: &'static str,
        message: String,
    },

    #[error("downstream operation failed: {0:#}")]
    Downstream(#[from] anyhow::Error),
}

/// A translation was aborted. Any partially populated result is discarded.
#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("profile '{profile}' rule {rule_index}: condition '{expression}' failed: {cause}")]
    ConditionEvaluation {
        profile: String,
        rule_index: usize,
        expression: String,
        #[source]
        cause: ConditionError,
    },

    #[error("profile '{profile}' rule {rule_index}: action '{action_type}' failed: {cause}")]
    TranslationFailed {
        profile: String,
        rule_index: usize,
        action_type: String,
        #[source]
        cause: ActionExecutionError,
    },

    #[error("profile '{profile}' rule {rule_index}: included profile '{included}' is not installed")]
    UnknownIncludedProfile {
        profile: String,
        rule_index: usize,
        included: String,
    },

    #[error(
        "profile '{profile}' rule {rule_index}: included profile '{included}' is {actual}, expected {expected}"
    )]
    IncludedProfileKind {
        profile: String,
        rule_index: usize,
        included: String,
        expected: ProfileKind,
        actual: ProfileKind,
    },

    #[error("profile '{profile}' rule {rule_index}: profile inclusion deeper than {max_depth}")]
    IncludeDepthExceeded {
        profile: String,
        rule_index: usize,
        max_depth: usize,
    },
}

impl TranslationError {
    /// Index of the failing rule within the profile that reported it.
    pub fn rule_index(&self) -> usize {
        match self {
            TranslationError::ConditionEvaluation { rule_index, .. }
            | TranslationError::TranslationFailed { rule_index, .. }
            | TranslationError::UnknownIncludedProfile { rule_index, .. }
            | TranslationError::IncludedProfileKind { rule_index, .. }
            | TranslationError::IncludeDepthExceeded { rule_index, .. } => *rule_index,
        }
    }
}

/// Failure while processing one entity of a scheduled rule.
#[derive(Debug, thiserror::Error)]
pub enum BulkError {
    #[error("entity {entity}: data could not be loaded: {message}")]
    Context { entity: EntityId, message: String },

    #[error("entity {entity}: condition failed: {cause}")]
    Condition {
        entity: EntityId,
        #[source]
        cause: ConditionError,
    },

    #[error("entity {entity}: action '{action}' failed: {cause}")]
    Action {
        entity: EntityId,
        action: String,
        #[source]
        cause: ActionExecutionError,
    },

    #[error("context does not name an entity")]
    MissingEntity,

    #[error("entities could not be listed: {0}")]
    Listing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_message_mentions_variadic() {
        let err = InvalidActionParameters::wrong_arity("removeFromGroup", 1, 0, true);
        assert_eq!(err.kind, ParameterErrorKind::Arity);
        assert!(err.message.contains("at least 1"));
    }

    #[test]
    fn test_choice_message_lists_allowed() {
        let err = InvalidActionParameters::invalid_choice("autoProcess", "action", "maybe", &[
            "accept", "reject",
        ]);
        assert_eq!(
            err.to_string(),
            "Parameter 'action' of action 'autoProcess' must be one of [accept, reject], got 'maybe'"
        );
    }

    #[test]
    fn test_translation_error_rule_index() {
        let err = TranslationError::IncludeDepthExceeded {
            profile: "p".into(),
            rule_index: 3,
            max_depth: 8,
        };
        assert_eq!(err.rule_index(), 3);
    }
}
