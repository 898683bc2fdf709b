//! Translation engine: runs a profile's rules over one context.
//!
//! Rules run in declaration order. Every rule whose condition holds has its
//! action invoked; there is no first-match short circuit. The first condition
//! or action error aborts the translation and the partial result is dropped.

use std::sync::Arc;

use tollgate_core::EngineSettings;
use tollgate_expr::Bindings;

use crate::context::TranslationContext;
use crate::error::TranslationError;
use crate::profile::Profile;
use crate::result::TranslationResult;

/// Default limit on nested profile inclusion.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 8;

/// Looks up installed profiles by name for profile inclusion.
pub trait ProfileResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Arc<Profile>>;
}

/// Stateless between calls; one engine can serve concurrent translations.
#[derive(Clone)]
pub struct TranslationEngine {
    resolver: Option<Arc<dyn ProfileResolver>>,
    max_include_depth: usize,
}

impl Default for TranslationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslationEngine {
    /// Engine without a resolver; profiles that include others fail.
    pub fn new() -> Self {
        Self {
            resolver: None,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new().with_max_include_depth(settings.max_include_depth)
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ProfileResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    pub fn max_include_depth(&self) -> usize {
        self.max_include_depth
    }

    /// Translate `context` with `profile`.
    pub fn translate(
        &self,
        profile: &Profile,
        context: &TranslationContext,
    ) -> Result<TranslationResult, TranslationError> {
        let bindings = context.bindings();
        let mut result = TranslationResult::new();
        self.run(profile, &bindings, &mut result, 0)?;
        tracing::debug!(
            profile = %profile.name(),
            attributes = result.attributes.len(),
            identities = result.identities.len(),
            groups = result.groups.len(),
            "translation finished"
        );
        Ok(result)
    }

    fn run(
        &self,
        profile: &Profile,
        bindings: &Bindings,
        result: &mut TranslationResult,
        depth: usize,
    ) -> Result<(), TranslationError> {
        let span = tracing::debug_span!("profile", name = %profile.name(), depth);
        let _enter = span.enter();

        for (rule_index, rule) in profile.rules().iter().enumerate() {
            let matched = rule.condition().evaluate(bindings).map_err(|cause| {
                TranslationError::ConditionEvaluation {
                    profile: profile.name().to_string(),
                    rule_index,
                    expression: rule.condition().expression().to_string(),
                    cause,
                }
            })?;
            if !matched {
                tracing::trace!(rule_index, "condition not met");
                continue;
            }

            tracing::debug!(rule_index, action = %rule.action_name(), "invoking action");
            rule.action()
                .invoke(bindings, result)
                .map_err(|cause| TranslationError::TranslationFailed {
                    profile: profile.name().to_string(),
                    rule_index,
                    action_type: rule.action_name().to_string(),
                    cause,
                })?;

            if let Some(included) = rule.action().included_profile() {
                let nested = self.resolve_included(profile, rule_index, included, depth)?;
                self.run(&nested, bindings, result, depth + 1)?;
            }

            if result.stop {
                tracing::debug!(rule_index, "stop requested, skipping remaining rules");
                break;
            }
        }
        Ok(())
    }

    fn resolve_included(
        &self,
        profile: &Profile,
        rule_index: usize,
        included: &str,
        depth: usize,
    ) -> Result<Arc<Profile>, TranslationError> {
        if depth + 1 > self.max_include_depth {
            return Err(TranslationError::IncludeDepthExceeded {
                profile: profile.name().to_string(),
                rule_index,
                max_depth: self.max_include_depth,
            });
        }
        let nested = self
            .resolver
            .as_ref()
            .and_then(|r| r.resolve(included))
            .ok_or_else(|| TranslationError::UnknownIncludedProfile {
                profile: profile.name().to_string(),
                rule_index,
                included: included.to_string(),
            })?;
        if nested.kind() != profile.kind() {
            return Err(TranslationError::IncludedProfileKind {
                profile: profile.name().to_string(),
                rule_index,
                included: included.to_string(),
                expected: profile.kind(),
                actual: nested.kind(),
            });
        }
        Ok(nested)
    }
}
