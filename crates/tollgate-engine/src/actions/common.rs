//! Actions valid in every translation profile.

use std::sync::Arc;

use tollgate_expr::Bindings;

use super::BuiltinFactory;
use crate::action::{Action, ActionFactory, ActionScope, ActionType, TranslationAction};
use crate::error::ActionExecutionError;
use crate::result::TranslationResult;

pub const STOP: ActionType = ActionType {
    name: "stop",
    description: "Skips the remaining rules of the profile",
    scope: ActionScope::AnyProfile,
    params: &[],
};

pub(crate) fn factories() -> Vec<Arc<dyn ActionFactory>> {
    vec![BuiltinFactory::new(STOP, |_| Ok(Action::Translation(Arc::new(Stop))))]
}

#[derive(Debug)]
struct Stop;

impl TranslationAction for Stop {
    fn invoke(
        &self,
        _bindings: &Bindings,
        result: &mut TranslationResult,
    ) -> Result<(), ActionExecutionError> {
        result.stop = true;
        Ok(())
    }
}
