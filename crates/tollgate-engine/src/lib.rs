//! Tollgate translation engine
//!
//! Declarative condition-action rules that transform identity data as it
//! crosses a trust boundary:
//!
//! - **input** profiles map a remote authentication response to local identity state
//! - **output** profiles shape the attributes released to a relying party
//! - **registration** and **enquiry** profiles post-process submitted forms
//! - **scheduled rules** select entities in bulk and act on each of them
//!
//! Profiles are compiled once against an [`ActionRegistry`] and a
//! [`SchemaCatalog`], installed into a [`ProfileRepository`] and run by the
//! [`TranslationEngine`].
//!
//! ```rust
//! use std::sync::Arc;
//! use tollgate_core::{ProfileDefinition, ProfileKind, RuleDefinition};
//! use tollgate_engine::{
//!     ActionRegistry, ProfileRepository, StaticCatalog, TranslationContext, TranslationEngine,
//! };
//!
//! let repository = Arc::new(ProfileRepository::new(
//!     Arc::new(ActionRegistry::with_builtins().unwrap()),
//!     Arc::new(StaticCatalog::permissive()),
//! ));
//! let profile = repository
//!     .install(ProfileDefinition::new(
//!         "release",
//!         ProfileKind::Output,
//!         vec![RuleDefinition::new("group('/staff')", "createAttribute", &["role", "'staff'"])],
//!     ))
//!     .unwrap();
//!
//! let engine = TranslationEngine::new().with_resolver(repository.clone());
//! let context = TranslationContext::new()
//!     .with_requester("https://sp.example.com")
//!     .with_groups(["/", "/staff"]);
//! let result = engine.translate(&profile, &context).unwrap();
//! assert_eq!(result.attribute_values("role"), Some(&["staff".to_string()][..]));
//! ```

pub mod action;
pub mod actions;
pub mod bulk;
pub mod catalog;
pub mod condition;
pub mod context;
pub mod engine;
pub mod error;
pub mod params;
pub mod profile;
pub mod registry;
pub mod repository;
pub mod result;

pub use action::{Action, ActionFactory, ActionInstance, ActionScope, ActionType, EntityAction, TranslationAction};
pub use bulk::{
    BulkProcessor, BulkRunReport, CronExpression, DirectoryEntry, EntityContextBuilder,
    EntityFailure, EntityManagement, IdentityDataProvider, InMemoryDirectory, ScheduledRule,
};
pub use catalog::{SchemaCatalog, StaticCatalog};
pub use condition::{Condition, ConditionError};
pub use context::TranslationContext;
pub use engine::{DEFAULT_MAX_INCLUDE_DEPTH, ProfileResolver, TranslationEngine};
pub use error::{
    ActionExecutionError, BulkError, ConfigurationError, InvalidActionParameters,
    ParameterErrorKind, RegistryError, TranslationError,
};
pub use params::{ActionParameterSpec, ParamValue, ParameterKind, ValidatedParameters};
pub use profile::{Profile, Rule};
pub use registry::ActionRegistry;
pub use repository::{DEFAULT_OUTPUT_PROFILE, LoadReport, ProfileRepository};
pub use result::{
    AttributeEffect, AttributeVisibility, AutomaticRequestAction, GroupEffect, IdentityEffect,
    MappedAttribute, MappedGroup, MappedIdentity, TranslationResult,
};
