//! Shared test infrastructure for Tollgate end-to-end tests.
//!
//! This module provides:
//! - A workspace on disk with a `tollgate.yaml`, profile documents and scheduled rules
//! - A repository and engine loaded from that workspace
//! - Context and directory fixtures

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;
use tollgate_core::{
    Attribute, EngineConfig, Entity, EntityId, EntityState, Identity, ProfileDefinition,
    ProfileKind, RuleDefinition, ScheduledOperation,
};
use tollgate_engine::{
    ActionRegistry, DirectoryEntry, EntityManagement, InMemoryDirectory, LoadReport,
    ProfileRepository, StaticCatalog, TranslationContext, TranslationEngine,
};

// =============================================================================
// WORKSPACE FIXTURES
// =============================================================================

pub const CONFIG_YAML: &str = r#"
profiles_dir: profiles
scheduled_rules_file: scheduled-rules.json
catalog:
  attribute_types: [cn, email, o, memberOf, title]
engine:
  max_include_depth: 4
log_filter: "tollgate=debug"
"#;

pub const LDAP_INPUT: &str = r#"{
  "ver": "2",
  "name": "ldap-in",
  "description": "Maps the campus directory",
  "type": "INPUT",
  "rules": [
    {"condition": {"conditionValue": "hasAttribute('uid')"},
     "action": {"name": "mapIdentity", "parameters": ["userName", "attr['uid']", null, "CREATE_OR_MATCH"]}},
    {"condition": {"conditionValue": "true"},
     "action": {"name": "mapAttribute", "parameters": ["email", "/", "attrs['mail']", "full", "CREATE_OR_UPDATE"]}},
    {"condition": {"conditionValue": "attr['affiliation'] == 'staff'"},
     "action": {"name": "mapGroup", "parameters": ["'/staff'", "CREATE_GROUP_IF_MISSING"]}},
    {"condition": {"conditionValue": "true"},
     "action": {"name": "includeInputProfile", "parameters": ["common-in"]}}
  ]
}"#;

pub const COMMON_INPUT: &str = r#"{
  "ver": "2",
  "name": "common-in",
  "type": "INPUT",
  "rules": [
    {"condition": {"conditionValue": "idp contains 'campus'"},
     "action": {"name": "removeStaleData", "parameters": []}}
  ]
}"#;

pub const RELEASE_OUTPUT: &str = r#"{
  "ver": "2",
  "name": "release",
  "type": "OUTPUT",
  "rules": [
    {"condition": {"conditionValue": "true"},
     "action": {"name": "includeOutputProfile", "parameters": ["sys:default"]}},
    {"condition": {"conditionValue": "requester == 'https://wiki.example.com'"},
     "action": {"name": "createAttribute", "parameters": ["cn", "attr['cn']"]}},
    {"condition": {"conditionValue": "true"},
     "action": {"name": "filterAttributeValues", "parameters": ["memberOf", "/"]}}
  ]
}"#;

/// Missing `ver`: rejected at load.
pub const LEGACY_PROFILE: &str = r#"{
  "name": "legacy",
  "rules": []
}"#;

pub const SCHEDULED_RULES: &str = r#"[
  {"id": "disable-inactive", "cronExpression": "0 0 2 * * ?",
   "condition": "attr['lastLogin'] < '2020'", "action": "changeStatus", "actionParams": ["disabled"]},
  {"id": "purge-disabled", "cronExpression": "0 30 2 ? * SUN",
   "condition": "status == 'disabled'", "action": "scheduleOperation", "actionParams": ["REMOVE", "30"]}
]"#;

// =============================================================================
// TEST CONTEXT
// =============================================================================

/// Everything a test module needs, built from an on-disk workspace.
pub struct TestContext {
    pub dir: TempDir,
    pub config: EngineConfig,
    pub registry: Arc<ActionRegistry>,
    pub repository: Arc<ProfileRepository>,
    pub engine: TranslationEngine,
    pub load_report: LoadReport,
}

impl TestContext {
    pub fn setup() -> Result<Self, String> {
        let dir = TempDir::new().map_err(|e| format!("Failed to create temp dir: {}", e))?;
        let profiles = dir.path().join("profiles");
        fs::create_dir(&profiles).map_err(|e| e.to_string())?;

        let files = [
            (dir.path().join("tollgate.yaml"), CONFIG_YAML),
            (profiles.join("10-ldap-in.json"), LDAP_INPUT),
            (profiles.join("20-common-in.json"), COMMON_INPUT),
            (profiles.join("30-release.json"), RELEASE_OUTPUT),
            (profiles.join("40-legacy.json"), LEGACY_PROFILE),
            (dir.path().join("scheduled-rules.json"), SCHEDULED_RULES),
        ];
        for (path, content) in files {
            fs::write(&path, content).map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
        }

        let config = EngineConfig::load_with_context(dir.path().join("tollgate.yaml"))
            .map_err(|e| e.to_string())?;
        let registry = Arc::new(ActionRegistry::with_builtins().map_err(|e| e.to_string())?);
        let catalog = Arc::new(StaticCatalog::from_config(&config.catalog));
        let repository = Arc::new(ProfileRepository::new(Arc::clone(&registry), catalog));
        if config.engine.install_default_output_profile {
            repository.install_default_output().map_err(|e| e.to_string())?;
        }
        let paths = config.profile_paths().map_err(|e| e.to_string())?;
        let load_report = repository.load_paths(&paths);

        let engine = TranslationEngine::from_settings(&config.engine).with_resolver(repository.clone());

        Ok(Self {
            dir,
            config,
            registry,
            repository,
            engine,
            load_report,
        })
    }

    /// Compile a profile against the shared registry and catalog without installing it.
    pub fn compile(&self, definition: ProfileDefinition) -> tollgate_engine::Profile {
        tollgate_engine::Profile::compile(
            definition,
            &self.registry,
            self.repository.catalog(),
        )
        .expect("profile should compile")
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

pub fn output_profile(name: &str, rules: Vec<RuleDefinition>) -> ProfileDefinition {
    ProfileDefinition::new(name, ProfileKind::Output, rules)
}

pub fn campus_login() -> TranslationContext {
    TranslationContext::new()
        .with_idp("https://campus.example.edu/idp")
        .with_protocol("SAML", Some("web-sso"))
        .with_attribute(Attribute::root("uid", &["alice"]))
        .with_attribute(Attribute::root("mail", &["alice@campus.example.edu", "a@example.org"]))
        .with_attribute(Attribute::root("affiliation", &["staff"]))
}

pub fn release_context(requester: &str) -> TranslationContext {
    TranslationContext::new()
        .with_entity(7, EntityState::Valid)
        .with_requester(requester)
        .with_identity(Identity::new("userName", "alice"))
        .with_attribute(Attribute::root("cn", &["Alice"]))
        .with_groups(["/", "/staff", "/staff/admins"])
}

pub fn directory() -> InMemoryDirectory {
    let entry = |id: EntityId, last_login: &str, state: EntityState| {
        let mut entity = Entity::new(id).with_identity(Identity::new("userName", format!("user{}", id)));
        entity.state = state;
        let mut entry = DirectoryEntry::new(entity);
        entry.attributes.push(Attribute::root("lastLogin", &[last_login]));
        entry.groups.push("/students".to_string());
        entry
    };
    InMemoryDirectory::from_entries(vec![
        entry(1, "2019-05-01", EntityState::Valid),
        entry(2, "2018-01-12", EntityState::Valid),
        entry(3, "2024-11-30", EntityState::Valid),
        entry(4, "2017-02-02", EntityState::Disabled),
    ])
}

/// Management that fails every mutation of one entity and delegates the rest.
pub struct FailingManagement<'a> {
    pub inner: &'a InMemoryDirectory,
    pub failing: EntityId,
}

impl FailingManagement<'_> {
    fn check(&self, entity: EntityId) -> anyhow::Result<()> {
        if entity == self.failing {
            anyhow::bail!("attribute store rejected update of entity {}", entity);
        }
        Ok(())
    }
}

impl EntityManagement for FailingManagement<'_> {
    fn set_status(&self, entity: EntityId, status: EntityState) -> anyhow::Result<()> {
        self.check(entity)?;
        self.inner.set_status(entity, status)
    }

    fn schedule_operation(
        &self,
        entity: EntityId,
        operation: ScheduledOperation,
        due: chrono::DateTime<chrono::Utc>,
    ) -> anyhow::Result<()> {
        self.check(entity)?;
        self.inner.schedule_operation(entity, operation, due)
    }

    fn remove_entity(&self, entity: EntityId) -> anyhow::Result<()> {
        self.check(entity)?;
        self.inner.remove_entity(entity)
    }

    fn set_credential_requirement(&self, entity: EntityId, requirement: &str) -> anyhow::Result<()> {
        self.check(entity)?;
        self.inner.set_credential_requirement(entity, requirement)
    }

    fn remove_from_group(&self, entity: EntityId, group: &str) -> anyhow::Result<()> {
        self.check(entity)?;
        self.inner.remove_from_group(entity, group)
    }
}
