//! Scheduled bulk processing tests.
//!
//! Tests scheduled rules loaded from the workspace and run over a directory:
//! - Rule compilation (cron, condition, entity-only actions)
//! - Per-entity failures that do not abort the run
//! - Chained rules acting on state left by earlier runs

use super::common::*;
use chrono::{TimeDelta, Utc};
use pretty_assertions::assert_eq;
use tollgate_core::{
    EntityState, ScheduledOperation, ScheduledRuleDefinition, ScheduledRuleParam,
};
use tollgate_engine::{BulkError, BulkProcessor, ConfigurationError, ScheduledRule};

fn load_rules(ctx: &TestContext) -> Vec<ScheduledRule> {
    ctx.config
        .scheduled_rules()
        .expect("scheduled rules file should parse")
        .into_iter()
        .map(|definition| {
            ScheduledRule::compile(definition, &ctx.registry, ctx.repository.catalog())
                .expect("scheduled rule should compile")
        })
        .collect()
}

// =============================================================================
// COMPILATION
// =============================================================================

pub fn test_rules_from_config(ctx: &TestContext) {
    println!("  🧪 test_rules_from_config");

    let rules = load_rules(ctx);
    let ids: Vec<&str> = rules.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["disable-inactive", "purge-disabled"]);
    assert_eq!(rules[0].action_name(), "changeStatus");
    assert_eq!(rules[1].schedule().as_str(), "0 30 2 ? * SUN");

    println!("    ✅ Two scheduled rules compiled from the workspace");
}

pub fn test_rule_compilation_errors(ctx: &TestContext) {
    println!("  🧪 test_rule_compilation_errors");

    let compile = |cron: &str, action: &str, params: &[&str]| {
        ScheduledRule::compile(
            ScheduledRuleDefinition::with_id(
                "candidate",
                ScheduledRuleParam::new(
                    cron,
                    "true",
                    action,
                    params.iter().map(|p| p.to_string()).collect(),
                ),
            ),
            &ctx.registry,
            ctx.repository.catalog(),
        )
    };

    let err = compile("0 0 2 * * *", "removeEntity", &[]).unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidSchedule { .. }));

    let err = compile("0 0 2 * * ?", "createAttribute", &["cn", "'x'"]).unwrap_err();
    assert!(matches!(err, ConfigurationError::ActionNotApplicable { rule_index: 0, .. }));

    let err = compile("0 0 2 * * ?", "changeStatus", &["frozen"]).unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidParameters { rule_index: 0, .. }));

    assert!(compile("0 0/15 8-18 ? * MON-FRI", "removeFromGroup", &["/a", "/b"]).is_ok());

    println!("    ✅ Bad cron, translation action and bad status rejected");
}

pub fn test_rule_identity(ctx: &TestContext) {
    println!("  🧪 test_rule_identity");

    let definitions = ctx.config.scheduled_rules().expect("rules parse");
    let edited = definitions[0].update(ScheduledRuleParam::new(
        "0 0 4 * * ?",
        definitions[0].condition.clone(),
        definitions[0].action.clone(),
        definitions[0].action_params.clone(),
    ));
    assert_eq!(edited.id, definitions[0].id);
    assert_ne!(edited, definitions[0]);

    let copy = ScheduledRuleDefinition::assign(definitions[0].param());
    assert_ne!(copy.id, definitions[0].id);
    assert_ne!(copy, definitions[0]);

    println!("    ✅ Edits keep the id, copies get a new one");
}

// =============================================================================
// PROCESSING
// =============================================================================

/// The action fails for entity 2; the others are still processed.
pub fn test_failure_does_not_abort(ctx: &TestContext) {
    println!("  🧪 test_failure_does_not_abort");

    let rules = load_rules(ctx);
    let directory = directory();
    let management = FailingManagement {
        inner: &directory,
        failing: 2,
    };

    let report = BulkProcessor::new(&directory, &management)
        .run(&rules[0])
        .expect("run should complete");

    assert_eq!(report.rule_id, "disable-inactive");
    assert_eq!(report.processed, 4);
    // entity 3 logged in recently, entity 2 failed
    assert_eq!(report.matched, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].entity, 2);
    assert!(report.failures[0].message.contains("rejected update"));

    let state = |id| directory.entry(id).expect("entity present").entity.state;
    assert_eq!(state(1), EntityState::Disabled);
    assert_eq!(state(2), EntityState::Valid);
    assert_eq!(state(3), EntityState::Valid);
    assert_eq!(state(4), EntityState::Disabled);

    println!("    ✅ Entities 1, 3 and 4 processed, one failure recorded");
}

pub fn test_chained_rules(ctx: &TestContext) {
    println!("  🧪 test_chained_rules");

    let rules = load_rules(ctx);
    let directory = directory();
    let processor = BulkProcessor::new(&directory, &directory);

    let disabled = processor.run(&rules[0]).expect("disable run completes");
    assert_eq!(disabled.matched, 3);

    let before = Utc::now();
    let purged = processor.run(&rules[1]).expect("purge run completes");
    assert_eq!(purged.matched, 3);
    assert!(purged.failures.is_empty());

    for id in [1, 2, 4] {
        let change = directory
            .entry(id)
            .and_then(|e| e.entity.scheduled_change)
            .expect("removal scheduled");
        assert_eq!(change.operation, ScheduledOperation::Remove);
        assert!(change.due >= before + TimeDelta::days(30));
        assert!(change.due <= Utc::now() + TimeDelta::days(30));
    }
    assert!(directory.entry(3).and_then(|e| e.entity.scheduled_change).is_none());

    println!("    ✅ Disabled entities scheduled for removal in 30 days");
}

pub fn test_missing_entity_context(ctx: &TestContext) {
    println!("  🧪 test_missing_entity_context");

    let rules = load_rules(ctx);
    let directory = directory();
    let err = rules[0]
        .apply(&campus_login(), &directory)
        .unwrap_err();
    assert!(matches!(err, BulkError::MissingEntity));

    println!("    ✅ Contexts without an entity are refused");
}

pub fn run_all_tests(ctx: &TestContext) {
    println!("\n📦 Bulk processing tests");
    test_rules_from_config(ctx);
    test_rule_compilation_errors(ctx);
    test_rule_identity(ctx);
    test_failure_does_not_abort(ctx);
    test_chained_rules(ctx);
    test_missing_entity_context(ctx);
}
