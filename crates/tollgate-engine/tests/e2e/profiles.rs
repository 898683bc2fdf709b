//! Translation profile tests.
//!
//! Tests profile loading and translation:
//! - Loading a profile directory (valid, legacy and included profiles)
//! - Input, output and registration translations
//! - Rule order, all-matches-run, non-match skip and stop
//! - Fail-fast on condition and configuration errors

use super::common::*;
use pretty_assertions::assert_eq;
use tollgate_core::{ProfileDefinition, ProfileKind, RuleDefinition};
use tollgate_engine::{
    AttributeEffect, AutomaticRequestAction, ConditionError, ConfigurationError, GroupEffect,
    IdentityEffect, Profile, TranslationContext, TranslationError,
};
use tollgate_expr::EvalError;

// =============================================================================
// LOADING
// =============================================================================

pub fn test_load_report(ctx: &TestContext) {
    println!("  🧪 test_load_report");

    assert_eq!(ctx.load_report.installed, vec!["ldap-in", "common-in", "release"]);
    assert_eq!(ctx.load_report.failures.len(), 1);
    let (path, err) = &ctx.load_report.failures[0];
    assert!(path.ends_with("40-legacy.json"));
    assert!(matches!(err, ConfigurationError::Document(_)));
    assert_eq!(
        ctx.repository.names(),
        vec!["common-in", "ldap-in", "release", "sys:default"]
    );

    println!("    ✅ Valid profiles installed, legacy profile rejected");
}

// =============================================================================
// INPUT TRANSLATION
// =============================================================================

pub fn test_input_translation(ctx: &TestContext) {
    println!("  🧪 test_input_translation");

    let profile = ctx.repository.get("ldap-in").expect("ldap-in installed");
    let result = ctx
        .engine
        .translate(&profile, &campus_login())
        .expect("translation should succeed");

    assert_eq!(result.identity_values("userName"), vec!["alice"]);
    assert_eq!(result.identities[0].effect, IdentityEffect::CreateOrMatch);
    let email = result.attribute("email").expect("email mapped");
    assert_eq!(email.values, vec!["alice@campus.example.edu", "a@example.org"]);
    assert_eq!(email.effect, Some(AttributeEffect::CreateOrUpdate));
    assert_eq!(result.group_paths(), vec!["/staff"]);
    assert_eq!(result.groups[0].effect, GroupEffect::CreateGroupIfMissing);
    // set by the included common-in profile
    assert!(result.remove_stale_data);

    println!("    ✅ Identity, attribute, group and included rule applied");
}

// =============================================================================
// OUTPUT TRANSLATION
// =============================================================================

/// `true` -> createAttribute(memberOf, groups) releases every group path.
pub fn test_default_output_releases_groups(ctx: &TestContext) {
    println!("  🧪 test_default_output_releases_groups");

    let profile = ctx.repository.get("sys:default").expect("default output installed");
    let context = TranslationContext::new().with_requester("sp").with_groups(["/a", "/b"]);
    let result = ctx.engine.translate(&profile, &context).expect("translation should succeed");

    assert_eq!(
        result.attribute_values("memberOf"),
        Some(&["/a".to_string(), "/b".to_string()][..])
    );

    println!("    ✅ memberOf == [/a, /b]");
}

pub fn test_output_with_include_and_filter(ctx: &TestContext) {
    println!("  🧪 test_output_with_include_and_filter");

    let profile = ctx.repository.get("release").expect("release installed");

    let wiki = ctx
        .engine
        .translate(&profile, &release_context("https://wiki.example.com"))
        .expect("translation should succeed");
    assert_eq!(
        wiki.attribute_values("memberOf"),
        Some(&["/staff".to_string(), "/staff/admins".to_string()][..])
    );
    assert_eq!(wiki.attribute_values("cn"), Some(&["Alice".to_string()][..]));

    let other = ctx
        .engine
        .translate(&profile, &release_context("https://other.example.com"))
        .expect("translation should succeed");
    assert!(other.attribute("cn").is_none());

    println!("    ✅ Included default profile, requester-specific rule and value filter");
}

// =============================================================================
// ENGINE SEMANTICS
// =============================================================================

pub fn test_all_matches_run_in_order(ctx: &TestContext) {
    println!("  🧪 test_all_matches_run_in_order");

    let rules = (0..5)
        .map(|i| {
            let name = format!("a{}", i);
            let value = format!("'{}'", i);
            RuleDefinition::new("true", "createAttribute", &[name.as_str(), value.as_str()])
        })
        .collect();
    let profile = ctx.compile(output_profile("ordered", rules));
    let result = ctx
        .engine
        .translate(&profile, &release_context("sp"))
        .expect("translation should succeed");

    let names: Vec<&str> = result.attributes.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["a0", "a1", "a2", "a3", "a4"]);

    println!("    ✅ Five matching rules ran once each, in order");
}

pub fn test_later_rules_see_no_earlier_state(ctx: &TestContext) {
    println!("  🧪 test_later_rules_see_no_earlier_state");

    // conditions read the context, never the result being built
    let profile = ctx.compile(output_profile(
        "isolation",
        vec![
            RuleDefinition::new("true", "createAttribute", &["cn", "'first'"]),
            RuleDefinition::new("attr['cn'] == 'Alice'", "createAttribute", &["seen", "attr['cn']"]),
        ],
    ));
    let result = ctx
        .engine
        .translate(&profile, &release_context("sp"))
        .expect("translation should succeed");
    assert_eq!(result.attribute_values("seen"), Some(&["Alice".to_string()][..]));

    println!("    ✅ Conditions evaluate against the context only");
}

pub fn test_non_matching_rule_skipped(ctx: &TestContext) {
    println!("  🧪 test_non_matching_rule_skipped");

    let profile = ctx.compile(output_profile(
        "skip",
        vec![
            RuleDefinition::new("false", "createAttribute", &["never", "'x'"]),
            RuleDefinition::new("group('/missing')", "createAttribute", &["never2", "'x'"]),
            RuleDefinition::new("group('/staff')", "createAttribute", &["staff", "'yes'"]),
        ],
    ));
    let result = ctx
        .engine
        .translate(&profile, &release_context("sp"))
        .expect("translation should succeed");
    assert!(result.attribute("never").is_none());
    assert!(result.attribute("never2").is_none());
    assert!(result.attribute("staff").is_some());

    println!("    ✅ Non-matching rules never invoke their action");
}

pub fn test_stop_returns_accumulated_result(ctx: &TestContext) {
    println!("  🧪 test_stop_returns_accumulated_result");

    let profile = ctx.compile(output_profile(
        "roles",
        vec![
            RuleDefinition::new("group('/staff/admins')", "createAttribute", &["role", "'admin'"]),
            RuleDefinition::new("group('/staff/admins')", "stop", &[]),
            RuleDefinition::new("group('/staff')", "createAttribute", &["role", "'staff'"]),
        ],
    ));
    let result = ctx
        .engine
        .translate(&profile, &release_context("sp"))
        .expect("translation should succeed");
    assert_eq!(result.attribute_values("role"), Some(&["admin".to_string()][..]));
    assert!(result.stop);

    println!("    ✅ Stop skipped the fallback rule");
}

/// An unbound variable in rule 1 aborts the translation.
pub fn test_condition_error_aborts(ctx: &TestContext) {
    println!("  🧪 test_condition_error_aborts");

    let profile = ctx.compile(ProfileDefinition::new(
        "needs-protocol",
        ProfileKind::Input,
        vec![
            RuleDefinition::new("true", "mapGroup", &["'/seen'", "ADD_IF_EXISTS"]),
            RuleDefinition::new("protocol == 'OIDC'", "removeStaleData", &[]),
        ],
    ));
    let context = TranslationContext::new().with_idp("https://idp.example.com");
    let err = ctx.engine.translate(&profile, &context).unwrap_err();

    assert_eq!(err.rule_index(), 1);
    match err {
        TranslationError::ConditionEvaluation { profile, expression, cause, .. } => {
            assert_eq!(profile, "needs-protocol");
            assert_eq!(expression, "protocol == 'OIDC'");
            assert_eq!(
                cause,
                ConditionError::Eval(EvalError::UnresolvedVariable("protocol".into()))
            );
        }
        other => panic!("unexpected error: {}", other),
    }

    println!("    ✅ ConditionEvaluation at rule 1, no result returned");
}

pub fn test_action_error_aborts(ctx: &TestContext) {
    println!("  🧪 test_action_error_aborts");

    let profile = ctx.compile(ProfileDefinition::new(
        "bad-group",
        ProfileKind::Input,
        vec![RuleDefinition::new("true", "mapGroup", &["attr['uid']", "ADD_IF_EXISTS"])],
    ));
    let err = ctx.engine.translate(&profile, &campus_login()).unwrap_err();
    assert!(matches!(
        err,
        TranslationError::TranslationFailed { rule_index: 0, ref action_type, .. } if action_type == "mapGroup"
    ));

    println!("    ✅ TranslationFailed names the action type");
}

// =============================================================================
// FORMS
// =============================================================================

pub fn test_registration_profile(ctx: &TestContext) {
    println!("  🧪 test_registration_profile");

    let profile = ctx.compile(ProfileDefinition::new(
        "signup",
        ProfileKind::Registration,
        vec![
            RuleDefinition::new("endsWith(attr['email'], '@campus.example.edu')", "autoProcess", &["accept"]),
            RuleDefinition::new("true", "addToGroup", &["['/students', '/staff/pending']"]),
            RuleDefinition::new("!group('/staff')", "filterGroup", &["/staff.*"]),
            RuleDefinition::new("true", "redirect", &["'https://campus.example.edu/welcome?req=' + requestId"]),
        ],
    ));
    let context = TranslationContext::new()
        .with_registration_request("signup", "r-42", "pending", false)
        .with_attribute(tollgate_core::Attribute::root("email", &["bob@campus.example.edu"]));
    let result = ctx.engine.translate(&profile, &context).expect("translation should succeed");

    assert_eq!(result.auto_action, Some(AutomaticRequestAction::Accept));
    assert_eq!(result.group_paths(), vec!["/students"]);
    assert_eq!(result.removed_groups, vec!["/staff/pending"]);
    assert_eq!(
        result.redirect_url.as_deref(),
        Some("https://campus.example.edu/welcome?req=r-42")
    );

    println!("    ✅ Auto-accept, filtered groups and redirect");
}

// =============================================================================
// CONFIGURATION ERRORS
// =============================================================================

pub fn test_unknown_action_not_installed(ctx: &TestContext) {
    println!("  🧪 test_unknown_action_not_installed");

    let before = ctx.repository.get("release").expect("release installed");
    let mut broken = before.definition().clone();
    broken.rules.push(RuleDefinition::new("true", "sendEmail", &["x"]));

    let err = ctx.repository.install(broken).unwrap_err();
    assert!(matches!(err, ConfigurationError::UnknownAction { rule_index: 3, .. }));

    let after = ctx.repository.get("release").expect("release still installed");
    assert_eq!(after.rules().len(), 3);
    assert_eq!(*after, *before);

    println!("    ✅ Rejected profile left the installed one active");
}

pub fn test_round_trip(ctx: &TestContext) {
    println!("  🧪 test_round_trip");

    for name in ctx.repository.names() {
        let profile = ctx.repository.get(&name).expect("listed profile exists");
        let json = profile.to_json().expect("profile serializes");
        let again = Profile::from_json(&json, &ctx.registry, ctx.repository.catalog())
            .expect("serialized profile compiles");
        assert_eq!(again, *profile);
        assert_eq!(again.definition().rules, profile.definition().rules);
    }

    println!("    ✅ Every installed profile survives serialize/deserialize");
}

pub fn run_all_tests(ctx: &TestContext) {
    println!("\n📦 Profile tests");
    test_load_report(ctx);
    test_input_translation(ctx);
    test_default_output_releases_groups(ctx);
    test_output_with_include_and_filter(ctx);
    test_all_matches_run_in_order(ctx);
    test_later_rules_see_no_earlier_state(ctx);
    test_non_matching_rule_skipped(ctx);
    test_stop_returns_accumulated_result(ctx);
    test_condition_error_aborts(ctx);
    test_action_error_aborts(ctx);
    test_registration_profile(ctx);
    test_unknown_action_not_installed(ctx);
    test_round_trip(ctx);
}
