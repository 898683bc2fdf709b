// Persisted documents and engine configuration
pub mod config;

// Attributes, identities and entities
pub mod identity;

pub use config::{
    ActionDefinition, CatalogConfig, ConditionDefinition, ConfigError, EngineConfig,
    EngineSettings, PROFILE_FORMAT_VERSION, ProfileDefinition, ProfileKind, RuleDefinition,
    ScheduledRuleDefinition, ScheduledRuleParam,
};
pub use identity::{
    Attribute, Entity, EntityId, EntityScheduledChange, EntityState, Identity, ROOT_GROUP,
    ScheduledOperation, group_path,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid(instance: &serde_json::Value, schema_src: &str, what: &str) {
        let schema: serde_json::Value = serde_json::from_str(schema_src).expect("schema must parse");
        let validator = jsonschema::draft202012::options()
            .build(&schema)
            .expect("schema must compile");

        if !validator.is_valid(instance) {
            let mut msgs = Vec::new();
            for (idx, err) in validator.iter_errors(instance).take(20).enumerate() {
                msgs.push(format!("{}: {}", idx + 1, err));
            }
            panic!("{} did not validate: {}", what, msgs.join("; "));
        }
    }

    #[test]
    fn profile_serialization_validates_against_schema() {
        let mut rule = RuleDefinition::new(
            "hasAttribute('uid')",
            "mapIdentity",
            &["userName", "attr['uid']"],
        );
        rule.action.parameters.push(None);
        rule.action.parameters.push(Some("CREATE_OR_MATCH".to_string()));
        let profile = ProfileDefinition::new("ldap-in", ProfileKind::Input, vec![rule]);

        let instance = serde_json::to_value(&profile).expect("profile must serialize");
        assert_valid(
            &instance,
            include_str!("../../../schemas/TranslationProfile.schema.json"),
            "profile",
        );
    }

    #[test]
    fn scheduled_rule_serialization_validates_against_schema() {
        let rule = ScheduledRuleDefinition::assign(ScheduledRuleParam::new(
            "0 0 2 * * ?",
            "status == 'disabled'",
            "removeEntity",
            Vec::new(),
        ));

        let instance = serde_json::to_value(&rule).expect("rule must serialize");
        assert_valid(
            &instance,
            include_str!("../../../schemas/ScheduledRule.schema.json"),
            "scheduled rule",
        );
    }
}
