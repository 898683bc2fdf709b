//! Per-invocation translation context.
//!
//! A context is built by the caller from live data, owned by one translation and
//! turned into expression [`Bindings`]. Fields left unset leave the matching
//! variables unbound, so a condition reading them fails instead of silently
//! not matching.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tollgate_core::{Attribute, EntityId, EntityState, Identity, ROOT_GROUP, group_path};
use tollgate_expr::{Bindings, Value, Variable};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationContext {
    /// Local entity, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EntityState>,
    /// Remote identity provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_subtype: Option<String>,
    /// Relying party the data is released to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_group: Option<String>,
    pub attributes: Vec<Attribute>,
    pub identities: Vec<Identity>,
    pub groups: Vec<String>,
    /// Attributes of the requesting entity (output translations).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester_attributes: Option<Vec<Attribute>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_form: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered: Option<bool>,
}

impl TranslationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    pub fn with_entity(mut self, entity_id: EntityId, status: EntityState) -> Self {
        self.entity_id = Some(entity_id);
        self.status = Some(status);
        self
    }

    pub fn with_idp(mut self, idp: impl Into<String>) -> Self {
        self.idp = Some(idp.into());
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>, subtype: Option<&str>) -> Self {
        self.protocol = Some(protocol.into());
        self.protocol_subtype = subtype.map(str::to_string);
        self
    }

    pub fn with_requester(mut self, requester: impl Into<String>) -> Self {
        self.requester = Some(requester.into());
        self
    }

    pub fn with_used_group(mut self, group: impl Into<String>) -> Self {
        self.used_group = Some(group.into());
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identities.push(identity);
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn with_requester_attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.requester_attributes = Some(attributes);
        self
    }

    pub fn with_registration_request(
        mut self,
        form: impl Into<String>,
        request_id: impl Into<String>,
        request_status: impl Into<String>,
        triggered: bool,
    ) -> Self {
        self.registration_form = Some(form.into());
        self.request_id = Some(request_id.into());
        self.request_status = Some(request_status.into());
        self.triggered = Some(triggered);
        self
    }

    /// Group whose attributes `attr` and `attrs` expose: `used_group`, else the root.
    pub fn attribute_group(&self) -> &str {
        self.used_group.as_deref().unwrap_or(ROOT_GROUP)
    }

    /// Expression bindings for this context.
    pub fn bindings(&self) -> Bindings {
        let mut bindings = Bindings::new();

        let (attr, attrs) = attribute_maps(&self.attributes, self.attribute_group());
        bindings.set(Variable::Attr, attr);
        bindings.set(Variable::Attrs, attrs);
        bindings.set(Variable::Groups, self.groups.clone());

        let mut ids_by_type: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for identity in &self.identities {
            ids_by_type
                .entry(identity.type_id.clone())
                .or_default()
                .push(identity.value.clone());
        }
        bindings.set(Variable::IdsByType, ids_by_type);

        if let Some(first) = self.identities.first() {
            bindings.set(Variable::Id, first.value.as_str());
            bindings.set(Variable::IdType, first.type_id.as_str());
        }

        if let Some(used_group) = &self.used_group {
            let sub_groups: Vec<&str> = self
                .groups
                .iter()
                .filter(|g| group_path::is_descendant(g, used_group))
                .map(String::as_str)
                .collect();
            bindings.set(Variable::UsedGroup, used_group.as_str());
            bindings.set(Variable::SubGroups, sub_groups);
        }

        bindings.set_opt(Variable::EntityId, self.entity_id);
        bindings.set_opt(Variable::Status, self.status.map(|s| s.as_str()));
        bindings.set_opt(Variable::Idp, self.idp.as_deref());
        bindings.set_opt(Variable::Protocol, self.protocol.as_deref());
        bindings.set_opt(Variable::ProtocolSubtype, self.protocol_subtype.as_deref());
        bindings.set_opt(Variable::Requester, self.requester.as_deref());
        bindings.set_opt(Variable::RegistrationForm, self.registration_form.as_deref());
        bindings.set_opt(Variable::RequestId, self.request_id.as_deref());
        bindings.set_opt(Variable::RequestStatus, self.request_status.as_deref());
        bindings.set_opt(Variable::Triggered, self.triggered);

        if let Some(requester_attributes) = &self.requester_attributes {
            let (attr, attrs) = attribute_maps(requester_attributes, ROOT_GROUP);
            bindings.set(Variable::RequesterAttr, attr);
            bindings.set(Variable::RequesterAttrs, attrs);
        }

        bindings
    }
}

/// `attr` (first value, `""` when valueless) and `attrs` (all values) maps over the
/// attributes of `group`. A later attribute of the same name replaces an earlier one.
fn attribute_maps(attributes: &[Attribute], group: &str) -> (Value, Value) {
    let mut first: BTreeMap<String, Value> = BTreeMap::new();
    let mut all: BTreeMap<String, Value> = BTreeMap::new();
    for attribute in attributes.iter().filter(|a| a.group == group) {
        first.insert(
            attribute.name.clone(),
            Value::from(attribute.first_value().unwrap_or_default()),
        );
        all.insert(attribute.name.clone(), Value::from(attribute.values.clone()));
    }
    (Value::from(first), Value::from(all))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> TranslationContext {
        TranslationContext::new()
            .with_idp("https://idp.example.com")
            .with_attribute(Attribute::root("mail", &["a@x", "b@x"]))
            .with_attribute(Attribute::new("mail", "/staff", vec!["c@x".into()]))
            .with_attribute(Attribute::root("empty", &[]))
            .with_identity(Identity::new("userName", "alice"))
            .with_identity(Identity::new("email", "a@x"))
            .with_groups(["/", "/staff", "/staff/admins", "/other"])
    }

    #[test]
    fn test_attribute_maps_use_root_group() {
        let bindings = context().bindings();
        let attrs = bindings.get(Variable::Attrs).unwrap().as_map().unwrap();
        assert_eq!(attrs["mail"], Value::from(vec!["a@x", "b@x"]));
        assert_eq!(attrs["empty"], Value::from(Vec::<String>::new()));
        let attr = bindings.get(Variable::Attr).unwrap().as_map().unwrap();
        assert_eq!(attr["mail"], Value::from("a@x"));
        assert_eq!(attr["empty"], Value::from(""));
    }

    #[test]
    fn test_attribute_maps_follow_used_group() {
        let bindings = context().with_used_group("/staff").bindings();
        let attrs = bindings.get(Variable::Attrs).unwrap().as_map().unwrap();
        assert_eq!(attrs["mail"], Value::from(vec!["c@x"]));
        assert!(!attrs.contains_key("empty"));
        let attr = bindings.get(Variable::Attr).unwrap().as_map().unwrap();
        assert_eq!(attr["mail"], Value::from("c@x"));
    }

    #[test]
    fn test_later_attribute_replaces_earlier() {
        let bindings = TranslationContext::new()
            .with_attribute(Attribute::root("cn", &["Bob"]))
            .with_attribute(Attribute::root("cn", &["Robert", "Rob"]))
            .bindings();
        let attrs = bindings.get(Variable::Attrs).unwrap().as_map().unwrap();
        assert_eq!(attrs["cn"], Value::from(vec!["Robert", "Rob"]));
        let attr = bindings.get(Variable::Attr).unwrap().as_map().unwrap();
        assert_eq!(attr["cn"], Value::from("Robert"));
    }

    #[test]
    fn test_empty_attribute_compares_equal_to_empty_string() {
        let bindings = context().bindings();
        let expr = tollgate_expr::CompiledExpression::compile("attr['empty'] == ''").unwrap();
        assert!(expr.evaluate_bool(&bindings).unwrap());
        let expr = tollgate_expr::CompiledExpression::compile("hasAttribute('empty')").unwrap();
        assert!(expr.evaluate_bool(&bindings).unwrap());
    }

    #[test]
    fn test_first_identity_bound_as_id() {
        let bindings = context().bindings();
        assert_eq!(bindings.get(Variable::Id), Some(&Value::from("alice")));
        assert_eq!(bindings.get(Variable::IdType), Some(&Value::from("userName")));
        let ids = bindings.get(Variable::IdsByType).unwrap().as_map().unwrap();
        assert_eq!(ids["email"], Value::from(vec!["a@x"]));
    }

    #[test]
    fn test_unset_fields_are_unbound() {
        let bindings = context().bindings();
        assert!(!bindings.is_bound(Variable::Protocol));
        assert!(!bindings.is_bound(Variable::Requester));
        assert!(!bindings.is_bound(Variable::EntityId));
        assert!(!bindings.is_bound(Variable::RequesterAttrs));
        assert!(!bindings.is_bound(Variable::SubGroups));
        assert!(bindings.is_bound(Variable::Idp));

        let empty = TranslationContext::new().bindings();
        assert!(!empty.is_bound(Variable::Id));
        assert!(empty.is_bound(Variable::Groups));
    }

    #[test]
    fn test_sub_groups_below_used_group() {
        let bindings = context().with_used_group("/staff").bindings();
        assert_eq!(
            bindings.get(Variable::SubGroups),
            Some(&Value::from(vec!["/staff/admins"]))
        );
    }

    #[test]
    fn test_entity_and_requester_bindings() {
        let bindings = context()
            .with_entity(42, EntityState::Disabled)
            .with_requester("sp-1")
            .with_requester_attributes(vec![Attribute::root("o", &["ICM"])])
            .bindings();
        assert_eq!(bindings.get(Variable::EntityId), Some(&Value::Int(42)));
        assert_eq!(bindings.get(Variable::Status), Some(&Value::from("disabled")));
        let requester_attr = bindings.get(Variable::RequesterAttr).unwrap().as_map().unwrap();
        assert_eq!(requester_attr["o"], Value::from("ICM"));
    }

    #[test]
    fn test_context_from_json() {
        let ctx = TranslationContext::from_json(
            r#"{"groups":["/a","/b"],"protocol":"SAML","attributes":[{"name":"cn","values":["Bob"]}]}"#,
        )
        .unwrap();
        assert_eq!(ctx.groups, vec!["/a", "/b"]);
        assert_eq!(ctx.protocol.as_deref(), Some("SAML"));
        assert_eq!(ctx.attributes[0].group, "/");
    }
}
