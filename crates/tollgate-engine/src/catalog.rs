//! Attribute and identity type catalog consulted when action parameters are validated.

use std::collections::HashSet;

use tollgate_core::CatalogConfig;

/// Live view of the attribute and identity types known to the deployment.
///
/// Passed at validation time, so types added after startup are accepted by
/// later profile loads.
pub trait SchemaCatalog: Send + Sync {
    fn has_attribute_type(&self, name: &str) -> bool;
    fn has_identity_type(&self, name: &str) -> bool;
}

/// Catalog backed by fixed sets of names.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    attribute_types: HashSet<String>,
    identity_types: HashSet<String>,
    permissive: bool,
}

impl StaticCatalog {
    pub fn new<A, I>(attribute_types: A, identity_types: I) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            attribute_types: attribute_types.into_iter().map(Into::into).collect(),
            identity_types: identity_types.into_iter().map(Into::into).collect(),
            permissive: false,
        }
    }

    /// Accepts every syntactically valid type name.
    pub fn permissive() -> Self {
        Self {
            permissive: true,
            ..Self::default()
        }
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            attribute_types: config.attribute_types.iter().cloned().collect(),
            identity_types: config.identity_types.iter().cloned().collect(),
            permissive: config.permissive,
        }
    }
}

impl SchemaCatalog for StaticCatalog {
    fn has_attribute_type(&self, name: &str) -> bool {
        self.permissive || self.attribute_types.contains(name)
    }

    fn has_identity_type(&self, name: &str) -> bool {
        self.permissive || self.identity_types.contains(name)
    }
}
