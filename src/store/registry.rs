//! Store kinds and the registry that instantiates them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{IndexedStore, RecordStore, StoreError, TreeItemStore};

/// Capabilities a record store can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Id- and property-addressable records. Every store has it.
    Flat,
    /// Records can be reordered by property values.
    Sortable,
    /// Records can be hidden by property filters.
    Filterable,
    /// Parent/child overlay.
    Tree,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Flat => "flat",
            Self::Sortable => "sortable",
            Self::Filterable => "filterable",
            Self::Tree => "tree",
        };
        f.write_str(name)
    }
}

/// What a caller asks the populator for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Any store offering the capability; a default is picked if needed.
    Capability(Capability),
    /// A concrete store registered under this name.
    Named(String),
}

impl StoreKind {
    /// Shorthand for [`StoreKind::Named`].
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Returns true if `store` can be reused for this kind.
    #[must_use]
    pub fn is_satisfied_by(&self, store: &dyn RecordStore) -> bool {
        match self {
            Self::Capability(capability) => store.supports(*capability),
            Self::Named(name) => store.kind_name() == name,
        }
    }
}

impl From<Capability> for StoreKind {
    fn from(capability: Capability) -> Self {
        Self::Capability(capability)
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capability(capability) => write!(f, "{capability}"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Constructor for a registered store.
pub type StoreConstructor = fn() -> Box<dyn RecordStore>;

fn indexed() -> Box<dyn RecordStore> {
    Box::new(IndexedStore::new())
}

fn tree() -> Box<dyn RecordStore> {
    Box::new(TreeItemStore::new())
}

/// Maps store kinds to constructors.
///
/// Capability defaults are fixed: sortable and filterable requests get an
/// [`IndexedStore`], tree requests a [`TreeItemStore`], and a bare flat
/// request has no default. Named stores are open: `indexed` and `tree` are
/// pre-registered and applications can add their own.
#[derive(Debug, Clone)]
pub struct StoreRegistry {
    named: BTreeMap<String, StoreConstructor>,
}

impl Default for StoreRegistry {
    fn default() -> Self {
        let mut named: BTreeMap<String, StoreConstructor> = BTreeMap::new();
        named.insert(IndexedStore::KIND.to_string(), indexed);
        named.insert(TreeItemStore::KIND.to_string(), tree);
        Self { named }
    }
}

impl StoreRegistry {
    /// A registry with the built-in stores.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a named store.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, constructor: StoreConstructor) -> Self {
        self.named.insert(name.into(), constructor);
        self
    }

    /// Returns true if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    /// Instantiates an empty store of the given kind.
    ///
    /// # Errors
    /// `UnsupportedStoreKind` for a bare flat request or an unregistered name.
    pub fn create(&self, kind: &StoreKind) -> Result<Box<dyn RecordStore>, StoreError> {
        let constructor: StoreConstructor = match kind {
            StoreKind::Capability(Capability::Sortable | Capability::Filterable) => indexed,
            StoreKind::Capability(Capability::Tree) => tree,
            StoreKind::Capability(Capability::Flat) => {
                return Err(StoreError::UnsupportedStoreKind {
                    kind: kind.to_string(),
                })
            }
            StoreKind::Named(name) => {
                *self
                    .named
                    .get(name)
                    .ok_or_else(|| StoreError::UnsupportedStoreKind {
                        kind: name.clone(),
                    })?
            }
        };
        Ok(constructor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_defaults() {
        let registry = StoreRegistry::new();
        let store = registry.create(&Capability::Filterable.into()).unwrap();
        assert_eq!(store.kind_name(), "indexed");
        assert!(store.supports(Capability::Sortable));

        let store = registry.create(&Capability::Tree.into()).unwrap();
        assert_eq!(store.kind_name(), "tree");
        assert!(store.as_tree().is_some());
    }

    #[test]
    fn test_flat_and_unknown_kinds_are_unsupported() {
        let registry = StoreRegistry::new();
        let err = registry.create(&Capability::Flat.into()).unwrap_err();
        assert_eq!(
            err,
            StoreError::UnsupportedStoreKind {
                kind: "flat".to_string()
            }
        );
        let err = registry.create(&StoreKind::named("ledger")).unwrap_err();
        assert!(err.to_string().contains("ledger"));
    }

    #[test]
    fn test_custom_named_store() {
        fn sorted() -> Box<dyn RecordStore> {
            Box::new(IndexedStore::new())
        }
        let registry = StoreRegistry::new().with("sorted", sorted);
        assert!(registry.contains("sorted"));
        assert!(registry.create(&StoreKind::named("sorted")).is_ok());
    }

    #[test]
    fn test_kind_satisfaction() {
        let store = IndexedStore::new();
        assert!(StoreKind::from(Capability::Filterable).is_satisfied_by(&store));
        assert!(!StoreKind::from(Capability::Tree).is_satisfied_by(&store));
        assert!(StoreKind::named("indexed").is_satisfied_by(&store));
    }

    #[test]
    fn test_store_kind_serde() {
        let kind: StoreKind = serde_json::from_str(r#"{"capability":"tree"}"#).unwrap();
        assert_eq!(kind, StoreKind::Capability(Capability::Tree));
        let kind: StoreKind = serde_json::from_str(r#"{"named":"indexed"}"#).unwrap();
        assert_eq!(kind, StoreKind::named("indexed"));
    }
}
