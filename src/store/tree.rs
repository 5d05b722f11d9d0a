//! Flat store with a parent/child overlay.

use std::any::Any;
use std::collections::HashSet;

use crate::error::{BindResult, HierarchyError};
use crate::value::Value;

use super::registry::Capability;
use super::{Batch, Hierarchy, ItemId, PropertyDef, RecordStore, RecordTable, StoreError, TreeStore};

/// Default store for tree requests.
///
/// Removing an item makes its children roots. New items allow children.
#[derive(Debug, Clone, Default)]
pub struct TreeItemStore {
    table: RecordTable,
    hierarchy: Hierarchy,
}

impl TreeItemStore {
    /// Registry name.
    pub const KIND: &'static str = "tree";

    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn require(&self, id: &ItemId) -> Result<(), HierarchyError> {
        if self.table.contains(id) {
            Ok(())
        } else {
            Err(HierarchyError::UnknownItem { id: id.clone() })
        }
    }
}

impl RecordStore for TreeItemStore {
    fn kind_name(&self) -> &'static str {
        Self::KIND
    }

    fn supports(&self, capability: Capability) -> bool {
        matches!(capability, Capability::Flat | Capability::Tree)
    }

    fn properties(&self) -> &[PropertyDef] {
        self.table.properties()
    }

    fn add_property(&mut self, property: PropertyDef) -> Result<(), StoreError> {
        self.table.add_property(property)
    }

    fn item_ids(&self) -> Vec<ItemId> {
        self.table.ids().to_vec()
    }

    fn all_item_ids(&self) -> Vec<ItemId> {
        self.table.ids().to_vec()
    }

    fn size(&self) -> usize {
        self.table.len()
    }

    fn contains_id(&self, id: &ItemId) -> bool {
        self.table.contains(id)
    }

    fn value(&self, id: &ItemId, property: &str) -> Result<&Value, StoreError> {
        self.table.value(id, property)
    }

    fn set_value(&mut self, id: &ItemId, property: &str, value: Value) -> Result<(), StoreError> {
        self.table.set_value(id, property, value)
    }

    fn add_item(&mut self, id: ItemId) -> Result<(), StoreError> {
        self.table.add_item(id)
    }

    fn remove_item(&mut self, id: &ItemId) -> bool {
        if !self.table.remove_item(id) {
            return false;
        }
        self.hierarchy.remove(id);
        true
    }

    fn remove_all_items(&mut self) {
        self.table.clear();
        self.hierarchy.clear();
    }

    fn commit(&mut self, batch: Batch) -> Result<(), StoreError> {
        self.table.commit(batch)?;
        self.hierarchy.clear();
        Ok(())
    }

    fn revision(&self) -> u64 {
        self.table.revision()
    }

    fn to_json(&self) -> serde_json::Value {
        let mut json = self.table.to_json(Self::KIND, self.table.ids());
        json["parents"] = serde_json::json!(self
            .hierarchy
            .parent_map()
            .iter()
            .map(|(child, parent)| serde_json::json!({ "child": child, "parent": parent }))
            .collect::<Vec<_>>());
        json
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_tree(&self) -> Option<&dyn TreeStore> {
        Some(self)
    }

    fn as_tree_mut(&mut self) -> Option<&mut dyn TreeStore> {
        Some(self)
    }
}

impl TreeStore for TreeItemStore {
    fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    fn set_parent(
        &mut self,
        child: &ItemId,
        parent: Option<&ItemId>,
    ) -> Result<(), HierarchyError> {
        self.require(child)?;
        if let Some(parent) = parent {
            self.require(parent)?;
        }
        self.hierarchy.set_parent(child, parent)
    }

    fn set_children_allowed(&mut self, id: &ItemId, allowed: bool) -> Result<(), HierarchyError> {
        self.require(id)?;
        self.hierarchy.set_children_allowed(id, allowed)
    }

    fn commit_tree(&mut self, batch: Batch, hierarchy: Hierarchy) -> BindResult<()> {
        {
            let ids: HashSet<&ItemId> = batch.rows.iter().map(|row| &row.id).collect();
            hierarchy.validate(|id| ids.contains(id))?;
        }
        self.table.commit(batch)?;
        self.hierarchy = hierarchy;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Row;
    use crate::value::DataType;

    fn id(s: &str) -> ItemId {
        ItemId::from(s)
    }

    fn family() -> TreeItemStore {
        let mut store = TreeItemStore::new();
        let batch = Batch {
            properties: vec![PropertyDef::new("name", DataType::Text)],
            rows: ["a", "a1", "a2", "b"]
                .into_iter()
                .map(|n| Row::new(n).value("name", n))
                .collect(),
        };
        let ids = [id("a"), id("a1"), id("a2"), id("b")];
        let hierarchy = Hierarchy::from_edges(&ids, [(id("a"), vec![id("a1"), id("a2")])]).unwrap();
        store.commit_tree(batch, hierarchy).unwrap();
        store
    }

    #[test]
    fn test_tree_queries() {
        let store = family();
        assert_eq!(store.size(), 4);
        assert_eq!(store.root_item_ids(), vec![id("a"), id("b")]);
        assert!(store.has_children(&id("a")));
        assert!(!store.has_children(&id("b")));
        assert!(!store.are_children_allowed(&id("b")));
        assert_eq!(store.parent(&id("a1")), Some(id("a")));
        assert!(store.is_root(&id("b")));
        assert!(!store.is_root(&id("zz")));
    }

    #[test]
    fn test_remove_item_promotes_children() {
        let mut store = family();
        assert!(store.remove_item(&id("a")));
        assert_eq!(store.root_item_ids(), vec![id("a1"), id("a2"), id("b")]);
    }

    #[test]
    fn test_set_parent_requires_known_items() {
        let mut store = family();
        let err = store.set_parent(&id("b"), Some(&id("ghost"))).unwrap_err();
        assert_eq!(err, HierarchyError::UnknownItem { id: id("ghost") });

        store.set_children_allowed(&id("b"), true).unwrap();
        store.set_parent(&id("a2"), Some(&id("b"))).unwrap();
        assert_eq!(store.children(&id("b")), vec![id("a2")]);
        assert_eq!(store.children(&id("a")), vec![id("a1")]);
    }

    #[test]
    fn test_commit_tree_rejects_unknown_child() {
        let mut store = family();
        let before = store.revision();
        let batch = Batch {
            properties: Vec::new(),
            rows: vec![Row::new("x")],
        };
        let hierarchy = Hierarchy::from_edges(&[id("x")], [(id("x"), vec![id("y")])]).unwrap();
        let err = store.commit_tree(batch, hierarchy).unwrap_err();
        assert!(err.is_inconsistent_hierarchy());
        assert_eq!(store.revision(), before);
        assert_eq!(store.size(), 4);
    }

    #[test]
    fn test_to_json_lists_parents() {
        let store = family();
        let json = store.to_json();
        assert_eq!(json["kind"], "tree");
        assert_eq!(json["parents"].as_array().map(Vec::len), Some(2));
    }
}
