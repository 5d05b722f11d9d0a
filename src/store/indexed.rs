//! Flat, sortable and filterable store.

use std::any::Any;

use crate::value::Value;

use super::registry::Capability;
use super::{
    Batch, Filter, FilterableStore, ItemId, PropertyDef, RecordStore, RecordTable, SortKey,
    SortableStore, StoreError,
};

/// Default store for sortable and filterable requests.
#[derive(Debug, Clone, Default)]
pub struct IndexedStore {
    table: RecordTable,
    filters: Vec<Filter>,
}

impl IndexedStore {
    /// Registry name.
    pub const KIND: &'static str = "indexed";

    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A property-less store with one item per id, in order. Repeated ids
    /// are kept once.
    pub fn from_ids<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ItemId>,
    {
        let mut store = Self::new();
        for id in ids {
            // duplicates are skipped
            let _ = store.table.add_item(id.into());
        }
        store
    }

    fn is_visible(&self, id: &ItemId) -> bool {
        self.filters.iter().all(|filter| {
            self.table
                .value(id, filter.property())
                .is_ok_and(|value| filter.accepts(value))
        })
    }
}

impl RecordStore for IndexedStore {
    fn kind_name(&self) -> &'static str {
        Self::KIND
    }

    fn supports(&self, capability: Capability) -> bool {
        matches!(
            capability,
            Capability::Flat | Capability::Sortable | Capability::Filterable
        )
    }

    fn properties(&self) -> &[PropertyDef] {
        self.table.properties()
    }

    fn add_property(&mut self, property: PropertyDef) -> Result<(), StoreError> {
        self.table.add_property(property)
    }

    fn item_ids(&self) -> Vec<ItemId> {
        self.table
            .ids()
            .iter()
            .filter(|id| self.is_visible(id))
            .cloned()
            .collect()
    }

    fn all_item_ids(&self) -> Vec<ItemId> {
        self.table.ids().to_vec()
    }

    fn size(&self) -> usize {
        if self.filters.is_empty() {
            return self.table.len();
        }
        self.table
            .ids()
            .iter()
            .filter(|id| self.is_visible(id))
            .count()
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
        self.table.remove_item(id)
    }

    fn remove_all_items(&mut self) {
        self.table.clear();
    }

    fn commit(&mut self, batch: Batch) -> Result<(), StoreError> {
        self.table.commit(batch)
    }

    fn revision(&self) -> u64 {
        self.table.revision()
    }

    fn to_json(&self) -> serde_json::Value {
        self.table.to_json(Self::KIND, &self.item_ids())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_sortable_mut(&mut self) -> Option<&mut dyn SortableStore> {
        Some(self)
    }

    fn as_filterable_mut(&mut self) -> Option<&mut dyn FilterableStore> {
        Some(self)
    }
}

impl SortableStore for IndexedStore {
    fn sortable_property_ids(&self) -> Vec<String> {
        self.table
            .properties()
            .iter()
            .filter(|p| p.data_type.is_sortable())
            .map(|p| p.name.clone())
            .collect()
    }

    fn sort(&mut self, keys: &[SortKey]) -> Result<(), StoreError> {
        self.table.sort(keys)
    }
}

impl FilterableStore for IndexedStore {
    fn add_filter(&mut self, filter: Filter) -> Result<(), StoreError> {
        if self.table.properties().iter().all(|p| p.name != filter.property()) {
            return Err(StoreError::PropertyNotFound(filter.property().to_string()));
        }
        self.filters.push(filter);
        Ok(())
    }

    fn remove_filters(&mut self, property: &str) {
        self.filters.retain(|f| f.property() != property);
    }

    fn remove_all_filters(&mut self) {
        self.filters.clear();
    }

    fn filters(&self) -> &[Filter] {
        &self.filters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Row;
    use crate::value::DataType;

    fn cities() -> IndexedStore {
        let mut store = IndexedStore::new();
        store
            .commit(Batch {
                properties: vec![
                    PropertyDef::new("name", DataType::Text),
                    PropertyDef::new("population", DataType::Int),
                ],
                rows: vec![
                    Row::new("lyon").value("name", "Lyon").value("population", 520),
                    Row::new("paris").value("name", "Paris").value("population", 2100),
                    Row::new("lille").value("name", "Lille"),
                ],
            })
            .unwrap();
        store
    }

    #[test]
    fn test_filters_hide_but_keep_items() {
        let mut store = cities();
        store.add_filter(Filter::text("name", "l", true, true)).unwrap();
        assert_eq!(store.size(), 2);
        assert_eq!(
            store.item_ids(),
            vec![ItemId::from("lyon"), ItemId::from("lille")]
        );
        assert!(store.contains_id(&ItemId::from("paris")));
        assert_eq!(store.all_item_ids().len(), 3);

        store.remove_filters("name");
        assert_eq!(store.size(), 3);
    }

    #[test]
    fn test_filter_on_unknown_property() {
        let mut store = cities();
        let err = store.add_filter(Filter::equals("mayor", "x")).unwrap_err();
        assert_eq!(err, StoreError::PropertyNotFound("mayor".to_string()));
    }

    #[test]
    fn test_clear_removes_hidden_items() {
        let mut store = cities();
        store
            .add_filter(Filter::equals("name", "Paris"))
            .unwrap();
        store.remove_all_items();
        store.remove_all_filters();
        assert_eq!(store.size(), 0);
        assert!(!store.contains_id(&ItemId::from("lyon")));
    }

    #[test]
    fn test_sort_nulls_first() {
        let mut store = cities();
        assert_eq!(store.sortable_property_ids(), vec!["name", "population"]);
        store.sort(&[SortKey::ascending("population")]).unwrap();
        assert_eq!(
            store.item_ids(),
            vec![
                ItemId::from("lille"),
                ItemId::from("lyon"),
                ItemId::from("paris")
            ]
        );
    }

    #[test]
    fn test_from_ids() {
        let store = IndexedStore::from_ids([3_i64, 1, 3, 2]);
        assert_eq!(
            store.item_ids(),
            vec![ItemId::from(3_i64), ItemId::from(1_i64), ItemId::from(2_i64)]
        );
        assert!(store.properties().is_empty());
    }

    #[test]
    fn test_capability_views() {
        let mut store: Box<dyn RecordStore> = Box::new(cities());
        assert!(store.as_tree().is_none());
        let sortable = store.as_sortable_mut().unwrap();
        sortable.sort(&[SortKey::descending("name")]).unwrap();
        assert_eq!(store.item_ids()[0], ItemId::from("paris"));
        assert!(store.as_any().downcast_ref::<IndexedStore>().is_some());
    }
}
