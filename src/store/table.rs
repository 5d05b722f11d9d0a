//! Ordered id → record engine shared by the concrete stores.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde_json::json;

use crate::value::Value;

use super::{Batch, ItemId, PropertyDef, SortKey, StoreError};

/// Ordered records with a uniform property set.
///
/// Every record holds exactly one cell per declared property, in declaration
/// order. `revision` increases on every change to the set of ids.
#[derive(Debug, Clone, Default)]
pub struct RecordTable {
    properties: Vec<PropertyDef>,
    columns: HashMap<String, usize>,
    order: Vec<ItemId>,
    records: HashMap<ItemId, Vec<Value>>,
    revision: u64,
}

fn check_type(property: &PropertyDef, value: &Value) -> Result<(), StoreError> {
    if property.data_type.accepts(value) {
        Ok(())
    } else {
        Err(StoreError::TypeMismatch {
            property: property.name.clone(),
            expected: property.data_type.to_string(),
            actual: value.type_name().to_string(),
        })
    }
}

impl RecordTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declared properties, in declaration order.
    #[must_use]
    pub fn properties(&self) -> &[PropertyDef] {
        &self.properties
    }

    fn column(&self, property: &str) -> Result<usize, StoreError> {
        self.columns
            .get(property)
            .copied()
            .ok_or_else(|| StoreError::PropertyNotFound(property.to_string()))
    }

    /// Declares a property, filling existing records with its default.
    pub fn add_property(&mut self, property: PropertyDef) -> Result<(), StoreError> {
        if self.columns.contains_key(&property.name) {
            return Err(StoreError::DuplicateProperty(property.name));
        }
        let initial = property.initial_value();
        check_type(&property, &initial)?;
        for cells in self.records.values_mut() {
            cells.push(initial.clone());
        }
        self.columns.insert(property.name.clone(), self.properties.len());
        self.properties.push(property);
        Ok(())
    }

    /// Ids in table order.
    #[must_use]
    pub fn ids(&self) -> &[ItemId] {
        &self.order
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the table holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns true if `id` is a record.
    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.records.contains_key(id)
    }

    /// Counter bumped by every change to the id set.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Cell of `id` under `property`.
    pub fn value(&self, id: &ItemId, property: &str) -> Result<&Value, StoreError> {
        let column = self.column(property)?;
        let cells = self
            .records
            .get(id)
            .ok_or_else(|| StoreError::ItemNotFound(id.clone()))?;
        cells
            .get(column)
            .ok_or_else(|| StoreError::PropertyNotFound(property.to_string()))
    }

    /// Overwrites one cell after checking the declared type.
    pub fn set_value(
        &mut self,
        id: &ItemId,
        property: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        let column = self.column(property)?;
        check_type(&self.properties[column], &value)?;
        let cells = self
            .records
            .get_mut(id)
            .ok_or_else(|| StoreError::ItemNotFound(id.clone()))?;
        cells[column] = value;
        Ok(())
    }

    /// Appends a record with default cells.
    pub fn add_item(&mut self, id: ItemId) -> Result<(), StoreError> {
        if self.records.contains_key(&id) {
            return Err(StoreError::DuplicateItem(id));
        }
        let cells = self.properties.iter().map(PropertyDef::initial_value).collect();
        self.records.insert(id.clone(), cells);
        self.order.push(id);
        self.revision += 1;
        Ok(())
    }

    /// Removes a record. Returns false if it was not present.
    pub fn remove_item(&mut self, id: &ItemId) -> bool {
        if self.records.remove(id).is_none() {
            return false;
        }
        self.order.retain(|existing| existing != id);
        self.revision += 1;
        true
    }

    /// Removes every record, keeping the declared properties.
    pub fn clear(&mut self) {
        if self.order.is_empty() {
            return;
        }
        self.order.clear();
        self.records.clear();
        self.revision += 1;
    }

    /// Validates `batch` against the current declarations plus the batch's
    /// own, then replaces every record.
    pub fn commit(&mut self, batch: Batch) -> Result<(), StoreError> {
        let mut properties = self.properties.clone();
        let mut columns = self.columns.clone();
        for property in batch.properties {
            if columns.contains_key(&property.name) {
                continue;
            }
            check_type(&property, &property.initial_value())?;
            columns.insert(property.name.clone(), properties.len());
            properties.push(property);
        }

        let mut seen = HashSet::with_capacity(batch.rows.len());
        let mut order = Vec::with_capacity(batch.rows.len());
        let mut records = HashMap::with_capacity(batch.rows.len());
        for row in batch.rows {
            if !seen.insert(row.id.clone()) {
                return Err(StoreError::DuplicateItem(row.id));
            }
            let mut cells: Vec<Value> = properties.iter().map(PropertyDef::initial_value).collect();
            for (name, value) in row.values {
                let column = *columns
                    .get(&name)
                    .ok_or(StoreError::PropertyNotFound(name))?;
                check_type(&properties[column], &value)?;
                cells[column] = value;
            }
            order.push(row.id.clone());
            records.insert(row.id, cells);
        }

        self.properties = properties;
        self.columns = columns;
        self.order = order;
        self.records = records;
        self.revision += 1;
        Ok(())
    }

    /// Stable sort of the table order.
    pub fn sort(&mut self, keys: &[SortKey]) -> Result<(), StoreError> {
        let mut resolved = Vec::with_capacity(keys.len());
        for key in keys {
            let column = self.column(&key.property)?;
            if !self.properties[column].data_type.is_sortable() {
                return Err(StoreError::NotSortable(key.property.clone()));
            }
            resolved.push((column, key.ascending));
        }

        let records = &self.records;
        self.order.sort_by(|a, b| {
            let (Some(left), Some(right)) = (records.get(a), records.get(b)) else {
                return Ordering::Equal;
            };
            resolved
                .iter()
                .map(|&(column, ascending)| {
                    let ord = left[column].sort_cmp(&right[column]);
                    if ascending {
                        ord
                    } else {
                        ord.reverse()
                    }
                })
                .find(|ord| ord.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        Ok(())
    }

    /// JSON snapshot of the declarations and of the records in `ids` order.
    #[must_use]
    pub fn to_json(&self, kind: &str, ids: &[ItemId]) -> serde_json::Value {
        let properties: Vec<serde_json::Value> = self
            .properties
            .iter()
            .map(|p| json!({ "name": p.name, "type": p.data_type.to_string() }))
            .collect();
        let items: Vec<serde_json::Value> = ids
            .iter()
            .filter_map(|id| {
                let cells = self.records.get(id)?;
                let values: serde_json::Map<String, serde_json::Value> = self
                    .properties
                    .iter()
                    .zip(cells)
                    .map(|(p, v)| (p.name.clone(), v.to_json()))
                    .collect();
                Some(json!({ "id": id, "values": values }))
            })
            .collect();
        json!({
            "kind": kind,
            "revision": self.revision,
            "properties": properties,
            "items": items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Row;
    use crate::value::DataType;

    fn people() -> RecordTable {
        let mut table = RecordTable::new();
        table
            .add_property(PropertyDef::new("name", DataType::Text))
            .unwrap();
        table
            .add_property(PropertyDef::new("age", DataType::Int).with_default(Value::Int(0)))
            .unwrap();
        table
            .commit(Batch {
                properties: Vec::new(),
                rows: vec![
                    Row::new(1_i64).value("name", "Cy").value("age", 30),
                    Row::new(2_i64).value("name", "Al"),
                    Row::new(3_i64).value("name", "Bo").value("age", 30),
                ],
            })
            .unwrap();
        table
    }

    #[test]
    fn test_add_property_extends_existing_records() {
        let mut table = people();
        table
            .add_property(PropertyDef::new("city", DataType::Text).with_default(Value::from("?")))
            .unwrap();
        assert_eq!(
            table.value(&ItemId::from(2_i64), "city").unwrap(),
            &Value::from("?")
        );
        assert_eq!(
            table.add_property(PropertyDef::new("city", DataType::Text)),
            Err(StoreError::DuplicateProperty("city".to_string()))
        );
    }

    #[test]
    fn test_defaults_and_type_checks() {
        let mut table = people();
        let id = ItemId::from(2_i64);
        assert_eq!(table.value(&id, "age").unwrap(), &Value::Int(0));
        let err = table.set_value(&id, "age", Value::from("old")).unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch { .. }));
        table.set_value(&id, "age", Value::Null).unwrap();
        assert_eq!(table.value(&id, "age").unwrap(), &Value::Null);
    }

    #[test]
    fn test_revision_tracks_record_set() {
        let mut table = people();
        let start = table.revision();
        table
            .set_value(&ItemId::from(1_i64), "name", Value::from("Cyd"))
            .unwrap();
        assert_eq!(table.revision(), start);

        table.add_item(ItemId::from(4_i64)).unwrap();
        assert_eq!(table.revision(), start + 1);
        assert!(table.remove_item(&ItemId::from(4_i64)));
        assert!(!table.remove_item(&ItemId::from(4_i64)));
        assert_eq!(table.revision(), start + 2);
    }

    #[test]
    fn test_failed_commit_leaves_table_untouched() {
        let mut table = people();
        let before = table.revision();
        let err = table
            .commit(Batch {
                properties: vec![PropertyDef::new("email", DataType::Text)],
                rows: vec![
                    Row::new(9_i64).value("name", "Ed"),
                    Row::new(9_i64).value("name", "Ed again"),
                ],
            })
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateItem(ItemId::from(9_i64)));
        assert_eq!(table.len(), 3);
        assert_eq!(table.revision(), before);
        assert!(table.properties().iter().all(|p| p.name != "email"));

        let err = table
            .commit(Batch {
                properties: Vec::new(),
                rows: vec![Row::new(9_i64).value("age", "nine")],
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch { .. }));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_sort_multiple_keys() {
        let mut table = people();
        table
            .sort(&[SortKey::descending("age"), SortKey::ascending("name")])
            .unwrap();
        let names: Vec<&Value> = table
            .ids()
            .iter()
            .map(|id| table.value(id, "name").unwrap())
            .collect();
        assert_eq!(
            names,
            vec![&Value::from("Bo"), &Value::from("Cy"), &Value::from("Al")]
        );

        assert_eq!(
            table.sort(&[SortKey::ascending("nope")]),
            Err(StoreError::PropertyNotFound("nope".to_string()))
        );
    }

    #[test]
    fn test_to_json_snapshot() {
        let table = people();
        let json = table.to_json("indexed", table.ids());
        assert_eq!(json["kind"], "indexed");
        assert_eq!(json["properties"][0]["name"], "name");
        assert_eq!(json["items"][0]["id"], 1);
        assert_eq!(json["items"][1]["values"]["age"], 0);
    }
}
