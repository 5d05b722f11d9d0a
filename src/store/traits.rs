//! Record store capability traits.
//!
//! These traits define the contract the populator and the synchronizer rely
//! on. Mutations take `&mut self`: a store and its overlay are owned by one
//! caller at a time, and exclusive access is checked by the compiler rather
//! than by locks.

use std::any::Any;
use std::fmt;

use thiserror::Error;

use crate::error::{BindResult, HierarchyError};
use crate::value::{DataType, Value};

use super::registry::Capability;
use super::{Filter, Hierarchy, ItemId};

/// Errors that can occur during store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No default, no registered constructor.
    #[error("Unsupported store kind: {kind}")]
    UnsupportedStoreKind {
        /// The requested kind, rendered.
        kind: String,
    },

    /// Item not found.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// Item id already present.
    #[error("Duplicate item: {0}")]
    DuplicateItem(ItemId),

    /// Property not declared on the store.
    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    /// Property already declared.
    #[error("Duplicate property: {0}")]
    DuplicateProperty(String),

    /// Value rejected by the property's declared type.
    #[error("Property '{property}' expects {expected}, got {actual}")]
    TypeMismatch {
        /// The rejected property.
        property: String,
        /// Declared type.
        expected: String,
        /// Type of the rejected value.
        actual: String,
    },

    /// Property type has no ordering.
    #[error("Property '{0}' is not sortable")]
    NotSortable(String),

    /// Filter pattern failed to compile.
    #[error("Invalid filter pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern as given.
        pattern: String,
        /// Compiler message.
        reason: String,
    },
}

/// A declared store property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    /// Property name.
    pub name: String,
    /// Type every value must conform to.
    pub data_type: DataType,
    /// Value given to records that never set this property.
    pub default_value: Option<Value>,
}

impl PropertyDef {
    /// A property without a default.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            default_value: None,
        }
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Cell value for a record that has not set this property.
    #[must_use]
    pub fn initial_value(&self) -> Value {
        self.default_value.clone().unwrap_or_default()
    }
}

/// One record to insert. Properties not listed take their default.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Id of the new record.
    pub id: ItemId,
    /// Property values, by name.
    pub values: Vec<(String, Value)>,
}

impl Row {
    /// A row with no values set.
    pub fn new(id: impl Into<ItemId>) -> Self {
        Self {
            id: id.into(),
            values: Vec::new(),
        }
    }

    /// Sets one property value.
    #[must_use]
    pub fn value(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((property.into(), value.into()));
        self
    }
}

/// A full replacement of a store's content.
///
/// Properties listed here are declared when absent; existing declarations
/// win. Rows replace every current record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    /// Properties to declare.
    pub properties: Vec<PropertyDef>,
    /// Records replacing the current content.
    pub rows: Vec<Row>,
}

/// Flat, id-addressable and property-addressable store.
pub trait RecordStore: Send + Sync {
    /// Registry name of the concrete store.
    fn kind_name(&self) -> &'static str;

    /// Returns true if the store offers `capability`.
    fn supports(&self, capability: Capability) -> bool;

    /// Declared properties, in declaration order.
    fn properties(&self) -> &[PropertyDef];

    /// Declares a property; existing records get its initial value.
    ///
    /// # Errors
    /// `DuplicateProperty` if the name is already declared.
    fn add_property(&mut self, property: PropertyDef) -> Result<(), StoreError>;

    /// Visible item ids, in store order.
    fn item_ids(&self) -> Vec<ItemId>;

    /// Every item id regardless of filters, in store order.
    fn all_item_ids(&self) -> Vec<ItemId>;

    /// Number of visible items.
    fn size(&self) -> usize;

    /// Returns true if the id is in the store, visible or not.
    fn contains_id(&self, id: &ItemId) -> bool;

    /// Reads one cell.
    fn value(&self, id: &ItemId, property: &str) -> Result<&Value, StoreError>;

    /// Writes one cell, type-checked against the declaration.
    fn set_value(&mut self, id: &ItemId, property: &str, value: Value) -> Result<(), StoreError>;

    /// Appends an item with every property at its initial value.
    fn add_item(&mut self, id: ItemId) -> Result<(), StoreError>;

    /// Removes an item. Returns false if it was not present.
    fn remove_item(&mut self, id: &ItemId) -> bool;

    /// Removes every item, visible or not.
    fn remove_all_items(&mut self);

    /// Validates the whole batch, then replaces the store's content.
    ///
    /// Nothing is modified when validation fails.
    fn commit(&mut self, batch: Batch) -> Result<(), StoreError>;

    /// Counter bumped by every change to the record set.
    fn revision(&self) -> u64;

    /// Debugging snapshot.
    fn to_json(&self) -> serde_json::Value;

    /// Concrete store, for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// The tree view, when the store has one.
    fn as_tree(&self) -> Option<&dyn TreeStore> {
        None
    }

    /// Mutable tree view, when the store has one.
    fn as_tree_mut(&mut self) -> Option<&mut dyn TreeStore> {
        None
    }

    /// Sorting view, when the store can sort.
    fn as_sortable_mut(&mut self) -> Option<&mut dyn SortableStore> {
        None
    }

    /// Filtering view, when the store can filter.
    fn as_filterable_mut(&mut self) -> Option<&mut dyn FilterableStore> {
        None
    }

    /// Declaration of `name`, if any.
    fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties().iter().find(|p| p.name == name)
    }

    /// Declared property names, in declaration order.
    fn property_ids(&self) -> Vec<String> {
        self.properties().iter().map(|p| p.name.clone()).collect()
    }
}

impl fmt::Debug for dyn RecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore")
            .field("kind", &self.kind_name())
            .field("size", &self.size())
            .field("revision", &self.revision())
            .finish_non_exhaustive()
    }
}

/// One sort criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Property to order by.
    pub property: String,
    /// Smallest value first.
    pub ascending: bool,
}

impl SortKey {
    /// Orders by `property`, smallest first.
    pub fn ascending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ascending: true,
        }
    }

    /// Orders by `property`, largest first.
    pub fn descending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ascending: false,
        }
    }
}

/// A store whose item order can be sorted by property values.
pub trait SortableStore: RecordStore {
    /// Properties whose declared type has an ordering.
    fn sortable_property_ids(&self) -> Vec<String>;

    /// Stable sort by the given keys, first key most significant.
    /// Nulls sort first.
    fn sort(&mut self, keys: &[SortKey]) -> Result<(), StoreError>;
}

/// A store that can hide items behind filters.
pub trait FilterableStore: RecordStore {
    /// Adds a filter; an item is visible when every filter accepts it.
    fn add_filter(&mut self, filter: Filter) -> Result<(), StoreError>;

    /// Removes every filter on `property`.
    fn remove_filters(&mut self, property: &str);

    /// Removes every filter.
    fn remove_all_filters(&mut self);

    /// Active filters, in insertion order.
    fn filters(&self) -> &[Filter];
}

/// A store with a parent/child overlay.
pub trait TreeStore: RecordStore {
    /// The current overlay.
    fn hierarchy(&self) -> &Hierarchy;

    /// Sets or clears the parent of `child`.
    fn set_parent(&mut self, child: &ItemId, parent: Option<&ItemId>)
        -> Result<(), HierarchyError>;

    /// Marks whether an item may have children.
    fn set_children_allowed(&mut self, id: &ItemId, allowed: bool) -> Result<(), HierarchyError>;

    /// Validates and replaces content and overlay together.
    ///
    /// Nothing is modified when validation fails.
    fn commit_tree(&mut self, batch: Batch, hierarchy: Hierarchy) -> BindResult<()>;

    /// Children of `id`.
    fn children(&self, id: &ItemId) -> Vec<ItemId> {
        self.hierarchy().children(id).to_vec()
    }

    /// Parent of `id`.
    fn parent(&self, id: &ItemId) -> Option<ItemId> {
        self.hierarchy().parent(id).cloned()
    }

    /// Returns true if `id` has at least one child.
    fn has_children(&self, id: &ItemId) -> bool {
        self.hierarchy().has_children(id)
    }

    /// Returns true if `id` is an item that may have children.
    fn are_children_allowed(&self, id: &ItemId) -> bool {
        self.contains_id(id) && self.hierarchy().are_children_allowed(id)
    }

    /// Returns true if `id` is an item without a parent.
    fn is_root(&self, id: &ItemId) -> bool {
        self.contains_id(id) && self.hierarchy().parent(id).is_none()
    }

    /// Items without a parent, in store order.
    fn root_item_ids(&self) -> Vec<ItemId> {
        self.all_item_ids()
            .into_iter()
            .filter(|id| self.hierarchy().parent(id).is_none())
            .collect()
    }
}
