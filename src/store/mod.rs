//! Record stores.
//!
//! A record store is an ordered mapping from [`ItemId`] to a record, where a
//! record maps every declared property to a [`Value`]. The set of properties
//! is uniform across all records of one store.
//!
//! Capabilities are expressed as traits ([`RecordStore`], [`SortableStore`],
//! [`FilterableStore`], [`TreeStore`]) implemented by two concrete stores that
//! share a [`RecordTable`] engine:
//!
//! - [`IndexedStore`]: flat, sortable and filterable
//! - [`TreeItemStore`]: flat with a [`Hierarchy`] overlay

mod filter;
mod hierarchy;
mod indexed;
mod registry;
mod table;
mod traits;
mod tree;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

pub use filter::Filter;
pub use hierarchy::Hierarchy;
pub use indexed::IndexedStore;
pub use registry::{Capability, StoreConstructor, StoreKind, StoreRegistry};
pub use table::RecordTable;
pub use traits::{
    Batch, FilterableStore, PropertyDef, RecordStore, Row, SortKey, SortableStore, StoreError,
    TreeStore,
};
pub use tree::TreeItemStore;

/// Identifier of a record within a store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    /// Numeric id.
    Int(i64),
    /// Textual id.
    Text(String),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ItemId {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ItemId {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<&str> for ItemId {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ItemId {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl TryFrom<&Value> for ItemId {
    type Error = Value;

    /// Integers and non-blank text make ids; anything else is handed back.
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Int(v) => Ok(Self::Int(*v)),
            Value::Text(v) if !v.trim().is_empty() => Ok(Self::Text(v.clone())),
            other => Err(other.clone()),
        }
    }
}

/// Value of `property` on item `id`, or `None` if either is unknown.
pub fn value_of(store: &dyn RecordStore, id: &ItemId, property: &str) -> Option<Value> {
    store.value(id, property).ok().cloned()
}
