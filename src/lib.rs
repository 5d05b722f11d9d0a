//! # beanbind - Record stores built from application beans
//!
//! beanbind binds collections of application objects ("beans") to generic
//! record stores. A schema is derived from the bean type, one record is
//! created per bean, and a tree overlay can be kept in step with a flat store.
//!
//! ## Core Concepts
//!
//! - **Bean**: An application type registered with a [`BeanType`] descriptor
//! - **PropertyReaderAlgorithm**: Derives an ordered property schema from a bean type
//! - **NestedPathResolver**: Resolves dotted paths such as `address.country.code`
//! - **Populator**: Declares the schema on a store and fills it with one record per bean
//! - **HierarchicalSynchronizer**: Derives parent/child relations for a flat store
//!
//! ## Usage
//!
//! ```rust,ignore
//! use beanbind::{AnnotationReaderAlgorithm, Capability, Populator};
//!
//! let populator = Populator::builder()
//!     .bean::<Person>()
//!     .algorithm(AnnotationReaderAlgorithm::new("detail")?)
//!     .id_property("internalId")
//!     .build()?;
//! let store = populator.build(None, &people, &Capability::Tree.into())?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Bean model
pub mod bean;
pub mod error;
pub mod path;
pub mod value;

// Schema derivation
pub mod property;

// Stores and binding
pub mod populate;
pub mod store;
pub mod sync;

// Re-export primary types at crate root for convenience
pub use bean::{
    Bean, BeanRef, BeanType, BeanTypeBuilder, ChildrenError, PropertyDeclaration,
    SchemaDeclaration, TypeHandle, ViewLabel, Visibility,
};
pub use error::{
    BindError, BindResult, HierarchyError, PopulateError, SchemaError, ValidationError,
};
pub use path::{NestedPathResolver, ResolvedPath};
pub use populate::{
    ChildrenPolicy, IdStrategy, Populator, PopulatorBuilder, PopulatorConfig,
    DEFAULT_BACK_REFERENCE,
};
pub use property::{
    date_from_text, AnnotationReaderAlgorithm, AttributeReaderAlgorithm, GeneratedProperty,
    GetterReaderAlgorithm, PropertyAccessor, PropertyMetadata, PropertyReaderAlgorithm,
};
pub use store::{
    Batch, Capability, Filter, FilterableStore, Hierarchy, IndexedStore, ItemId, PropertyDef,
    RecordStore, Row, SortKey, SortableStore, StoreError, StoreKind, StoreRegistry,
    TreeItemStore, TreeStore,
};
pub use sync::{ChildResolver, HierarchicalSynchronizer};
pub use value::{DataType, Value};
