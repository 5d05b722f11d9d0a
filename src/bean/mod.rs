//! Bean types and handles.
//!
//! Rust has no runtime reflection, so every bean type registers an explicit
//! [`BeanType`] descriptor listing its fields, methods, parent type, optional
//! schema declaration and optional children accessor. Accessors are typed
//! closures captured once when the descriptor is built.
//!
//! ```
//! use std::sync::LazyLock;
//! use beanbind::{Bean, BeanRef, BeanType, DataType, Value};
//!
//! struct City {
//!     name: String,
//! }
//!
//! impl Bean for City {
//!     fn bean_type() -> &'static BeanType {
//!         static TYPE: LazyLock<BeanType> = LazyLock::new(|| {
//!             BeanType::builder::<City>("City")
//!                 .field("name", DataType::Text, |c: &City| Value::from(&c.name))
//!                 .build()
//!         });
//!         &TYPE
//!     }
//! }
//!
//! let city = BeanRef::new(City { name: "Lyon".to_string() });
//! assert_eq!(city.bean_type().name(), "City");
//! ```

mod descriptor;
mod schema;

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

pub use descriptor::{BeanType, BeanTypeBuilder, FieldDescriptor, Lineage, MethodDescriptor, Visibility};
pub(crate) use descriptor::{FieldLocation, ReadFn};
pub use schema::{PropertyDeclaration, SchemaDeclaration, ViewLabel};

/// An application object that can be bound to a record store.
pub trait Bean: Any + Send + Sync {
    /// The descriptor registered for this type.
    fn bean_type() -> &'static BeanType
    where
        Self: Sized;
}

/// Failure reported by a bean's children accessor.
///
/// Typically a lazily loaded collection that can only be read inside the
/// context that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ChildrenError {
    /// What went wrong.
    pub reason: String,
}

impl ChildrenError {
    /// Creates an error carrying `reason`.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Shared handle to a bean instance.
///
/// Cloning a `BeanRef` never clones the bean: equality is identity.
#[derive(Clone)]
pub struct BeanRef {
    instance: Arc<dyn Any + Send + Sync>,
    bean_type: &'static BeanType,
}

impl BeanRef {
    /// Moves a bean behind a new shared handle.
    pub fn new<T: Bean>(bean: T) -> Self {
        Self::from_arc(Arc::new(bean))
    }

    /// Wraps an already shared bean, preserving its identity.
    pub fn from_arc<T: Bean>(bean: Arc<T>) -> Self {
        let bean_type = T::bean_type();
        debug_assert_eq!(
            bean_type.type_id(),
            TypeId::of::<T>(),
            "descriptor {} registered for a different Rust type",
            bean_type.name()
        );
        Self {
            instance: bean,
            bean_type,
        }
    }

    /// Descriptor of the bean's runtime type.
    #[must_use]
    pub const fn bean_type(&self) -> &'static BeanType {
        self.bean_type
    }

    /// Type-erased instance, as expected by descriptor accessors.
    #[must_use]
    pub fn instance(&self) -> &dyn Any {
        let instance: &(dyn Any + Send + Sync) = &*self.instance;
        instance
    }

    /// Borrows the bean as `T` when that is its runtime type.
    #[must_use]
    pub fn downcast_ref<T: Bean>(&self) -> Option<&T> {
        self.instance.downcast_ref::<T>()
    }

    /// Returns the shared bean as `T` when that is its runtime type.
    #[must_use]
    pub fn downcast<T: Bean>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.instance).downcast::<T>().ok()
    }

    /// Address of the shared instance; stable for the bean's lifetime.
    #[must_use]
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.instance).cast::<()>() as usize
    }

    /// Returns true if both handles point at the same bean.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }

    /// Reads the bean's children through its type's children accessor.
    ///
    /// `None` when neither the type nor its ancestors declare one.
    #[must_use]
    pub fn children(&self) -> Option<Result<Vec<BeanRef>, ChildrenError>> {
        self.bean_type.read_children(self.instance())
    }
}

impl PartialEq for BeanRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for BeanRef {}

impl fmt::Debug for BeanRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BeanRef({}@{:#x})", self.bean_type.name(), self.identity())
    }
}

impl fmt::Display for BeanRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#x}", self.bean_type.name(), self.identity())
    }
}

/// Lazily resolved reference to a bean type.
///
/// Field declarations point at other types through a handle so that
/// self-referential and mutually recursive types can be described.
#[derive(Clone, Copy)]
pub struct TypeHandle(HandleInner);

#[derive(Clone, Copy)]
enum HandleInner {
    Lazy(fn() -> &'static BeanType),
    Resolved(&'static BeanType),
}

impl TypeHandle {
    /// Handle to the descriptor of `T`.
    #[must_use]
    pub fn of<T: Bean>() -> Self {
        Self(HandleInner::Lazy(<T as Bean>::bean_type))
    }

    /// Handle to an already resolved descriptor.
    #[must_use]
    pub const fn from_static(bean_type: &'static BeanType) -> Self {
        Self(HandleInner::Resolved(bean_type))
    }

    /// Resolves the descriptor.
    #[must_use]
    pub fn get(self) -> &'static BeanType {
        match self.0 {
            HandleInner::Lazy(f) => f(),
            HandleInner::Resolved(t) => t,
        }
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.get().id() == other.get().id()
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandle({})", self.get().name())
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::fixtures::{Entity, Person};
    use super::*;

    #[test]
    fn test_bean_ref_identity_survives_clone() {
        let a = BeanRef::new(Person::new(1, "Ada", 36));
        let b = a.clone();
        let c = BeanRef::new(Person::new(1, "Ada", 36));
        assert!(a.ptr_eq(&b));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_bean_ref_from_arc_preserves_identity() {
        let shared = Arc::new(Person::new(2, "Bob", 40));
        let r = BeanRef::from_arc(Arc::clone(&shared));
        let back = r.downcast::<Person>().unwrap();
        assert!(Arc::ptr_eq(&shared, &back));
        assert_eq!(r.downcast_ref::<Person>().unwrap().name, "Bob");
        assert!(r.downcast_ref::<Entity>().is_none());
    }

    #[test]
    fn test_bean_ref_children() {
        let mut parent = Person::new(1, "Ada", 36);
        parent.children.push(Arc::new(Person::new(2, "Byron", 8)));
        let r = BeanRef::new(parent);
        let kids = r.children().unwrap().unwrap();
        assert_eq!(kids.len(), 1);
        assert_eq!(kids[0].downcast_ref::<Person>().unwrap().name, "Byron");

        let plain = BeanRef::new(Entity { internal_id: 3 });
        assert!(plain.children().is_none());
    }

    #[test]
    fn test_type_handle_equality() {
        assert_eq!(TypeHandle::of::<Person>(), TypeHandle::from_static(Person::bean_type()));
        assert_ne!(TypeHandle::of::<Person>(), TypeHandle::of::<Entity>());
    }
}
