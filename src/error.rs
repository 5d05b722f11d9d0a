//! Error types for beanbind.
//!
//! Every layer has its own strongly typed error enum (thiserror) and the
//! top-level [`BindError`] wraps them, so callers can match on the exact
//! failure or just propagate with `?`.

use thiserror::Error;

use crate::store::{ItemId, StoreError};

/// Validation errors raised before any work is done.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// An argument was rejected.
    #[error("Invalid argument '{argument}': {reason}")]
    InvalidArgument {
        /// Name of the rejected argument.
        argument: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A required setting was not provided.
    #[error("Required field '{field}' is missing")]
    MissingField {
        /// Name of the missing setting.
        field: String,
    },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::InvalidArgument`].
    #[must_use]
    pub fn invalid(argument: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while deriving a property schema from a bean type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The annotation algorithm found no schema declaration.
    #[error("{type_name} and its ancestors carry no schema declaration")]
    NotAnnotated {
        /// The bean type that was inspected.
        type_name: String,
    },

    /// A path segment names no field.
    #[error("No field '{segment}' on {class} or its ancestors")]
    NoSuchField {
        /// The segment that could not be located.
        segment: String,
        /// The type it was looked up on.
        class: String,
    },

    /// A path continues past a value that is not a bean.
    #[error("Cannot navigate into '{segment}': {type_name} is not a bean type")]
    NotNavigable {
        /// The segment following the scalar value.
        segment: String,
        /// Type name of the scalar value.
        type_name: String,
    },

    /// Two declarations share a name within one view.
    #[error("Property '{name}' is declared twice for view '{label}'")]
    DuplicateProperty {
        /// The repeated property name.
        name: String,
        /// The view both declarations belong to.
        label: String,
    },

    /// A bean was read through an accessor of an unrelated type.
    #[error("Bean of type {actual} cannot be read as {expected}")]
    TypeMismatch {
        /// Type the accessor was declared on.
        expected: String,
        /// Runtime type of the bean.
        actual: String,
    },
}

/// Errors raised while maintaining a hierarchy overlay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    /// A resolved child id is not an item of the store.
    #[error("Inconsistent hierarchy: child {child} of {parent} is not in the store")]
    UnknownChild {
        /// Item whose bean named the child.
        parent: ItemId,
        /// The missing child id.
        child: ItemId,
    },

    /// Two items claim the same child.
    #[error("Inconsistent hierarchy: {child} is claimed by both {first} and {second}")]
    ConflictingParents {
        /// The contested child.
        child: ItemId,
        /// Parent recorded first.
        first: ItemId,
        /// Parent that claimed it again.
        second: ItemId,
    },

    /// A parent link would make an item its own ancestor.
    #[error("Inconsistent hierarchy: setting {parent} as parent of {child} creates a cycle")]
    Cycle {
        /// Item being attached.
        child: ItemId,
        /// Proposed parent.
        parent: ItemId,
    },

    /// A parent has children while disallowing them.
    #[error("Inconsistent hierarchy: {parent} does not allow children")]
    ChildrenNotAllowed {
        /// The offending parent.
        parent: ItemId,
    },

    /// An item carries no bean in its back-reference property.
    #[error("Item {id} has no bean in back-reference property '{property}'")]
    MissingBackReference {
        /// The item without a bean.
        id: ItemId,
        /// Name of the back-reference property.
        property: String,
    },

    /// An operation named an item the store does not contain.
    #[error("Item {id} is not in the store")]
    UnknownItem {
        /// The unknown id.
        id: ItemId,
    },

    /// Children cannot be disallowed while an item has some.
    #[error("Item {id} has children; they must be moved before disallowing children")]
    HasChildren {
        /// The item that still has children.
        id: ItemId,
    },
}

impl HierarchyError {
    /// Returns true for every variant that describes a tree that disagrees
    /// with its backing store.
    #[must_use]
    pub const fn is_inconsistent(&self) -> bool {
        matches!(
            self,
            Self::UnknownChild { .. }
                | Self::ConflictingParents { .. }
                | Self::Cycle { .. }
                | Self::ChildrenNotAllowed { .. }
        )
    }
}

/// Errors raised while populating a store from beans.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PopulateError {
    /// A bean is reachable from its own children.
    #[error("Cyclic bean graph: a {type_name} bean is its own descendant")]
    CyclicGraph {
        /// Type of the repeated bean.
        type_name: String,
    },

    /// A children accessor failed under the strict policy.
    #[error("Children of a {type_name} bean are unavailable: {reason}")]
    ChildrenUnavailable {
        /// Type of the bean whose children were read.
        type_name: String,
        /// Failure reported by the accessor.
        reason: String,
    },

    /// The id property held a value that cannot be an item id.
    #[error("Cannot derive an item id from {value}")]
    InvalidId {
        /// The rejected value, rendered.
        value: String,
    },
}

/// Top-level error type for beanbind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    /// Rejected input.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Schema derivation or property read failure.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Record store failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Hierarchy overlay failure.
    #[error("Hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),

    /// Population failure.
    #[error("Population error: {0}")]
    Populate(#[from] PopulateError),
}

impl BindError {
    /// Shorthand for an invalid-argument validation error.
    #[must_use]
    pub fn invalid_argument(argument: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation(ValidationError::invalid(argument, reason))
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a schema error.
    #[must_use]
    pub const fn is_schema(&self) -> bool {
        matches!(self, Self::Schema(_))
    }

    /// Returns true if this is a store error.
    #[must_use]
    pub const fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Returns true if the tree overlay disagrees with its store.
    #[must_use]
    pub const fn is_inconsistent_hierarchy(&self) -> bool {
        match self {
            Self::Hierarchy(e) => e.is_inconsistent(),
            _ => false,
        }
    }

    /// Returns true if population hit a cyclic bean graph.
    #[must_use]
    pub const fn is_cyclic_graph(&self) -> bool {
        matches!(self, Self::Populate(PopulateError::CyclicGraph { .. }))
    }
}

/// Result type alias for beanbind operations.
pub type BindResult<T> = Result<T, BindError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_invalid_argument() {
        let err = ValidationError::invalid("label", "cannot be blank");
        let msg = format!("{err}");
        assert!(msg.contains("label"));
        assert!(msg.contains("cannot be blank"));
    }

    #[test]
    fn test_schema_error_no_such_field() {
        let err = SchemaError::NoSuchField {
            segment: "street".to_string(),
            class: "Address".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("street"));
        assert!(msg.contains("Address"));
    }

    #[test]
    fn test_hierarchy_error_is_inconsistent() {
        let err = HierarchyError::UnknownChild {
            parent: ItemId::from("a"),
            child: ItemId::from("z"),
        };
        assert!(err.is_inconsistent());
        assert!(err.to_string().contains("Inconsistent hierarchy"));

        let err = HierarchyError::MissingBackReference {
            id: ItemId::from(1_i64),
            property: "bean".to_string(),
        };
        assert!(!err.is_inconsistent());
        assert!(!HierarchyError::UnknownItem { id: ItemId::from("q") }.is_inconsistent());
    }

    #[test]
    fn test_bind_error_from_layers() {
        let err: BindError = ValidationError::invalid("path", "empty").into();
        assert!(err.is_validation());
        assert!(!err.is_schema());

        let err: BindError = SchemaError::NotAnnotated {
            type_name: "Person".to_string(),
        }
        .into();
        assert!(err.is_schema());

        let err: BindError = PopulateError::CyclicGraph {
            type_name: "Node".to_string(),
        }
        .into();
        assert!(err.is_cyclic_graph());

        let err: BindError = HierarchyError::Cycle {
            child: ItemId::from("a"),
            parent: ItemId::from("b"),
        }
        .into();
        assert!(err.is_inconsistent_hierarchy());
    }

    #[test]
    fn test_bind_error_store() {
        let err: BindError = StoreError::UnsupportedStoreKind {
            kind: "flat".to_string(),
        }
        .into();
        assert!(err.is_store());
        assert!(format!("{err}").contains("flat"));
    }
}
