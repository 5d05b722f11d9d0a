//! Property metadata and the reader algorithms that derive it.
//!
//! A [`PropertyReaderAlgorithm`] turns a bean type into an ordered list of
//! [`PropertyMetadata`]. Three strategies are provided:
//!
//! - [`AttributeReaderAlgorithm`]: declared fields (optionally inherited ones)
//! - [`GetterReaderAlgorithm`]: public zero-argument `getX` methods
//! - [`AnnotationReaderAlgorithm`]: the type's schema declaration, filtered by view
//!
//! Every metadata entry carries an accessor resolved when the schema is built,
//! so populating records never re-resolves paths or methods per read.

mod annotation;
mod attribute;
mod cache;
mod generated;
mod getter;

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::bean::{BeanRef, BeanType, ReadFn};
use crate::error::{BindResult, SchemaError};
use crate::path::ResolvedPath;
use crate::value::{DataType, Value};

pub use annotation::AnnotationReaderAlgorithm;
pub use attribute::{AttributeReaderAlgorithm, DEFAULT_IGNORED_ATTRIBUTES};
pub use generated::{date_from_text, GeneratedProperty, GeneratorFn};
pub use getter::GetterReaderAlgorithm;

pub(crate) use cache::MetadataCache;

/// Strategy converting a bean type into an ordered property schema.
///
/// Implementations must be deterministic; memoization is their only allowed
/// side effect.
pub trait PropertyReaderAlgorithm: Send + Sync {
    /// Resolves the properties of `bean_type`.
    fn properties(&self, bean_type: &BeanType) -> BindResult<Vec<PropertyMetadata>>;
}

/// How a property value is obtained from a bean.
#[derive(Clone)]
pub enum PropertyAccessor {
    /// A resolved dotted field path.
    Path(Arc<ResolvedPath>),
    /// A zero-argument method declared on `owner`.
    ///
    /// Beans of a subtype are projected onto `owner` before the call.
    Method {
        /// Name of the declaring type.
        owner: String,
        /// Rust type of the declaring type.
        owner_type: TypeId,
        /// The registered accessor.
        invoke: ReadFn,
    },
    /// A computed value.
    Generated(GeneratorFn),
}

impl PropertyAccessor {
    /// Evaluates the accessor against a bean.
    pub fn read(&self, bean: &BeanRef) -> BindResult<Value> {
        match self {
            Self::Path(path) => path.read(bean),
            Self::Method {
                owner,
                owner_type,
                invoke,
            } => bean
                .bean_type()
                .view_as(bean.instance(), *owner_type)
                .and_then(|view| invoke(view))
                .ok_or_else(|| {
                    SchemaError::TypeMismatch {
                        expected: owner.clone(),
                        actual: bean.bean_type().name().to_string(),
                    }
                    .into()
                }),
            Self::Generated(generate) => generate(bean),
        }
    }
}

impl fmt::Debug for PropertyAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "Path({})", path.path()),
            Self::Method { owner, .. } => write!(f, "Method({owner})"),
            Self::Generated(_) => write!(f, "Generated"),
        }
    }
}

/// Immutable descriptor of one resolvable property.
#[derive(Clone)]
pub struct PropertyMetadata {
    name: String,
    data_type: DataType,
    default_value: Option<Value>,
    source_attribute: String,
    accessor: PropertyAccessor,
}

impl PropertyMetadata {
    /// Creates metadata whose source attribute is the property name.
    pub fn new(name: impl Into<String>, data_type: DataType, accessor: PropertyAccessor) -> Self {
        let name = name.into();
        Self {
            source_attribute: name.clone(),
            name,
            data_type,
            default_value: None,
            accessor,
        }
    }

    /// Metadata reading through a resolved path; the path is the source attribute.
    #[must_use]
    pub fn from_path(name: impl Into<String>, path: ResolvedPath) -> Self {
        Self {
            name: name.into(),
            data_type: path.data_type().clone(),
            default_value: None,
            source_attribute: path.path().to_string(),
            accessor: PropertyAccessor::Path(Arc::new(path)),
        }
    }

    /// Overrides the reported source attribute.
    #[must_use]
    pub fn with_source_attribute(mut self, source: impl Into<String>) -> Self {
        self.source_attribute = source.into();
        self
    }

    /// Sets the value used for records that never set this property.
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Property name in the store.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type of the values.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Default value, if any.
    #[must_use]
    pub const fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    /// Dotted path (or method suffix) the value comes from.
    #[must_use]
    pub fn source_attribute(&self) -> &str {
        &self.source_attribute
    }

    /// How values are obtained.
    #[must_use]
    pub const fn accessor(&self) -> &PropertyAccessor {
        &self.accessor
    }

    /// Reads this property from a bean.
    pub fn read(&self, bean: &BeanRef) -> BindResult<Value> {
        self.accessor.read(bean)
    }
}

impl PartialEq for PropertyMetadata {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.data_type == other.data_type
            && self.default_value == other.default_value
            && self.source_attribute == other.source_attribute
    }
}

impl fmt::Debug for PropertyMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMetadata")
            .field("name", &self.name)
            .field("data_type", &self.data_type)
            .field("default_value", &self.default_value)
            .field("source_attribute", &self.source_attribute)
            .field("accessor", &self.accessor)
            .finish()
    }
}
