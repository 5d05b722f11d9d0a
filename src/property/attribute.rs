//! Field-based reader algorithm.

use std::collections::HashSet;

use crate::bean::BeanType;
use crate::error::BindResult;
use crate::path::NestedPathResolver;

use super::{MetadataCache, PropertyMetadata, PropertyReaderAlgorithm};

/// Attributes ignored unless configured otherwise: the conventional
/// serialization version marker, which carries no data.
pub const DEFAULT_IGNORED_ATTRIBUTES: &[&str] = &["serialVersionUID"];

/// Enumerates declared fields, most derived type first.
///
/// A field shadowing an ancestor's field of the same name is reported once,
/// for the most derived declaration.
#[derive(Debug)]
pub struct AttributeReaderAlgorithm {
    ignored: HashSet<String>,
    with_super: bool,
    cache: MetadataCache,
}

impl Default for AttributeReaderAlgorithm {
    fn default() -> Self {
        Self {
            ignored: DEFAULT_IGNORED_ATTRIBUTES
                .iter()
                .map(ToString::to_string)
                .collect(),
            with_super: true,
            cache: MetadataCache::new(),
        }
    }
}

impl AttributeReaderAlgorithm {
    /// Default ignore set, inherited fields included.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the ignore set.
    #[must_use]
    pub fn ignoring<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Whether ancestor fields are included.
    #[must_use]
    pub fn with_super(mut self, with_super: bool) -> Self {
        self.with_super = with_super;
        self
    }

    fn compute(&self, bean_type: &BeanType) -> BindResult<Vec<PropertyMetadata>> {
        let depth = if self.with_super { usize::MAX } else { 1 };
        let mut seen = HashSet::new();
        let mut metadata = Vec::new();
        for ty in bean_type.lineage().take(depth) {
            for field in ty.declared_fields() {
                let name = field.name();
                if self.ignored.contains(name) || !seen.insert(name.to_string()) {
                    continue;
                }
                let path = NestedPathResolver::resolve(bean_type, name)?;
                metadata.push(PropertyMetadata::from_path(name, path));
            }
        }
        Ok(metadata)
    }
}

impl PropertyReaderAlgorithm for AttributeReaderAlgorithm {
    fn properties(&self, bean_type: &BeanType) -> BindResult<Vec<PropertyMetadata>> {
        self.cache
            .get_or_try_insert(bean_type, || self.compute(bean_type))
    }
}
