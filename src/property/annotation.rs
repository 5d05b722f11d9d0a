//! Schema-declaration reader algorithm.

use std::collections::HashSet;

use crate::bean::{BeanType, ViewLabel};
use crate::error::{BindResult, SchemaError, ValidationError};
use crate::path::NestedPathResolver;

use super::{MetadataCache, PropertyMetadata, PropertyReaderAlgorithm};

/// Reads the properties a type's schema declaration assigns to one view.
///
/// The schema is looked up on the type, then on each ancestor in turn; source
/// paths are always resolved against the type that was asked for.
#[derive(Debug)]
pub struct AnnotationReaderAlgorithm {
    label: ViewLabel,
    cache: MetadataCache,
}

impl AnnotationReaderAlgorithm {
    /// Creates an algorithm for the given view.
    ///
    /// # Errors
    /// `InvalidArgument` if the label is blank.
    pub fn new(label: impl Into<ViewLabel>) -> BindResult<Self> {
        let label = label.into();
        if label.as_str().trim().is_empty() {
            return Err(ValidationError::invalid("label", "cannot be blank").into());
        }
        Ok(Self {
            label,
            cache: MetadataCache::new(),
        })
    }

    /// The view this algorithm selects.
    #[must_use]
    pub const fn label(&self) -> &ViewLabel {
        &self.label
    }

    fn compute(&self, bean_type: &BeanType) -> BindResult<Vec<PropertyMetadata>> {
        let schema = bean_type
            .lineage()
            .find_map(BeanType::schema)
            .ok_or_else(|| SchemaError::NotAnnotated {
                type_name: bean_type.name().to_string(),
            })?;

        let mut seen = HashSet::new();
        let mut metadata = Vec::new();
        for declaration in schema
            .properties
            .iter()
            .filter(|p| p.in_view(&self.label))
        {
            if !seen.insert(declaration.name.as_str()) {
                return Err(SchemaError::DuplicateProperty {
                    name: declaration.name.clone(),
                    label: self.label.to_string(),
                }
                .into());
            }
            let path = NestedPathResolver::resolve(bean_type, declaration.source_attribute())?;
            metadata.push(PropertyMetadata::from_path(declaration.name.clone(), path));
        }
        Ok(metadata)
    }
}

impl PropertyReaderAlgorithm for AnnotationReaderAlgorithm {
    fn properties(&self, bean_type: &BeanType) -> BindResult<Vec<PropertyMetadata>> {
        self.cache
            .get_or_try_insert(bean_type, || self.compute(bean_type))
    }
}
