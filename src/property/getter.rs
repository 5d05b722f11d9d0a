//! Accessor-method reader algorithm.

use crate::bean::{BeanType, Visibility};
use crate::error::BindResult;

use super::{MetadataCache, PropertyAccessor, PropertyMetadata, PropertyReaderAlgorithm};

const GETTER_PREFIX: &str = "get";

/// Enumerates public, zero-argument `getX` methods declared on the type
/// itself. The property name is `X` as written.
#[derive(Debug, Default)]
pub struct GetterReaderAlgorithm {
    cache: MetadataCache,
}

impl GetterReaderAlgorithm {
    /// Creates the algorithm with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn compute(bean_type: &BeanType) -> Vec<PropertyMetadata> {
        let mut metadata: Vec<PropertyMetadata> = Vec::new();
        for method in bean_type.declared_methods() {
            if method.visibility() != Visibility::Public || method.arity() != 0 {
                continue;
            }
            let Some(suffix) = method.name().strip_prefix(GETTER_PREFIX) else {
                continue;
            };
            if suffix.is_empty() {
                continue;
            }
            let (Some(return_type), Some(invoke)) = (method.return_type(), method.invoker()) else {
                continue;
            };
            if metadata.iter().any(|m| m.name() == suffix) {
                continue;
            }
            metadata.push(PropertyMetadata::new(
                suffix,
                return_type.clone(),
                PropertyAccessor::Method {
                    owner: bean_type.name().to_string(),
                    owner_type: bean_type.type_id(),
                    invoke,
                },
            ));
        }
        metadata
    }
}

impl PropertyReaderAlgorithm for GetterReaderAlgorithm {
    fn properties(&self, bean_type: &BeanType) -> BindResult<Vec<PropertyMetadata>> {
        self.cache
            .get_or_try_insert(bean_type, || Ok(Self::compute(bean_type)))
    }
}
