//! Per-algorithm metadata memoization.
//!
//! Each algorithm instance owns one cache keyed by descriptor identity, so
//! several descriptors built for one Rust type never share an entry. A
//! descriptor never changes, so entries are never invalidated. This is scoped state
//! owned by the algorithm, not a process-wide registry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::bean::BeanType;
use crate::error::BindResult;

use super::PropertyMetadata;

#[derive(Debug, Default)]
pub(crate) struct MetadataCache {
    entries: RwLock<HashMap<u64, Arc<[PropertyMetadata]>>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached metadata for `bean_type`, computing it on a miss.
    ///
    /// Failures are not cached. A poisoned lock only disables memoization.
    pub fn get_or_try_insert<F>(
        &self,
        bean_type: &BeanType,
        compute: F,
    ) -> BindResult<Vec<PropertyMetadata>>
    where
        F: FnOnce() -> BindResult<Vec<PropertyMetadata>>,
    {
        let key = bean_type.id();
        if let Ok(entries) = self.entries.read() {
            if let Some(hit) = entries.get(&key) {
                return Ok(hit.to_vec());
            }
        }

        let computed = compute()?;
        debug!(
            bean_type = bean_type.name(),
            properties = computed.len(),
            "resolved property metadata"
        );
        if let Ok(mut entries) = self.entries.write() {
            entries
                .entry(key)
                .or_insert_with(|| Arc::from(computed.clone()));
        }
        Ok(computed)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or_default()
    }
}
