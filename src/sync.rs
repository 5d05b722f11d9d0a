//! Tree overlay kept in step with a flat store.
//!
//! A [`HierarchicalSynchronizer`] owns one flat store and a [`Hierarchy`]
//! overlay. With a [`ChildResolver`] configured, the overlay is derived: every
//! change to the store's record set triggers a full rebuild from the beans
//! held in the back-reference property. Without one, the overlay is plain
//! state set through [`HierarchicalSynchronizer::set_parent`] and friends,
//! and store changes only prune relations of vanished items.
//!
//! Rebuilds never happen behind the caller's back: they run from
//! [`HierarchicalSynchronizer::sync`] or at the end of
//! [`HierarchicalSynchronizer::with_store_mut`]. A rebuild computes a fresh
//! overlay, validates it, and only then swaps it in.

use std::fmt;

use tracing::trace;

use crate::bean::BeanRef;
use crate::error::{BindResult, HierarchyError};
use crate::populate::DEFAULT_BACK_REFERENCE;
use crate::store::{Hierarchy, ItemId, RecordStore, StoreError};
use crate::value::Value;

/// Maps a bean to the ids of its children. Supplied by the application.
pub trait ChildResolver: Send + Sync {
    /// Ids of `bean`'s direct children, in display order.
    fn child_ids(&self, bean: &BeanRef) -> Vec<ItemId>;
}

impl<F> ChildResolver for F
where
    F: Fn(&BeanRef) -> Vec<ItemId> + Send + Sync,
{
    fn child_ids(&self, bean: &BeanRef) -> Vec<ItemId> {
        self(bean)
    }
}

/// Flat store plus tree overlay.
pub struct HierarchicalSynchronizer {
    store: Box<dyn RecordStore>,
    overlay: Hierarchy,
    resolver: Option<Box<dyn ChildResolver>>,
    back_reference: String,
    synced_revision: Option<u64>,
}

impl fmt::Debug for HierarchicalSynchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HierarchicalSynchronizer")
            .field("store", &self.store.kind_name())
            .field("overlay", &self.overlay)
            .field("has_resolver", &self.resolver.is_some())
            .field("back_reference", &self.back_reference)
            .field("synced_revision", &self.synced_revision)
            .finish()
    }
}

impl HierarchicalSynchronizer {
    /// Wraps a store with an empty pass-through overlay.
    pub fn new(store: impl RecordStore + 'static) -> Self {
        Self::from_boxed(Box::new(store))
    }

    /// Like [`Self::new`], for an already boxed store.
    #[must_use]
    pub fn from_boxed(store: Box<dyn RecordStore>) -> Self {
        Self {
            store,
            overlay: Hierarchy::new(),
            resolver: None,
            back_reference: DEFAULT_BACK_REFERENCE.to_string(),
            synced_revision: None,
        }
    }

    /// Derives the overlay from `resolver` from now on. Call [`Self::sync`]
    /// to build it.
    #[must_use]
    pub fn with_resolver(mut self, resolver: impl ChildResolver + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self.synced_revision = None;
        self
    }

    /// Property the beans are read from. Blank falls back to `bean`.
    #[must_use]
    pub fn with_back_reference(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.back_reference = if name.trim().is_empty() {
            DEFAULT_BACK_REFERENCE.to_string()
        } else {
            name.trim().to_string()
        };
        self
    }

    /// The wrapped store.
    #[must_use]
    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// The current overlay.
    #[must_use]
    pub const fn hierarchy(&self) -> &Hierarchy {
        &self.overlay
    }

    /// Unwraps the store, dropping the overlay.
    #[must_use]
    pub fn into_store(self) -> Box<dyn RecordStore> {
        self.store
    }

    /// Returns true if the store changed since the last successful sync.
    #[must_use]
    pub fn needs_sync(&self) -> bool {
        self.synced_revision != Some(self.store.revision())
    }

    /// Brings the overlay in line with the store.
    ///
    /// With a resolver, rebuilds it from scratch; without one, drops
    /// relations that mention items no longer in the store.
    ///
    /// # Errors
    /// - `MissingBackReference` for a record without a bean
    /// - `UnknownChild`, `ConflictingParents` or `Cycle` when the resolver's
    ///   answers do not form a tree over the store's items
    ///
    /// On error the previous overlay is kept, minus relations of vanished
    /// items.
    pub fn sync(&mut self) -> BindResult<()> {
        let revision = self.store.revision();
        let Some(resolver) = self.resolver.as_deref() else {
            let store = &self.store;
            self.overlay.retain_ids(|id| store.contains_id(id));
            self.synced_revision = Some(revision);
            return Ok(());
        };

        match rebuild(self.store.as_ref(), resolver, &self.back_reference) {
            Ok(overlay) => {
                trace!(
                    store = self.store.kind_name(),
                    revision,
                    relations = overlay.len(),
                    "rebuilt hierarchy"
                );
                self.overlay = overlay;
                self.synced_revision = Some(revision);
                Ok(())
            }
            Err(e) => {
                let store = &self.store;
                self.overlay.retain_ids(|id| store.contains_id(id));
                Err(e)
            }
        }
    }

    /// Runs `mutate` against the store, then syncs if the record set changed.
    ///
    /// # Errors
    /// Any error of [`Self::sync`].
    pub fn with_store_mut<R, F>(&mut self, mutate: F) -> BindResult<R>
    where
        F: FnOnce(&mut dyn RecordStore) -> R,
    {
        let before = self.store.revision();
        let result = mutate(self.store.as_mut());
        if self.store.revision() != before || self.synced_revision.is_none() {
            self.sync()?;
        }
        Ok(result)
    }

    /// Adds an item whose back-reference holds `bean`.
    ///
    /// # Errors
    /// `DuplicateItem`, a missing or mistyped back-reference property, or a
    /// sync failure.
    pub fn add_bean(&mut self, id: impl Into<ItemId>, bean: BeanRef) -> BindResult<()> {
        let id = id.into();
        let property = self.back_reference.clone();
        self.with_store_mut(|store| -> Result<(), StoreError> {
            store.add_item(id.clone())?;
            if let Err(e) = store.set_value(&id, &property, Value::Bean(bean)) {
                store.remove_item(&id);
                return Err(e);
            }
            Ok(())
        })??;
        Ok(())
    }

    /// Removes an item. Returns false if it was not present.
    pub fn remove_item(&mut self, id: &ItemId) -> BindResult<bool> {
        self.with_store_mut(|store| store.remove_item(id))
    }

    /// Empties the store and, after the resync, the overlay.
    pub fn remove_all_items(&mut self) -> BindResult<()> {
        self.with_store_mut(|store| store.remove_all_items())
    }

    fn require(&self, id: &ItemId) -> Result<(), HierarchyError> {
        if self.store.contains_id(id) {
            Ok(())
        } else {
            Err(HierarchyError::UnknownItem { id: id.clone() })
        }
    }

    /// Sets or clears a parent directly on the overlay.
    ///
    /// With a resolver the change lasts until the next rebuild.
    pub fn set_parent(&mut self, child: &ItemId, parent: Option<&ItemId>) -> BindResult<()> {
        self.require(child)?;
        if let Some(parent) = parent {
            self.require(parent)?;
        }
        self.overlay.set_parent(child, parent)?;
        Ok(())
    }

    /// Marks whether an item may have children.
    ///
    /// # Errors
    /// `UnknownItem` for ids not in the store, `HasChildren` when disallowing
    /// children on an item that has some.
    pub fn set_children_allowed(&mut self, id: &ItemId, allowed: bool) -> BindResult<()> {
        self.require(id)?;
        self.overlay.set_children_allowed(id, allowed)?;
        Ok(())
    }

    /// Children of `id` in the overlay.
    #[must_use]
    pub fn children(&self, id: &ItemId) -> Vec<ItemId> {
        self.overlay.children(id).to_vec()
    }

    /// Parent of `id` in the overlay.
    #[must_use]
    pub fn parent(&self, id: &ItemId) -> Option<ItemId> {
        self.overlay.parent(id).cloned()
    }

    /// Returns true if `id` has at least one child.
    #[must_use]
    pub fn has_children(&self, id: &ItemId) -> bool {
        self.overlay.has_children(id)
    }

    /// Returns true if `id` is in the store and may have children.
    #[must_use]
    pub fn are_children_allowed(&self, id: &ItemId) -> bool {
        self.store.contains_id(id) && self.overlay.are_children_allowed(id)
    }

    /// Returns true if `id` is in the store and has no parent.
    #[must_use]
    pub fn is_root(&self, id: &ItemId) -> bool {
        self.store.contains_id(id) && self.overlay.parent(id).is_none()
    }

    /// Items without a parent, in store order.
    #[must_use]
    pub fn root_item_ids(&self) -> Vec<ItemId> {
        self.store
            .all_item_ids()
            .into_iter()
            .filter(|id| self.overlay.parent(id).is_none())
            .collect()
    }
}

fn rebuild(
    store: &dyn RecordStore,
    resolver: &dyn ChildResolver,
    back_reference: &str,
) -> BindResult<Hierarchy> {
    let ids = store.all_item_ids();
    let mut edges = Vec::new();
    for id in &ids {
        let bean = match store.value(id, back_reference) {
            Ok(Value::Bean(bean)) => bean,
            _ => {
                return Err(HierarchyError::MissingBackReference {
                    id: id.clone(),
                    property: back_reference.to_string(),
                }
                .into())
            }
        };
        let children = resolver.child_ids(bean);
        if !children.is_empty() {
            edges.push((id.clone(), children));
        }
    }
    let overlay = Hierarchy::from_edges(&ids, edges)?;
    overlay.validate(|id| store.contains_id(id))?;
    Ok(overlay)
}
