//! Parent/child overlay over a flat record set.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::HierarchyError;

use super::ItemId;

/// Tree relation layered on top of a store's ids.
///
/// The overlay only records relations; which ids exist is the store's
/// business. Items are allowed to have children unless explicitly
/// disallowed. Invariants maintained by the mutating methods:
/// - the parent relation is acyclic
/// - an item with children allows children
/// - `children(p)` lists exactly the items whose parent is `p`, in
///   insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hierarchy {
    parents: BTreeMap<ItemId, ItemId>,
    children: BTreeMap<ItemId, Vec<ItemId>>,
    no_children: BTreeSet<ItemId>,
}

impl Hierarchy {
    /// An empty overlay: every item is a root that allows children.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an overlay from parent → children claims.
    ///
    /// Every id in `ids` that ends up without children has children
    /// disallowed; parents have them allowed.
    ///
    /// # Errors
    /// `ConflictingParents` when two parents claim the same child.
    pub fn from_edges<'a, I, E>(ids: I, edges: E) -> Result<Self, HierarchyError>
    where
        I: IntoIterator<Item = &'a ItemId>,
        E: IntoIterator<Item = (ItemId, Vec<ItemId>)>,
    {
        let mut hierarchy = Self::new();
        for (parent, kids) in edges {
            for child in kids {
                if let Some(first) = hierarchy.parents.get(&child) {
                    if *first != parent {
                        return Err(HierarchyError::ConflictingParents {
                            child,
                            first: first.clone(),
                            second: parent,
                        });
                    }
                    continue;
                }
                hierarchy.parents.insert(child.clone(), parent.clone());
                hierarchy.children.entry(parent.clone()).or_default().push(child);
            }
        }
        for id in ids {
            if !hierarchy.has_children(id) {
                hierarchy.no_children.insert(id.clone());
            }
        }
        Ok(hierarchy)
    }

    /// Parent of `id`, if it has one.
    #[must_use]
    pub fn parent(&self, id: &ItemId) -> Option<&ItemId> {
        self.parents.get(id)
    }

    /// Children of `id`, in insertion order.
    #[must_use]
    pub fn children(&self, id: &ItemId) -> &[ItemId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns true if `id` has at least one child.
    #[must_use]
    pub fn has_children(&self, id: &ItemId) -> bool {
        self.children.get(id).is_some_and(|c| !c.is_empty())
    }

    /// Returns false only for ids explicitly marked childless.
    #[must_use]
    pub fn are_children_allowed(&self, id: &ItemId) -> bool {
        !self.no_children.contains(id)
    }

    /// The child → parent map.
    #[must_use]
    pub const fn parent_map(&self) -> &BTreeMap<ItemId, ItemId> {
        &self.parents
    }

    /// Ids with children explicitly disallowed.
    #[must_use]
    pub const fn disallowed(&self) -> &BTreeSet<ItemId> {
        &self.no_children
    }

    /// Number of parent relations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Returns true if the overlay records nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty() && self.no_children.is_empty()
    }

    fn detach(&mut self, child: &ItemId) {
        if let Some(old) = self.parents.remove(child) {
            if let Some(siblings) = self.children.get_mut(&old) {
                siblings.retain(|c| c != child);
                if siblings.is_empty() {
                    self.children.remove(&old);
                }
            }
        }
    }

    /// Sets or clears the parent of `child`.
    ///
    /// # Errors
    /// - `ChildrenNotAllowed` if the new parent disallows children
    /// - `Cycle` if `child` is the new parent or one of its ancestors
    pub fn set_parent(
        &mut self,
        child: &ItemId,
        parent: Option<&ItemId>,
    ) -> Result<(), HierarchyError> {
        let Some(parent) = parent else {
            self.detach(child);
            return Ok(());
        };
        if !self.are_children_allowed(parent) {
            return Err(HierarchyError::ChildrenNotAllowed {
                parent: parent.clone(),
            });
        }
        let mut cursor = Some(parent);
        while let Some(ancestor) = cursor {
            if ancestor == child {
                return Err(HierarchyError::Cycle {
                    child: child.clone(),
                    parent: parent.clone(),
                });
            }
            cursor = self.parents.get(ancestor);
        }
        if self.parents.get(child) == Some(parent) {
            return Ok(());
        }
        self.detach(child);
        self.parents.insert(child.clone(), parent.clone());
        self.children
            .entry(parent.clone())
            .or_default()
            .push(child.clone());
        Ok(())
    }

    /// # Errors
    /// `HasChildren` when disallowing children of an item that has some.
    pub fn set_children_allowed(
        &mut self,
        id: &ItemId,
        allowed: bool,
    ) -> Result<(), HierarchyError> {
        if allowed {
            self.no_children.remove(id);
            return Ok(());
        }
        if self.has_children(id) {
            return Err(HierarchyError::HasChildren { id: id.clone() });
        }
        self.no_children.insert(id.clone());
        Ok(())
    }

    /// Forgets an item; its children become roots.
    pub fn remove(&mut self, id: &ItemId) {
        self.detach(id);
        if let Some(orphans) = self.children.remove(id) {
            for orphan in orphans {
                self.parents.remove(&orphan);
            }
        }
        self.no_children.remove(id);
    }

    /// Drops every relation mentioning an id for which `keep` is false.
    pub fn retain_ids<F>(&mut self, keep: F)
    where
        F: Fn(&ItemId) -> bool,
    {
        let gone: Vec<ItemId> = self
            .parents
            .iter()
            .flat_map(|(child, parent)| [child, parent])
            .chain(self.no_children.iter())
            .filter(|id| !keep(id))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        for id in &gone {
            self.remove(id);
        }
    }

    /// Drops every relation and flag.
    pub fn clear(&mut self) {
        self.parents.clear();
        self.children.clear();
        self.no_children.clear();
    }

    /// Checks the overlay against the ids `exists` accepts.
    ///
    /// # Errors
    /// - `UnknownChild` for a relation naming an id that does not exist
    /// - `ChildrenNotAllowed` for a parent that disallows children
    /// - `Cycle` for a parent chain that loops
    pub fn validate<F>(&self, exists: F) -> Result<(), HierarchyError>
    where
        F: Fn(&ItemId) -> bool,
    {
        for (child, parent) in &self.parents {
            if !exists(parent) || !exists(child) {
                return Err(HierarchyError::UnknownChild {
                    parent: parent.clone(),
                    child: child.clone(),
                });
            }
            if !self.are_children_allowed(parent) {
                return Err(HierarchyError::ChildrenNotAllowed {
                    parent: parent.clone(),
                });
            }
        }

        let mut acyclic: HashSet<&ItemId> = HashSet::new();
        for start in self.parents.keys() {
            let mut path: HashSet<&ItemId> = HashSet::new();
            let mut cursor = start;
            loop {
                if acyclic.contains(cursor) {
                    break;
                }
                if !path.insert(cursor) {
                    return Err(HierarchyError::Cycle {
                        child: start.clone(),
                        parent: self.parents.get(start).cloned().unwrap_or_else(|| start.clone()),
                    });
                }
                match self.parents.get(cursor) {
                    Some(next) => cursor = next,
                    None => break,
                }
            }
            acyclic.extend(path);
        }
        Ok(())
    }
}
