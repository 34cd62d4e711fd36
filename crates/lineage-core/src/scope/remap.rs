//! Source-to-target id remap tables.

use crate::model::EntityRef;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Maps (kind, source id) to the id assigned in the target document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdRemap {
    entries: BTreeMap<EntityRef, i64>,
}

impl IdRemap {
    /// Create an empty remap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the target id of a source entity.
    pub fn get(&self, kind: &str, id: i64) -> Option<i64> {
        // BTreeMap lookups need an owned key of the same type.
        self.entries.get(&EntityRef::new(kind, id)).copied()
    }

    /// Look up by typed reference.
    pub fn get_ref(&self, key: &EntityRef) -> Option<i64> {
        self.entries.get(key).copied()
    }

    /// Check whether a source entity has been assigned.
    pub fn contains(&self, kind: &str, id: i64) -> bool {
        self.get(kind, id).is_some()
    }

    /// Record an assignment, returning the previous target if any.
    pub fn insert(&mut self, kind: impl Into<String>, id: i64, target: i64) -> Option<i64> {
        self.entries.insert(EntityRef::new(kind, id), target)
    }

    /// Record an assignment unless one exists; returns the effective target.
    pub fn get_or_insert_with(
        &mut self,
        kind: &str,
        id: i64,
        mint: impl FnOnce() -> i64,
    ) -> i64 {
        *self.entries.entry(EntityRef::new(kind, id)).or_insert_with(mint)
    }

    /// Number of assignments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate assignments in (kind, id) order.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityRef, i64)> {
        self.entries.iter().map(|(k, v)| (k, *v))
    }

    /// Iterate (source id, target id) pairs of one kind.
    pub fn entries_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = (i64, i64)> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k.kind == kind)
            .map(|(k, v)| (k.id, *v))
    }

    /// Copy of this remap without the given kinds.
    ///
    /// Used before sharing a remap with a sibling document so document-private
    /// ids never cross the document boundary.
    pub fn filtered(&self, exclude: &BTreeSet<String>) -> IdRemap {
        IdRemap {
            entries: self
                .entries
                .iter()
                .filter(|(k, _)| !exclude.contains(&k.kind))
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
        }
    }

    /// Drop the given kinds in place.
    pub fn retain_shared(&mut self, exclude: &BTreeSet<String>) {
        self.entries.retain(|k, _| !exclude.contains(&k.kind));
    }

    /// Merge another remap into this one; entries of `other` win.
    pub fn extend(&mut self, other: &IdRemap) {
        self.entries
            .extend(other.entries.iter().map(|(k, v)| (k.clone(), *v)));
    }

    /// Target-to-source view: (kind, target id) -> source id.
    pub fn inverse(&self) -> BTreeMap<EntityRef, i64> {
        self.entries
            .iter()
            .map(|(k, v)| (EntityRef::new(k.kind.clone(), *v), k.id))
            .collect()
    }

    /// Check that no two source ids of one kind share a target id.
    pub fn is_injective(&self) -> bool {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .all(|(k, v)| seen.insert((k.kind.as_str(), *v)))
    }
}

impl FromIterator<(EntityRef, i64)> for IdRemap {
    fn from_iter<T: IntoIterator<Item = (EntityRef, i64)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
