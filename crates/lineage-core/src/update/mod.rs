//! Structural updaters.
//!
//! A structural updater maps a source-version entity graph onto the target
//! schema, deferring to translator hooks for any (kind, field) pair the active
//! hook table overrides. What changes between two versions is data (see
//! [`mapping`]); the engine only supplies hooks and document-kind dispatch.

pub mod mapping;
mod updater;

pub use mapping::{KindMapping, MappingSet, SplitRule, VersionMapping};
pub use updater::MappingUpdater;

use crate::error::{MigrationError, Result};
use crate::model::{DocumentKind, Entity};
use crate::scope::{ContextId, HookKey, IdScope, TranslationContext, Translator};
use crate::translate::Migrator;
use std::collections::BTreeMap;

/// What a translator hook gets to work with.
pub struct HookCx<'a> {
    /// The migrator, for recursive translation of embedded documents.
    pub migrator: &'a Migrator,
    /// The context tree of the current top-level call.
    pub contexts: &'a mut TranslationContext,
    /// Context node whose hook table is active.
    pub node: ContextId,
    /// Id scope of the target document being built.
    pub scope: &'a mut IdScope,
}

impl HookCx<'_> {
    /// The active hook for (kind, field), if any.
    pub fn translator(&self, kind: &str, field: &str) -> Option<Translator> {
        self.contexts.translator(self.node, kind, field)
    }
}

/// Maps one document kind across one adjacent version pair.
pub trait StructuralUpdater {
    /// Document kind this updater handles.
    fn document_kind(&self) -> DocumentKind;

    /// Check whether a hook key names a (kind, field) pair this updater knows.
    fn recognizes(&self, key: &HookKey) -> bool;

    /// Produce the target-version graph of `source`.
    ///
    /// The result still bears source ids, and references still name source
    /// kinds; the copier assigns final ones. A renamed entity records its
    /// source kind in [`Entity::source_kind`].
    fn update(&self, source: &Entity, cx: &mut HookCx<'_>) -> Result<Entity>;

    /// Source kind to target kind for kinds renamed unconditionally.
    ///
    /// Used for references whose target is not part of the copied graph.
    fn kind_renames(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

/// One structural updater per document kind.
#[derive(Default)]
pub struct UpdaterSet {
    updaters: BTreeMap<DocumentKind, Box<dyn StructuralUpdater>>,
}

impl UpdaterSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an updater, replacing any for the same document kind.
    pub fn with_updater(mut self, updater: impl StructuralUpdater + 'static) -> Self {
        self.updaters
            .insert(updater.document_kind(), Box::new(updater));
        self
    }

    /// Updater for a document kind.
    pub fn get(&self, kind: DocumentKind) -> Result<&dyn StructuralUpdater> {
        self.updaters
            .get(&kind)
            .map(|u| u.as_ref())
            .ok_or(MigrationError::MissingUpdater { kind })
    }

    /// Check whether any updater recognizes a hook key.
    pub fn recognizes(&self, key: &HookKey) -> bool {
        self.updaters.values().any(|u| u.recognizes(key))
    }

    /// Kind renames of the updater for a document kind; empty without one.
    pub fn kind_renames(&self, kind: DocumentKind) -> BTreeMap<String, String> {
        self.updaters
            .get(&kind)
            .map(|u| u.kind_renames())
            .unwrap_or_default()
    }

    /// Document kinds covered.
    pub fn kinds(&self) -> impl Iterator<Item = DocumentKind> + '_ {
        self.updaters.keys().copied()
    }
}

impl From<MappingSet> for UpdaterSet {
    fn from(set: MappingSet) -> Self {
        set.documents
            .into_iter()
            .fold(UpdaterSet::new(), |updaters, mapping| {
                updaters.with_updater(MappingUpdater::new(mapping))
            })
    }
}

impl std::fmt::Debug for UpdaterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdaterSet")
            .field("kinds", &self.updaters.keys().collect::<Vec<_>>())
            .finish()
    }
}
