//! Log, registry, mashup and startup translators.
//!
//! None of these embed other documents; they are an update and a copy in
//! their own id scope.

use super::Migrator;
use crate::copier::{settle_kinds, DocumentCopier};
use crate::error::Result;
use crate::model::kinds;
use crate::model::{Document, DocumentKind};
use crate::scope::{ContextId, IdScope, TranslationContext};
use tracing::debug;

/// Every kind of log item draws from one counter.
pub(crate) fn log_scope() -> IdScope {
    IdScope::new()
        .with_alias(kinds::MODULE_EXEC, kinds::ITEM_EXEC)
        .with_alias(kinds::GROUP_EXEC, kinds::ITEM_EXEC)
        .with_alias(kinds::LOOP_EXEC, kinds::ITEM_EXEC)
}

impl Migrator {
    pub(crate) fn log_in(
        &self,
        source: &Document,
        contexts: &mut TranslationContext,
        node: ContextId,
    ) -> Result<Document> {
        self.copy_in(DocumentKind::Log, source, contexts, node, log_scope())
    }

    pub(crate) fn registry_in(
        &self,
        source: &Document,
        contexts: &mut TranslationContext,
        node: ContextId,
    ) -> Result<Document> {
        self.copy_in(DocumentKind::Registry, source, contexts, node, IdScope::new())
    }

    pub(crate) fn mashup_in(
        &self,
        source: &Document,
        contexts: &mut TranslationContext,
        node: ContextId,
    ) -> Result<Document> {
        self.copy_in(DocumentKind::Mashup, source, contexts, node, IdScope::new())
    }

    /// Startup configurations only need the structural update.
    pub(crate) fn startup(&self, source: &Document) -> Result<Document> {
        source.expect_kind(DocumentKind::Startup)?;
        let mut contexts = TranslationContext::new();
        let root = contexts.root();
        let mut scope = IdScope::new();
        let mut updated = self.run_structural_update(
            DocumentKind::Startup,
            &source.root,
            &mut contexts,
            root,
            &mut scope,
        )?;
        settle_kinds(&mut updated, &self.updaters.kind_renames(DocumentKind::Startup));
        Ok(self.stamp(DocumentKind::Startup, updated))
    }

    fn copy_in(
        &self,
        kind: DocumentKind,
        source: &Document,
        contexts: &mut TranslationContext,
        node: ContextId,
        mut scope: IdScope,
    ) -> Result<Document> {
        source.expect_kind(kind)?;
        let location = contexts.describe(node);
        let mut contexts = contexts.local_translators(node);

        let updated = self.run_structural_update(kind, &source.root, &mut contexts, node, &mut scope)?;
        let root = DocumentCopier::new(&mut scope, contexts.remap_mut(node))
            .with_location(&location)
            .with_kind_renames(self.updaters.kind_renames(kind))
            .copy(&updated)?;

        debug!(
            context = %location,
            %kind,
            remap_size = contexts.remap(node).len(),
            "Translated document"
        );
        Ok(self.stamp(kind, root))
    }
}
