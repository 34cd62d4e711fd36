use super::{fixups, hooks, Migrator};
use crate::copier::DocumentCopier;
use crate::error::Result;
use crate::model::kinds::{self, fields};
use crate::model::{Document, DocumentKind};
use crate::scope::{ContextId, IdScope, TranslationContext};
use tracing::debug;

/// Operations share one counter, as do the node kinds.
pub(crate) fn history_scope() -> IdScope {
    IdScope::new()
        .with_alias(kinds::ADD, kinds::OPERATION)
        .with_alias(kinds::CHANGE, kinds::OPERATION)
        .with_alias(kinds::DELETE, kinds::OPERATION)
        .with_alias(kinds::GROUP, kinds::MODULE)
        .with_alias(kinds::ABSTRACTION, kinds::MODULE)
}

impl Migrator {
    /// Translate a history document on `node`.
    pub(crate) fn history_in(
        &self,
        source: &Document,
        contexts: &mut TranslationContext,
        node: ContextId,
    ) -> Result<Document> {
        source.expect_kind(DocumentKind::History)?;
        let location = contexts.describe(node);
        let mut contexts = contexts.local_translators(node);

        if !contexts.remap(node).contains(kinds::ACTION, 0) {
            contexts
                .remap_mut(node)
                .insert(kinds::ACTION, 0, self.config.root_version);
        }

        let repaired = fixups::repair_sub_ids(&source.root, self.config.sub_id_policy)?;

        contexts.add_translator(node, kinds::GROUP, fields::WORKFLOW, hooks::embedded_pipeline());
        contexts.add_translator(node, kinds::ACTION, fields::SESSION, hooks::session_memo());
        if !contexts.has_translator(node, kinds::ABSTRACTION, fields::INTERNAL_VERSION) {
            contexts.add_translator(
                node,
                kinds::ABSTRACTION,
                fields::INTERNAL_VERSION,
                hooks::fallback_internal_version(node),
            );
        }

        let mut scope = history_scope();
        let updated = self.run_structural_update(
            DocumentKind::History,
            &repaired,
            &mut contexts,
            node,
            &mut scope,
        )?;
        let mut root = DocumentCopier::new(&mut scope, contexts.remap_mut(node))
            .with_location(&location)
            .with_kind_renames(self.updaters.kind_renames(DocumentKind::History))
            .with_positions(kinds::ACTION, fields::OPERATIONS)
            .copy(&updated)?;

        fixups::rewrite_upgrade_annotations(
            &mut root,
            contexts.remap(node),
            &self.config.upgrade_annotation_key,
        )?;
        fixups::restore_variable_ids(&mut root, contexts.remap_mut(node));

        debug!(
            context = %location,
            actions = root.count_kind(kinds::ACTION),
            remap_size = contexts.remap(node).len(),
            "Translated history"
        );
        Ok(self.stamp(DocumentKind::History, root))
    }
}
