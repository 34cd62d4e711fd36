use super::{hooks, Migrator};
use crate::copier::DocumentCopier;
use crate::error::Result;
use crate::model::kinds::{self, fields};
use crate::model::{Document, DocumentKind};
use crate::scope::{ContextId, IdScope, TranslationContext};
use tracing::debug;

/// Groups and abstractions are nodes: they draw from the module counter.
pub(crate) fn pipeline_scope() -> IdScope {
    IdScope::new()
        .with_alias(kinds::GROUP, kinds::MODULE)
        .with_alias(kinds::ABSTRACTION, kinds::MODULE)
}

impl Migrator {
    /// Translate a pipeline on `node`.
    ///
    /// With `inherit_from`, the hooks of that node are visible for the extent
    /// of this call, which is how recursive hooks reach every depth.
    pub(crate) fn pipeline_in(
        &self,
        source: &Document,
        contexts: &mut TranslationContext,
        node: ContextId,
        inherit_from: Option<ContextId>,
    ) -> Result<Document> {
        source.expect_kind(DocumentKind::Pipeline)?;
        let location = contexts.describe(node);
        let mut contexts = contexts.local_translators(node);
        if let Some(parent) = inherit_from {
            contexts.inherit_translators(node, parent);
        }
        contexts.add_translator(node, kinds::GROUP, fields::WORKFLOW, hooks::embedded_pipeline());

        let mut scope = pipeline_scope();
        let updated = self.run_structural_update(
            DocumentKind::Pipeline,
            &source.root,
            &mut contexts,
            node,
            &mut scope,
        )?;
        let root = DocumentCopier::new(&mut scope, contexts.remap_mut(node))
            .with_location(&location)
            .with_kind_renames(self.updaters.kind_renames(DocumentKind::Pipeline))
            .copy(&updated)?;

        debug!(
            context = %location,
            modules = root.count_kind(kinds::MODULE),
            "Translated pipeline"
        );
        Ok(self.stamp(DocumentKind::Pipeline, root))
    }
}
