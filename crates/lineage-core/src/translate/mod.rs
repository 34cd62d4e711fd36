//! Per-document translators and the bundle composer.
//!
//! Every entry point follows the same shape:
//!
//! 1. obtain a [`TranslationContext`] (the caller's, or a fresh one);
//! 2. register the structural fix-ups and recursive hooks for the document
//!    kind, scoped so they disappear when the call returns;
//! 3. run the structural updater, then the [`DocumentCopier`];
//! 4. apply post-copy fix-ups that need final ids;
//! 5. stamp the target version.
//!
//! Translation never mutates its input. A failure leaves the source document
//! untouched, though an external context may hold partial assignments.
//!
//! [`DocumentCopier`]: crate::copier::DocumentCopier

mod bundle;
mod config;
mod fixups;
mod history;
mod hooks;
pub mod naming;
mod pipeline;
mod records;

pub use config::{MigrationConfig, SubIdPolicy, ROOT_VERSION, UPGRADE_ANNOTATION};
pub use naming::{parse_subpipeline_name, SubPipelineName};

use crate::error::{MigrationError, Result};
use crate::model::{Bundle, Document, DocumentKind, Entity};
use crate::scope::{ContextId, IdScope, TranslationContext};
use crate::update::{HookCx, MappingSet, UpdaterSet};
use tracing::instrument;

/// Runs translations for one adjacent version pair.
///
/// A migrator holds no per-call state; everything a call accumulates lives in
/// the [`TranslationContext`] threaded through it.
#[derive(Debug)]
pub struct Migrator {
    config: MigrationConfig,
    updaters: UpdaterSet,
}

impl Migrator {
    /// Create a migrator from a configuration and its structural updaters.
    pub fn new(config: MigrationConfig, updaters: UpdaterSet) -> Self {
        Self { config, updaters }
    }

    /// Create a migrator from a validated mapping set.
    ///
    /// The configuration is derived from the set's version pair.
    pub fn from_mappings(mappings: MappingSet) -> Result<Self> {
        mappings.validate()?;
        let config = MigrationConfig::for_pair(&mappings.source_version, &mappings.target_version);
        Ok(Self::new(config, mappings.into()))
    }

    /// The configuration in use.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// The structural updaters in use.
    pub fn updaters(&self) -> &UpdaterSet {
        &self.updaters
    }

    /// Translate a history document.
    #[instrument(skip_all, fields(version = %source.version))]
    pub fn translate_history(
        &self,
        source: &Document,
        contexts: Option<&mut TranslationContext>,
    ) -> Result<Document> {
        with_contexts(contexts, |contexts| {
            let root = contexts.root();
            self.history_in(source, contexts, root)
        })
    }

    /// Translate a standalone pipeline.
    #[instrument(skip_all, fields(version = %source.version))]
    pub fn translate_pipeline(
        &self,
        source: &Document,
        contexts: Option<&mut TranslationContext>,
    ) -> Result<Document> {
        with_contexts(contexts, |contexts| {
            let root = contexts.root();
            self.pipeline_in(source, contexts, root, None)
        })
    }

    /// Translate an execution log.
    #[instrument(skip_all, fields(version = %source.version))]
    pub fn translate_log(
        &self,
        source: &Document,
        contexts: Option<&mut TranslationContext>,
    ) -> Result<Document> {
        with_contexts(contexts, |contexts| {
            let root = contexts.root();
            self.log_in(source, contexts, root)
        })
    }

    /// Translate a type registry.
    #[instrument(skip_all, fields(version = %source.version))]
    pub fn translate_registry(
        &self,
        source: &Document,
        contexts: Option<&mut TranslationContext>,
    ) -> Result<Document> {
        with_contexts(contexts, |contexts| {
            let root = contexts.root();
            self.registry_in(source, contexts, root)
        })
    }

    /// Translate a parameter mashup.
    #[instrument(skip_all, fields(version = %source.version))]
    pub fn translate_mashup(
        &self,
        source: &Document,
        contexts: Option<&mut TranslationContext>,
    ) -> Result<Document> {
        with_contexts(contexts, |contexts| {
            let root = contexts.root();
            self.mashup_in(source, contexts, root)
        })
    }

    /// Translate a startup configuration.
    ///
    /// Startup configurations carry no ids and take no hooks; an external
    /// context is accepted for uniformity and left untouched.
    #[instrument(skip_all, fields(version = %source.version))]
    pub fn translate_startup_config(
        &self,
        source: &Document,
        _contexts: Option<&mut TranslationContext>,
    ) -> Result<Document> {
        self.startup(source)
    }

    /// Translate a bundle of related documents.
    #[instrument(skip_all, fields(
        subpipelines = source.subpipelines.len(),
        mashups = source.mashups.len()
    ))]
    pub fn translate_bundle(
        &self,
        source: &Bundle,
        contexts: Option<&mut TranslationContext>,
    ) -> Result<Bundle> {
        with_contexts(contexts, |contexts| {
            let root = contexts.root();
            self.bundle_in(source, contexts, root)
        })
    }

    /// Translate a single document, dispatching on its kind.
    pub fn translate(
        &self,
        source: &Document,
        contexts: Option<&mut TranslationContext>,
    ) -> Result<Document> {
        match source.kind {
            DocumentKind::History => self.translate_history(source, contexts),
            DocumentKind::Pipeline => self.translate_pipeline(source, contexts),
            DocumentKind::Log => self.translate_log(source, contexts),
            DocumentKind::Registry => self.translate_registry(source, contexts),
            DocumentKind::Mashup => self.translate_mashup(source, contexts),
            DocumentKind::Startup => self.translate_startup_config(source, contexts),
        }
    }

    /// Run the structural updater of `kind` with the hooks active on `node`.
    ///
    /// Fails with [`MigrationError::HookContractViolation`] if an active hook
    /// names a (kind, field) pair no updater recognizes.
    fn run_structural_update(
        &self,
        kind: DocumentKind,
        root: &Entity,
        contexts: &mut TranslationContext,
        node: ContextId,
        scope: &mut IdScope,
    ) -> Result<Entity> {
        let updater = self.updaters.get(kind)?;
        if let Some(key) = contexts
            .translators(node)
            .keys()
            .find(|key| !self.updaters.recognizes(key))
        {
            return Err(MigrationError::HookContractViolation {
                kind: key.kind.clone(),
                field: key.field.clone(),
            });
        }

        let mut cx = HookCx {
            migrator: self,
            contexts,
            node,
            scope,
        };
        updater.update(root, &mut cx)
    }

    fn stamp(&self, kind: DocumentKind, root: Entity) -> Document {
        Document::new(kind, self.config.target_version.clone(), root)
    }
}

fn with_contexts<T>(
    contexts: Option<&mut TranslationContext>,
    f: impl FnOnce(&mut TranslationContext) -> Result<T>,
) -> Result<T> {
    match contexts {
        Some(contexts) => f(contexts),
        None => f(&mut TranslationContext::new()),
    }
}
