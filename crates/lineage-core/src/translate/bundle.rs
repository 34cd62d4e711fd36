//! Bundle composer.
//!
//! Documents of a bundle are translated in dependency order, not in the order
//! they are stored:
//!
//! 1. bundled sub-pipelines, dependencies first, each in its own child scope;
//!    their action remaps become the internal-version table;
//! 2. the history, resolving sub-pipeline pins against that table;
//! 3. the standalone pipeline, seeded with the history's shared ids so the same
//!    logical node gets the same target id in both;
//! 4. mashups and the log, each seeded with the shared core remap;
//! 5. the registry, independently.
//!
//! Legacy abstraction documents are carried through as they are.
//!
//! Document-private kinds are stripped from every remap before it is shared.

use super::hooks::{self, InternalVersions};
use super::naming::parse_subpipeline_name;
use super::Migrator;
use crate::error::{MigrationError, Result};
use crate::model::kinds::{self, fields};
use crate::model::{Bundle, Document, Entity, SubPipeline, Value};
use crate::scope::{ContextId, IdRemap, ScopeKey, TranslationContext};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use tracing::{debug, info};

/// Sub-pipelines are keyed by (name, namespace).
type SubPipelineKey = (String, String);

/// Child scope whose remap and hooks seed every sub-pipeline scope.
const SUBPIPELINES: &str = "subworkflows";
const HISTORY: &str = "vistrail";
const PIPELINE: &str = "workflow";
const MASHUPS: &str = "mashups";
const LOG: &str = "log";
const REGISTRY: &str = "registry";

struct PendingSubPipeline<'a> {
    source: &'a SubPipeline,
    depends_on: BTreeSet<SubPipelineKey>,
}

/// State of the dependency-ordered sub-pipeline walk.
struct SubPipelineWalk<'a> {
    bundle_node: ContextId,
    pending: BTreeMap<SubPipelineKey, PendingSubPipeline<'a>>,
    done: BTreeMap<SubPipelineKey, Document>,
    versions: InternalVersions,
}

impl Migrator {
    pub(crate) fn bundle_in(
        &self,
        source: &Bundle,
        contexts: &mut TranslationContext,
        node: ContextId,
    ) -> Result<Bundle> {
        let mut contexts = contexts.local_translators(node);
        let private = &self.config.private_kinds;

        let (subpipelines, versions) = self.subpipelines_in(source, &mut contexts, node)?;
        let versions = Rc::new(versions);

        let mut history_node = None;
        let history = match &source.history {
            Some(doc) => {
                let vt = contexts.child(node, ScopeKey::named(HISTORY));
                let mut local = contexts.local_translators(vt);
                local.add_translator(
                    vt,
                    kinds::ABSTRACTION,
                    fields::INTERNAL_VERSION,
                    hooks::internal_version_lookup(Rc::clone(&versions)),
                );
                history_node = Some(vt);
                Some(self.history_in(doc, &mut local, vt)?)
            }
            None => None,
        };

        let mut pipeline_node = None;
        let pipeline = match &source.pipeline {
            Some(doc) => {
                let wf = contexts.child(node, ScopeKey::named(PIPELINE));
                if let Some(vt) = history_node {
                    let shared = contexts.filter_remap(vt, private);
                    contexts.extend_remap(wf, &shared);
                }
                let mut local = contexts.local_translators(wf);
                local.add_translator(
                    wf,
                    kinds::ABSTRACTION,
                    fields::INTERNAL_VERSION,
                    hooks::internal_version_lookup(Rc::clone(&versions)),
                );
                pipeline_node = Some(wf);
                Some(self.pipeline_in(doc, &mut local, wf, None)?)
            }
            None => None,
        };

        let core = match (history_node, pipeline_node) {
            (Some(vt), _) => contexts.filter_remap(vt, private),
            (None, Some(wf)) => contexts.filter_remap(wf, private),
            (None, None) => IdRemap::new(),
        };

        let mashups_node = contexts.child(node, ScopeKey::named(MASHUPS));
        contexts.extend_remap(mashups_node, &core);
        let mut mashups = Vec::with_capacity(source.mashups.len());
        for mashup in &source.mashups {
            let id = mashup.root.id.ok_or_else(|| MigrationError::InvalidBundle {
                message: "mashup without an id".to_string(),
            })?;
            let child = contexts.child(node, ScopeKey::Mashup(id));
            let seed = contexts.remap(mashups_node).clone();
            contexts.extend_remap(child, &seed);
            mashups.push(self.mashup_in(mashup, &mut contexts, child)?);
        }

        let log = match &source.log {
            Some(doc) => {
                let child = contexts.child(node, ScopeKey::named(LOG));
                contexts.extend_remap(child, &core);
                Some(self.log_in(doc, &mut contexts, child)?)
            }
            None => None,
        };

        let registry = match &source.registry {
            Some(doc) => {
                let child = contexts.child(node, ScopeKey::named(REGISTRY));
                Some(self.registry_in(doc, &mut contexts, child)?)
            }
            None => None,
        };

        info!(
            history = history.is_some(),
            pipeline = pipeline.is_some(),
            log = log.is_some(),
            registry = registry.is_some(),
            mashups = mashups.len(),
            subpipelines = subpipelines.len(),
            abstractions = source.abstractions.len(),
            shared_ids = core.len(),
            "Bundle translated"
        );
        Ok(Bundle {
            history,
            pipeline,
            log,
            registry,
            mashups,
            subpipelines,
            abstractions: source.abstractions.clone(),
        })
    }

    /// Translate the bundled sub-pipelines, dependencies first.
    ///
    /// Returns them in bundle order, with the internal-version table built from
    /// their action remaps.
    fn subpipelines_in(
        &self,
        source: &Bundle,
        contexts: &mut TranslationContext,
        node: ContextId,
    ) -> Result<(Vec<SubPipeline>, InternalVersions)> {
        let mut order = Vec::with_capacity(source.subpipelines.len());
        let mut pending = BTreeMap::new();
        for sub in &source.subpipelines {
            let parsed = parse_subpipeline_name(&sub.reference)?;
            let key = (parsed.name, parsed.namespace);
            let entry = PendingSubPipeline {
                source: sub,
                depends_on: abstraction_keys(&sub.history),
            };
            if pending.insert(key.clone(), entry).is_some() {
                return Err(MigrationError::InvalidBundle {
                    message: format!("sub-pipeline {}:{} bundled twice", key.0, key.1),
                });
            }
            order.push(key);
        }

        let mut walk = SubPipelineWalk {
            bundle_node: node,
            pending,
            done: BTreeMap::new(),
            versions: InternalVersions::new(),
        };
        for key in &order {
            self.visit_subpipeline(key, &mut walk, contexts)?;
        }

        let mut translated = Vec::with_capacity(order.len());
        for key in &order {
            let (Some(history), Some(pending)) = (walk.done.remove(key), walk.pending.get(key)) else {
                continue;
            };
            translated.push(SubPipeline::new(pending.source.reference.clone(), history));
        }
        Ok((translated, walk.versions))
    }

    fn visit_subpipeline(
        &self,
        key: &SubPipelineKey,
        walk: &mut SubPipelineWalk<'_>,
        contexts: &mut TranslationContext,
    ) -> Result<()> {
        if walk.done.contains_key(key) {
            return Ok(());
        }
        let Some(pending) = walk.pending.get(key) else {
            return Ok(());
        };
        let source = pending.source;
        let depends_on: Vec<_> = pending
            .depends_on
            .iter()
            .filter(|dep| walk.pending.contains_key(*dep))
            .cloned()
            .collect();

        let sub = contexts.child(
            walk.bundle_node,
            ScopeKey::SubPipeline {
                name: key.0.clone(),
                namespace: key.1.clone(),
            },
        );
        let mut contexts = contexts.embed(sub)?;
        for dep in &depends_on {
            self.visit_subpipeline(dep, walk, &mut contexts)?;
        }

        let mut local = contexts.local_translators(sub);
        if let Some(seed) = local.existing_child(walk.bundle_node, &ScopeKey::named(SUBPIPELINES)) {
            let remap = local.remap(seed).clone();
            local.extend_remap(sub, &remap);
            local.inherit_translators(sub, seed);
        }
        local.add_translator(
            sub,
            kinds::ABSTRACTION,
            fields::INTERNAL_VERSION,
            hooks::internal_version_lookup(Rc::new(walk.versions.clone())),
        );
        let history = self.history_in(&source.history, &mut local, sub)?;

        for (old, new) in local.remap(sub).entries_of(kinds::ACTION) {
            walk.versions.insert((key.0.clone(), key.1.clone(), old), new);
        }
        debug!(
            name = %key.0,
            namespace = %key.1,
            dependencies = depends_on.len(),
            "Translated sub-pipeline"
        );
        walk.done.insert(key.clone(), history);
        Ok(())
    }
}

/// (name, namespace) of every sub-pipeline an abstraction node of `history` pins,
/// embedded pipelines included.
fn abstraction_keys(history: &Document) -> BTreeSet<SubPipelineKey> {
    let mut keys = BTreeSet::new();
    collect_abstraction_keys(&history.root, &mut keys);
    keys
}

fn collect_abstraction_keys(root: &Entity, keys: &mut BTreeSet<SubPipelineKey>) {
    root.visit(&mut |entity| {
        if entity.kind == kinds::ABSTRACTION {
            if let Some(name) = entity.str_field(fields::NAME) {
                let namespace = entity.str_field(fields::NAMESPACE).unwrap_or_default();
                keys.insert((name.to_string(), namespace.to_string()));
            }
        }
        for embedded in entity.fields.values().filter_map(Value::as_document) {
            collect_abstraction_keys(&embedded.root, keys);
        }
    });
}
