//! Translator hooks registered by the per-document translators.

use crate::error::{MigrationError, Result};
use crate::model::kinds::{self, fields};
use crate::model::{Entity, Value};
use crate::scope::{ContextId, ScopeKey, Translator, DEFAULT_BEGIN_ID};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// `(name, namespace, source version) -> target version` of bundled sub-pipelines.
pub(crate) type InternalVersions = BTreeMap<(String, String, i64), i64>;

/// Translate the pipeline embedded in a group, recursively.
///
/// The embedded pipeline gets the child scope keyed by the group's source id,
/// so every occurrence of the same group within one call shares assignments.
/// Hooks of the embedding scope stay visible inside.
pub(crate) fn embedded_pipeline() -> Translator {
    Translator::new("embedded_pipeline", |group, cx| {
        let id = group.id.ok_or_else(|| {
            MigrationError::invalid_document(format!("{} without an id embeds a pipeline", group.kind))
        })?;
        let embedded = match group.field(fields::WORKFLOW) {
            None | Some(Value::Null) => return Ok(Value::Null),
            Some(Value::Document(doc)) => doc,
            Some(_) => {
                return Err(MigrationError::invalid_document(format!(
                    "{}:{id}.workflow is not a document",
                    group.kind
                )))
            }
        };

        let parent = cx.node;
        let child = cx.contexts.child(parent, ScopeKey::Group(id));
        let mut contexts = cx.contexts.embed(child)?;
        let translated = cx
            .migrator
            .pipeline_in(embedded, &mut contexts, child, Some(parent))?;
        Ok(Value::from(translated))
    })
}

/// Collapse every occurrence of one legacy session nonce to one fresh id.
///
/// A missing session stays null.
pub(crate) fn session_memo() -> Translator {
    let memo: Rc<RefCell<BTreeMap<String, i64>>> = Rc::default();
    Translator::new("session_memo", move |action, cx| {
        let key = match action.field(fields::SESSION) {
            None | Some(Value::Null) => return Ok(Value::Null),
            Some(Value::Int(i)) => i.to_string(),
            Some(Value::Str(s)) => s.clone(),
            Some(_) => {
                return Err(MigrationError::invalid_document(format!(
                    "session of {} is neither a number nor a string",
                    describe(action)
                )))
            }
        };
        let mut memo = memo.borrow_mut();
        let id = match memo.get(&key) {
            Some(id) => *id,
            None => {
                let id = cx.scope.new_free_id()?;
                memo.insert(key, id);
                id
            }
        };
        Ok(Value::Int(id))
    })
}

/// Resolve a sub-pipeline pin without a bundle to resolve it against.
///
/// Each distinct source version gets one fresh id, memoized in the remap of
/// `owner` under the `internal_version` pseudo-kind so nested scopes agree.
pub(crate) fn fallback_internal_version(owner: ContextId) -> Translator {
    Translator::new("fallback_internal_version", move |abstraction, cx| {
        let version = internal_version_of(abstraction)?;
        let remap = cx.contexts.remap_mut(owner);
        if let Some(id) = remap.get(kinds::INTERNAL_VERSION, version) {
            return Ok(Value::Int(id));
        }
        let next = match remap.entries_of(kinds::INTERNAL_VERSION).map(|(_, target)| target).max() {
            Some(last) => last
                .checked_add(1)
                .ok_or_else(|| MigrationError::IdSpaceExhausted {
                    kind: kinds::INTERNAL_VERSION.to_string(),
                })?,
            None => DEFAULT_BEGIN_ID,
        };
        remap.insert(kinds::INTERNAL_VERSION, version, next);
        Ok(Value::Int(next))
    })
}

/// Resolve a sub-pipeline pin against the versions of the bundled sub-pipelines.
pub(crate) fn internal_version_lookup(versions: Rc<InternalVersions>) -> Translator {
    Translator::new("internal_version_lookup", move |abstraction, _| {
        let version = internal_version_of(abstraction)?;
        let name = abstraction.str_field(fields::NAME).unwrap_or_default();
        let namespace = abstraction.str_field(fields::NAMESPACE).unwrap_or_default();
        versions
            .get(&(name.to_string(), namespace.to_string(), version))
            .map(|id| Value::Int(*id))
            .ok_or_else(|| {
                MigrationError::unresolved(
                    kinds::INTERNAL_VERSION,
                    version,
                    format!("sub-pipeline {name}:{namespace}"),
                )
            })
    })
}

fn internal_version_of(abstraction: &Entity) -> Result<i64> {
    abstraction
        .field(fields::INTERNAL_VERSION)
        .and_then(Value::as_id)
        .ok_or_else(|| {
            MigrationError::invalid_document(format!(
                "{} has no usable internal version",
                describe(abstraction)
            ))
        })
}

fn describe(entity: &Entity) -> String {
    match entity.entity_ref() {
        Some(r) => r.to_string(),
        None => entity.kind.clone(),
    }
}
