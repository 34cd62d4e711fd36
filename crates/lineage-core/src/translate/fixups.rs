//! History fix-ups applied around the structural update and the copy.

use super::SubIdPolicy;
use crate::error::{MigrationError, Result};
use crate::model::kinds::{self, fields};
use crate::model::{Entity, EntityRef, Value};
use crate::scope::{IdRemap, IdScope};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Make port-spec-item sub-ids unique across the history.
///
/// Works on a copy of the source. Items are reached through the port specs
/// added or changed by the history's operations; new sub-ids come after the
/// largest one in use.
pub(crate) fn repair_sub_ids(source: &Entity, policy: SubIdPolicy) -> Result<Entity> {
    let mut root = source.clone();
    let mut scope = IdScope::new();
    if let Some(max) = source.ids_of(kinds::PORT_SPEC_ITEM).into_iter().max() {
        scope.reserve(kinds::PORT_SPEC_ITEM, max);
    }

    let mut seen = BTreeSet::new();
    let mut repaired = 0usize;
    for action in root.children_mut(fields::ACTIONS) {
        for op in action.children_mut(fields::OPERATIONS) {
            let touches_port_spec = matches!(op.kind.as_str(), kinds::ADD | kinds::CHANGE)
                && op.str_field(fields::WHAT) == Some(kinds::PORT_SPEC);
            if !touches_port_spec {
                continue;
            }
            let Some(Value::Entity(port_spec)) = op.field_mut(fields::DATA) else {
                continue;
            };
            for item in port_spec.children_mut(fields::PORT_SPEC_ITEMS) {
                match policy {
                    SubIdPolicy::Unconditional => {
                        item.id = Some(scope.new_id(kinds::PORT_SPEC_ITEM)?);
                        repaired += 1;
                    }
                    SubIdPolicy::OnCollision => {
                        let Some(mut id) = item.id else { continue };
                        if seen.contains(&id) {
                            while seen.contains(&id) {
                                id = scope.new_id(kinds::PORT_SPEC_ITEM)?;
                            }
                            item.id = Some(id);
                            repaired += 1;
                        }
                        seen.insert(id);
                    }
                }
            }
        }
    }

    if repaired > 0 {
        debug!(repaired, ?policy, "Reassigned port spec item sub-ids");
    }
    Ok(root)
}

/// Point upgrade annotations at the final id of the action they name.
pub(crate) fn rewrite_upgrade_annotations(root: &mut Entity, remap: &IdRemap, key: &str) -> Result<()> {
    for annotation in root.children_mut(fields::ACTION_ANNOTATIONS) {
        if annotation.str_field(fields::KEY) != Some(key) {
            continue;
        }
        let old = annotation
            .field(fields::VALUE)
            .and_then(Value::as_id)
            .ok_or_else(|| {
                MigrationError::invalid_document(format!("{key} annotation does not name an action"))
            })?;
        let new = remap
            .get(kinds::ACTION, old)
            .ok_or_else(|| MigrationError::unresolved(kinds::ACTION, old, format!("{key} annotation")))?;
        annotation.set(fields::VALUE, Value::Str(new.to_string()));
    }
    Ok(())
}

/// Give variables back the id they had before translation.
///
/// Variable ids are user-facing keys. References to a variable follow it
/// back, and the remap is pointed at the stable id so later lookups agree
/// with the document.
pub(crate) fn restore_variable_ids(root: &mut Entity, remap: &mut IdRemap) {
    let minted: BTreeMap<i64, i64> = remap
        .entries_of(kinds::VARIABLE)
        .map(|(original, id)| (id, original))
        .collect();

    let mut restored = BTreeMap::new();
    for variable in root.children_mut(fields::VARIABLES) {
        let Some(id) = variable.id else { continue };
        let Some(&original) = minted.get(&id) else { continue };
        restored.insert(EntityRef::new(variable.kind.clone(), id), original);
        variable.id = Some(original);
    }
    if restored.is_empty() {
        return;
    }

    root.visit_mut(&mut |entity| {
        for value in entity.fields.values_mut() {
            restore_refs(value, &restored);
        }
    });
    for &original in restored.values() {
        remap.insert(kinds::VARIABLE, original, original);
    }
}

fn restore_refs(value: &mut Value, restored: &BTreeMap<EntityRef, i64>) {
    match value {
        Value::Ref(r) => {
            if let Some(&original) = restored.get(r) {
                r.id = original;
            }
        }
        Value::List(items) => items.iter_mut().for_each(|v| restore_refs(v, restored)),
        _ => {}
    }
}
