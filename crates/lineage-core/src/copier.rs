//! Deep copy with id reassignment.
//!
//! The copier takes a structurally updated graph that still bears source ids
//! and produces the final target graph in two passes:
//!
//! 1. every identity-bearing entity without a remap entry gets a fresh id
//!    from the [`IdScope`], drawn from the counter of its target kind;
//! 2. every entity id and every [`Value::Ref`] is rewritten through the now
//!    complete [`IdRemap`].
//!
//! The remap is keyed by source kind, so two source kinds merged into one
//! target kind keep distinct identities while sharing one counter. References
//! are resolved by source kind and take the target kind of the entity they
//! point at, or the updater's kind rename when that entity lives elsewhere.
//!
//! Targets already present in the remap (pinned roots, ids shared in from a
//! sibling document) are reserved in the scope first, so minted ids never
//! collide with them.

use crate::error::{MigrationError, Result};
use crate::model::kinds::fields;
use crate::model::{Entity, EntityRef, Value};
use crate::scope::{IdRemap, IdScope};
use std::collections::BTreeMap;
use tracing::debug;

/// Recompute `pos` on the children of a list field of one owner kind.
#[derive(Debug, Clone)]
struct PositionRule {
    owner: String,
    list: String,
}

/// Copies one document graph into a target id space.
pub struct DocumentCopier<'a> {
    scope: &'a mut IdScope,
    remap: &'a mut IdRemap,
    positions: Vec<PositionRule>,
    location: String,
    kind_renames: BTreeMap<String, String>,
    /// Source identity of every entity in the graph to its target kind.
    target_kinds: BTreeMap<EntityRef, String>,
}

impl<'a> DocumentCopier<'a> {
    /// Create a copier minting from `scope` and recording into `remap`.
    pub fn new(scope: &'a mut IdScope, remap: &'a mut IdRemap) -> Self {
        Self {
            scope,
            remap,
            positions: Vec::new(),
            location: "document".to_string(),
            kind_renames: BTreeMap::new(),
            target_kinds: BTreeMap::new(),
        }
    }

    /// Describe where the copied graph lives, for error messages.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Recompute the `pos` field of the entities listed in `list` on every
    /// `owner` entity, following list order.
    pub fn with_positions(mut self, owner: impl Into<String>, list: impl Into<String>) -> Self {
        self.positions.push(PositionRule {
            owner: owner.into(),
            list: list.into(),
        });
        self
    }

    /// Source kind to target kind, for references to entities outside the graph.
    pub fn with_kind_renames(mut self, renames: BTreeMap<String, String>) -> Self {
        self.kind_renames = renames;
        self
    }

    /// Copy `source`, returning the graph with final ids.
    ///
    /// `source` itself is never modified.
    pub fn copy(mut self, source: &Entity) -> Result<Entity> {
        let reserved = self.reserve_seeded();
        let minted = self.assign(source)?;

        let mut target = source.clone();
        self.rewrite_entity(&mut target)?;

        debug!(
            location = %self.location,
            reserved,
            minted,
            remap_size = self.remap.len(),
            "Copied document graph"
        );
        Ok(target)
    }

    fn reserve_seeded(&mut self) -> usize {
        for (key, target) in self.remap.iter() {
            self.scope.reserve(&key.kind, target);
            if let Some(renamed) = self.kind_renames.get(&key.kind) {
                self.scope.reserve(renamed, target);
            }
        }
        self.remap.len()
    }

    fn assign(&mut self, source: &Entity) -> Result<usize> {
        let scope = &mut *self.scope;
        let remap = &mut *self.remap;
        let target_kinds = &mut self.target_kinds;
        let mut minted = 0;
        let mut failure = None;
        source.visit(&mut |entity| {
            let Some(id) = entity.id else { return };
            if failure.is_some() {
                return;
            }
            let identity = entity.identity_kind();
            target_kinds.insert(EntityRef::new(identity, id), entity.kind.clone());
            if remap.contains(identity, id) {
                return;
            }
            match scope.new_id(&entity.kind) {
                Ok(new) => {
                    remap.insert(identity, id, new);
                    minted += 1;
                }
                Err(err) => failure = Some(err),
            }
        });
        match failure {
            Some(err) => Err(err),
            None => Ok(minted),
        }
    }

    fn resolve(&self, kind: &str, id: i64) -> Result<i64> {
        self.remap
            .get(kind, id)
            .ok_or_else(|| MigrationError::unresolved(kind, id, self.location.clone()))
    }

    fn target_kind_of(&self, source: &EntityRef) -> String {
        self.target_kinds
            .get(source)
            .or_else(|| self.kind_renames.get(&source.kind))
            .cloned()
            .unwrap_or_else(|| source.kind.clone())
    }

    fn rewrite_entity(&self, entity: &mut Entity) -> Result<()> {
        if let Some(id) = entity.id {
            entity.id = Some(self.resolve(entity.identity_kind(), id)?);
        }
        entity.source_kind = None;
        for value in entity.fields.values_mut() {
            self.rewrite_value(value)?;
        }
        let kind = entity.kind.clone();
        for rule in self.positions.iter().filter(|r| r.owner == kind) {
            for (pos, child) in entity.children_mut(&rule.list).enumerate() {
                child.set(fields::POS, pos as i64);
            }
        }
        Ok(())
    }

    fn rewrite_value(&self, value: &mut Value) -> Result<()> {
        match value {
            Value::Ref(r) => {
                let id = self.resolve(&r.kind, r.id)?;
                *r = EntityRef::new(self.target_kind_of(r), id);
            }
            Value::Entity(entity) => self.rewrite_entity(entity)?,
            Value::List(items) => {
                for item in items {
                    self.rewrite_value(item)?;
                }
            }
            // Embedded documents were translated in their own scope.
            _ => {}
        }
        Ok(())
    }
}

/// Bring an updated graph that is not copied to its target kinds.
///
/// Clears recorded source kinds and renames reference kinds; ids are kept.
pub(crate) fn settle_kinds(root: &mut Entity, renames: &BTreeMap<String, String>) {
    root.visit_mut(&mut |entity| {
        entity.source_kind = None;
        for value in entity.fields.values_mut() {
            rename_refs(value, renames);
        }
    });
}

fn rename_refs(value: &mut Value, renames: &BTreeMap<String, String>) {
    match value {
        Value::Ref(r) => {
            if let Some(renamed) = renames.get(&r.kind) {
                r.kind = renamed.clone();
            }
        }
        Value::List(items) => items.iter_mut().for_each(|v| rename_refs(v, renames)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Document, DocumentKind};

    fn pipeline() -> Entity {
        Entity::new("workflow")
            .with_field(
                "modules",
                Value::entities([Entity::with_id("module", 10), Entity::with_id("module", 20)]),
            )
            .with_field(
                "connections",
                Value::entities([Entity::with_id("connection", 10)
                    .with_field("source", Value::reference("module", 10))
                    .with_field("destination", Value::reference("module", 20))]),
            )
    }

    #[test]
    fn test_two_pass_copy() {
        let source = pipeline();
        let mut scope = IdScope::new();
        let mut remap = IdRemap::new();

        let target = DocumentCopier::new(&mut scope, &mut remap).copy(&source).unwrap();

        assert_eq!(target.ids_of("module"), vec![1, 2]);
        assert_eq!(target.ids_of("connection"), vec![1]);
        let connection = target.children("connections").next().unwrap();
        assert_eq!(connection.field("source"), Some(&Value::reference("module", 1)));
        assert_eq!(connection.field("destination"), Some(&Value::reference("module", 2)));

        // Source untouched.
        assert_eq!(source.ids_of("module"), vec![10, 20]);
        assert!(remap.is_injective());
    }

    #[test]
    fn test_seeded_entries_are_kept_and_reserved() {
        let mut scope = IdScope::new();
        let mut remap = IdRemap::new();
        remap.insert("module", 20, 1);

        let target = DocumentCopier::new(&mut scope, &mut remap)
            .copy(&pipeline())
            .unwrap();

        // module 20 keeps its seeded target; module 10 must not reuse 1.
        assert_eq!(target.ids_of("module"), vec![2, 1]);
        assert!(remap.is_injective());
    }

    #[test]
    fn test_dangling_reference_fails() {
        let source = Entity::new("workflow").with_field(
            "connections",
            Value::entities([
                Entity::with_id("connection", 1).with_field("source", Value::reference("module", 99))
            ]),
        );
        let mut scope = IdScope::new();
        let mut remap = IdRemap::new();

        let err = DocumentCopier::new(&mut scope, &mut remap)
            .with_location("pipeline")
            .copy(&source)
            .unwrap_err();
        match err {
            MigrationError::UnresolvedReference { kind, id, context } => {
                assert_eq!(kind, "module");
                assert_eq!(id, 99);
                assert_eq!(context, "pipeline");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_embedded_documents_are_opaque() {
        let inner = Document::new(
            DocumentKind::Pipeline,
            "2.0.0",
            Entity::new("workflow")
                .with_field("modules", Value::entities([Entity::with_id("module", 7)])),
        );
        let source = Entity::new("workflow").with_field(
            "modules",
            Value::entities([Entity::with_id("group", 3).with_field("workflow", inner.clone())]),
        );
        let mut scope = IdScope::new();
        let mut remap = IdRemap::new();

        let target = DocumentCopier::new(&mut scope, &mut remap).copy(&source).unwrap();
        let group = target.children("modules").next().unwrap();
        assert_eq!(group.field("workflow").and_then(Value::as_document), Some(&inner));
        assert!(!remap.contains("module", 7));
    }

    #[test]
    fn test_positions_recomputed() {
        let source = Entity::new("history").with_field(
            "actions",
            Value::entities([Entity::with_id("action", 1).with_field(
                "operations",
                Value::entities([
                    Entity::with_id("add", 4).with_field("pos", 7i64),
                    Entity::with_id("delete", 2).with_field("pos", 7i64),
                ]),
            )]),
        );
        let mut scope = IdScope::new().with_alias("add", "operation").with_alias("delete", "operation");
        let mut remap = IdRemap::new();

        let target = DocumentCopier::new(&mut scope, &mut remap)
            .with_positions("action", "operations")
            .copy(&source)
            .unwrap();
        let action = target.children("actions").next().unwrap();
        let positions: Vec<_> = action
            .children("operations")
            .map(|op| op.field("pos").and_then(Value::as_int))
            .collect();
        assert_eq!(positions, vec![Some(0), Some(1)]);
        // Aliased kinds draw from one counter.
        assert_eq!(target.ids_of("add"), vec![1]);
        assert_eq!(target.ids_of("delete"), vec![2]);
    }

    fn merged(kind: &str, source_kind: &str, id: i64) -> Entity {
        let mut entity = Entity::with_id(kind, id);
        entity.source_kind = Some(source_kind.to_string());
        entity
    }

    #[test]
    fn test_merged_kinds_keep_distinct_identities() {
        // module 2 and an abstraction 2 renamed to module.
        let source = Entity::new("workflow")
            .with_field(
                "modules",
                Value::entities([Entity::with_id("module", 2), merged("module", "abstraction", 2)]),
            )
            .with_field(
                "connections",
                Value::entities([Entity::with_id("connection", 1)
                    .with_field("source", Value::reference("module", 2))
                    .with_field("destination", Value::reference("abstraction", 2))]),
            );
        let mut scope = IdScope::new();
        let mut remap = IdRemap::new();

        let target = DocumentCopier::new(&mut scope, &mut remap).copy(&source).unwrap();

        let ids = target.ids_of("module");
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(remap.get("module", 2), Some(ids[0]));
        assert_eq!(remap.get("abstraction", 2), Some(ids[1]));

        let connection = target.children("connections").next().unwrap();
        assert_eq!(connection.field("source"), Some(&Value::reference("module", ids[0])));
        assert_eq!(connection.field("destination"), Some(&Value::reference("module", ids[1])));
        assert!(target.children("modules").all(|m| m.source_kind.is_none()));
    }

    #[test]
    fn test_outside_references_follow_kind_renames() {
        let source = Entity::new("log").with_field(
            "items",
            Value::entities([Entity::with_id("module_exec", 4)
                .with_field("module", Value::reference("abstraction", 7))]),
        );
        let mut scope = IdScope::new();
        let mut remap = IdRemap::new();
        remap.insert("abstraction", 7, 3);

        let target = DocumentCopier::new(&mut scope, &mut remap)
            .with_kind_renames([("abstraction".to_string(), "module".to_string())].into())
            .copy(&source)
            .unwrap();
        let item = target.children("items").next().unwrap();
        assert_eq!(item.field("module"), Some(&Value::reference("module", 3)));
    }

    #[test]
    fn test_seeded_max_id_exhausts_counter() {
        let mut scope = IdScope::new();
        let mut remap = IdRemap::new();
        remap.insert("module", 20, i64::MAX);

        let err = DocumentCopier::new(&mut scope, &mut remap)
            .copy(&pipeline())
            .unwrap_err();
        assert!(matches!(err, MigrationError::IdSpaceExhausted { .. }), "{err}");
    }

    #[test]
    fn test_settle_kinds() {
        let mut root = Entity::new("workflow").with_field(
            "modules",
            Value::entities([merged("module", "abstraction", 2)
                .with_field("peer", Value::reference("abstraction", 2))]),
        );
        settle_kinds(&mut root, &[("abstraction".to_string(), "module".to_string())].into());

        let module = root.children("modules").next().unwrap();
        assert_eq!(module.source_kind, None);
        assert_eq!(module.id, Some(2));
        assert_eq!(module.field("peer"), Some(&Value::reference("module", 2)));
    }
}
