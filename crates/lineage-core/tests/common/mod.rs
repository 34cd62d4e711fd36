//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use lineage_core::{
    Document, DocumentKind, Entity, KindMapping, MappingSet, Migrator, Value, VersionMapping,
};

pub const SOURCE: &str = "1.0.5";
pub const TARGET: &str = "2.0.0";

/// Mapping tables declaring every field the engine hooks, plus a few
/// mechanical changes.
pub fn mappings() -> MappingSet {
    let nodes = |mapping: VersionMapping| {
        mapping
            .with_kind("group", KindMapping::new().with_fields(["workflow", "name"]))
            .with_kind(
                "abstraction",
                KindMapping::new().with_fields(["internal_version", "name", "namespace"]),
            )
            .with_kind(
                "module",
                KindMapping::new()
                    .with_fields(["name"])
                    .rename_field("package", "package_name")
                    .drop_field("cache"),
            )
    };

    MappingSet::new(SOURCE, TARGET)
        .with_document(nodes(VersionMapping::new(DocumentKind::History)).with_kind(
            "action",
            KindMapping::new().with_fields(["session", "operations", "prev", "user"]),
        ))
        .with_document(nodes(VersionMapping::new(DocumentKind::Pipeline)))
        .with_document(VersionMapping::new(DocumentKind::Log))
        .with_document(VersionMapping::new(DocumentKind::Registry))
        .with_document(VersionMapping::new(DocumentKind::Mashup))
        .with_document(
            VersionMapping::new(DocumentKind::Startup)
                .with_kind("startup", KindMapping::new().add_field("auto_save", true)),
        )
}

pub fn migrator() -> Migrator {
    Migrator::from_mappings(mappings()).unwrap()
}

pub fn module(id: i64, name: &str) -> Entity {
    Entity::with_id("module", id).with_field("name", name)
}

pub fn connection(id: i64, source: i64, destination: i64) -> Entity {
    Entity::with_id("connection", id)
        .with_field("source", Value::reference("module", source))
        .with_field("destination", Value::reference("module", destination))
}

pub fn annotation(id: i64, key: &str, value: &str) -> Entity {
    Entity::with_id("annotation", id)
        .with_field("key", key)
        .with_field("value", value)
}

pub fn pipeline(modules: Vec<Entity>, connections: Vec<Entity>) -> Document {
    Document::new(
        DocumentKind::Pipeline,
        SOURCE,
        Entity::new("workflow")
            .with_field("modules", Value::entities(modules))
            .with_field("connections", Value::entities(connections)),
    )
}

/// A group node embedding `workflow`.
pub fn group(id: i64, workflow: Document) -> Entity {
    Entity::with_id("group", id)
        .with_field("name", "group")
        .with_field("workflow", workflow)
}

/// A reusable-reference node pinning version `internal_version` of `name`.
pub fn abstraction(id: i64, name: &str, namespace: &str, internal_version: i64) -> Entity {
    Entity::with_id("abstraction", id)
        .with_field("name", name)
        .with_field("namespace", namespace)
        .with_field("internal_version", internal_version)
}

/// An operation adding `data`.
pub fn add(id: i64, data: Entity) -> Entity {
    let what = data.kind.clone();
    Entity::with_id("add", id)
        .with_field("what", what.as_str())
        .with_field("data", data)
}

/// An operation deleting the entity `kind:id`.
pub fn delete(id: i64, kind: &str, target: i64) -> Entity {
    Entity::with_id("delete", id)
        .with_field("what", kind)
        .with_field("target", Value::reference(kind, target))
}

pub fn action(id: i64, prev: i64, operations: Vec<Entity>) -> Entity {
    Entity::with_id("action", id)
        .with_field("prev", Value::reference("action", prev))
        .with_field("operations", Value::entities(operations))
}

pub fn history(actions: Vec<Entity>) -> Document {
    history_with(actions, Vec::new(), Vec::new())
}

pub fn history_with(
    actions: Vec<Entity>,
    action_annotations: Vec<Entity>,
    variables: Vec<Entity>,
) -> Document {
    Document::new(
        DocumentKind::History,
        SOURCE,
        Entity::new("vistrail")
            .with_field("actions", Value::entities(actions))
            .with_field("action_annotations", Value::entities(action_annotations))
            .with_field("variables", Value::entities(variables)),
    )
}

/// Every (kind, id) reference in `root` points at an entity present in `root`.
pub fn references_resolve(root: &Entity) -> bool {
    let mut present = std::collections::BTreeSet::new();
    root.visit(&mut |e| {
        if let Some(r) = e.entity_ref() {
            present.insert(r);
        }
    });

    let mut ok = true;
    root.visit(&mut |e| {
        for value in e.fields.values() {
            check_refs(value, &present, &mut ok);
        }
    });
    ok
}

fn check_refs(
    value: &Value,
    present: &std::collections::BTreeSet<lineage_core::EntityRef>,
    ok: &mut bool,
) {
    match value {
        Value::Ref(r) => *ok &= present.contains(r),
        Value::List(items) => items.iter().for_each(|v| check_refs(v, present, ok)),
        _ => {}
    }
}
