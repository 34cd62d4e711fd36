//! Id assignment properties of single-document translations.

mod common;

use common::*;
use lineage_core::{
    Entity, MigrationConfig, Migrator, ScopeKey, SubIdPolicy, TranslationContext, Value,
    ROOT_VERSION,
};
use std::collections::BTreeSet;

fn edit_history() -> lineage_core::Document {
    history(vec![
        action(1, 0, vec![add(1, module(1, "Reader")), add(2, module(2, "Writer"))]),
        action(
            2,
            1,
            vec![delete(3, "module", 1), add(3, connection(1, 2, 2))],
        ),
    ])
}

fn port_spec(id: i64, items: &[i64]) -> Entity {
    Entity::with_id("port_spec", id).with_field(
        "port_spec_items",
        Value::entities(items.iter().map(|i| Entity::with_id("port_spec_item", *i))),
    )
}

#[test]
fn test_ids_are_injective_per_kind() {
    let migrator = migrator();
    let mut contexts = TranslationContext::new();
    let translated = migrator
        .translate_history(&edit_history(), Some(&mut contexts))
        .unwrap();

    // add 3 and delete 3 collide numerically but are distinct operations.
    let mut operations = translated.root.ids_of("add");
    operations.extend(translated.root.ids_of("delete"));
    let distinct: BTreeSet<_> = operations.iter().copied().collect();
    assert_eq!(distinct.len(), operations.len());
    assert_eq!(distinct.len(), 4);

    assert!(contexts.remap(contexts.root()).is_injective());
}

#[test]
fn test_translation_is_deterministic() {
    let migrator = migrator();
    let source = history(vec![
        action(1, 0, vec![add(1, module(1, "Reader"))]).with_field("session", "legacy-7"),
        action(2, 1, vec![add(2, module(2, "Writer"))]).with_field("session", "legacy-7"),
    ]);

    let first = migrator.translate_history(&source, None).unwrap();
    let second = migrator.translate_history(&source, None).unwrap();
    assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
    assert_eq!(first, second);
}

#[test]
fn test_references_resolve_in_target() {
    let migrator = migrator();
    let inner = pipeline(vec![module(1, "Inner")], Vec::new());
    // The second connection ends at the group node.
    let into_group = connection(2, 20, 20).with_field("destination", Value::reference("group", 30));
    let source = pipeline(
        vec![module(10, "Reader"), module(20, "Writer"), group(30, inner)],
        vec![connection(1, 10, 20), into_group],
    );

    let translated = migrator.translate_pipeline(&source, None).unwrap();
    assert!(references_resolve(&translated.root));
    assert_eq!(translated.version, TARGET);
}

#[test]
fn test_single_action_is_anchored_at_root() {
    let migrator = migrator();
    let source = history(vec![Entity::with_id("action", 0)
        .with_field("operations", Value::entities([add(1, module(1, "Reader"))]))]);

    let translated = migrator.translate_history(&source, None).unwrap();
    assert_eq!(translated.root.ids_of("action"), vec![ROOT_VERSION]);
}

#[test]
fn test_first_action_follows_root() {
    let migrator = migrator();
    let translated = migrator.translate_history(&edit_history(), None).unwrap();

    assert_eq!(translated.root.ids_of("action"), vec![1, 2]);
    let first = translated.root.children("actions").next().unwrap();
    assert_eq!(first.field("prev"), Some(&Value::reference("action", ROOT_VERSION)));
}

#[test]
fn test_colliding_sub_ids_are_repaired() {
    let source = history(vec![action(1, 0, vec![add(1, port_spec(1, &[0, 0]))])]);

    for policy in [SubIdPolicy::OnCollision, SubIdPolicy::Unconditional] {
        let migrator = Migrator::new(
            MigrationConfig::default().with_sub_id_policy(policy),
            mappings().into(),
        );
        let translated = migrator.translate_history(&source, None).unwrap();
        let ids = translated.root.ids_of("port_spec_item");
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1], "policy {policy:?}");
    }
    // The source keeps its duplicates.
    assert_eq!(source.root.ids_of("port_spec_item"), vec![0, 0]);
}

#[test]
fn test_operation_positions_recomputed() {
    let migrator = migrator();
    let translated = migrator.translate_history(&edit_history(), None).unwrap();

    for action in translated.root.children("actions") {
        let positions: Vec<_> = action
            .children("operations")
            .map(|op| op.field("pos").and_then(Value::as_int))
            .collect();
        assert_eq!(positions, vec![Some(0), Some(1)]);
    }
}

#[test]
fn test_embedded_pipeline_gets_fresh_consistent_ids() {
    let migrator = migrator();
    let inner = pipeline(
        vec![module(10, "Inner A"), module(20, "Inner B")],
        vec![connection(5, 10, 20)],
    );
    let source = pipeline(vec![module(1, "Outer"), group(3, inner)], Vec::new());

    let mut contexts = TranslationContext::new();
    let translated = migrator
        .translate_pipeline(&source, Some(&mut contexts))
        .unwrap();

    let group = translated
        .root
        .children("modules")
        .find(|m| m.kind == "group")
        .unwrap();
    let embedded = group.field("workflow").and_then(Value::as_document).unwrap();
    assert_eq!(embedded.version, TARGET);
    assert_eq!(embedded.root.ids_of("module"), vec![1, 2]);
    assert!(references_resolve(&embedded.root));

    let root = contexts.root();
    let child = contexts.existing_child(root, &ScopeKey::Group(3)).unwrap();
    assert_eq!(contexts.remap(child).get("module", 10), Some(1));
    assert_eq!(contexts.remap(child).get("module", 20), Some(2));
    // Hooks registered for the call are gone afterwards.
    assert!(contexts.translators(root).is_empty());
    assert!(contexts.translators(child).is_empty());
}

#[test]
fn test_revisited_group_reuses_child_scope() {
    let migrator = migrator();
    let first = pipeline(vec![module(10, "A"), module(20, "B")], Vec::new());
    let second = pipeline(
        vec![module(10, "A"), module(20, "B"), module(30, "C")],
        Vec::new(),
    );
    let change = Entity::with_id("change", 2)
        .with_field("what", "group")
        .with_field("data", group(3, second));
    let source = history(vec![
        action(1, 0, vec![add(1, group(3, first))]),
        action(2, 1, vec![change]),
    ]);

    let mut contexts = TranslationContext::new();
    let translated = migrator
        .translate_history(&source, Some(&mut contexts))
        .unwrap();

    let embedded: Vec<Vec<i64>> = translated
        .root
        .children("actions")
        .flat_map(|a| a.children("operations"))
        .filter_map(|op| op.field("data").and_then(Value::as_entity))
        .filter_map(|g| g.field("workflow").and_then(Value::as_document))
        .map(|doc| doc.root.ids_of("module"))
        .collect();
    assert_eq!(embedded, vec![vec![1, 2], vec![1, 2, 3]]);

    // One child scope, keyed by the group's source id.
    let root = contexts.root();
    let groups: Vec<_> = contexts
        .children(root)
        .filter(|(key, _)| matches!(key, ScopeKey::Group(_)))
        .collect();
    assert_eq!(groups.len(), 1);
}

#[test]
fn test_mechanical_changes_applied() {
    let migrator = migrator();
    let source = pipeline(
        vec![module(1, "Reader")
            .with_field("package", "basic")
            .with_field("cache", true)],
        Vec::new(),
    );

    let translated = migrator.translate_pipeline(&source, None).unwrap();
    let reader = translated.root.children("modules").next().unwrap();
    assert_eq!(reader.str_field("package_name"), Some("basic"));
    assert!(reader.field("cache").is_none());
}

#[test]
fn test_merged_kinds_keep_distinct_ids() {
    let mut set = mappings();
    for mapping in &mut set.documents {
        if mapping.document == lineage_core::DocumentKind::Pipeline {
            if let Some(abstraction) = mapping.kinds.remove("abstraction") {
                mapping.kinds.insert("abstraction".into(), abstraction.renamed("module"));
            }
        }
    }
    let migrator = Migrator::from_mappings(set).unwrap();

    // Module 2 and abstraction 2 collide once both are modules.
    let link = Entity::with_id("connection", 1)
        .with_field("source", Value::reference("module", 2))
        .with_field("destination", Value::reference("abstraction", 2));
    let source = pipeline(
        vec![module(2, "Reader"), abstraction(2, "Filter", "ns", 7)],
        vec![link],
    );

    let mut contexts = TranslationContext::new();
    let translated = migrator
        .translate_pipeline(&source, Some(&mut contexts))
        .unwrap();

    assert_eq!(translated.root.ids_of("module"), vec![1, 2]);
    assert_eq!(translated.root.count_kind("abstraction"), 0);
    let connection = translated.root.children("connections").next().unwrap();
    assert_eq!(connection.field("source"), Some(&Value::reference("module", 1)));
    assert_eq!(connection.field("destination"), Some(&Value::reference("module", 2)));
    assert!(references_resolve(&translated.root));

    let remap = contexts.remap(contexts.root());
    assert_eq!(remap.get("module", 2), Some(1));
    assert_eq!(remap.get("abstraction", 2), Some(2));
    assert!(remap.is_injective());
}

#[test]
fn test_largest_sub_id_survives_translation() {
    let migrator = migrator();
    let source = history(vec![action(
        1,
        0,
        vec![add(1, port_spec(1, &[i64::MAX]))],
    )]);

    let translated = migrator.translate_history(&source, None).unwrap();
    assert_eq!(translated.root.count_kind("port_spec_item"), 1);
}
