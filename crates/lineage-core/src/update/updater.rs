//! Table-driven structural updater.

use super::mapping::VersionMapping;
use super::{HookCx, StructuralUpdater};
use crate::copier::settle_kinds;
use crate::error::Result;
use crate::model::{Document, DocumentKind, Entity, Value};
use crate::scope::HookKey;
use std::collections::BTreeMap;

/// Structural updater driven by a [`VersionMapping`].
///
/// Walks the source graph, renaming kinds and fields per the table and
/// dropping and adding fields. A renamed entity remembers its source kind and
/// references keep naming source kinds, so ids of merged kinds stay apart
/// until the copier assigns target ids and target kinds. A field with an
/// active hook is produced by the hook instead; hooks on target-only fields
/// receive the source entity and replace the table default.
#[derive(Debug, Clone)]
pub struct MappingUpdater {
    mapping: VersionMapping,
}

impl MappingUpdater {
    /// Create an updater from a table.
    pub fn new(mapping: VersionMapping) -> Self {
        Self { mapping }
    }

    /// The table in use.
    pub fn mapping(&self) -> &VersionMapping {
        &self.mapping
    }

    fn update_entity(&self, source: &Entity, cx: &mut HookCx<'_>) -> Result<Entity> {
        let kind_mapping = self.mapping.kind(&source.kind);
        let mut fields = BTreeMap::new();

        for (field, value) in &source.fields {
            if kind_mapping.is_some_and(|m| m.dropped.contains(field)) {
                continue;
            }
            let name = kind_mapping.map_or(field.as_str(), |m| m.target_field(field));
            let mapped = match cx.translator(&source.kind, field) {
                Some(translator) => translator.call(source, cx)?,
                None => self.update_value(value, cx)?,
            };
            fields.insert(name.to_string(), mapped);
        }

        if let Some(kind_mapping) = kind_mapping {
            for (field, default) in &kind_mapping.added {
                if fields.contains_key(field) {
                    continue;
                }
                let value = match cx.translator(&source.kind, field) {
                    Some(translator) => translator.call(source, cx)?,
                    None => default.clone(),
                };
                fields.insert(field.clone(), value);
            }
        }

        let kind = self.mapping.target_kind(source);
        let source_kind = (kind != source.kind).then(|| source.identity_kind().to_string());
        Ok(Entity {
            kind,
            id: source.id,
            fields,
            source_kind,
        })
    }

    fn update_value(&self, value: &Value, cx: &mut HookCx<'_>) -> Result<Value> {
        Ok(match value {
            Value::Entity(entity) => Value::Entity(Box::new(self.update_entity(entity, cx)?)),
            Value::List(items) => Value::List(
                items
                    .iter()
                    .map(|item| self.update_value(item, cx))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Document(doc) => {
                let mut root = self.update_entity(&doc.root, cx)?;
                settle_kinds(&mut root, &self.kind_renames());
                Value::Document(Box::new(Document {
                    kind: doc.kind,
                    version: doc.version.clone(),
                    root,
                }))
            }
            scalar => scalar.clone(),
        })
    }
}

impl StructuralUpdater for MappingUpdater {
    fn document_kind(&self) -> DocumentKind {
        self.mapping.document
    }

    fn recognizes(&self, key: &HookKey) -> bool {
        self.mapping.recognizes(key)
    }

    fn kind_renames(&self) -> BTreeMap<String, String> {
        self.mapping.kind_renames()
    }

    fn update(&self, source: &Entity, cx: &mut HookCx<'_>) -> Result<Entity> {
        self.update_entity(source, cx)
    }
}
