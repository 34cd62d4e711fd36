//! Version mapping tables.
//!
//! A [`VersionMapping`] describes, for one document kind and one adjacent
//! version pair, how source entity kinds and fields map onto the target
//! schema. Tables are data: they load from JSON and carry no behavior beyond
//! what [`super::MappingUpdater`] does with them.

use crate::error::{MigrationError, Result};
use crate::model::{DocumentKind, Entity, Value};
use crate::scope::HookKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Chooses a target kind from the value of a source field.
///
/// Used where one source kind splits into several target kinds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitRule {
    /// Source field inspected.
    pub field: String,
    /// Field value to target kind.
    pub cases: BTreeMap<String, String>,
}

/// How one source kind maps onto the target schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindMapping {
    /// Target kind name; several source kinds renamed to one target merge.
    pub rename: Option<String>,
    /// Value-dependent target kind, consulted before `rename`.
    pub split: Option<SplitRule>,
    /// Source fields this kind is known to carry.
    pub fields: BTreeSet<String>,
    /// Source field to target field.
    pub field_renames: BTreeMap<String, String>,
    /// Source fields with no target counterpart.
    pub dropped: BTreeSet<String>,
    /// Fields new in the target schema, with their defaults.
    pub added: BTreeMap<String, Value>,
}

impl KindMapping {
    /// Create an empty mapping (kind and fields carried over as-is).
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare known source fields.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Rename the kind.
    pub fn renamed(mut self, target: impl Into<String>) -> Self {
        self.rename = Some(target.into());
        self
    }

    /// Split the kind on a field value.
    pub fn split_on(mut self, field: impl Into<String>, cases: BTreeMap<String, String>) -> Self {
        self.split = Some(SplitRule {
            field: field.into(),
            cases,
        });
        self
    }

    /// Rename a field.
    pub fn rename_field(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into();
        self.fields.insert(from.clone());
        self.field_renames.insert(from, to.into());
        self
    }

    /// Drop a field.
    pub fn drop_field(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.fields.insert(field.clone());
        self.dropped.insert(field);
        self
    }

    /// Add a target-only field with a default.
    pub fn add_field(mut self, field: impl Into<String>, default: impl Into<Value>) -> Self {
        self.added.insert(field.into(), default.into());
        self
    }

    /// Check whether a field is known on this kind.
    pub fn knows_field(&self, field: &str) -> bool {
        self.fields.contains(field) || self.added.contains_key(field)
    }

    /// Target name of a source field.
    pub fn target_field<'a>(&'a self, field: &'a str) -> &'a str {
        self.field_renames
            .get(field)
            .map(String::as_str)
            .unwrap_or(field)
    }
}

/// Mapping of every kind of one document kind for one version pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionMapping {
    /// Document kind this table applies to.
    pub document: DocumentKind,
    /// Source kind to mapping. Undeclared kinds pass through unchanged.
    #[serde(default)]
    pub kinds: BTreeMap<String, KindMapping>,
}

impl VersionMapping {
    /// Create an empty table.
    pub fn new(document: DocumentKind) -> Self {
        Self {
            document,
            kinds: BTreeMap::new(),
        }
    }

    /// Declare a kind.
    pub fn with_kind(mut self, kind: impl Into<String>, mapping: KindMapping) -> Self {
        self.kinds.insert(kind.into(), mapping);
        self
    }

    /// Mapping of a source kind.
    pub fn kind(&self, kind: &str) -> Option<&KindMapping> {
        self.kinds.get(kind)
    }

    /// Check whether this table declares the hook's kind and field.
    pub fn recognizes(&self, key: &HookKey) -> bool {
        self.kind(&key.kind)
            .is_some_and(|mapping| mapping.knows_field(&key.field))
    }

    /// Target kind of a source entity.
    pub fn target_kind(&self, source: &Entity) -> String {
        let Some(mapping) = self.kind(&source.kind) else {
            return source.kind.clone();
        };
        if let Some(split) = &mapping.split {
            let case = source
                .str_field(&split.field)
                .and_then(|value| split.cases.get(value));
            if let Some(target) = case {
                return target.clone();
            }
        }
        mapping.rename.clone().unwrap_or_else(|| source.kind.clone())
    }

    /// Source kind to target kind, for every renamed kind.
    pub fn kind_renames(&self) -> BTreeMap<String, String> {
        self.kinds
            .iter()
            .filter_map(|(kind, mapping)| Some((kind.clone(), mapping.rename.clone()?)))
            .collect()
    }

    /// Target kind of a reference to a source kind.
    ///
    /// Split rules need the referenced entity and are not applied here.
    pub fn target_ref_kind<'a>(&'a self, kind: &'a str) -> &'a str {
        self.kind(kind)
            .and_then(|mapping| mapping.rename.as_deref())
            .unwrap_or(kind)
    }

    fn validate(&self) -> Result<()> {
        for (kind, mapping) in &self.kinds {
            if mapping.rename.as_deref() == Some("") {
                return Err(MigrationError::Mapping(format!(
                    "{}: kind `{kind}` renamed to an empty name",
                    self.document
                )));
            }
            if let Some(field) = mapping.dropped.iter().find(|f| mapping.added.contains_key(*f)) {
                return Err(MigrationError::Mapping(format!(
                    "{}: field `{kind}.{field}` is both dropped and added",
                    self.document
                )));
            }
        }
        Ok(())
    }
}

/// All mapping tables for one adjacent version pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSet {
    /// Version documents are read in.
    pub source_version: String,
    /// Version documents are written in.
    pub target_version: String,
    /// One table per document kind.
    #[serde(default)]
    pub documents: Vec<VersionMapping>,
}

impl MappingSet {
    /// Create an empty set.
    pub fn new(source_version: impl Into<String>, target_version: impl Into<String>) -> Self {
        Self {
            source_version: source_version.into(),
            target_version: target_version.into(),
            documents: Vec::new(),
        }
    }

    /// Add a table.
    pub fn with_document(mut self, mapping: VersionMapping) -> Self {
        self.documents.push(mapping);
        self
    }

    /// Table for a document kind.
    pub fn document(&self, kind: DocumentKind) -> Option<&VersionMapping> {
        self.documents.iter().find(|m| m.document == kind)
    }

    /// Reject duplicate or malformed tables.
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for mapping in &self.documents {
            if !seen.insert(mapping.document) {
                return Err(MigrationError::Mapping(format!(
                    "duplicate table for {} documents",
                    mapping.document
                )));
            }
            mapping.validate()?;
        }
        Ok(())
    }

    /// Decode and validate from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let set: MappingSet = serde_json::from_str(json)?;
        set.validate()?;
        Ok(set)
    }
}
