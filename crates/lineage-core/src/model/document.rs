//! Versioned documents.

use super::entity::Entity;
use crate::error::{MigrationError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of document the engine migrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Version history of one workflow.
    History,
    /// One concrete executable node/edge graph.
    Pipeline,
    /// Execution log.
    Log,
    /// Type/port registry.
    Registry,
    /// Parameter-mashup definitions.
    Mashup,
    /// Startup configuration.
    Startup,
}

impl DocumentKind {
    /// All document kinds.
    pub const ALL: [DocumentKind; 6] = [
        DocumentKind::History,
        DocumentKind::Pipeline,
        DocumentKind::Log,
        DocumentKind::Registry,
        DocumentKind::Mashup,
        DocumentKind::Startup,
    ];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::History => "history",
            DocumentKind::Pipeline => "pipeline",
            DocumentKind::Log => "log",
            DocumentKind::Registry => "registry",
            DocumentKind::Mashup => "mashup",
            DocumentKind::Startup => "startup",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self> {
        DocumentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| MigrationError::invalid_document(format!("unknown document kind `{s}`")))
    }
}

/// A versioned tree of entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// What this document is.
    pub kind: DocumentKind,
    /// Schema version identifier.
    pub version: String,
    /// Root entity.
    pub root: Entity,
}

impl Document {
    /// Create a document.
    pub fn new(kind: DocumentKind, version: impl Into<String>, root: Entity) -> Self {
        Self {
            kind,
            version: version.into(),
            root,
        }
    }

    /// Fail unless this document has the given kind.
    pub fn expect_kind(&self, expected: DocumentKind) -> Result<()> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(MigrationError::DocumentKindMismatch {
                expected,
                found: self.kind,
            })
        }
    }

    /// Canonical JSON encoding.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Content fingerprint: blake3 of the canonical JSON encoding, hex encoded.
    ///
    /// Field maps are ordered, so equal documents always hash equal.
    pub fn fingerprint(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(blake3::hash(&bytes).as_bytes()))
    }
}
