//! Migration error types.

use crate::model::DocumentKind;
use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, MigrationError>;

/// Errors raised while translating documents between schema versions.
///
/// Every variant is fatal: translation is deterministic, so nothing is retried
/// and the source document is never touched.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A cross-reference could not be resolved against the final id remap.
    #[error("unresolved reference to {kind} {id} ({context})")]
    UnresolvedReference {
        /// Entity kind of the dangling reference.
        kind: String,
        /// Source id that has no remap entry.
        id: i64,
        /// Where the reference was found.
        context: String,
    },

    /// A translator hook names a (kind, field) pair no updater recognizes.
    #[error("no structural updater recognizes hook on {kind}.{field}")]
    HookContractViolation {
        /// Entity kind the hook was registered for.
        kind: String,
        /// Field the hook was registered for.
        field: String,
    },

    /// A sub-document eventually re-embeds its own container.
    #[error("embedding cycle detected: {}", chain.join(" -> "))]
    EmbeddingCycle {
        /// Scope keys along the embedding chain, ending with the repeated one.
        chain: Vec<String>,
    },

    /// An id counter has no ids left to hand out.
    #[error("id space exhausted for {kind}")]
    IdSpaceExhausted {
        /// Counter that ran out.
        kind: String,
    },

    /// A translator was handed a document of the wrong kind.
    #[error("expected a {expected} document, found {found}")]
    DocumentKindMismatch {
        /// Kind the entry point translates.
        expected: DocumentKind,
        /// Kind of the document that was passed in.
        found: DocumentKind,
    },

    /// No structural updater is registered for a document kind.
    #[error("no structural updater registered for {kind} documents")]
    MissingUpdater {
        /// The document kind without an updater.
        kind: DocumentKind,
    },

    /// The document content is malformed.
    #[error("invalid document: {message}")]
    InvalidDocument {
        /// Description of the problem.
        message: String,
    },

    /// The bundle content is malformed.
    #[error("invalid bundle: {message}")]
    InvalidBundle {
        /// Description of the problem.
        message: String,
    },

    /// A version mapping table is malformed.
    #[error("invalid version mapping: {0}")]
    Mapping(String),

    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrationError {
    /// Shorthand for [`MigrationError::InvalidDocument`].
    pub fn invalid_document(message: impl Into<String>) -> Self {
        MigrationError::InvalidDocument {
            message: message.into(),
        }
    }

    /// Shorthand for [`MigrationError::UnresolvedReference`].
    pub fn unresolved(kind: impl Into<String>, id: i64, context: impl Into<String>) -> Self {
        MigrationError::UnresolvedReference {
            kind: kind.into(),
            id,
            context: context.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_display() {
        let err = MigrationError::unresolved("action", 42, "upgrade annotation");
        assert_eq!(
            err.to_string(),
            "unresolved reference to action 42 (upgrade annotation)"
        );
    }

    #[test]
    fn test_cycle_display() {
        let err = MigrationError::EmbeddingCycle {
            chain: vec!["subpipeline(a)".into(), "subpipeline(b)".into(), "subpipeline(a)".into()],
        };
        assert!(err.to_string().contains("subpipeline(a) -> subpipeline(b) -> subpipeline(a)"));
    }

    #[test]
    fn test_kind_mismatch_display() {
        let err = MigrationError::DocumentKindMismatch {
            expected: DocumentKind::History,
            found: DocumentKind::Log,
        };
        assert_eq!(err.to_string(), "expected a history document, found log");
    }
}
