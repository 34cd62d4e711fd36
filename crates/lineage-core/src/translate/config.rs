//! Migration configuration.

use crate::model::kinds;
use std::collections::BTreeSet;

/// Target id the first history action is pinned to.
pub const ROOT_VERSION: i64 = 0;

/// Annotation key whose value names the action an upgrade replaced.
pub const UPGRADE_ANNOTATION: &str = "__upgrade__";

/// How duplicate port-spec-item sub-ids are repaired before translation.
///
/// Sub-ids are not tracked as first-class references, so repairing them never
/// touches another entity. The two policies come from different adjacent
/// version pairs and are kept apart on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubIdPolicy {
    /// Give every item a fresh sub-id.
    Unconditional,
    /// Give an item a fresh sub-id only when its sub-id was already seen.
    OnCollision,
}

impl SubIdPolicy {
    /// Policy used when upgrading from `source_version`.
    pub fn for_source_version(source_version: &str) -> Self {
        match source_version {
            "1.0.4" => SubIdPolicy::Unconditional,
            _ => SubIdPolicy::OnCollision,
        }
    }
}

/// Migration configuration for one adjacent version pair.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Version documents are read in.
    pub source_version: String,
    /// Version stamped on every translated document.
    pub target_version: String,
    /// Target id of the root action.
    pub root_version: i64,
    /// Sub-id repair policy.
    pub sub_id_policy: SubIdPolicy,
    /// Kinds whose ids never cross a document boundary inside a bundle.
    pub private_kinds: BTreeSet<String>,
    /// Key of the action annotation rewritten after the copy.
    pub upgrade_annotation_key: String,
}

impl MigrationConfig {
    /// Configuration for upgrading `source_version` documents to `target_version`.
    pub fn for_pair(source_version: impl Into<String>, target_version: impl Into<String>) -> Self {
        let source_version = source_version.into();
        Self {
            sub_id_policy: SubIdPolicy::for_source_version(&source_version),
            source_version,
            target_version: target_version.into(),
            root_version: ROOT_VERSION,
            private_kinds: [kinds::ANNOTATION.to_string()].into(),
            upgrade_annotation_key: UPGRADE_ANNOTATION.to_string(),
        }
    }

    /// Set the root action target id.
    pub fn with_root_version(mut self, root_version: i64) -> Self {
        self.root_version = root_version;
        self
    }

    /// Override the sub-id repair policy.
    pub fn with_sub_id_policy(mut self, policy: SubIdPolicy) -> Self {
        self.sub_id_policy = policy;
        self
    }

    /// Replace the set of document-private kinds.
    pub fn with_private_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.private_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    /// Set the upgrade annotation key.
    pub fn with_upgrade_annotation_key(mut self, key: impl Into<String>) -> Self {
        self.upgrade_annotation_key = key.into();
        self
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self::for_pair("1.0.5", "2.0.0")
    }
}
