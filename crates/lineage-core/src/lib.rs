//! Lineage Core - schema-version migration for graph documents.
//!
//! This crate upgrades history, pipeline, log, registry, mashup and startup
//! documents (or a bundle of related ones) from one schema version to the
//! next, reassigning ids so they stay collision-free and internally
//! consistent while embedded sub-documents are migrated recursively.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod copier;
pub mod error;
pub mod model;
pub mod scope;
pub mod translate;
pub mod update;

pub use copier::DocumentCopier;
pub use error::{MigrationError, Result};
pub use model::{Bundle, Document, DocumentKind, Entity, EntityRef, SubPipeline, Value};
pub use scope::{ContextId, HookKey, IdRemap, IdScope, ScopeKey, TranslationContext, Translator};
pub use translate::{
    parse_subpipeline_name, MigrationConfig, Migrator, SubIdPolicy, SubPipelineName, ROOT_VERSION,
};
pub use update::{
    HookCx, KindMapping, MappingSet, MappingUpdater, StructuralUpdater, UpdaterSet, VersionMapping,
};
