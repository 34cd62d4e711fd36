//! Id scopes, remap tables and translation contexts.

mod context;
mod id_scope;
mod remap;

pub use context::{
    ContextId, EmbeddingGuard, HookFn, HookKey, HookTable, LocalTranslators, ScopeKey,
    TranslationContext, Translator,
};
pub use id_scope::{IdScope, DEFAULT_BEGIN_ID};
pub use remap::IdRemap;
