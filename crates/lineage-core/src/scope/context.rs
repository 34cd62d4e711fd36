//! Translation contexts.
//!
//! A [`TranslationContext`] is an arena of context nodes. Each node owns an id
//! remap, a table of translator hooks and a set of named children for nested
//! scopes (one per embedded sub-document, one per bundle member, ...). Nodes
//! live for the duration of one top-level translation call, so revisiting the
//! same logical nested entity reuses its earlier assignments.
//!
//! Two drop guards provide scoped activation:
//! - [`LocalTranslators`] restores a node's hook table when it goes out of
//!   scope, whatever the exit path.
//! - [`EmbeddingGuard`] keeps the chain of nodes currently being translated
//!   and rejects re-entering one of them.

use super::remap::IdRemap;
use crate::error::{MigrationError, Result};
use crate::model::{Entity, Value};
use crate::update::HookCx;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

/// Signature of a translator hook.
pub type HookFn = dyn Fn(&Entity, &mut HookCx<'_>) -> Result<Value>;

/// A hook overriding how the structural updater maps one field.
#[derive(Clone)]
pub struct Translator {
    name: &'static str,
    func: Rc<HookFn>,
}

impl Translator {
    /// Wrap a hook function.
    pub fn new(
        name: &'static str,
        func: impl Fn(&Entity, &mut HookCx<'_>) -> Result<Value> + 'static,
    ) -> Self {
        Self {
            name,
            func: Rc::new(func),
        }
    }

    /// Diagnostic name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run the hook on a source entity.
    pub fn call(&self, source: &Entity, cx: &mut HookCx<'_>) -> Result<Value> {
        (self.func)(source, cx)
    }
}

impl fmt::Debug for Translator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translator").field("name", &self.name).finish()
    }
}

/// (entity kind, field) pair a translator is registered for.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HookKey {
    /// Source entity kind.
    pub kind: String,
    /// Source field name.
    pub field: String,
}

impl HookKey {
    /// Create a hook key.
    pub fn new(kind: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for HookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.field)
    }
}

/// Hooks keyed by (kind, field).
pub type HookTable = BTreeMap<HookKey, Translator>;

/// Handle to a node of a [`TranslationContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextId(usize);

/// Opaque key addressing a nested scope under its parent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScopeKey {
    /// A fixed role such as `log` or `workflow`.
    Named(String),
    /// The sub-document embedded in the group with this source id.
    Group(i64),
    /// The mashup with this source id.
    Mashup(i64),
    /// A reusable sub-pipeline.
    SubPipeline {
        /// Sub-pipeline name.
        name: String,
        /// Sub-pipeline namespace.
        namespace: String,
    },
}

impl ScopeKey {
    /// Build a [`ScopeKey::Named`] key.
    pub fn named(name: impl Into<String>) -> Self {
        ScopeKey::Named(name.into())
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKey::Named(name) => f.write_str(name),
            ScopeKey::Group(id) => write!(f, "group({id})"),
            ScopeKey::Mashup(id) => write!(f, "mashup({id})"),
            ScopeKey::SubPipeline { name, namespace } => {
                write!(f, "subpipeline({name}:{namespace})")
            }
        }
    }
}

#[derive(Debug, Default)]
struct ContextNode {
    key: Option<ScopeKey>,
    parent: Option<ContextId>,
    remap: IdRemap,
    translators: HookTable,
    children: BTreeMap<ScopeKey, ContextId>,
}

/// Tree of remap/hook scopes threaded through one translation call.
///
/// Independent translations must use independent contexts.
#[derive(Debug)]
pub struct TranslationContext {
    nodes: Vec<ContextNode>,
    embedding: Vec<ContextId>,
}

impl TranslationContext {
    /// Create a context holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![ContextNode::default()],
            embedding: Vec::new(),
        }
    }

    /// The root node.
    pub fn root(&self) -> ContextId {
        ContextId(0)
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A context always holds its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    fn node(&self, id: ContextId) -> &ContextNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: ContextId) -> &mut ContextNode {
        &mut self.nodes[id.0]
    }

    /// Parent of a node; `None` for the root.
    pub fn parent(&self, node: ContextId) -> Option<ContextId> {
        self.node(node).parent
    }

    /// Key of a node under its parent; `None` for the root.
    pub fn key(&self, node: ContextId) -> Option<&ScopeKey> {
        self.node(node).key.as_ref()
    }

    /// Look up a child, creating it when `create` is set.
    pub fn child_context(&mut self, node: ContextId, key: ScopeKey, create: bool) -> Option<ContextId> {
        if create {
            Some(self.child(node, key))
        } else {
            self.existing_child(node, &key)
        }
    }

    /// Look up or create a child.
    pub fn child(&mut self, node: ContextId, key: ScopeKey) -> ContextId {
        if let Some(child) = self.existing_child(node, &key) {
            return child;
        }
        let child = ContextId(self.nodes.len());
        self.nodes.push(ContextNode {
            key: Some(key.clone()),
            parent: Some(node),
            ..ContextNode::default()
        });
        self.node_mut(node).children.insert(key, child);
        child
    }

    /// Look up an existing child.
    pub fn existing_child(&self, node: ContextId, key: &ScopeKey) -> Option<ContextId> {
        self.node(node).children.get(key).copied()
    }

    /// Iterate the children of a node in key order.
    pub fn children(&self, node: ContextId) -> impl Iterator<Item = (&ScopeKey, ContextId)> {
        self.node(node).children.iter().map(|(k, v)| (k, *v))
    }

    /// Id remap of a node.
    pub fn remap(&self, node: ContextId) -> &IdRemap {
        &self.node(node).remap
    }

    /// Mutable id remap of a node.
    pub fn remap_mut(&mut self, node: ContextId) -> &mut IdRemap {
        &mut self.node_mut(node).remap
    }

    /// Copy of a node's remap without the given kinds.
    pub fn filter_remap(&self, node: ContextId, exclude: &BTreeSet<String>) -> IdRemap {
        self.remap(node).filtered(exclude)
    }

    /// Drop the given kinds from a node's remap.
    pub fn retain_shared(&mut self, node: ContextId, exclude: &BTreeSet<String>) {
        self.remap_mut(node).retain_shared(exclude);
    }

    /// Merge a remap into a node's remap.
    pub fn extend_remap(&mut self, node: ContextId, remap: &IdRemap) {
        self.remap_mut(node).extend(remap);
    }

    /// Register a hook on a node, replacing any previous one for the key.
    pub fn add_translator(
        &mut self,
        node: ContextId,
        kind: impl Into<String>,
        field: impl Into<String>,
        translator: Translator,
    ) {
        self.node_mut(node)
            .translators
            .insert(HookKey::new(kind, field), translator);
    }

    /// Check if a node has a hook for (kind, field).
    pub fn has_translator(&self, node: ContextId, kind: &str, field: &str) -> bool {
        self.translator(node, kind, field).is_some()
    }

    /// The hook a node has for (kind, field).
    pub fn translator(&self, node: ContextId, kind: &str, field: &str) -> Option<Translator> {
        self.node(node)
            .translators
            .get(&HookKey::new(kind, field))
            .cloned()
    }

    /// All hooks active on a node.
    pub fn translators(&self, node: ContextId) -> &HookTable {
        &self.node(node).translators
    }

    /// Copy `parent`'s hooks into `child`; entries of the parent win.
    pub fn inherit_translators(&mut self, child: ContextId, parent: ContextId) {
        let inherited = self.node(parent).translators.clone();
        self.node_mut(child).translators.extend(inherited);
    }

    /// Snapshot a node's hook table, to be restored when the guard drops.
    pub fn local_translators(&mut self, node: ContextId) -> LocalTranslators<'_> {
        let saved = self.node(node).translators.clone();
        LocalTranslators {
            contexts: self,
            node,
            saved,
        }
    }

    /// Enter a node on the embedding chain.
    ///
    /// Fails with [`MigrationError::EmbeddingCycle`] when the node is already
    /// being translated further up the chain.
    pub fn embed(&mut self, node: ContextId) -> Result<EmbeddingGuard<'_>> {
        if self.embedding.contains(&node) {
            let chain = self
                .embedding
                .iter()
                .chain(std::iter::once(&node))
                .map(|id| self.describe(*id))
                .collect();
            return Err(MigrationError::EmbeddingCycle { chain });
        }
        let depth = self.embedding.len();
        self.embedding.push(node);
        Ok(EmbeddingGuard {
            contexts: self,
            depth,
        })
    }

    /// Current embedding depth.
    pub fn embedding_depth(&self) -> usize {
        self.embedding.len()
    }

    /// Path of scope keys from the root to a node, e.g. `vistrail/group(3)`.
    pub fn describe(&self, node: ContextId) -> String {
        let mut keys = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(key) = self.key(id) {
                keys.push(key.to_string());
            }
            current = self.parent(id);
        }
        if keys.is_empty() {
            return "root".to_string();
        }
        keys.reverse();
        keys.join("/")
    }
}

impl Default for TranslationContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Restores a node's hook table on drop.
pub struct LocalTranslators<'a> {
    contexts: &'a mut TranslationContext,
    node: ContextId,
    saved: HookTable,
}

impl Deref for LocalTranslators<'_> {
    type Target = TranslationContext;

    fn deref(&self) -> &TranslationContext {
        self.contexts
    }
}

impl DerefMut for LocalTranslators<'_> {
    fn deref_mut(&mut self) -> &mut TranslationContext {
        self.contexts
    }
}

impl Drop for LocalTranslators<'_> {
    fn drop(&mut self) {
        let saved = std::mem::take(&mut self.saved);
        self.contexts.node_mut(self.node).translators = saved;
    }
}

/// Pops the embedding chain on drop.
pub struct EmbeddingGuard<'a> {
    contexts: &'a mut TranslationContext,
    depth: usize,
}

impl Deref for EmbeddingGuard<'_> {
    type Target = TranslationContext;

    fn deref(&self) -> &TranslationContext {
        self.contexts
    }
}

impl DerefMut for EmbeddingGuard<'_> {
    fn deref_mut(&mut self) -> &mut TranslationContext {
        self.contexts
    }
}

impl Drop for EmbeddingGuard<'_> {
    fn drop(&mut self) {
        self.contexts.embedding.truncate(self.depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: i64) -> Translator {
        Translator::new("constant", move |_, _| Ok(Value::Int(value)))
    }

    #[test]
    fn test_child_contexts_persist() {
        let mut contexts = TranslationContext::new();
        let root = contexts.root();

        assert_eq!(contexts.child_context(root, ScopeKey::Group(3), false), None);
        let child = contexts.child(root, ScopeKey::Group(3));
        contexts.remap_mut(child).insert("module", 1, 8);

        let again = contexts.child(root, ScopeKey::Group(3));
        assert_eq!(child, again);
        assert_eq!(contexts.remap(again).get("module", 1), Some(8));
        assert_eq!(contexts.parent(child), Some(root));
        assert_eq!(contexts.len(), 2);
    }

    #[test]
    fn test_describe_path() {
        let mut contexts = TranslationContext::new();
        let root = contexts.root();
        let vt = contexts.child(root, ScopeKey::named("vistrail"));
        let group = contexts.child(vt, ScopeKey::Group(4));

        assert_eq!(contexts.describe(root), "root");
        assert_eq!(contexts.describe(group), "vistrail/group(4)");
    }

    #[test]
    fn test_local_translators_restore_on_drop() {
        let mut contexts = TranslationContext::new();
        let root = contexts.root();
        contexts.add_translator(root, "action", "session", constant(1));

        {
            let mut local = contexts.local_translators(root);
            local.add_translator(root, "group", "workflow", constant(2));
            local.add_translator(root, "action", "session", constant(3));
            assert_eq!(local.translators(root).len(), 2);
        }

        assert_eq!(contexts.translators(root).len(), 1);
        assert!(!contexts.has_translator(root, "group", "workflow"));
    }

    #[test]
    fn test_local_translators_restore_on_error() {
        fn failing(contexts: &mut TranslationContext) -> Result<()> {
            let root = contexts.root();
            let mut local = contexts.local_translators(root);
            local.add_translator(root, "group", "workflow", constant(2));
            Err(MigrationError::invalid_document("boom"))
        }

        let mut contexts = TranslationContext::new();
        assert!(failing(&mut contexts).is_err());
        assert!(contexts.translators(contexts.root()).is_empty());
    }

    #[test]
    fn test_inherit_translators() {
        let mut contexts = TranslationContext::new();
        let root = contexts.root();
        let child = contexts.child(root, ScopeKey::Group(1));
        contexts.add_translator(root, "group", "workflow", constant(1));
        contexts.add_translator(child, "action", "session", constant(2));

        contexts.inherit_translators(child, root);
        assert!(contexts.has_translator(child, "group", "workflow"));
        assert!(contexts.has_translator(child, "action", "session"));
        assert!(!contexts.has_translator(root, "action", "session"));
    }

    #[test]
    fn test_embedding_cycle_detected() {
        let mut contexts = TranslationContext::new();
        let root = contexts.root();
        let a = contexts.child(root, ScopeKey::named("a"));
        let b = contexts.child(root, ScopeKey::named("b"));

        let mut outer = contexts.embed(a).unwrap();
        let mut inner = outer.embed(b).unwrap();
        let err = inner.embed(a).err().unwrap();
        match err {
            MigrationError::EmbeddingCycle { chain } => assert_eq!(chain, vec!["a", "b", "a"]),
            other => panic!("unexpected error: {other}"),
        }
        drop(inner);
        drop(outer);
        assert_eq!(contexts.embedding_depth(), 0);
        assert!(contexts.embed(a).is_ok());
    }

    #[test]
    fn test_filter_remap() {
        let mut contexts = TranslationContext::new();
        let root = contexts.root();
        contexts.remap_mut(root).insert("annotation", 5, 1);
        contexts.remap_mut(root).insert("module", 5, 2);

        let exclude: BTreeSet<String> = ["annotation".to_string()].into();
        let shared = contexts.filter_remap(root, &exclude);
        assert_eq!(shared.len(), 1);
        assert_eq!(contexts.remap(root).len(), 2);

        contexts.retain_shared(root, &exclude);
        assert_eq!(contexts.remap(root), &shared);
    }
}
