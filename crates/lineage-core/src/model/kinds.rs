//! Well-known entity kinds and field names.
//!
//! Kinds are plain strings so version mappings can introduce new ones; these
//! constants name the ones the translators attach behavior to.

/// A recorded edit in a history document.
pub const ACTION: &str = "action";
/// Untyped operation counter shared by add/change/delete.
pub const OPERATION: &str = "operation";
/// Operation adding an entity.
pub const ADD: &str = "add";
/// Operation replacing an entity.
pub const CHANGE: &str = "change";
/// Operation removing an entity.
pub const DELETE: &str = "delete";
/// Pipeline node.
pub const MODULE: &str = "module";
/// Embedding node: inlines a whole pipeline.
pub const GROUP: &str = "group";
/// Reusable-reference node: points at a named, versioned sub-pipeline.
pub const ABSTRACTION: &str = "abstraction";
/// Pipeline edge.
pub const CONNECTION: &str = "connection";
/// Free-form key/value note; ids are private to each document.
pub const ANNOTATION: &str = "annotation";
/// Note attached to an action in a history document.
pub const ACTION_ANNOTATION: &str = "action_annotation";
/// User-facing variable whose id must survive migration.
pub const VARIABLE: &str = "variable";
/// Port specification.
pub const PORT_SPEC: &str = "port_spec";
/// Item of a port specification; not referenced individually.
pub const PORT_SPEC_ITEM: &str = "port_spec_item";
/// Pseudo-kind used to memoize sub-pipeline internal versions.
pub const INTERNAL_VERSION: &str = "internal_version";

/// Log item kinds sharing one counter.
pub const ITEM_EXEC: &str = "item_exec";
/// Execution of a single module.
pub const MODULE_EXEC: &str = "module_exec";
/// Execution of a group.
pub const GROUP_EXEC: &str = "group_exec";
/// Execution of one loop iteration.
pub const LOOP_EXEC: &str = "loop_exec";

/// Field names the translators read or write.
pub mod fields {
    /// Ordered actions of a history document.
    pub const ACTIONS: &str = "actions";
    /// Ordered operations of an action.
    pub const OPERATIONS: &str = "operations";
    /// Position of an operation within its action.
    pub const POS: &str = "pos";
    /// Legacy session nonce on an action.
    pub const SESSION: &str = "session";
    /// Kind of entity an operation touches.
    pub const WHAT: &str = "what";
    /// Entity payload of an add/change operation.
    pub const DATA: &str = "data";
    /// Embedded pipeline of a group.
    pub const WORKFLOW: &str = "workflow";
    /// Name of a reusable sub-pipeline.
    pub const NAME: &str = "name";
    /// Namespace of a reusable sub-pipeline.
    pub const NAMESPACE: &str = "namespace";
    /// Pinned version of a reusable sub-pipeline.
    pub const INTERNAL_VERSION: &str = "internal_version";
    /// Items of a port spec.
    pub const PORT_SPEC_ITEMS: &str = "port_spec_items";
    /// Action annotations of a history document.
    pub const ACTION_ANNOTATIONS: &str = "action_annotations";
    /// Variables of a history document.
    pub const VARIABLES: &str = "variables";
    /// Annotation key.
    pub const KEY: &str = "key";
    /// Annotation value.
    pub const VALUE: &str = "value";
}
