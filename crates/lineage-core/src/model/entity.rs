//! Entities, values and typed references.

use super::document::Document;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A typed reference to an entity: the unit of identity used for remapping.
///
/// Ids of different kinds may collide numerically and are never conflated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity kind.
    pub kind: String,
    /// Id within (document, kind).
    pub id: i64,
}

impl EntityRef {
    /// Create a new reference.
    pub fn new(kind: impl Into<String>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A field value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point.
    Float(f64),
    /// String.
    Str(String),
    /// Cross-reference to another entity of the same document.
    Ref(EntityRef),
    /// Owned child entity.
    Entity(Box<Entity>),
    /// Ordered list of values.
    List(Vec<Value>),
    /// Whole embedded sub-document, translated in its own scope.
    Document(Box<Document>),
}

impl Value {
    /// Build a reference value.
    pub fn reference(kind: impl Into<String>, id: i64) -> Self {
        Value::Ref(EntityRef::new(kind, id))
    }

    /// Build a string value.
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Build a list of child entities.
    pub fn entities(items: impl IntoIterator<Item = Entity>) -> Self {
        Value::List(items.into_iter().map(Value::from).collect())
    }

    /// Check for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer payload, if any.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// String payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Reference payload, if any.
    pub fn as_entity_ref(&self) -> Option<&EntityRef> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// Child entity payload, if any.
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Value::Entity(e) => Some(e),
            _ => None,
        }
    }

    /// Embedded document payload, if any.
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    /// Interpret an integer or a decimal string as an id.
    pub fn as_id(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn visit_entities<F: FnMut(&Entity)>(&self, f: &mut F) {
        match self {
            Value::Entity(e) => e.visit(f),
            Value::List(items) => items.iter().for_each(|v| v.visit_entities(f)),
            _ => {}
        }
    }

    fn visit_entities_mut<F: FnMut(&mut Entity)>(&mut self, f: &mut F) {
        match self {
            Value::Entity(e) => e.visit_mut(f),
            Value::List(items) => items.iter_mut().for_each(|v| v.visit_entities_mut(f)),
            _ => {}
        }
    }
}

impl From<Entity> for Value {
    fn from(entity: Entity) -> Self {
        Value::Entity(Box::new(entity))
    }
}

impl From<Document> for Value {
    fn from(document: Document) -> Self {
        Value::Document(Box::new(document))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// A typed, optionally id-bearing node of a document graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity kind.
    pub kind: String,
    /// Id, unique within (document, kind). `None` for entities without identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Fields keyed by name.
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    /// Kind the id belongs to when a structural update renamed the entity.
    ///
    /// Set between the update and the copy only; never serialized.
    #[serde(skip)]
    pub source_kind: Option<String>,
}

impl Entity {
    /// Create an entity without identity.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            fields: BTreeMap::new(),
            source_kind: None,
        }
    }

    /// Create an identity-bearing entity.
    pub fn with_id(kind: impl Into<String>, id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::new(kind)
        }
    }

    /// Set a field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Kind the id of this entity is keyed by in a remap.
    pub fn identity_kind(&self) -> &str {
        self.source_kind.as_deref().unwrap_or(&self.kind)
    }

    /// Typed reference to this entity, if it bears an id.
    pub fn entity_ref(&self) -> Option<EntityRef> {
        self.id.map(|id| EntityRef::new(self.kind.clone(), id))
    }

    /// Get a field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Get a field mutably.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    /// Set a field, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Get a string field.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// Iterate the child entities stored in a list field.
    pub fn children<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Entity> + 'a {
        let items: &'a [Value] = match self.fields.get(name) {
            Some(Value::List(items)) => items,
            _ => &[],
        };
        items.iter().filter_map(Value::as_entity)
    }

    /// Iterate the child entities stored in a list field, mutably.
    pub fn children_mut<'a>(&'a mut self, name: &str) -> impl Iterator<Item = &'a mut Entity> + 'a {
        let items: &'a mut [Value] = match self.fields.get_mut(name) {
            Some(Value::List(items)) => items,
            _ => &mut [],
        };
        items.iter_mut().filter_map(|v| match v {
            Value::Entity(e) => Some(&mut **e),
            _ => None,
        })
    }

    /// Visit this entity and every nested entity, pre-order.
    ///
    /// Embedded documents are not entered: they belong to their own scope.
    pub fn visit<F: FnMut(&Entity)>(&self, f: &mut F) {
        f(self);
        for value in self.fields.values() {
            value.visit_entities(f);
        }
    }

    /// Mutable variant of [`Entity::visit`].
    pub fn visit_mut<F: FnMut(&mut Entity)>(&mut self, f: &mut F) {
        f(self);
        for value in self.fields.values_mut() {
            value.visit_entities_mut(f);
        }
    }

    /// Count nested entities of a kind, this one included.
    pub fn count_kind(&self, kind: &str) -> usize {
        let mut count = 0;
        self.visit(&mut |e| {
            if e.kind == kind {
                count += 1;
            }
        });
        count
    }

    /// Collect the ids of nested entities of a kind, in visit order.
    pub fn ids_of(&self, kind: &str) -> Vec<i64> {
        let mut ids = Vec::new();
        self.visit(&mut |e| {
            if e.kind == kind {
                ids.extend(e.id);
            }
        });
        ids
    }
}
