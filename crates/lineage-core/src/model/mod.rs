//! Document model.
//!
//! Documents are trees of typed entities whose ids are unique only within
//! (document, kind); entities point at each other with typed references.

mod bundle;
mod document;
mod entity;
pub mod kinds;

pub use bundle::{Bundle, SubPipeline};
pub use document::{Document, DocumentKind};
pub use entity::{Entity, EntityRef, Value};
