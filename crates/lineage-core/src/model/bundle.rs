//! Bundles of related documents.

use super::document::Document;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A reusable sub-pipeline shipped inside a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPipeline {
    /// Stored reference string, e.g. `abstraction_Filter_<uuid>.xml`.
    pub reference: String,
    /// The sub-pipeline's own history document.
    pub history: Document,
}

impl SubPipeline {
    /// Create a sub-pipeline entry.
    pub fn new(reference: impl Into<String>, history: Document) -> Self {
        Self {
            reference: reference.into(),
            history,
        }
    }
}

/// The set of related documents produced and consumed together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    /// Workflow history.
    #[serde(default)]
    pub history: Option<Document>,
    /// Standalone pipeline materialized from the history.
    #[serde(default)]
    pub pipeline: Option<Document>,
    /// Execution log.
    #[serde(default)]
    pub log: Option<Document>,
    /// Type registry.
    #[serde(default)]
    pub registry: Option<Document>,
    /// Parameter mashups.
    #[serde(default)]
    pub mashups: Vec<Document>,
    /// Reusable sub-pipelines referenced by abstraction nodes.
    #[serde(default)]
    pub subpipelines: Vec<SubPipeline>,
    /// Legacy standalone abstraction documents, carried through untranslated.
    #[serde(default)]
    pub abstractions: Vec<Document>,
}

impl Bundle {
    /// Create an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the history document.
    pub fn with_history(mut self, history: Document) -> Self {
        self.history = Some(history);
        self
    }

    /// Set the standalone pipeline.
    pub fn with_pipeline(mut self, pipeline: Document) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Set the log.
    pub fn with_log(mut self, log: Document) -> Self {
        self.log = Some(log);
        self
    }

    /// Set the registry.
    pub fn with_registry(mut self, registry: Document) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Add a mashup.
    pub fn with_mashup(mut self, mashup: Document) -> Self {
        self.mashups.push(mashup);
        self
    }

    /// Add a sub-pipeline.
    pub fn with_subpipeline(mut self, subpipeline: SubPipeline) -> Self {
        self.subpipelines.push(subpipeline);
        self
    }

    /// Add a legacy abstraction document.
    pub fn with_abstraction(mut self, abstraction: Document) -> Self {
        self.abstractions.push(abstraction);
        self
    }

    /// Check if the bundle carries no documents.
    pub fn is_empty(&self) -> bool {
        self.history.is_none()
            && self.pipeline.is_none()
            && self.log.is_none()
            && self.registry.is_none()
            && self.mashups.is_empty()
            && self.subpipelines.is_empty()
            && self.abstractions.is_empty()
    }

    /// Iterate every document in the bundle.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.subpipelines
            .iter()
            .map(|s| &s.history)
            .chain(self.history.iter())
            .chain(self.pipeline.iter())
            .chain(self.mashups.iter())
            .chain(self.log.iter())
            .chain(self.registry.iter())
            .chain(self.abstractions.iter())
    }

    /// Decode from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty JSON encoding.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
