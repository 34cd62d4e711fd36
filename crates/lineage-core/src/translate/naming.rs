//! Sub-pipeline reference names.
//!
//! A bundled sub-pipeline is stored under a reference such as
//! `subworkflows/abstraction_Filter_1c2d3e4f-0000-4000-8000-00000000abcd.xml`.
//! Only the name and namespace matter for keying scopes; the rest is kept so
//! the reference can be rebuilt.

use crate::error::{MigrationError, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

const PATTERN: &str = r"^(?P<path>.*[/\\])?(?P<prefix>abstraction_)?(?P<name>.+?)(?:_(?P<namespace>[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}))?(?P<suffix>\.(?:xml|vt))?$";

static REFERENCE: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();

/// Parts of a sub-pipeline reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubPipelineName {
    /// Directory part, with its trailing separator.
    pub path: String,
    /// `abstraction_` when present.
    pub prefix: String,
    /// Sub-pipeline name.
    pub name: String,
    /// Namespace uuid; empty when the reference carries none.
    pub namespace: String,
    /// File suffix, with its dot.
    pub suffix: String,
}

impl fmt::Display for SubPipelineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.path, self.prefix, self.name)?;
        if !self.namespace.is_empty() {
            write!(f, "_{}", self.namespace)?;
        }
        f.write_str(&self.suffix)
    }
}

/// Split a stored sub-pipeline reference into its parts.
pub fn parse_subpipeline_name(reference: &str) -> Result<SubPipelineName> {
    let pattern = REFERENCE
        .get_or_init(|| Regex::new(PATTERN))
        .as_ref()
        .map_err(|err| MigrationError::InvalidBundle {
            message: format!("sub-pipeline name pattern: {err}"),
        })?;

    let captures = pattern
        .captures(reference)
        .ok_or_else(|| MigrationError::InvalidBundle {
            message: format!("unparseable sub-pipeline reference `{reference}`"),
        })?;
    let part = |group: &str| {
        captures
            .name(group)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    };

    Ok(SubPipelineName {
        path: part("path"),
        prefix: part("prefix"),
        name: part("name"),
        namespace: part("namespace"),
        suffix: part("suffix"),
    })
}
