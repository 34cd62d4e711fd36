//! Fresh-id authority for one target document.

use crate::error::{MigrationError, Result};
use std::collections::BTreeMap;

/// First id handed out by a default scope; 0 stays free for root sentinels.
pub const DEFAULT_BEGIN_ID: i64 = 1;

/// Counter name reported when the untyped counter runs out.
const FREE_COUNTER: &str = "free";

/// Mints fresh, never-reused ids per entity kind.
///
/// Kinds may be aliased so that several source kinds draw from one counter
/// (e.g. groups and abstractions share the module counter of a pipeline).
///
/// A counter holds the next id it hands out, or `None` once `i64::MAX` has
/// been handed out or reserved. Minting from an exhausted counter fails with
/// [`MigrationError::IdSpaceExhausted`]; reserving never fails.
#[derive(Debug, Clone)]
pub struct IdScope {
    begin_id: i64,
    next: BTreeMap<String, Option<i64>>,
    aliases: BTreeMap<String, String>,
    free: Option<i64>,
}

impl IdScope {
    /// Create a scope whose counters begin at [`DEFAULT_BEGIN_ID`].
    pub fn new() -> Self {
        Self::with_begin_id(DEFAULT_BEGIN_ID)
    }

    /// Create a scope whose counters begin at `begin_id`.
    pub fn with_begin_id(begin_id: i64) -> Self {
        Self {
            begin_id,
            next: BTreeMap::new(),
            aliases: BTreeMap::new(),
            free: Some(begin_id),
        }
    }

    /// Make `kind` draw from the counter of `target`.
    pub fn with_alias(mut self, kind: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.insert(kind.into(), target.into());
        self
    }

    /// Counter a kind draws from.
    pub fn counter_of<'a>(&'a self, kind: &'a str) -> &'a str {
        self.aliases.get(kind).map(String::as_str).unwrap_or(kind)
    }

    /// Mint a fresh id for `kind`.
    pub fn new_id(&mut self, kind: &str) -> Result<i64> {
        let begin_id = self.begin_id;
        let counter = self.counter_of(kind).to_string();
        let next = self.next.entry(counter.clone()).or_insert(Some(begin_id));
        take_next(next, &counter)
    }

    /// Mint a fresh id from the untyped counter (session tokens and the like).
    pub fn new_free_id(&mut self) -> Result<i64> {
        take_next(&mut self.free, FREE_COUNTER)
    }

    /// Ensure `id` is never minted for `kind` by moving its counter past it.
    pub fn reserve(&mut self, kind: &str, id: i64) {
        let begin_id = self.begin_id;
        let counter = self.counter_of(kind).to_string();
        let next = self.next.entry(counter).or_insert(Some(begin_id));
        if let Some(current) = *next {
            if current <= id {
                *next = id.checked_add(1);
            }
        }
    }

    /// The id the next [`IdScope::new_id`] call for `kind` returns, if any.
    pub fn peek(&self, kind: &str) -> Option<i64> {
        self.next
            .get(self.counter_of(kind))
            .copied()
            .unwrap_or(Some(self.begin_id))
    }
}

fn take_next(next: &mut Option<i64>, counter: &str) -> Result<i64> {
    let id = next.ok_or_else(|| MigrationError::IdSpaceExhausted {
        kind: counter.to_string(),
    })?;
    *next = id.checked_add(1);
    Ok(id)
}

impl Default for IdScope {
    fn default() -> Self {
        Self::new()
    }
}
