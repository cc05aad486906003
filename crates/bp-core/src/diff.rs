//! Identifier-level diff between two documents, for display

use crate::document::Document;
use crate::identifier::{CategoryKey, Identifier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub category: CategoryKey,
    pub identifier: Identifier,
    /// False for a removal
    pub added: bool,
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.added { '+' } else { '-' };
        write!(f, "{} {}: {}", sign, self.category, self.identifier)
    }
}

/// Categories ascending; within one, removals (in `before` order) then
/// additions (in `after` order)
pub fn diff(before: &Document, after: &Document) -> Vec<DiffEntry> {
    let keys: BTreeSet<CategoryKey> = before
        .category_keys()
        .into_iter()
        .chain(after.category_keys())
        .collect();

    let mut entries = Vec::new();
    for key in keys {
        let old = before.category(&key).map(|c| c.items()).unwrap_or_default();
        let new = after.category(&key).map(|c| c.items()).unwrap_or_default();

        entries.extend(old.iter().filter(|id| !new.contains(id)).map(|id| DiffEntry {
            category: key.clone(),
            identifier: id.clone(),
            added: false,
        }));
        entries.extend(new.iter().filter(|id| !old.contains(id)).map(|id| DiffEntry {
            category: key.clone(),
            identifier: id.clone(),
            added: true,
        }));
    }
    entries
}
