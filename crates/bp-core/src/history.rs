//! Reversible edit history
//!
//! Every document mutation is recorded as an [`Operation`]. The log is
//! append-only with a cursor: undo and redo move the cursor, and restoring a
//! checkpoint is just moving the cursor several steps.

use crate::document::{Category, Document};
use crate::error::{Error, NoOpError, Result};
use crate::identifier::{CategoryKey, Identifier};
use crate::template::Insertion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// One identifier added to or removed from a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub category: CategoryKey,
    pub identifier: Identifier,
    pub added: bool,
}

/// Before/after state of one category element touched by an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPatch {
    pub key: CategoryKey,
    /// Element index at the time of the first touch
    pub position: usize,
    /// `None` when the operation created the category
    pub before: Option<Category>,
    pub after: Option<Category>,
}

/// One atomic, invertible document change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Human-readable summary for the history panel
    pub description: String,
    /// When the operation was committed
    pub timestamp: DateTime<Utc>,
    /// Insertions and removals, in the order they happened
    pub changes: Vec<Change>,
    patches: Vec<CategoryPatch>,
}

impl Operation {
    pub fn patches(&self) -> &[CategoryPatch] {
        &self.patches
    }

    pub fn added(&self) -> usize {
        self.changes.iter().filter(|c| c.added).count()
    }

    pub fn removed(&self) -> usize {
        self.changes.iter().filter(|c| !c.added).count()
    }

    /// Replay the operation forward
    pub(crate) fn apply(&self, doc: &mut Document) -> Result<()> {
        for patch in &self.patches {
            let current = patch.before.as_ref().map(|_| &patch.key);
            if !doc.put_category(patch.position, current, patch.after.as_ref()) {
                return Err(mismatch(patch));
            }
        }
        Ok(())
    }

    /// Apply the inverse
    pub(crate) fn revert(&self, doc: &mut Document) -> Result<()> {
        for patch in self.patches.iter().rev() {
            let current = patch.after.as_ref().map(|_| &patch.key);
            if !doc.put_category(patch.position, current, patch.before.as_ref()) {
                return Err(mismatch(patch));
            }
        }
        Ok(())
    }
}

fn mismatch(patch: &CategoryPatch) -> Error {
    Error::HistoryMismatch {
        key: patch.key.clone(),
        position: patch.position,
    }
}

/// Records mutations against a document so they can be committed as one
/// [`Operation`]
///
/// Dropping a transaction without calling [`Transaction::finish`] leaves the
/// mutations in the document but records nothing; callers that need
/// atomicity run the transaction on a scratch copy (see
/// [`crate::session::Session::edit`]).
pub struct Transaction<'d> {
    doc: &'d mut Document,
    changes: Vec<Change>,
    patches: Vec<CategoryPatch>,
    touched: HashMap<CategoryKey, usize>,
}

impl<'d> Transaction<'d> {
    pub fn new(doc: &'d mut Document) -> Self {
        Self {
            doc,
            changes: Vec::new(),
            patches: Vec::new(),
            touched: HashMap::new(),
        }
    }

    /// Read access to the in-progress document
    pub fn document(&self) -> &Document {
        &*self.doc
    }

    fn record<F>(&mut self, key: &CategoryKey, mutate: F) -> bool
    where
        F: FnOnce(&mut Document) -> bool,
    {
        let position = self.doc.position_of(key);
        let before = self.doc.category(key).cloned();
        if !mutate(&mut *self.doc) {
            return false;
        }
        let after = self.doc.category(key).cloned();

        match self.touched.get(key) {
            Some(&idx) => self.patches[idx].after = after,
            None => {
                let position = match position {
                    Some(p) => p,
                    None => self.doc.position_of(key).unwrap_or_default(),
                };
                self.touched.insert(key.clone(), self.patches.len());
                self.patches.push(CategoryPatch {
                    key: key.clone(),
                    position,
                    before,
                    after,
                });
            }
        }
        true
    }

    /// Insert one identifier, creating the category if needed
    pub fn insert(&mut self, key: &CategoryKey, id: Identifier) -> bool {
        let inserted = self.record(key, |doc| doc.insert(key, id.clone()));
        if inserted {
            self.changes.push(Change {
                category: key.clone(),
                identifier: id,
                added: true,
            });
        }
        inserted
    }

    /// Insert a planned batch; returns how many were new
    pub fn insert_all(&mut self, insertions: &[Insertion]) -> usize {
        insertions
            .iter()
            .filter(|ins| self.insert(&ins.category, ins.identifier.clone()))
            .count()
    }

    pub fn remove(&mut self, key: &CategoryKey, id: &Identifier) -> bool {
        let removed = self.record(key, |doc| doc.remove(key, id));
        if removed {
            self.changes.push(Change {
                category: key.clone(),
                identifier: id.clone(),
                added: false,
            });
        }
        removed
    }

    pub fn create_category(&mut self, key: &CategoryKey) -> bool {
        self.record(key, |doc| doc.create_category(key))
    }

    pub fn sort_category(&mut self, key: &CategoryKey) -> bool {
        self.record(key, |doc| doc.sort_category(key))
    }

    /// Close the transaction; `None` if nothing changed
    pub fn finish(self, description: impl Into<String>) -> Option<Operation> {
        if self.patches.is_empty() {
            return None;
        }
        Some(Operation {
            description: description.into(),
            timestamp: Utc::now(),
            changes: self.changes,
            patches: self.patches,
        })
    }
}

/// Where the cursor sits relative to the tail of the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    /// Cursor at the tail; nothing to redo
    Clean,
    /// Cursor behind the tail by this many operations
    Undone(usize),
}

/// Ordered operation log with a cursor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryLog {
    operations: Vec<Operation>,
    /// Number of operations currently applied
    cursor: usize,
}

impl HistoryLog {
    /// Create a new empty history
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of operations currently applied (the checkpoint index)
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn state(&self) -> HistoryState {
        match self.operations.len() - self.cursor {
            0 => HistoryState::Clean,
            behind => HistoryState::Undone(behind),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.operations.len()
    }

    /// All operations, applied and undone
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Append an operation, discarding anything that was undone
    pub fn commit(&mut self, op: Operation) {
        if self.cursor < self.operations.len() {
            debug!(discarded = self.operations.len() - self.cursor, "dropping redo history");
            self.operations.truncate(self.cursor);
        }
        info!(description = %op.description, added = op.added(), removed = op.removed(), "commit");
        self.operations.push(op);
        self.cursor = self.operations.len();
    }

    /// Revert the operation before the cursor
    pub fn undo(&mut self, doc: &mut Document) -> Result<&Operation> {
        if self.cursor == 0 {
            return Err(NoOpError::NothingToUndo.into());
        }
        let op = &self.operations[self.cursor - 1];
        op.revert(doc)?;
        self.cursor -= 1;
        info!(description = %op.description, "undo");
        Ok(op)
    }

    /// Reapply the operation after the cursor
    pub fn redo(&mut self, doc: &mut Document) -> Result<&Operation> {
        if self.cursor == self.operations.len() {
            return Err(NoOpError::NothingToRedo.into());
        }
        let op = &self.operations[self.cursor];
        op.apply(doc)?;
        self.cursor += 1;
        info!(description = %op.description, "redo");
        Ok(op)
    }

    /// Move to the state right after operation `checkpoint` (0 = as loaded)
    ///
    /// Returns the number of operations replayed or reverted.
    pub fn restore(&mut self, doc: &mut Document, checkpoint: usize) -> Result<usize> {
        if checkpoint > self.operations.len() {
            return Err(Error::CheckpointOutOfRange {
                requested: checkpoint,
                available: self.operations.len(),
            });
        }
        let steps = self.cursor.abs_diff(checkpoint);
        while self.cursor > checkpoint {
            self.undo(doc)?;
        }
        while self.cursor < checkpoint {
            self.redo(doc)?;
        }
        info!(checkpoint, steps, "restored checkpoint");
        Ok(steps)
    }

    /// Rebuild the current document from the loaded one by replaying the
    /// applied prefix of the log
    pub fn replay(&self, original: &Document) -> Result<Document> {
        if self.cursor > self.operations.len() {
            return Err(Error::CheckpointOutOfRange {
                requested: self.cursor,
                available: self.operations.len(),
            });
        }
        let mut doc = original.clone();
        for op in &self.operations[..self.cursor] {
            op.apply(&mut doc)?;
        }
        Ok(doc)
    }
}
