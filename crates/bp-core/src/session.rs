//! Editing session: one document, its history, and persistence
//!
//! The live document sits behind an [`Arc`]. Readers take a
//! [`Session::snapshot`] and keep a consistent view for as long as they hold
//! it; every edit builds the next document on a private copy and swaps it in
//! only once it has fully succeeded.

use crate::config::EngineConfig;
use crate::diff::{diff, DiffEntry};
use crate::document::Document;
use crate::error::{Error, NoOpError, Result, ValidationError};
use crate::history::{HistoryLog, Operation, Transaction};
use crate::identifier::{CategoryKey, Identifier};
use crate::parser::{parse_document, parse_document_file, write_document};
use crate::rules::{apply_plan, plan_rules, plan_rules_chunked, AutoMapPlan, AutoMapReport, Progress, Rule};
use crate::suggest::{suggest_many, suggest_with, Suggestion};
use crate::template::{expand, Expansion};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of a multi-identifier insert
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertReport {
    pub inserted: usize,
    /// Already present
    pub unchanged: usize,
    pub skipped: Vec<ValidationError>,
}

/// Outcome of a template expansion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpandReport {
    pub expansion: Expansion,
    /// Insertions that were new to the document
    pub inserted: usize,
}

/// On-disk form of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFile {
    /// File the document was opened from, if any
    pub source_path: Option<PathBuf>,
    /// Document text as loaded
    pub original: String,
    pub history: HistoryLog,
}

impl SessionFile {
    /// Load a session file from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the session file to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// A loaded document with undo history
#[derive(Debug, Clone)]
pub struct Session {
    document: Arc<Document>,
    original: Arc<Document>,
    history: HistoryLog,
    source_path: Option<PathBuf>,
}

impl Session {
    /// Start a session over an already-parsed document
    pub fn new(document: Document) -> Self {
        let document = Arc::new(document);
        Self {
            original: Arc::clone(&document),
            document,
            history: HistoryLog::new(),
            source_path: None,
        }
    }

    /// Parse a properties file and start a session on it
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let document = parse_document_file(path.as_ref())?;
        info!(
            path = %path.as_ref().display(),
            categories = document.category_count(),
            identifiers = document.identifier_count(),
            "opened document"
        );
        let mut session = Self::new(document);
        session.source_path = Some(path.as_ref().to_path_buf());
        Ok(session)
    }

    pub fn from_text(text: &str) -> Result<Self> {
        Ok(Self::new(parse_document(text)?))
    }

    /// Current document
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Point-in-time view that later edits never touch
    pub fn snapshot(&self) -> Arc<Document> {
        Arc::clone(&self.document)
    }

    /// Document as it was loaded
    pub fn original(&self) -> &Document {
        &self.original
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Current document as text
    pub fn to_text(&self) -> String {
        self.document.to_text()
    }

    /// Run `f` on a copy of the document and commit it as one operation
    ///
    /// Nothing is committed when `f` fails or changes nothing.
    pub fn edit<T, F>(&mut self, description: impl Into<String>, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T>,
    {
        let mut next = (*self.document).clone();
        let (value, op) = {
            let mut tx = Transaction::new(&mut next);
            let value = f(&mut tx)?;
            (value, tx.finish(description))
        };
        match op {
            Some(op) => {
                self.history.commit(op);
                self.document = Arc::new(next);
            }
            None => debug!("edit changed nothing; not recorded"),
        }
        Ok(value)
    }

    /// Move through history on a copy; swap in only on success
    fn navigate<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut HistoryLog, &mut Document) -> Result<T>,
    {
        let mut next = (*self.document).clone();
        let mut history = self.history.clone();
        let value = f(&mut history, &mut next)?;
        self.history = history;
        self.document = Arc::new(next);
        Ok(value)
    }

    /// Insert one identifier; `Ok(false)` if it was already there
    pub fn insert(&mut self, key: &CategoryKey, token: &str) -> Result<bool> {
        let id = Identifier::parse(token.trim())?;
        let description = format!("Insert '{}' into {}", id, key);
        self.edit(description, |tx| Ok(tx.insert(key, id)))
    }

    /// Insert several tokens as one operation; invalid tokens are skipped
    pub fn insert_many<S: AsRef<str>>(&mut self, key: &CategoryKey, tokens: &[S]) -> Result<InsertReport> {
        let mut report = InsertReport::default();
        let mut ids = Vec::with_capacity(tokens.len());
        for token in tokens {
            match Identifier::parse(token.as_ref().trim()) {
                Ok(id) => ids.push(id),
                Err(e) => report.skipped.push(e),
            }
        }
        let description = format!("Insert {} items into {}", ids.len(), key);
        self.edit(description, |tx| {
            for id in ids {
                if tx.insert(key, id) {
                    report.inserted += 1;
                } else {
                    report.unchanged += 1;
                }
            }
            Ok(report)
        })
    }

    /// Remove one identifier; absent items are a [`NoOpError`]
    pub fn remove(&mut self, key: &CategoryKey, token: &str) -> Result<()> {
        let id = Identifier::parse(token.trim())?;
        let description = format!("Remove '{}' from {}", id, key);
        self.edit(description, |tx| {
            if tx.remove(key, &id) {
                Ok(())
            } else {
                Err(NoOpError::AbsentItem {
                    category: key.clone(),
                    identifier: id.clone(),
                }
                .into())
            }
        })
    }

    /// Add an empty category; `Ok(false)` if it exists
    pub fn create_category(&mut self, key: &CategoryKey) -> Result<bool> {
        self.edit(format!("Create {}", key), |tx| Ok(tx.create_category(key)))
    }

    /// Sort a category; `Ok(false)` if already sorted
    pub fn sort_category(&mut self, key: &CategoryKey) -> Result<bool> {
        if self.document.category(key).is_none() {
            return Err(NoOpError::UnknownCategory(key.clone()).into());
        }
        self.edit(format!("Sort {}", key), |tx| Ok(tx.sort_category(key)))
    }

    /// Give every name the template's category footprint, as one operation
    pub fn expand_template<S: AsRef<str>>(&mut self, template: &str, names: &[S]) -> Result<ExpandReport> {
        let expansion = expand(&self.document, template, names)?;
        let description = format!(
            "Template: applied '{}' to {} items",
            expansion.template,
            names.len() - expansion.skipped.len()
        );
        let inserted = self.edit(description, |tx| Ok(tx.insert_all(&expansion.insertions)))?;
        Ok(ExpandReport { expansion, inserted })
    }

    /// Preview an auto-map run without changing anything
    pub fn plan_rules<S: AsRef<str>>(&self, rules: &[Rule], candidates: &[S]) -> AutoMapPlan {
        plan_rules(&self.document, rules, candidates)
    }

    /// Auto-map a batch; every insertion lands in one operation
    pub fn apply_rules<S: AsRef<str>>(&mut self, rules: &[Rule], candidates: &[S]) -> Result<AutoMapReport> {
        let plan = plan_rules(&self.document, rules, candidates);
        self.commit_plan(plan)
    }

    /// [`Session::apply_rules`] with progress after every `chunk_size` candidates
    pub fn apply_rules_chunked<S, F>(
        &mut self,
        rules: &[Rule],
        candidates: &[S],
        chunk_size: usize,
        on_progress: F,
    ) -> Result<AutoMapReport>
    where
        S: AsRef<str>,
        F: FnMut(Progress),
    {
        let plan = plan_rules_chunked(&self.document, rules, candidates, chunk_size, on_progress);
        self.commit_plan(plan)
    }

    fn commit_plan(&mut self, plan: AutoMapPlan) -> Result<AutoMapReport> {
        let total = plan.mapped.len() + plan.unmapped.len() + plan.invalid.len();
        let description = format!("Auto-map: {} of {} candidates", plan.mapped.len(), total);
        let report = self.edit(description, |tx| Ok(apply_plan(tx, plan)))?;
        info!(
            mapped = report.mapped.len(),
            unmapped = report.unmapped.len(),
            inserted = report.inserted,
            "auto-map finished"
        );
        Ok(report)
    }

    /// Ranked categories for one name, trimmed per `config`
    pub fn suggest(&self, name: &str, config: &EngineConfig) -> Vec<Suggestion> {
        suggest_with(&self.document, name, config.suggestion_limit, config.min_confidence)
    }

    /// Score many names in parallel against the current snapshot
    pub fn suggest_many<S>(&self, names: &[S], config: &EngineConfig) -> Vec<(String, Vec<Suggestion>)>
    where
        S: AsRef<str> + Sync,
    {
        let snapshot = self.snapshot();
        suggest_many(&snapshot, names, config.workers)
            .into_iter()
            .map(|(name, list)| {
                let list = list
                    .into_iter()
                    .filter(|s| s.confidence > config.min_confidence)
                    .take(config.suggestion_limit)
                    .collect();
                (name, list)
            })
            .collect()
    }

    pub fn undo(&mut self) -> Result<&Operation> {
        self.navigate(|history, doc| history.undo(doc).map(|_| ()))?;
        Ok(&self.history.operations()[self.history.cursor()])
    }

    pub fn redo(&mut self) -> Result<&Operation> {
        self.navigate(|history, doc| history.redo(doc).map(|_| ()))?;
        Ok(&self.history.operations()[self.history.cursor() - 1])
    }

    /// Jump to the state after operation `checkpoint` (0 = as loaded)
    pub fn restore(&mut self, checkpoint: usize) -> Result<usize> {
        self.navigate(|history, doc| history.restore(doc, checkpoint))
    }

    /// Changes from the loaded document to the current one
    pub fn diff(&self) -> Vec<DiffEntry> {
        diff(&self.original, &self.document)
    }

    /// Write the current document as a properties file
    pub fn save_as<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_document(&self.document, path.as_ref())?;
        info!(path = %path.as_ref().display(), "saved document");
        Ok(())
    }

    pub fn to_session_file(&self) -> SessionFile {
        SessionFile {
            source_path: self.source_path.clone(),
            original: self.original.to_text(),
            history: self.history.clone(),
        }
    }

    /// Rebuild a session by replaying its log over the loaded text
    pub fn from_session_file(file: SessionFile) -> Result<Self> {
        let original = parse_document(&file.original)?;
        let document = file.history.replay(&original)?;
        debug!(
            operations = file.history.len(),
            cursor = file.history.cursor(),
            "replayed session"
        );
        Ok(Self {
            document: Arc::new(document),
            original: Arc::new(original),
            history: file.history,
            source_path: file.source_path,
        })
    }

    pub fn save_session<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_session_file().save(path)
    }

    pub fn load_session<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_session_file(SessionFile::load(path)?)
    }
}
