//! Error types for bp-core

use crate::identifier::{CategoryKey, Identifier};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in bp-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed properties document
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Identifier or category key failed the grammar
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Requested change would not alter anything
    #[error(transparent)]
    NoOp(#[from] NoOpError),

    /// Template base is not filed in any category
    #[error("template '{0}' does not appear in any category")]
    InvalidTemplate(String),

    /// Checkpoint index past the end of the history log
    #[error("checkpoint {requested} is out of range (history has {available} operations)")]
    CheckpointOutOfRange { requested: usize, available: usize },

    /// Recorded operation does not fit the document it is replayed on
    #[error("history does not match document: expected '{key}' at element {position}")]
    HistoryMismatch { key: CategoryKey, position: usize },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What went wrong while parsing a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Left-hand side is not `<kind>.<number>`
    MalformedKey,
    /// Non-comment line with no `=`
    MissingAssignment,
    /// Trailing backslash on the last line of the file
    UnterminatedContinuation,
    /// Same category key defined twice
    DuplicateKey,
    /// Token on the right-hand side is not a valid identifier
    InvalidIdentifier,
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ParseErrorKind::MalformedKey => "malformed category key",
            ParseErrorKind::MissingAssignment => "line is not a comment and has no '='",
            ParseErrorKind::UnterminatedContinuation => "unterminated line continuation",
            ParseErrorKind::DuplicateKey => "duplicate category key",
            ParseErrorKind::InvalidIdentifier => "invalid identifier",
        };
        f.write_str(text)
    }
}

/// A line-addressed document parse failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}: {detail}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// 1-based line number
    pub line: usize,
    pub detail: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, line: usize, detail: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            detail: detail.into(),
        }
    }
}

/// A single token that failed the identifier or key grammar
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("invalid '{token}': {reason}")]
pub struct ValidationError {
    pub token: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            reason: reason.into(),
        }
    }
}

/// Recoverable "nothing happened" signals
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoOpError {
    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("'{identifier}' is not in '{category}'")]
    AbsentItem {
        category: CategoryKey,
        identifier: Identifier,
    },

    #[error("every identifier is already present")]
    AlreadyPresent,

    #[error("category '{0}' does not exist")]
    UnknownCategory(CategoryKey),
}
