//! bp-core: Merge engine for shader-pack block.properties files
//!
//! This library provides functionality to:
//! - Parse block.properties files into a document that serializes back
//!   byte-for-byte
//! - Find where a base name's variants are filed (variant families)
//! - Replicate a template's category footprint onto new names
//! - Auto-map batches of new names with user rules
//! - Rank categories for a name when no rule applies
//! - Record every edit for undo, redo and checkpoint restore

pub mod config;
pub mod diff;
pub mod document;
pub mod error;
pub mod history;
pub mod identifier;
pub mod parser;
pub mod rules;
pub mod session;
pub mod suggest;
pub mod template;
pub mod variants;

pub use config::EngineConfig;
pub use diff::{diff, DiffEntry};
pub use document::{Category, Document, Element, Presence};
pub use error::{Error, NoOpError, ParseError, ParseErrorKind, Result, ValidationError};
pub use history::{Change, HistoryLog, HistoryState, Operation, Transaction};
pub use identifier::{CategoryKey, Identifier};
pub use parser::{parse_document, parse_document_file, write_document};
pub use rules::{
    apply_rules, plan_rules, Action, AutoMapPlan, AutoMapReport, Matcher, Pattern, Rule, RuleSet, RuleWarning,
    UnmappedCandidate, UnmappedReason,
};
pub use session::{ExpandReport, InsertReport, Session, SessionFile};
pub use suggest::{suggest, suggest_many, Suggestion};
pub use template::{expand, Expansion, Insertion};
pub use variants::{families_of, resolve_template, template_categories, VariantFamily};
