//! Rule engine / auto-mapper
//!
//! Rule file grammar, one rule per line:
//!
//! ```text
//! # comment
//! *_wall   -> template:minecraft:stone_wall
//! *_ore    -> category:block.42
//! suffix:_slab -> template:oak_slab
//! regex:^(red|blue)_.*_lamp$ -> category:block.7
//! ```
//!
//! Matchers are `suffix`, `prefix`, `contains` and `exact`, written either
//! as a glob (`*_wall`, `stone*`, `*ore*`, `name`) or with an explicit kind,
//! plus `regex`, which searches anywhere in the name. Matching is
//! case-insensitive. Rules are tried in file order and the first match wins.

use crate::document::Document;
use crate::error::{Error, Result, ValidationError};
use crate::history::Transaction;
use crate::identifier::{base_path, CategoryKey, Identifier};
use crate::template::{expand, Insertion};
use crate::variants::resolve_template;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// A compiled case-insensitive regular expression, serialized as its source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> std::result::Result<Self, regex::Error> {
        let regex = RegexBuilder::new(source).case_insensitive(true).build()?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

impl TryFrom<String> for Pattern {
    type Error = regex::Error;

    fn try_from(source: String) -> std::result::Result<Self, Self::Error> {
        Self::new(&source)
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.source
    }
}

/// Predicate over a candidate name; plain patterns are stored lower-cased
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Matcher {
    Suffix(String),
    Prefix(String),
    Contains(String),
    Exact(String),
    Regex(Pattern),
}

impl Matcher {
    /// Parse a glob (`*_wall`) or explicit (`suffix:_wall`) matcher
    ///
    /// The error is a short reason suitable for a [`RuleWarning`].
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let text = text.trim();
        if let Some((kind, value)) = text.split_once(':') {
            let kind = kind.trim().to_lowercase();
            let value = value.trim();
            if kind == "regex" {
                if value.is_empty() {
                    return Err("empty regex".to_string());
                }
                return Pattern::new(value)
                    .map(Matcher::Regex)
                    .map_err(|e| format!("invalid regex: {e}"));
            }

            let value = value.to_lowercase();
            let explicit = match kind.as_str() {
                "suffix" => Some(Matcher::Suffix(value)),
                "prefix" => Some(Matcher::Prefix(value)),
                "contains" => Some(Matcher::Contains(value)),
                "exact" => Some(Matcher::Exact(value)),
                _ => None,
            };
            if let Some(matcher) = explicit {
                if matcher.pattern().is_empty() {
                    return Err(format!("empty {kind} pattern"));
                }
                return Ok(matcher);
            }
        }

        let lower = text.to_lowercase();
        let starts = lower.starts_with('*');
        let ends = lower.ends_with('*') && lower.len() > 1;
        let inner = lower.trim_start_matches('*').trim_end_matches('*');
        if inner.is_empty() || inner.contains('*') || inner.chars().any(char::is_whitespace) {
            return Err("unrecognised matcher".to_string());
        }
        let inner = inner.to_string();
        Ok(match (starts, ends) {
            (true, true) => Matcher::Contains(inner),
            (true, false) => Matcher::Suffix(inner),
            (false, true) => Matcher::Prefix(inner),
            (false, false) => Matcher::Exact(inner),
        })
    }

    pub fn pattern(&self) -> &str {
        match self {
            Matcher::Suffix(p) | Matcher::Prefix(p) | Matcher::Contains(p) | Matcher::Exact(p) => p,
            Matcher::Regex(p) => p.as_str(),
        }
    }

    /// Pure, case-insensitive test
    ///
    /// Prefix and exact matchers also accept the candidate's name without its
    /// namespace, so `stone*` matches `mymod:stone_tiles`.
    pub fn matches(&self, candidate: &str) -> bool {
        let full = candidate.trim().to_lowercase();
        let path = base_path(&full);
        match self {
            Matcher::Suffix(p) => full.ends_with(p.as_str()),
            Matcher::Prefix(p) => full.starts_with(p.as_str()) || path.starts_with(p.as_str()),
            Matcher::Contains(p) => full.contains(p.as_str()),
            Matcher::Exact(p) => full == *p || path == p,
            Matcher::Regex(p) => p.is_match(&full),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Suffix(p) => write!(f, "*{}", p),
            Matcher::Prefix(p) => write!(f, "{}*", p),
            Matcher::Contains(p) => write!(f, "*{}*", p),
            Matcher::Exact(p) => write!(f, "{}", p),
            Matcher::Regex(p) => write!(f, "regex:{}", p.as_str()),
        }
    }
}

/// What to do with a matching candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Replicate this template's variant footprint
    UseTemplate(String),
    /// File the bare candidate directly under this category
    AssignCategory(CategoryKey),
}

impl Action {
    pub fn parse(text: &str) -> Option<Self> {
        let (kind, value) = text.trim().split_once(':')?;
        let value = value.trim();
        match kind.trim().to_lowercase().as_str() {
            "template" if !value.is_empty() => Some(Action::UseTemplate(value.to_string())),
            "category" => CategoryKey::parse(value).ok().map(Action::AssignCategory),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::UseTemplate(t) => write!(f, "template:{}", t),
            Action::AssignCategory(k) => write!(f, "category:{}", k),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub matcher: Matcher,
    pub action: Action,
    /// 1-based line in the rule file (0 for rules built in code)
    pub line: usize,
}

impl Rule {
    pub fn new(matcher: Matcher, action: Action) -> Self {
        Self {
            matcher,
            action,
            line: 0,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.matcher, self.action)
    }
}

/// A rule-file line that was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleWarning {
    pub line: usize,
    pub text: String,
    pub reason: String,
}

/// Rules in file order plus the lines that could not be read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
    pub warnings: Vec<RuleWarning>,
}

impl RuleSet {
    /// Parse rule text; bad lines become warnings, never errors
    pub fn parse(text: &str) -> Self {
        let mut set = RuleSet::default();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut skip = |reason: &str| {
                warn!(line = idx + 1, text = line, reason, "skipping rule line");
                set.warnings.push(RuleWarning {
                    line: idx + 1,
                    text: line.to_string(),
                    reason: reason.to_string(),
                });
            };

            let Some((left, right)) = line.split_once("->") else {
                skip("missing '->'");
                continue;
            };
            let matcher = match Matcher::parse(left) {
                Ok(matcher) => matcher,
                Err(reason) => {
                    skip(reason.as_str());
                    continue;
                }
            };
            let Some(action) = Action::parse(right) else {
                skip("unrecognised action");
                continue;
            };
            set.rules.push(Rule {
                matcher,
                action,
                line: idx + 1,
            });
        }

        debug!(rules = set.rules.len(), warnings = set.warnings.len(), "parsed rules");
        set
    }

    /// Load a rule file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::parse(&content))
    }

    /// First rule matching `candidate`
    pub fn first_match(&self, candidate: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.matcher.matches(candidate))
    }

    /// Templates named by every matching rule, in rule order, without repeats
    pub fn template_suggestions(&self, candidate: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for rule in self.rules.iter().filter(|r| r.matcher.matches(candidate)) {
            if let Action::UseTemplate(template) = &rule.action {
                if !out.contains(template) {
                    out.push(template.clone());
                }
            }
        }
        out
    }
}

/// Why a candidate was left for manual handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnmappedReason {
    NoRuleMatched,
    /// The first matching rule names a template filed nowhere
    TemplateNotFound(String),
}

impl fmt::Display for UnmappedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmappedReason::NoRuleMatched => write!(f, "no rule matched"),
            UnmappedReason::TemplateNotFound(t) => write!(f, "template '{}' not found", t),
        }
    }
}

/// A candidate that was not auto-mapped (an expected outcome, not an error)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmappedCandidate {
    pub candidate: String,
    pub reason: UnmappedReason,
}

/// A candidate and the insertions its matching rule produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedCandidate {
    pub candidate: String,
    /// The rule that matched, rendered as in the rule file
    pub rule: String,
    pub insertions: Vec<Insertion>,
}

/// Dry-run result of evaluating rules over a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoMapPlan {
    pub mapped: Vec<MappedCandidate>,
    pub unmapped: Vec<UnmappedCandidate>,
    pub invalid: Vec<ValidationError>,
}

impl AutoMapPlan {
    /// All insertions across mapped candidates, deduplicated in plan order
    pub fn insertions(&self) -> Vec<Insertion> {
        let mut seen = HashSet::new();
        self.mapped
            .iter()
            .flat_map(|m| m.insertions.iter())
            .filter(|ins| seen.insert((*ins).clone()))
            .cloned()
            .collect()
    }

    fn extend(&mut self, other: AutoMapPlan) {
        self.mapped.extend(other.mapped);
        self.unmapped.extend(other.unmapped);
        self.invalid.extend(other.invalid);
    }
}

/// Outcome of an applied auto-map run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoMapReport {
    pub mapped: Vec<MappedCandidate>,
    pub unmapped: Vec<UnmappedCandidate>,
    pub invalid: Vec<ValidationError>,
    /// Insertions that were actually new to the document
    pub inserted: usize,
}

/// Progress of a chunked auto-map run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

fn plan_candidate(doc: &Document, rules: &[Rule], candidate: &str, plan: &mut AutoMapPlan) {
    let name = match Identifier::parse_base(candidate.trim()) {
        Ok(name) => name,
        Err(e) => {
            plan.invalid.push(e);
            return;
        }
    };

    let Some(rule) = rules.iter().find(|r| r.matcher.matches(&name)) else {
        plan.unmapped.push(UnmappedCandidate {
            candidate: name,
            reason: UnmappedReason::NoRuleMatched,
        });
        return;
    };

    let insertions = match &rule.action {
        Action::AssignCategory(key) => vec![Insertion::new(key.clone(), Identifier::new(name.clone(), ""))],
        Action::UseTemplate(template) => {
            let resolved = resolve_template(doc, template);
            let expansion = resolved
                .as_deref()
                .map(|base| expand(doc, base, std::slice::from_ref(&name)));
            match expansion {
                Some(Ok(expansion)) => expansion.insertions,
                _ => {
                    plan.unmapped.push(UnmappedCandidate {
                        candidate: name,
                        reason: UnmappedReason::TemplateNotFound(template.clone()),
                    });
                    return;
                }
            }
        }
    };

    plan.mapped.push(MappedCandidate {
        candidate: name,
        rule: rule.to_string(),
        insertions,
    });
}

/// Evaluate rules against candidates without touching the document
pub fn plan_rules<S: AsRef<str>>(doc: &Document, rules: &[Rule], candidates: &[S]) -> AutoMapPlan {
    let mut plan = AutoMapPlan::default();
    for candidate in candidates {
        plan_candidate(doc, rules, candidate.as_ref(), &mut plan);
    }
    plan
}

/// Plan in chunks, reporting progress after each chunk
pub fn plan_rules_chunked<S, F>(
    doc: &Document,
    rules: &[Rule],
    candidates: &[S],
    chunk_size: usize,
    mut on_progress: F,
) -> AutoMapPlan
where
    S: AsRef<str>,
    F: FnMut(Progress),
{
    let mut plan = AutoMapPlan::default();
    let total = candidates.len();
    let mut processed = 0;
    for chunk in candidates.chunks(chunk_size.max(1)) {
        plan.extend(plan_rules(doc, rules, chunk));
        processed += chunk.len();
        on_progress(Progress { processed, total });
    }
    plan
}

/// Apply a plan inside a transaction
pub fn apply_plan(tx: &mut Transaction<'_>, plan: AutoMapPlan) -> AutoMapReport {
    let inserted = tx.insert_all(&plan.insertions());
    AutoMapReport {
        mapped: plan.mapped,
        unmapped: plan.unmapped,
        invalid: plan.invalid,
        inserted,
    }
}

/// Evaluate and apply rules, returning the new document and a report
///
/// The input document is not modified.
pub fn apply_rules<S: AsRef<str>>(
    doc: &Document,
    rules: &[Rule],
    candidates: &[S],
) -> (Document, AutoMapReport) {
    let plan = plan_rules(doc, rules, candidates);
    let mut next = doc.clone();
    let report = {
        let mut tx = Transaction::new(&mut next);
        apply_plan(&mut tx, plan)
    };
    (next, report)
}
