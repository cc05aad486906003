//! Parser for block.properties documents

use crate::document::{Category, Document, Element, Layout};
use crate::error::{Error, ParseError, ParseErrorKind, Result};
use crate::identifier::{CategoryKey, Identifier};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Directive prefixes recognised on `#` lines
const DIRECTIVES: &[&str] = &["#ifdef", "#ifndef", "#else", "#endif", "#define"];

/// Parse a properties file into a Document
pub fn parse_document_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let doc = parse_document(&content)?;
    debug!(
        path = %path.display(),
        categories = doc.category_count(),
        identifiers = doc.identifier_count(),
        "parsed properties file"
    );
    Ok(doc)
}

/// Parse properties text into a Document
pub fn parse_document(text: &str) -> Result<Document> {
    let (body, trailing_newline) = match text.strip_suffix('\n') {
        Some(body) => (body, true),
        None => (text, false),
    };
    if body.is_empty() && !trailing_newline {
        return Ok(Document::new());
    }

    let lines: Vec<&str> = body.split('\n').collect();
    let mut elements = Vec::new();
    let mut seen_keys: HashSet<CategoryKey> = HashSet::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();

        if trimmed.is_empty() {
            elements.push(Element::Blank(line.to_string()));
            i += 1;
            continue;
        }

        if trimmed.starts_with('#') {
            if is_directive(trimmed) {
                elements.push(Element::Directive(line.to_string()));
            } else {
                elements.push(Element::Comment(line.to_string()));
            }
            i += 1;
            continue;
        }

        let start = i;
        let (lhs, rhs) = line.split_once('=').ok_or_else(|| {
            ParseError::new(ParseErrorKind::MissingAssignment, start + 1, trimmed)
        })?;
        let key = CategoryKey::parse(lhs)
            .map_err(|e| ParseError::new(ParseErrorKind::MalformedKey, start + 1, e.to_string()))?;
        if !seen_keys.insert(key.clone()) {
            return Err(ParseError::new(ParseErrorKind::DuplicateKey, start + 1, key.to_string()).into());
        }

        // Gather continuation lines
        let mut raw = vec![line.to_string()];
        while continues(&raw[raw.len() - 1]) {
            i += 1;
            match lines.get(i) {
                Some(next) => raw.push(next.to_string()),
                None => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnterminatedContinuation,
                        start + 1,
                        key.to_string(),
                    )
                    .into())
                }
            }
        }
        i += 1;

        elements.push(Element::Category(parse_category(key, lhs, rhs, raw, start)?));
    }

    Ok(Document::from_elements(elements, trailing_newline))
}

fn is_directive(trimmed: &str) -> bool {
    DIRECTIVES.iter().any(|d| {
        trimmed
            .strip_prefix(d)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
    })
}

fn continues(line: &str) -> bool {
    line.trim_end().ends_with('\\')
}

/// Build a category from its raw lines
fn parse_category(
    key: CategoryKey,
    lhs: &str,
    rhs: &str,
    raw: Vec<String>,
    start: usize,
) -> Result<Category> {
    let leading = rhs.len() - rhs.trim_start().len();
    let head = raw[0][..lhs.len() + 1 + leading].to_string();
    let indent = raw
        .get(1)
        .map(|l| l[..l.len() - l.trim_start().len()].to_string())
        .unwrap_or_else(|| " ".to_string());

    let mut items: Vec<Identifier> = Vec::new();
    let mut rows = Vec::with_capacity(raw.len());

    for (offset, physical) in raw.iter().enumerate() {
        let content = if offset == 0 { rhs } else { physical.as_str() };
        let content = if offset + 1 < raw.len() {
            let t = content.trim_end();
            t.strip_suffix('\\').unwrap_or(t)
        } else {
            content
        };

        let mut count = 0;
        for token in content.split_whitespace() {
            let id = Identifier::parse(token).map_err(|e| {
                ParseError::new(
                    ParseErrorKind::InvalidIdentifier,
                    start + offset + 1,
                    e.to_string(),
                )
            })?;
            if items.contains(&id) {
                warn!(category = %key, identifier = %id, line = start + offset + 1, "dropping duplicate identifier");
                continue;
            }
            items.push(id);
            count += 1;
        }
        rows.push(count);
    }

    let line_end = if raw[0].ends_with('\r') { "\r" } else { "" }.to_string();
    let layout = Layout {
        head,
        indent,
        rows,
        raw: Some(raw),
        line_end,
    };
    Ok(Category::from_source(key, items, layout))
}

/// Write a document's serialized text to a file
pub fn write_document<P: AsRef<Path>>(doc: &Document, path: P) -> Result<()> {
    fs::write(path.as_ref(), doc.to_text())?;
    Ok(())
}
