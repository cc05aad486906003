//! Document model for block.properties files
//!
//! A document is the ordered list of source elements (blank lines, comments,
//! directives, categories). Categories keep their verbatim source text until
//! they are modified, which is what makes `parse` followed by `serialize`
//! byte-identical.

use crate::identifier::{CategoryKey, Identifier};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One source element of a properties document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Element {
    /// Whitespace-only line, kept verbatim
    Blank(String),
    /// `#` comment line, kept verbatim
    Comment(String),
    /// Preprocessor directive (`#ifdef`, `#define`, ...), kept verbatim
    Directive(String),
    /// A `<kind>.<number> = <ids>` entry, possibly spanning several lines
    Category(Category),
}

impl Element {
    fn lines(&self) -> Vec<String> {
        match self {
            Element::Blank(line) | Element::Comment(line) | Element::Directive(line) => {
                vec![line.clone()]
            }
            Element::Category(category) => category.render(),
        }
    }
}

/// Physical shape of a category entry in the source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Layout {
    /// First line up to the first identifier (`block.10 = `)
    pub(crate) head: String,
    /// Leading whitespace of continuation lines
    pub(crate) indent: String,
    /// Number of identifiers on each physical line
    pub(crate) rows: Vec<usize>,
    /// Verbatim source lines; dropped on the first modification
    pub(crate) raw: Option<Vec<String>>,
    /// `"\r"` when the source used CRLF line endings
    #[serde(default)]
    pub(crate) line_end: String,
}

/// Mod group of rows that start with a bare name, and of the first row
const VANILLA: &str = "minecraft";

fn group_of(id: &Identifier) -> &str {
    id.namespace().unwrap_or(VANILLA)
}

/// A category key and its ordered identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    key: CategoryKey,
    items: Vec<Identifier>,
    layout: Layout,
}

impl Category {
    /// Create an empty category rendered as `<key>=`
    pub fn new(key: CategoryKey) -> Self {
        let head = format!("{}=", key);
        Self {
            key,
            items: Vec::new(),
            layout: Layout {
                head,
                indent: " ".to_string(),
                rows: vec![0],
                raw: None,
                line_end: String::new(),
            },
        }
    }

    pub(crate) fn with_line_end(mut self, line_end: &str) -> Self {
        self.layout.line_end = line_end.to_string();
        self
    }

    pub(crate) fn from_source(key: CategoryKey, items: Vec<Identifier>, layout: Layout) -> Self {
        Self { key, items, layout }
    }

    pub fn key(&self) -> &CategoryKey {
        &self.key
    }

    /// Identifiers in file order
    pub fn items(&self) -> &[Identifier] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.items.contains(id)
    }

    /// Add an identifier to its mod group; returns false if already present
    ///
    /// Each physical line is a group: the first line is `minecraft`, a
    /// continuation line belongs to the namespace of its first identifier.
    /// The identifier goes at the end of the last line of its group, or on a
    /// new continuation line when no line has that group yet.
    pub(crate) fn insert(&mut self, id: Identifier) -> bool {
        if self.contains(&id) {
            return false;
        }

        let target = if self.items.is_empty() {
            self.layout.rows = vec![0];
            Some((0, 0))
        } else {
            let group = group_of(&id);
            let mut start = 0;
            let mut found = None;
            for (row, &count) in self.layout.rows.iter().enumerate() {
                let row_group = match row {
                    0 => Some(VANILLA),
                    _ if count > 0 => self.items.get(start).map(group_of),
                    _ => None,
                };
                if row_group == Some(group) {
                    found = Some((row, start + count));
                }
                start += count;
            }
            found
        };

        match target {
            Some((row, at)) => {
                self.items.insert(at.min(self.items.len()), id);
                self.layout.rows[row] += 1;
            }
            None => {
                self.items.push(id);
                self.layout.rows.push(1);
            }
        }
        self.layout.raw = None;
        true
    }

    /// Remove an identifier; returns false if it was absent
    pub(crate) fn remove(&mut self, id: &Identifier) -> bool {
        let Some(position) = self.items.iter().position(|i| i == id) else {
            return false;
        };
        self.items.remove(position);

        let mut seen = 0;
        for count in self.layout.rows.iter_mut() {
            if position < seen + *count {
                *count -= 1;
                break;
            }
            seen += *count;
        }
        self.layout.raw = None;
        true
    }

    /// Sort each line's identifiers by rendered text; false if already sorted
    pub(crate) fn sort(&mut self) -> bool {
        let mut sorted = self.items.clone();
        let mut start = 0;
        let last_row = self.layout.rows.len().saturating_sub(1);
        for (i, &count) in self.layout.rows.iter().enumerate() {
            let end = if i == last_row {
                sorted.len()
            } else {
                (start + count).min(sorted.len())
            };
            sorted[start..end].sort_by_key(|id| id.to_string());
            start = end;
        }
        if sorted == self.items {
            return false;
        }
        self.items = sorted;
        self.layout.raw = None;
        true
    }

    /// Render the entry as physical lines
    pub(crate) fn render(&self) -> Vec<String> {
        if let Some(raw) = &self.layout.raw {
            return raw.clone();
        }

        let mut rows: Vec<&[Identifier]> = Vec::new();
        let mut start = 0;
        let last_row = self.layout.rows.len().saturating_sub(1);
        for (i, &count) in self.layout.rows.iter().enumerate() {
            // the last row absorbs anything the counts do not cover
            let end = if i == last_row {
                self.items.len()
            } else {
                (start + count).min(self.items.len())
            };
            if i == 0 || end > start {
                rows.push(&self.items[start..end]);
            }
            start = end;
        }
        if rows.is_empty() {
            rows.push(&self.items[..]);
        }

        let total = rows.len();
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                let mut line = if i == 0 {
                    self.layout.head.clone()
                } else {
                    self.layout.indent.clone()
                };
                let tokens: Vec<String> = row.iter().map(|id| id.to_string()).collect();
                line.push_str(&tokens.join(" "));
                if i + 1 < total {
                    line.push_str(" \\");
                }
                line.push_str(&self.layout.line_end);
                line
            })
            .collect()
    }
}

/// Whether a name is already known to the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Presence {
    /// The exact token is filed in some category
    Exists,
    /// Only the base is known (other variants are filed)
    Partial,
    /// Neither the token nor its base appears
    New,
}

/// A parsed properties document
#[derive(Debug, Clone, Default)]
pub struct Document {
    elements: Vec<Element>,
    index: BTreeMap<CategoryKey, usize>,
    trailing_newline: bool,
    /// Terminator carried by new categories (`"\r"` in CRLF files)
    line_end: String,
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements && self.trailing_newline == other.trailing_newline
    }
}

impl Eq for Document {}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_elements(elements: Vec<Element>, trailing_newline: bool) -> Self {
        let crlf = elements
            .first()
            .and_then(|el| el.lines().into_iter().next())
            .is_some_and(|line| line.ends_with('\r'));
        let mut doc = Self {
            elements,
            index: BTreeMap::new(),
            trailing_newline,
            line_end: if crlf { "\r".to_string() } else { String::new() },
        };
        doc.reindex();
        doc
    }

    pub(crate) fn reindex(&mut self) {
        self.index = self
            .elements
            .iter()
            .enumerate()
            .filter_map(|(i, el)| match el {
                Element::Category(c) => Some((c.key.clone(), i)),
                _ => None,
            })
            .collect();
    }

    /// Source elements in file order
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Categories in ascending key order
    pub fn categories(&self) -> impl Iterator<Item = &Category> + '_ {
        self.index.values().filter_map(|&i| match &self.elements[i] {
            Element::Category(c) => Some(c),
            _ => None,
        })
    }

    pub fn category(&self, key: &CategoryKey) -> Option<&Category> {
        self.index.get(key).and_then(|&i| match &self.elements[i] {
            Element::Category(c) => Some(c),
            _ => None,
        })
    }

    /// All category keys, ascending
    pub fn category_keys(&self) -> Vec<CategoryKey> {
        self.index.keys().cloned().collect()
    }

    pub fn category_count(&self) -> usize {
        self.index.len()
    }

    /// Total number of filed identifiers across all categories
    pub fn identifier_count(&self) -> usize {
        self.categories().map(Category::len).sum()
    }

    pub fn contains(&self, key: &CategoryKey, id: &Identifier) -> bool {
        self.category(key).is_some_and(|c| c.contains(id))
    }

    pub(crate) fn position_of(&self, key: &CategoryKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    fn category_mut(&mut self, key: &CategoryKey) -> Option<&mut Category> {
        let i = *self.index.get(key)?;
        match &mut self.elements[i] {
            Element::Category(c) => Some(c),
            _ => None,
        }
    }

    /// Add an empty category; returns false if it exists
    ///
    /// The entry goes right after the nearest lower-numbered category of the
    /// same kind, else right before the nearest higher one, else at the end.
    pub fn create_category(&mut self, key: &CategoryKey) -> bool {
        if self.index.contains_key(key) {
            return false;
        }

        let same_kind = |(k, _): &(&CategoryKey, &usize)| k.kind() == key.kind();
        let after_lower = self
            .index
            .range(..key.clone())
            .rev()
            .find(same_kind)
            .map(|(_, &i)| i + 1);
        let before_higher = self
            .index
            .range(key.clone()..)
            .find(same_kind)
            .map(|(_, &i)| i);
        let position = after_lower
            .or(before_higher)
            .unwrap_or(self.elements.len());

        let category = Category::new(key.clone()).with_line_end(&self.line_end);
        self.elements.insert(position, Element::Category(category));
        self.reindex();
        true
    }

    /// Add `id` to `key`, creating the category if needed
    ///
    /// Returns false (and leaves the document untouched) if the identifier
    /// is already filed there.
    pub fn insert(&mut self, key: &CategoryKey, id: Identifier) -> bool {
        if self.contains(key, &id) {
            return false;
        }
        self.create_category(key);
        self.category_mut(key).is_some_and(|c| c.insert(id))
    }

    /// Remove `id` from `key`; returns false if it was not there
    pub fn remove(&mut self, key: &CategoryKey, id: &Identifier) -> bool {
        self.category_mut(key).is_some_and(|c| c.remove(id))
    }

    /// Sort a category alphabetically; returns false if unknown or unchanged
    pub fn sort_category(&mut self, key: &CategoryKey) -> bool {
        self.category_mut(key).is_some_and(Category::sort)
    }

    /// Replace or insert or delete the category element at `position`
    pub(crate) fn put_category(
        &mut self,
        position: usize,
        current: Option<&CategoryKey>,
        next: Option<&Category>,
    ) -> bool {
        let matches = match current {
            Some(key) => matches!(
                self.elements.get(position),
                Some(Element::Category(c)) if &c.key == key
            ),
            None => position <= self.elements.len(),
        };
        if !matches {
            return false;
        }

        match (current, next) {
            (Some(_), Some(c)) => self.elements[position] = Element::Category(c.clone()),
            (Some(_), None) => {
                self.elements.remove(position);
            }
            (None, Some(c)) => self.elements.insert(position, Element::Category(c.clone())),
            (None, None) => {}
        }
        self.reindex();
        true
    }

    /// Exact token known, only base known, or new
    pub fn presence(&self, name: &str) -> Presence {
        let Ok(id) = Identifier::parse(name.trim()) else {
            return Presence::New;
        };
        let mut partial = false;
        for item in self.categories().flat_map(Category::items) {
            if item == &id {
                return Presence::Exists;
            }
            if item.base() == id.base() {
                partial = true;
            }
        }
        if partial {
            Presence::Partial
        } else {
            Presence::New
        }
    }

    /// Sorted set of distinct base names
    pub fn base_names(&self) -> BTreeSet<String> {
        self.categories()
            .flat_map(Category::items)
            .map(|id| id.base().to_string())
            .collect()
    }

    /// 1-based line where a category starts in the serialized text
    pub fn category_line(&self, key: &CategoryKey) -> Option<usize> {
        let target = *self.index.get(key)?;
        let line = self.elements[..target]
            .iter()
            .map(|el| el.lines().len())
            .sum::<usize>();
        Some(line + 1)
    }

    /// Serialize back to text
    pub fn to_text(&self) -> String {
        let lines: Vec<String> = self.elements.iter().flat_map(Element::lines).collect();
        let mut text = lines.join("\n");
        if self.trailing_newline {
            text.push('\n');
        }
        text
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    fn key(text: &str) -> CategoryKey {
        CategoryKey::parse(text).unwrap()
    }

    fn id(text: &str) -> Identifier {
        Identifier::parse(text).unwrap()
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut doc = parse_document("block.10=minecraft:stone\n").unwrap();
        assert!(doc.insert(&key("block.10"), id("granite")));
        let once = doc.clone();
        assert!(!doc.insert(&key("block.10"), id("granite")));
        assert_eq!(doc, once);
        assert_eq!(doc.to_text(), "block.10=minecraft:stone granite\n");
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut doc = parse_document("block.10=minecraft:stone\n").unwrap();
        let before = doc.clone();
        assert!(!doc.remove(&key("block.10"), &id("granite")));
        assert!(!doc.remove(&key("block.99"), &id("granite")));
        assert_eq!(doc, before);
        assert_eq!(doc.to_text(), "block.10=minecraft:stone\n");
    }

    #[test]
    fn test_insert_keeps_continuation_layout() {
        let text = "block.10 = a b \\\n    c d\n";
        let mut doc = parse_document(text).unwrap();
        doc.insert(&key("block.10"), id("e"));
        assert_eq!(doc.to_text(), "block.10 = a b \\\n    c d e\n");

        doc.remove(&key("block.10"), &id("c"));
        doc.remove(&key("block.10"), &id("d"));
        doc.remove(&key("block.10"), &id("e"));
        assert_eq!(doc.to_text(), "block.10 = a b\n");
    }

    #[test]
    fn test_insert_groups_by_mod() {
        let text = "block.20=minecraft:oak_log \\\n  mymod:ash_log mymod:elm_log \\\n  other:yew_log\n";
        let mut doc = parse_document(text).unwrap();

        doc.insert(&key("block.20"), id("mymod:fir_log"));
        doc.insert(&key("block.20"), id("birch_log"));
        doc.insert(&key("block.20"), id("newmod:teak_log[axis=y]"));
        assert_eq!(
            doc.to_text(),
            "block.20=minecraft:oak_log birch_log \\\n  mymod:ash_log mymod:elm_log mymod:fir_log \\\n  other:yew_log \\\n  newmod:teak_log[axis=y]\n"
        );
    }

    #[test]
    fn test_insert_into_empty_category_uses_first_line() {
        let mut doc = parse_document("block.1=a\n").unwrap();
        doc.insert(&key("block.2"), id("mymod:x"));
        doc.insert(&key("block.2"), id("mymod:y"));
        assert_eq!(doc.to_text(), "block.1=a\nblock.2=mymod:x mymod:y\n");
    }

    #[test]
    fn test_edit_keeps_crlf_line_endings() {
        let mut doc = parse_document("block.1=a b\r\nblock.2=c \\\r\n d\r\n").unwrap();
        doc.insert(&key("block.2"), id("e"));
        assert_eq!(doc.to_text(), "block.1=a b\r\nblock.2=c \\\r\n d e\r\n");

        doc.insert(&key("block.3"), id("f"));
        assert_eq!(doc.to_text(), "block.1=a b\r\nblock.2=c \\\r\n d e\r\nblock.3=f\r\n");
    }

    #[test]
    fn test_create_category_numeric_order() {
        let text = "block.8=a\nblock.54=b\n";
        let mut doc = parse_document(text).unwrap();
        assert!(doc.create_category(&key("block.12")));
        assert!(!doc.create_category(&key("block.12")));
        assert_eq!(doc.to_text(), "block.8=a\nblock.12=\nblock.54=b\n");

        assert!(doc.create_category(&key("block.100")));
        assert_eq!(doc.to_text(), "block.8=a\nblock.12=\nblock.54=b\nblock.100=\n");
    }

    #[test]
    fn test_create_category_after_lower_neighbour() {
        let text = "#ifdef WAVING\nblock.10001=a\n#endif\nblock.5=b\nitem.1=c\n";
        let mut doc = parse_document(text).unwrap();
        doc.create_category(&key("block.77"));
        doc.create_category(&key("block.2"));
        assert_eq!(
            doc.to_text(),
            "#ifdef WAVING\nblock.10001=a\n#endif\nblock.2=\nblock.5=b\nblock.77=\nitem.1=c\n"
        );
    }

    #[test]
    fn test_insert_creates_missing_category() {
        let mut doc = parse_document("# header\nblock.1=a\n").unwrap();
        assert!(doc.insert(&key("block.42"), id("copper_ore")));
        assert_eq!(doc.to_text(), "# header\nblock.1=a\nblock.42=copper_ore\n");
    }

    #[test]
    fn test_sort_category() {
        let mut doc = parse_document("block.1=c a b\n").unwrap();
        assert!(doc.sort_category(&key("block.1")));
        assert!(!doc.sort_category(&key("block.1")));
        assert_eq!(doc.to_text(), "block.1=a b c\n");
    }

    #[test]
    fn test_sort_keeps_mod_lines() {
        let mut doc = parse_document("block.1=stone andesite \\\n mymod:b mymod:a\n").unwrap();
        assert!(doc.sort_category(&key("block.1")));
        assert_eq!(doc.to_text(), "block.1=andesite stone \\\n mymod:a mymod:b\n");
    }

    #[test]
    fn test_presence() {
        let doc = parse_document("block.1=minecraft:stone_wall minecraft:stone_wall:north\n").unwrap();
        assert_eq!(doc.presence("minecraft:stone_wall:north"), Presence::Exists);
        assert_eq!(doc.presence("minecraft:stone_wall:south"), Presence::Partial);
        assert_eq!(doc.presence("granite_wall"), Presence::New);
    }

    #[test]
    fn test_categories_sorted_and_lines() {
        let doc = parse_document("block.54=b\n\n# c\nblock.8=a \\\n  z\nblock.9=q\n").unwrap();
        let keys: Vec<String> = doc.categories().map(|c| c.key().to_string()).collect();
        assert_eq!(keys, ["block.8", "block.9", "block.54"]);
        assert_eq!(doc.category_line(&key("block.54")), Some(1));
        assert_eq!(doc.category_line(&key("block.8")), Some(4));
        assert_eq!(doc.category_line(&key("block.9")), Some(6));
        assert_eq!(doc.identifier_count(), 4);
    }

    #[test]
    fn test_base_names() {
        let doc = parse_document("block.1=minecraft:stone minecraft:stone:1 oak_log[axis=y]\n").unwrap();
        let names: Vec<String> = doc.base_names().into_iter().collect();
        assert_eq!(names, ["minecraft:stone", "oak_log"]);
    }
}
