//! Variant index: where a base name's variants are filed
//!
//! Nothing here is cached. Every query scans the document it is handed, so
//! results can never go stale across edits.

use crate::document::Document;
use crate::error::ValidationError;
use crate::identifier::{base_path, CategoryKey, Identifier};
use serde::{Deserialize, Serialize};

/// The qualifiers of one base filed under one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub category: CategoryKey,
    /// Distinct qualifiers in first-seen order; `""` is the bare form
    pub qualifiers: Vec<String>,
}

/// Every (category, qualifier) placement of one base name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantFamily {
    pub base: String,
    /// Ascending by category key
    pub placements: Vec<Placement>,
}

impl VariantFamily {
    /// True when the base is not filed anywhere (not a usable template)
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Number of (category, qualifier) pairs
    pub fn len(&self) -> usize {
        self.placements.iter().map(|p| p.qualifiers.len()).sum()
    }

    /// Categories the family occupies, ascending
    pub fn categories(&self) -> Vec<CategoryKey> {
        self.placements.iter().map(|p| p.category.clone()).collect()
    }

    /// Flattened (category, qualifier) pairs
    pub fn pairs(&self) -> impl Iterator<Item = (&CategoryKey, &str)> + '_ {
        self.placements
            .iter()
            .flat_map(|p| p.qualifiers.iter().map(move |q| (&p.category, q.as_str())))
    }
}

/// Scan every category for identifiers whose base is `template_base`
pub fn families_of(doc: &Document, template_base: &str) -> VariantFamily {
    let placements = doc
        .categories()
        .filter_map(|category| {
            let mut qualifiers: Vec<String> = Vec::new();
            for id in category.items().iter().filter(|id| id.base() == template_base) {
                if !qualifiers.iter().any(|q| q == id.qualifier()) {
                    qualifiers.push(id.qualifier().to_string());
                }
            }
            (!qualifiers.is_empty()).then(|| Placement {
                category: category.key().clone(),
                qualifiers,
            })
        })
        .collect();

    VariantFamily {
        base: template_base.to_string(),
        placements,
    }
}

/// Reduce a template argument to its base (`x:wall[up=true]` -> `x:wall`)
pub fn template_base(template: &str) -> Result<String, ValidationError> {
    Identifier::parse(template.trim()).map(|id| id.base().to_string())
}

/// Categories a template occupies, for previewing where new names will land
pub fn template_categories(doc: &Document, template: &str) -> Vec<CategoryKey> {
    match template_base(template) {
        Ok(base) => families_of(doc, &base).categories(),
        Err(_) => Vec::new(),
    }
}

/// Resolve a possibly short template name to a base known by the document
///
/// Tries, in order: an exact base, a base whose path part equals `name`,
/// and a base whose path part contains `name`. Candidates are scanned in
/// sorted order so the result is deterministic.
pub fn resolve_template(doc: &Document, name: &str) -> Option<String> {
    let name = template_base(name).ok()?;
    let bases = doc.base_names();

    if bases.contains(&name) {
        return Some(name);
    }
    if let Some(found) = bases.iter().find(|b| base_path(b) == name) {
        return Some(found.clone());
    }
    bases.into_iter().find(|b| base_path(b).contains(name.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    const DOC: &str = "\
block.10=minecraft:stone_wall minecraft:stone_wall:north minecraft:cobblestone_wall
block.3=minecraft:stone_wall:up=true minecraft:stone_wall:north
block.20=minecraft:oak_log
block.11=minecraft:stone_wall:north minecraft:stone_wall
";

    #[test]
    fn test_families_grouped_and_ordered() {
        let doc = parse_document(DOC).unwrap();
        let family = families_of(&doc, "minecraft:stone_wall");

        let keys: Vec<String> = family.categories().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["block.3", "block.10", "block.11"]);
        assert_eq!(family.placements[0].qualifiers, [":up=true", ":north"]);
        assert_eq!(family.placements[1].qualifiers, ["", ":north"]);
        assert_eq!(family.placements[2].qualifiers, [":north", ""]);
        assert_eq!(family.len(), 6);
    }

    #[test]
    fn test_families_of_unknown_base_is_empty() {
        let doc = parse_document(DOC).unwrap();
        let family = families_of(&doc, "minecraft:granite_wall");
        assert!(family.is_empty());
        assert_eq!(family.len(), 0);
    }

    #[test]
    fn test_families_exact_base_only() {
        let doc = parse_document(DOC).unwrap();
        // cobblestone_wall shares a suffix but not the base
        let family = families_of(&doc, "minecraft:stone_wall");
        assert!(family.pairs().all(|(_, q)| q != "cobblestone_wall"));
    }

    #[test]
    fn test_template_categories_strips_qualifier() {
        let doc = parse_document(DOC).unwrap();
        let keys = template_categories(&doc, "minecraft:oak_log[axis=y]");
        assert_eq!(keys, [CategoryKey::new("block", 20)]);
    }

    #[test]
    fn test_resolve_template() {
        let doc = parse_document(DOC).unwrap();
        assert_eq!(
            resolve_template(&doc, "minecraft:oak_log").as_deref(),
            Some("minecraft:oak_log")
        );
        assert_eq!(resolve_template(&doc, "stone_wall").as_deref(), Some("minecraft:stone_wall"));
        assert_eq!(resolve_template(&doc, "cobble").as_deref(), Some("minecraft:cobblestone_wall"));
        assert_eq!(resolve_template(&doc, "andesite_wall"), None);
    }
}
