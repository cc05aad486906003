//! Template expander: replicate a template's variant footprint onto new names

use crate::document::Document;
use crate::error::{Error, Result, ValidationError};
use crate::identifier::{CategoryKey, Identifier};
use crate::variants::{families_of, template_base};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// One planned (category, identifier) insertion
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Insertion {
    pub category: CategoryKey,
    pub identifier: Identifier,
}

impl Insertion {
    pub fn new(category: CategoryKey, identifier: Identifier) -> Self {
        Self {
            category,
            identifier,
        }
    }
}

/// Result of expanding one template over a batch of new base names
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Expansion {
    /// Template base the footprint was taken from
    pub template: String,
    /// Deduplicated insertions, grouped by category then by new name
    pub insertions: Vec<Insertion>,
    /// Names rejected by the identifier grammar
    pub skipped: Vec<ValidationError>,
}

impl Expansion {
    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty()
    }

    /// Apply the plan directly to a document; returns how many were new
    pub fn apply_to(&self, doc: &mut Document) -> usize {
        self.insertions
            .iter()
            .filter(|ins| doc.insert(&ins.category, ins.identifier.clone()))
            .count()
    }
}

/// Plan the insertions that give each of `new_bases` the template's footprint
///
/// `template` may carry a qualifier; only its base is used. Fails with
/// [`Error::InvalidTemplate`] when the base is filed nowhere. Invalid names
/// are skipped and reported without failing the batch.
pub fn expand<S: AsRef<str>>(doc: &Document, template: &str, new_bases: &[S]) -> Result<Expansion> {
    let base = template_base(template)?;
    let family = families_of(doc, &base);
    if family.is_empty() {
        warn!(template = %base, "template not found in any category");
        return Err(Error::InvalidTemplate(base));
    }

    let mut names: Vec<String> = Vec::with_capacity(new_bases.len());
    let mut skipped = Vec::new();
    for name in new_bases {
        match Identifier::parse_base(name.as_ref().trim()) {
            Ok(valid) => names.push(valid),
            Err(e) => {
                debug!(name = name.as_ref(), error = %e, "skipping invalid name");
                skipped.push(e);
            }
        }
    }

    let mut seen: HashSet<Insertion> = HashSet::new();
    let mut insertions = Vec::new();
    for placement in &family.placements {
        for name in &names {
            for qualifier in &placement.qualifiers {
                let insertion = Insertion::new(
                    placement.category.clone(),
                    Identifier::new(name.clone(), qualifier.clone()),
                );
                if seen.insert(insertion.clone()) {
                    insertions.push(insertion);
                }
            }
        }
    }

    debug!(
        template = %base,
        placements = family.len(),
        names = names.len(),
        insertions = insertions.len(),
        "expanded template"
    );

    Ok(Expansion {
        template: base,
        insertions,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    fn rendered(expansion: &Expansion) -> Vec<String> {
        expansion
            .insertions
            .iter()
            .map(|i| format!("{}: {}", i.category, i.identifier))
            .collect()
    }

    #[test]
    fn test_expand_stone_wall_scenario() {
        let doc = parse_document("block.10 = minecraft:stone_wall minecraft:stone_wall:north\n").unwrap();
        let expansion = expand(&doc, "minecraft:stone_wall", &["granite_wall"]).unwrap();

        assert_eq!(
            rendered(&expansion),
            ["block.10: granite_wall", "block.10: granite_wall:north"]
        );
        assert!(expansion.skipped.is_empty());
    }

    #[test]
    fn test_expansion_count_is_product() {
        let doc = parse_document(
            "block.1=minecraft:stone_wall minecraft:stone_wall:north\nblock.2=minecraft:stone_wall[up=true]\nblock.3=minecraft:dirt\n",
        )
        .unwrap();
        let names = ["granite_wall", "diorite_wall", "mymod:brick_wall"];
        let expansion = expand(&doc, "minecraft:stone_wall", &names).unwrap();

        let family = families_of(&doc, "minecraft:stone_wall");
        assert_eq!(family.len(), 3);
        assert_eq!(expansion.insertions.len(), family.len() * names.len());
    }

    #[test]
    fn test_invalid_names_skipped() {
        let doc = parse_document("block.1=minecraft:stone_wall\n").unwrap();
        let expansion = expand(&doc, "minecraft:stone_wall", &["granite_wall", "bad name", "x[y"]).unwrap();

        assert_eq!(rendered(&expansion), ["block.1: granite_wall"]);
        assert_eq!(expansion.skipped.len(), 2);
        assert_eq!(expansion.skipped[0].token, "bad name");
    }

    #[test]
    fn test_duplicate_names_dedup() {
        let doc = parse_document("block.1=minecraft:stone_wall\n").unwrap();
        let expansion = expand(&doc, "minecraft:stone_wall", &["granite_wall", "granite_wall"]).unwrap();
        assert_eq!(expansion.insertions.len(), 1);
    }

    #[test]
    fn test_unknown_template_is_error() {
        let doc = parse_document("block.1=minecraft:stone\n").unwrap();
        let err = expand(&doc, "minecraft:stone_wall", &["granite_wall"]).unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate(ref t) if t == "minecraft:stone_wall"));
    }

    #[test]
    fn test_template_with_qualifier_and_apply() {
        let mut doc = parse_document("block.1=minecraft:stone_wall minecraft:stone_wall:north\n").unwrap();
        let expansion = expand(&doc, "minecraft:stone_wall:north", &["granite_wall"]).unwrap();
        assert_eq!(expansion.template, "minecraft:stone_wall");

        assert_eq!(expansion.apply_to(&mut doc), 2);
        assert_eq!(expansion.apply_to(&mut doc), 0);
        assert_eq!(
            doc.to_text(),
            "block.1=minecraft:stone_wall minecraft:stone_wall:north granite_wall granite_wall:north\n"
        );
    }

    #[test]
    fn test_expand_skips_variants_already_filed() {
        let mut doc =
            parse_document("block.10 = minecraft:stone_wall minecraft:stone_wall:north granite_wall:north\n").unwrap();
        let expansion = expand(&doc, "minecraft:stone_wall", &["granite_wall"]).unwrap();

        assert_eq!(expansion.apply_to(&mut doc), 1);
        let text = doc.to_text();
        assert_eq!(text.matches("granite_wall:north").count(), 1);
        assert_eq!(
            text,
            "block.10 = minecraft:stone_wall minecraft:stone_wall:north granite_wall:north granite_wall\n"
        );
    }
}
