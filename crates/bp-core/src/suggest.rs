//! Suggestion scorer: rank categories for a new name by similarity
//!
//! Advisory only; nothing here touches the document. Templates and rules
//! should be tried first.
//!
//! Per entry, names are compared lower-cased with namespace and qualifier
//! stripped. Equal names score 1.0; otherwise
//! `0.95 * J * (0.6 + 0.4 * R)` where `J` is a weighted Jaccard overlap of
//! `_`-separated tokens (last token counts double) and `R` is normalised
//! Levenshtein similarity. A category combines its entries with a noisy-or
//! in which only the best entry has full weight.

use crate::document::Document;
use crate::identifier::{base_path, CategoryKey, Identifier};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::thread;
use tracing::debug;

/// Weight of every entry after the best one in a category
const SECONDARY_WEIGHT: f64 = 0.25;

/// Cap for non-identical names so they never tie with an exact match
const PARTIAL_CAP: f64 = 0.95;

/// One ranked category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub category: CategoryKey,
    /// In `[0, 1]`
    pub confidence: f64,
}

/// Lower-cased name with namespace and qualifier removed
fn normalise(name: &str) -> String {
    let name = name.trim().to_lowercase();
    match Identifier::parse(&name) {
        Ok(id) => id.path().to_string(),
        Err(_) => base_path(&name).to_string(),
    }
}

/// Edit distance over chars
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev_row: Vec<usize> = (0..=b.len()).collect();
    let mut curr_row = vec![0; b.len() + 1];

    for (i, a_char) in a.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, b_char) in b.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b.len()]
}

fn tokens(name: &str) -> Vec<&str> {
    name.split('_').filter(|t| !t.is_empty()).collect()
}

/// Token overlap where each name's last token weighs 2
fn weighted_jaccard(a: &str, b: &str) -> f64 {
    let mut weights: HashMap<&str, (f64, bool, bool)> = HashMap::new();
    for (side, name) in [(0, a), (1, b)] {
        let toks = tokens(name);
        let last = toks.len().saturating_sub(1);
        for (i, tok) in toks.into_iter().enumerate() {
            let weight = if i == last { 2.0 } else { 1.0 };
            let entry = weights.entry(tok).or_insert((0.0, false, false));
            entry.0 = entry.0.max(weight);
            if side == 0 {
                entry.1 = true;
            } else {
                entry.2 = true;
            }
        }
    }

    let union: f64 = weights.values().map(|(w, _, _)| w).sum();
    if union == 0.0 {
        return 0.0;
    }
    let shared: f64 = weights
        .values()
        .filter(|(_, in_a, in_b)| *in_a && *in_b)
        .map(|(w, _, _)| w)
        .sum();
    shared / union
}

/// Similarity of two already-normalised names
fn similarity(candidate: &str, existing: &str) -> f64 {
    if candidate == existing {
        return 1.0;
    }
    let jaccard = weighted_jaccard(candidate, existing);
    if jaccard == 0.0 {
        return 0.0;
    }
    let longest = candidate.chars().count().max(existing.chars().count()).max(1);
    let ratio = 1.0 - levenshtein(candidate, existing) as f64 / longest as f64;
    PARTIAL_CAP * jaccard * (0.6 + 0.4 * ratio)
}

/// Noisy-or over similarities; order does not matter
fn combine(mut scores: Vec<f64>) -> f64 {
    scores.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    let Some((&best, rest)) = scores.split_first() else {
        return 0.0;
    };
    let miss = rest
        .iter()
        .fold(1.0 - best, |acc, s| acc * (1.0 - SECONDARY_WEIGHT * s));
    (1.0 - miss).clamp(0.0, 1.0)
}

/// Rank every category for `name`, best first; zero scores are left out
pub fn suggest(doc: &Document, name: &str) -> Vec<Suggestion> {
    let candidate = normalise(name);
    let mut out: Vec<Suggestion> = doc
        .categories()
        .filter_map(|category| {
            let scores: Vec<f64> = category
                .items()
                .iter()
                .map(|id| similarity(&candidate, &id.path().to_lowercase()))
                .filter(|s| *s > 0.0)
                .collect();
            let confidence = combine(scores);
            (confidence > 0.0).then(|| Suggestion {
                category: category.key().clone(),
                confidence,
            })
        })
        .collect();

    out.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });
    debug!(name, suggestions = out.len(), "scored categories");
    out
}

/// [`suggest`] trimmed to `limit` results above `min_confidence`
pub fn suggest_with(doc: &Document, name: &str, limit: usize, min_confidence: f64) -> Vec<Suggestion> {
    suggest(doc, name)
        .into_iter()
        .filter(|s| s.confidence > min_confidence)
        .take(limit)
        .collect()
}

/// Score several names in parallel over one read-only snapshot
///
/// `workers == 0` uses the available parallelism. Results keep the order of
/// `names`.
pub fn suggest_many<S>(snapshot: &Document, names: &[S], workers: usize) -> Vec<(String, Vec<Suggestion>)>
where
    S: AsRef<str> + Sync,
{
    if names.is_empty() {
        return Vec::new();
    }
    let workers = match workers {
        0 => thread::available_parallelism().map_or(1, NonZeroUsize::get),
        n => n,
    };
    let per_worker = names.len().div_ceil(workers.min(names.len()));

    thread::scope(|scope| {
        let handles: Vec<_> = names
            .chunks(per_worker)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|n| (n.as_ref().to_string(), suggest(snapshot, n.as_ref())))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|h| match h.join() {
                Ok(results) => results,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    fn confidence_of(out: &[Suggestion], key: &str) -> f64 {
        let key = CategoryKey::parse(key).unwrap();
        out.iter()
            .find(|s| s.category == key)
            .map_or(0.0, |s| s.confidence)
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("hello", "hello"), 0);
        assert_eq!(levenshtein("", "hello"), 5);
        assert_eq!(levenshtein("greeting", "greetng"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn test_identical_name_is_full_confidence() {
        let doc = parse_document("block.1=minecraft:stone_wall\nblock.2=minecraft:oak_log\n").unwrap();
        let out = suggest(&doc, "minecraft:stone_wall:north");
        assert_eq!(out[0].category, CategoryKey::new("block", 1));
        assert_eq!(out[0].confidence, 1.0);
    }

    #[test]
    fn test_disjoint_tokens_score_zero() {
        let doc = parse_document("block.1=minecraft:stone_wall\n").unwrap();
        assert!(suggest(&doc, "oak_log").is_empty());
    }

    #[test]
    fn test_family_token_dominates() {
        let doc = parse_document("block.1=minecraft:stone_wall\nblock.2=minecraft:granite_slab\n").unwrap();
        let out = suggest(&doc, "granite_wall");
        assert!(confidence_of(&out, "block.1") > confidence_of(&out, "block.2"));
        assert!(out.iter().all(|s| s.confidence < 1.0));
    }

    #[test]
    fn test_adding_entries_never_lowers_confidence() {
        let mut doc = parse_document("block.1=minecraft:stone_wall\nblock.2=oak_log\n").unwrap();
        let key = CategoryKey::new("block", 1);
        let mut last = confidence_of(&suggest(&doc, "granite_wall"), "block.1");

        for extra in ["cobblestone_wall", "oak_log", "andesite_wall", "granite_wall"] {
            doc.insert(&key, Identifier::parse(extra).unwrap());
            let now = confidence_of(&suggest(&doc, "granite_wall"), "block.1");
            assert!(now >= last, "{extra}: {now} < {last}");
            last = now;
        }
        assert_eq!(last, 1.0);
    }

    #[test]
    fn test_ties_break_by_key() {
        let doc = parse_document("block.20=stone_wall\nblock.3=stone_wall\n").unwrap();
        let out = suggest(&doc, "stone_wall");
        let keys: Vec<String> = out.iter().map(|s| s.category.to_string()).collect();
        assert_eq!(keys, ["block.3", "block.20"]);
    }

    #[test]
    fn test_suggest_with_limits() {
        let doc = parse_document("block.1=stone_wall\nblock.2=stone_wall\nblock.3=brick_wall\n").unwrap();
        assert_eq!(suggest_with(&doc, "stone_wall", 1, 0.0).len(), 1);
        assert!(suggest_with(&doc, "stone_wall", 10, 0.99)
            .iter()
            .all(|s| s.confidence == 1.0));
    }

    #[test]
    fn test_suggest_many_matches_serial() {
        let doc = parse_document("block.1=stone_wall\nblock.2=oak_log birch_log\nblock.3=iron_ore\n").unwrap();
        let names = ["granite_wall", "spruce_log", "copper_ore", "glass", "stone_wall"];

        let parallel = suggest_many(&doc, &names, 2);
        assert_eq!(parallel.len(), names.len());
        for ((name, got), expected) in parallel.iter().zip(names) {
            assert_eq!(name, expected);
            assert_eq!(got, &suggest(&doc, expected));
        }
        assert_eq!(suggest_many(&doc, &names, 0), parallel);
    }
}
