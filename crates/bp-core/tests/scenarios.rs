//! End-to-end scenarios over a realistic block.properties file

use bp_core::{
    apply_rules, diff, expand, families_of, parse_document, suggest, CategoryKey, Document, HistoryLog, Identifier,
    RuleSet, Session, Transaction, UnmappedReason,
};

const PACK: &str = "\
# Shader pack block mappings
#ifdef WAVING_PLANTS
block.10001=minecraft:grass minecraft:fern \\
    minecraft:tall_grass:lower
#endif

block.10 = minecraft:stone_wall minecraft:stone_wall:north \\
           minecraft:cobblestone_wall
block.12=minecraft:stone_wall[up=true] minecraft:oak_log[axis=y]
block.54=minecraft:iron_ore minecraft:gold_ore
item.5=minecraft:torch
";

fn key(text: &str) -> CategoryKey {
    CategoryKey::parse(text).unwrap()
}

fn id(text: &str) -> Identifier {
    Identifier::parse(text).unwrap()
}

#[test]
fn round_trip_is_byte_identical() {
    let doc = parse_document(PACK).unwrap();
    similar_asserts::assert_eq!(doc.to_text(), PACK.to_string());

    let no_trailing = PACK.trim_end_matches('\n');
    similar_asserts::assert_eq!(parse_document(no_trailing).unwrap().to_text(), no_trailing.to_string());
}

#[test]
fn insert_twice_equals_insert_once() {
    let doc = parse_document(PACK).unwrap();
    let mut once = doc.clone();
    once.insert(&key("block.54"), id("minecraft:copper_ore"));
    let mut twice = once.clone();
    twice.insert(&key("block.54"), id("minecraft:copper_ore"));

    similar_asserts::assert_eq!(once.to_text(), twice.to_text());
    assert!(once == twice);
}

#[test]
fn stone_wall_template_scenario() {
    let doc = parse_document("block.10 = minecraft:stone_wall minecraft:stone_wall:north\n").unwrap();
    let expansion = expand(&doc, "minecraft:stone_wall", &["granite_wall"]).unwrap();

    let got: Vec<String> = expansion
        .insertions
        .iter()
        .map(|i| format!("{}: {}", i.category, i.identifier))
        .collect();
    assert_eq!(got, vec!["block.10: granite_wall", "block.10: granite_wall:north"]);
}

#[test]
fn expansion_size_is_families_times_names() {
    let doc = parse_document(PACK).unwrap();
    let names = ["granite_wall", "diorite_wall", "andesite_wall", "mymod:brick_wall"];
    let expansion = expand(&doc, "minecraft:stone_wall", &names).unwrap();

    let family = families_of(&doc, "minecraft:stone_wall");
    assert_eq!(family.len(), 3);
    assert_eq!(expansion.insertions.len(), family.len() * names.len());
}

#[test]
fn ore_rule_scenario() {
    let doc = parse_document(PACK).unwrap();
    let rules = RuleSet::parse("*_ore -> category:block.42\n");
    let (next, report) = apply_rules(&doc, &rules.rules, &["copper_ore", "iron_ingot"]);

    assert!(next.contains(&key("block.42"), &id("copper_ore")));
    assert_eq!(report.mapped.len(), 1);
    assert_eq!(report.unmapped.len(), 1);
    assert_eq!(report.unmapped[0].candidate, "iron_ingot");
    assert_eq!(report.unmapped[0].reason, UnmappedReason::NoRuleMatched);

    // block.42 sorts between block.12 and block.54
    let keys: Vec<String> = next.category_keys().iter().map(|k| k.to_string()).collect();
    assert_eq!(keys, vec!["block.10", "block.12", "block.42", "block.54", "block.10001", "item.5"]);
    assert!(next.to_text().contains("block.42=copper_ore\nblock.54="));
}

#[test]
fn rule_runs_are_deterministic() {
    let doc = parse_document(PACK).unwrap();
    let rules = RuleSet::parse(
        "# walls first\n*_wall -> template:stone_wall\n*_ore -> category:block.54\nprefix:oak -> template:minecraft:oak_log\n",
    );
    let candidates = ["granite_wall", "copper_ore", "oak_planks", "glass", "bad name"];

    let first = apply_rules(&doc, &rules.rules, &candidates);
    let second = apply_rules(&doc, &rules.rules, &candidates);
    similar_asserts::assert_eq!(first.0.to_text(), second.0.to_text());
    assert!(first.1 == second.1);
    assert_eq!(first.1.invalid.len(), 1);
}

#[test]
fn undo_redo_inverse_laws() {
    let original = parse_document(PACK).unwrap();
    let mut doc = original.clone();
    let mut history = HistoryLog::new();

    let edits: [(&str, &str, bool); 4] = [
        ("block.10", "minecraft:granite_wall", true),
        ("block.54", "minecraft:iron_ore", false),
        ("block.77", "minecraft:glass", true),
        ("item.5", "minecraft:soul_torch", true),
    ];
    for (category, item, add) in edits {
        let before = doc.clone();
        let mut tx = Transaction::new(&mut doc);
        if add {
            tx.insert(&key(category), id(item));
        } else {
            tx.remove(&key(category), &id(item));
        }
        let op = tx.finish(format!("{category} {item}")).unwrap();
        history.commit(op);
        let committed = doc.clone();

        history.undo(&mut doc).unwrap();
        similar_asserts::assert_eq!(doc.to_text(), before.to_text());
        history.redo(&mut doc).unwrap();
        similar_asserts::assert_eq!(doc.to_text(), committed.to_text());
    }

    history.restore(&mut doc, 0).unwrap();
    similar_asserts::assert_eq!(doc.to_text(), PACK.to_string());
}

#[test]
fn three_commits_two_undos_one_redo() {
    let mut session = Session::from_text(PACK).unwrap();
    session.insert(&key("block.10"), "minecraft:granite_wall").unwrap();
    session.insert(&key("block.12"), "minecraft:birch_log[axis=y]").unwrap();
    let after_second = session.to_text();
    session.insert(&key("item.5"), "minecraft:lantern").unwrap();

    session.undo().unwrap();
    session.undo().unwrap();
    session.redo().unwrap();
    similar_asserts::assert_eq!(session.to_text(), after_second);
}

#[test]
fn suggestions_are_monotonic_in_matching_entries() {
    let mut doc: Document = parse_document(PACK).unwrap();
    let wall = key("block.10");
    let score = |doc: &Document| {
        suggest(doc, "granite_wall")
            .into_iter()
            .find(|s| s.category == key("block.10"))
            .map_or(0.0, |s| s.confidence)
    };

    let base = score(&doc);
    assert!(base > 0.0 && base < 1.0);
    doc.insert(&wall, id("minecraft:granite_wall"));
    let exact = score(&doc);
    assert!(exact >= base);
    assert_eq!(exact, 1.0);

    let top = suggest(&doc, "granite_wall");
    assert_eq!(top[0].category, wall);
    assert!(suggest(&doc, "zzz").is_empty());
}

#[test]
fn template_rule_with_missing_template_is_unmapped() {
    let doc = parse_document(PACK).unwrap();
    let rules = RuleSet::parse("*_slab -> template:oak_slab\n");
    let (next, report) = apply_rules(&doc, &rules.rules, &["birch_slab"]);

    similar_asserts::assert_eq!(next.to_text(), PACK.to_string());
    assert_eq!(
        report.unmapped[0].reason,
        UnmappedReason::TemplateNotFound("oak_slab".to_string())
    );
}

#[test]
fn session_persistence_and_diff() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pack.session.json");

    let mut session = Session::from_text(PACK).unwrap();
    session
        .expand_template("minecraft:stone_wall", &["granite_wall"])
        .unwrap();
    session.remove(&key("item.5"), "minecraft:torch").unwrap();
    session.save_session(&path).unwrap();

    let loaded = Session::load_session(&path).unwrap();
    similar_asserts::assert_eq!(loaded.to_text(), session.to_text());

    let changes: Vec<String> = diff(loaded.original(), loaded.document())
        .iter()
        .map(|e| e.to_string())
        .collect();
    assert_eq!(
        changes,
        vec![
            "+ block.10: granite_wall",
            "+ block.10: granite_wall:north",
            "+ block.12: granite_wall[up=true]",
            "- item.5: minecraft:torch",
        ]
    );
}
