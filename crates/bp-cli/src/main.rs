//! Block Properties Merger CLI
//!
//! Command-line tool for merging new blocks into a shader pack's
//! block.properties. Edits are kept in a JSON session file so undo, redo and
//! restore work across invocations.

use bp_core::{
    families_of, resolve_template, CategoryKey, EngineConfig, HistoryState, Presence, RuleSet, Session,
};
use clap::{Parser, Subcommand};
use similar::TextDiff;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bp-cli")]
#[command(about = "Shader pack block.properties merger", long_about = None)]
#[command(version)]
struct Cli {
    /// Engine config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a block.properties file and start a session
    Open {
        /// Path to block.properties
        #[arg(short, long)]
        file: PathBuf,

        /// Session file to create
        #[arg(short, long)]
        session: PathBuf,
    },

    /// List categories with their sizes
    Categories {
        #[arg(short, long)]
        session: PathBuf,
    },

    /// Show where a template's variants are filed
    Families {
        #[arg(short, long)]
        session: PathBuf,

        /// Template name (short names are resolved)
        #[arg(short, long)]
        template: String,
    },

    /// Report whether names are already known to the document
    Check {
        #[arg(short, long)]
        session: PathBuf,

        /// Names to check
        #[arg(short, long, required = true)]
        name: Vec<String>,
    },

    /// Insert identifiers into a category
    Insert {
        #[arg(short, long)]
        session: PathBuf,

        /// Category key (e.g. block.10)
        #[arg(short, long)]
        category: String,

        /// Identifiers to insert
        #[arg(short, long, required = true)]
        id: Vec<String>,
    },

    /// Remove an identifier from a category
    Remove {
        #[arg(short, long)]
        session: PathBuf,

        #[arg(short, long)]
        category: String,

        #[arg(short, long)]
        id: String,
    },

    /// Create an empty category
    Create {
        #[arg(short, long)]
        session: PathBuf,

        #[arg(short, long)]
        category: String,
    },

    /// Sort a category alphabetically
    Sort {
        #[arg(short, long)]
        session: PathBuf,

        #[arg(short, long)]
        category: String,
    },

    /// Give new names the same categories as a template
    Expand {
        #[arg(short, long)]
        session: PathBuf,

        /// Template identifier
        #[arg(short, long)]
        template: String,

        /// New base names
        #[arg(short, long, required = true)]
        name: Vec<String>,
    },

    /// Auto-map new names with a rule file
    Automap {
        #[arg(short, long)]
        session: PathBuf,

        /// Rule file (defaults to the configured one)
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// New names
        #[arg(short, long)]
        name: Vec<String>,

        /// File with one new name per line
        #[arg(long)]
        names_file: Option<PathBuf>,

        /// Only show what would be inserted
        #[arg(long)]
        dry_run: bool,
    },

    /// Rank categories for names no rule handled
    Suggest {
        #[arg(short, long)]
        session: PathBuf,

        #[arg(short, long, required = true)]
        name: Vec<String>,

        /// Also list templates named by matching rules
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },

    /// Undo the last operation
    Undo {
        #[arg(short, long)]
        session: PathBuf,
    },

    /// Redo the next operation
    Redo {
        #[arg(short, long)]
        session: PathBuf,
    },

    /// Jump to the state after a given operation (0 = as loaded)
    Restore {
        #[arg(short, long)]
        session: PathBuf,

        #[arg(short, long)]
        checkpoint: usize,
    },

    /// List recorded operations
    History {
        #[arg(short, long)]
        session: PathBuf,
    },

    /// Show changes since the document was loaded
    Diff {
        #[arg(short, long)]
        session: PathBuf,

        /// Print a unified text diff instead of identifier changes
        #[arg(long)]
        text: bool,

        /// Print identifier changes as JSON
        #[arg(long, conflicts_with = "text")]
        json: bool,
    },

    /// Write the current document
    Save {
        #[arg(short, long)]
        session: PathBuf,

        /// Output path (defaults to the file the session was opened from)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "bp_core=debug" } else { "bp_core=info" };
    let filter = if verbose {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> bp_core::Result<()> {
    let config = match &cli.config {
        Some(path) => {
            let config = EngineConfig::load(path)?;
            debug!(path = %path.display(), ?config, "loaded config");
            config
        }
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Open { file, session } => cmd_open(&file, &session),
        Commands::Categories { session } => cmd_categories(&session),
        Commands::Families { session, template } => cmd_families(&session, &template),
        Commands::Check { session, name } => cmd_check(&session, &name),
        Commands::Insert { session, category, id } => cmd_insert(&session, &category, &id),
        Commands::Remove { session, category, id } => cmd_remove(&session, &category, &id),
        Commands::Create { session, category } => cmd_create(&session, &category),
        Commands::Sort { session, category } => cmd_sort(&session, &category),
        Commands::Expand {
            session,
            template,
            name,
        } => cmd_expand(&session, &template, &name),
        Commands::Automap {
            session,
            rules,
            name,
            names_file,
            dry_run,
        } => {
            let rules = rules.unwrap_or_else(|| config.rules_path.clone());
            cmd_automap(&session, &rules, name, names_file.as_deref(), dry_run, &config)
        }
        Commands::Suggest { session, name, rules } => cmd_suggest(&session, &name, rules.as_deref(), &config),
        Commands::Undo { session } => cmd_undo(&session),
        Commands::Redo { session } => cmd_redo(&session),
        Commands::Restore { session, checkpoint } => cmd_restore(&session, checkpoint),
        Commands::History { session } => cmd_history(&session),
        Commands::Diff { session, text, json } => cmd_diff(&session, text, json),
        Commands::Save { session, output } => cmd_save(&session, output.as_deref()),
    }
}

fn parse_key(text: &str) -> bp_core::Result<CategoryKey> {
    Ok(CategoryKey::parse(text)?)
}

fn cmd_open(file: &Path, session_path: &Path) -> bp_core::Result<()> {
    let session = Session::open(file)?;
    session.save_session(session_path)?;

    let doc = session.document();
    println!("Opened {}", file.display());
    println!(
        "{} categories, {} identifiers",
        doc.category_count(),
        doc.identifier_count()
    );
    println!("Session saved to {}", session_path.display());
    Ok(())
}

fn cmd_categories(session_path: &Path) -> bp_core::Result<()> {
    let session = Session::load_session(session_path)?;
    let doc = session.document();

    println!("Categories ({}):", doc.category_count());
    println!();
    for category in doc.categories() {
        let line = doc.category_line(category.key()).unwrap_or_default();
        println!("  {:<12} {:>5} items  (line {})", category.key().to_string(), category.len(), line);
    }
    Ok(())
}

fn cmd_families(session_path: &Path, template: &str) -> bp_core::Result<()> {
    let session = Session::load_session(session_path)?;
    let doc = session.document();

    let base = resolve_template(doc, template).ok_or_else(|| bp_core::Error::InvalidTemplate(template.to_string()))?;
    let family = families_of(doc, &base);

    println!("{} ({} placements)", family.base, family.len());
    for placement in &family.placements {
        let qualifiers: Vec<&str> = placement
            .qualifiers
            .iter()
            .map(|q| if q.is_empty() { "<bare>" } else { q.as_str() })
            .collect();
        println!("  {}: {}", placement.category, qualifiers.join(" "));
    }
    Ok(())
}

fn cmd_check(session_path: &Path, names: &[String]) -> bp_core::Result<()> {
    let session = Session::load_session(session_path)?;
    for name in names {
        let status = match session.document().presence(name) {
            Presence::Exists => "exists",
            Presence::Partial => "partial (other variants filed)",
            Presence::New => "new",
        };
        println!("{}: {}", name, status);
    }
    Ok(())
}

fn cmd_insert(session_path: &Path, category: &str, ids: &[String]) -> bp_core::Result<()> {
    let mut session = Session::load_session(session_path)?;
    let key = parse_key(category)?;

    let report = session.insert_many(&key, ids)?;
    session.save_session(session_path)?;

    println!("Inserted {} into {} ({} already present)", report.inserted, key, report.unchanged);
    for skipped in &report.skipped {
        println!("  skipped: {}", skipped);
    }
    Ok(())
}

fn cmd_remove(session_path: &Path, category: &str, id: &str) -> bp_core::Result<()> {
    let mut session = Session::load_session(session_path)?;
    let key = parse_key(category)?;

    session.remove(&key, id)?;
    session.save_session(session_path)?;
    println!("Removed {} from {}", id, key);
    Ok(())
}

fn cmd_create(session_path: &Path, category: &str) -> bp_core::Result<()> {
    let mut session = Session::load_session(session_path)?;
    let key = parse_key(category)?;

    if session.create_category(&key)? {
        session.save_session(session_path)?;
        println!("Created {}", key);
    } else {
        println!("{} already exists", key);
    }
    Ok(())
}

fn cmd_sort(session_path: &Path, category: &str) -> bp_core::Result<()> {
    let mut session = Session::load_session(session_path)?;
    let key = parse_key(category)?;

    if session.sort_category(&key)? {
        session.save_session(session_path)?;
        println!("Sorted {}", key);
    } else {
        println!("{} is already sorted", key);
    }
    Ok(())
}

fn cmd_expand(session_path: &Path, template: &str, names: &[String]) -> bp_core::Result<()> {
    let mut session = Session::load_session(session_path)?;
    let base = resolve_template(session.document(), template).unwrap_or_else(|| template.to_string());

    let report = session.expand_template(&base, names)?;
    session.save_session(session_path)?;

    println!(
        "Template '{}': {} insertions, {} new",
        report.expansion.template,
        report.expansion.insertions.len(),
        report.inserted
    );
    for insertion in &report.expansion.insertions {
        println!("  {}: {}", insertion.category, insertion.identifier);
    }
    for skipped in &report.expansion.skipped {
        println!("  skipped: {}", skipped);
    }
    Ok(())
}

fn read_names(names: Vec<String>, names_file: Option<&Path>) -> bp_core::Result<Vec<String>> {
    let mut all = names;
    if let Some(path) = names_file {
        let content = fs::read_to_string(path).map_err(|e| bp_core::Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        all.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(String::from),
        );
    }
    Ok(all)
}

fn cmd_automap(
    session_path: &Path,
    rules_path: &Path,
    names: Vec<String>,
    names_file: Option<&Path>,
    dry_run: bool,
    config: &EngineConfig,
) -> bp_core::Result<()> {
    let mut session = Session::load_session(session_path)?;
    let rules = RuleSet::load(rules_path)?;
    let candidates = read_names(names, names_file)?;

    println!("Loaded {} rules from {}", rules.rules.len(), rules_path.display());
    for warning in &rules.warnings {
        println!("  line {}: {} ({})", warning.line, warning.text, warning.reason);
    }

    let (mapped, unmapped, invalid) = if dry_run {
        let plan = session.plan_rules(&rules.rules, &candidates);
        println!("\nWould insert {} identifiers:", plan.insertions().len());
        for insertion in plan.insertions() {
            println!("  {}: {}", insertion.category, insertion.identifier);
        }
        (plan.mapped, plan.unmapped, plan.invalid)
    } else {
        let report = session.apply_rules_chunked(&rules.rules, &candidates, config.chunk_size, |p| {
            eprintln!("  processed {}/{}", p.processed, p.total);
        })?;
        session.save_session(session_path)?;
        println!("\nInserted {} identifiers", report.inserted);
        (report.mapped, report.unmapped, report.invalid)
    };

    println!("\nMapped ({}):", mapped.len());
    for m in &mapped {
        println!("  {} via '{}' ({} insertions)", m.candidate, m.rule, m.insertions.len());
    }
    if !unmapped.is_empty() {
        println!("\nUnmapped ({}):", unmapped.len());
        for u in &unmapped {
            println!("  {}: {}", u.candidate, u.reason);
        }
    }
    if !invalid.is_empty() {
        println!("\nInvalid ({}):", invalid.len());
        for e in &invalid {
            println!("  {}", e);
        }
    }
    Ok(())
}

fn cmd_suggest(
    session_path: &Path,
    names: &[String],
    rules_path: Option<&Path>,
    config: &EngineConfig,
) -> bp_core::Result<()> {
    let session = Session::load_session(session_path)?;
    let rules = rules_path.map(RuleSet::load).transpose()?;

    for (name, suggestions) in session.suggest_many(names, config) {
        println!("{}:", name);
        if let Some(rules) = &rules {
            for template in rules.template_suggestions(&name) {
                println!("  template {}", template);
            }
        }
        if suggestions.is_empty() {
            println!("  (no similar categories)");
        }
        for s in suggestions {
            println!("  {:<12} {:.2}", s.category.to_string(), s.confidence);
        }
    }
    Ok(())
}

fn cmd_undo(session_path: &Path) -> bp_core::Result<()> {
    let mut session = Session::load_session(session_path)?;
    let description = session.undo()?.description.clone();
    session.save_session(session_path)?;
    println!("Undid: {}", description);
    Ok(())
}

fn cmd_redo(session_path: &Path) -> bp_core::Result<()> {
    let mut session = Session::load_session(session_path)?;
    let description = session.redo()?.description.clone();
    session.save_session(session_path)?;
    println!("Redid: {}", description);
    Ok(())
}

fn cmd_restore(session_path: &Path, checkpoint: usize) -> bp_core::Result<()> {
    let mut session = Session::load_session(session_path)?;
    let steps = session.restore(checkpoint)?;
    session.save_session(session_path)?;
    println!("Restored checkpoint {} ({} steps)", checkpoint, steps);
    Ok(())
}

fn cmd_history(session_path: &Path) -> bp_core::Result<()> {
    let session = Session::load_session(session_path)?;
    let history = session.history();

    match history.state() {
        HistoryState::Clean => println!("History ({} operations):", history.len()),
        HistoryState::Undone(n) => println!("History ({} operations, {} undone):", history.len(), n),
    }
    println!("  0. (as loaded){}", if history.cursor() == 0 { " <-- current" } else { "" });
    for (i, op) in history.operations().iter().enumerate() {
        let marker = if i + 1 == history.cursor() { " <-- current" } else { "" };
        println!(
            "  {}. [{}] {} (+{} -{}){}",
            i + 1,
            op.timestamp.format("%Y-%m-%d %H:%M:%S"),
            op.description,
            op.added(),
            op.removed(),
            marker
        );
    }
    Ok(())
}

fn cmd_diff(session_path: &Path, text: bool, json: bool) -> bp_core::Result<()> {
    let session = Session::load_session(session_path)?;

    if text {
        let before = session.original().to_text();
        let after = session.to_text();
        let diff = TextDiff::from_lines(&before, &after);
        print!("{}", diff.unified_diff().context_radius(2).header("loaded", "current"));
        return Ok(());
    }

    let entries = session.diff();
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No changes");
    }
    for entry in &entries {
        println!("{}", entry);
    }
    Ok(())
}

fn cmd_save(session_path: &Path, output: Option<&Path>) -> bp_core::Result<()> {
    let session = Session::load_session(session_path)?;
    let target = output
        .or_else(|| session.source_path())
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            bp_core::Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "no output path and the session has no source file",
            ))
        })?;

    session.save_as(&target)?;
    println!("Saved {}", target.display());
    Ok(())
}
