//! Murajaah CLI
//!
//! Operator interface to a local review database: inspect and grade nodes,
//! manage anchor suspensions, export/import backups, and sync with a shared
//! backup file.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{ArgGroup, Parser, Subcommand};
use colored::Colorize;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use murajaah_core::{
    merge, BackupDocument, EmptyCatalog, EngineConfig, FileTransport, Grade, Maturity, MemoryNode,
    NoSimilarity, NodeKey, ReviewScope, StaticCatalog, Storage, SyncOrchestrator, SyncOutcome,
};

/// Murajaah - memorization review engine CLI
#[derive(Parser)]
#[command(name = "murajaah")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CLI for the Murajaah review scheduling and sync engine")]
struct Cli {
    /// Data directory (defaults to the platform data directory)
    #[arg(long, global = true, env = "MURAJAAH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show node counts by maturity and due status
    Stats,

    /// List nodes due today
    Due {
        /// Restrict to one section (requires --catalog)
        #[arg(long, requires = "catalog")]
        section: Option<u32>,
        /// Catalog JSON describing section units
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Grade a node
    #[command(group(ArgGroup::new("outcome").required(true).args(["forgot", "remembered"])))]
    Grade {
        /// Node id, e.g. verse:2:1-5, mindmap:18, part_mindmap:30
        id: String,
        #[arg(long)]
        forgot: bool,
        #[arg(long)]
        remembered: bool,
    },

    /// Defer a node to tomorrow without changing its schedule
    Postpone {
        /// Node id
        id: String,
    },

    /// Overwrite a node's schedule with a maturity bucket's canonical state
    SetMaturity {
        /// Node id
        id: String,
        /// reset, medium, strong or mastered
        bucket: Maturity,
    },

    /// List anchors held back by repeated failures
    Suspended,

    /// Mark an anchor's content as fixed
    ClearSuspension {
        surah: u32,
        anchor: String,
    },

    /// Write the full local state to a backup file
    Export {
        /// Output file path
        output: PathBuf,
    },

    /// Replace the local state with a backup file
    Import {
        /// Backup JSON file
        file: PathBuf,
    },

    /// Merge two backup files without touching the database
    Merge {
        local: PathBuf,
        remote: PathBuf,
        /// Where to write the merged document
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Sync with a shared backup file
    Sync {
        /// Remote backup file (created on first sync)
        remote: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    if let Commands::Merge {
        local,
        remote,
        output,
    } = &cli.command
    {
        return run_merge(local, remote, output.as_deref());
    }

    let mut storage = Storage::open_default(cli.data_dir, EngineConfig::from_env())
        .context("Failed to open the review database")?;
    info!("Murajaah CLI v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Stats => run_stats(&storage),
        Commands::Due { section, catalog } => run_due(&mut storage, section, catalog),
        Commands::Grade { id, forgot, .. } => {
            let grade = if forgot { Grade::FORGOT } else { Grade::REMEMBERED };
            run_grade(&mut storage, &id, grade)
        }
        Commands::Postpone { id } => run_postpone(&mut storage, &id),
        Commands::SetMaturity { id, bucket } => run_set_maturity(&mut storage, &id, bucket),
        Commands::Suspended => run_suspended(&storage),
        Commands::ClearSuspension { surah, anchor } => {
            storage.clear_suspension(surah, &anchor, Utc::now())?;
            println!("{} {}/{}", "Cleared".green().bold(), surah, anchor);
            Ok(())
        }
        Commands::Export { output } => run_export(&storage, &output),
        Commands::Import { file } => run_import(&mut storage, &file),
        Commands::Sync { remote } => run_sync(&mut storage, remote).await,
        Commands::Merge { .. } => Ok(()),
    }
}

fn run_stats(storage: &Storage) -> anyhow::Result<()> {
    let today = Utc::now().date_naive();
    let stats = storage.stats(today);

    println!("{}", "=== Murajaah Statistics ===".cyan().bold());
    println!();
    println!("{}: {}", "Total Nodes".white().bold(), stats.total_nodes);
    println!("{}: {}", "Due Today".white().bold(), stats.due_today);
    println!("{}: {}", "Review Errors".white().bold(), storage.review_log().len());
    println!(
        "{}: {}",
        "Suspended Anchors".white().bold(),
        storage.suspended_anchors().len()
    );
    if let Some(newest) = stats.newest_review {
        println!("{}: {}", "Last Review".white().bold(), newest.format("%Y-%m-%d %H:%M:%S"));
    }
    match storage.last_sync()? {
        Some(at) => println!("{}: {}", "Last Sync".white().bold(), at.format("%Y-%m-%d %H:%M:%S")),
        None => println!("{}: {}", "Last Sync".white().bold(), "never".dimmed()),
    }

    println!();
    println!("{}", "=== Maturity Distribution ===".yellow().bold());
    let total = stats.total_nodes;
    print_distribution_bar("Reset", stats.reset, total, "red");
    print_distribution_bar("Medium", stats.medium, total, "yellow");
    print_distribution_bar("Strong", stats.strong, total, "green");
    print_distribution_bar("Mastered", stats.mastered, total, "magenta");

    Ok(())
}

fn print_distribution_bar(label: &str, count: usize, total: usize, color: &str) {
    let percentage = if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    };

    let bar_width: usize = 30;
    let filled = ((percentage / 100.0) * bar_width as f64) as usize;
    let empty = bar_width.saturating_sub(filled);

    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(empty));
    let colored_bar = match color {
        "green" => bar.green(),
        "yellow" => bar.yellow(),
        "red" => bar.red(),
        "magenta" => bar.magenta(),
        _ => bar.white(),
    };

    println!(
        "  {:10} [{:30}] {:>4} ({:>5.1}%)",
        label, colored_bar, count, percentage
    );
}

fn run_due(
    storage: &mut Storage,
    section: Option<u32>,
    catalog_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let today = Utc::now().date_naive();
    let due = match (section, catalog_path) {
        (Some(part_id), Some(path)) => {
            let catalog = StaticCatalog::load(&path)
                .with_context(|| format!("Failed to load catalog {}", path.display()))?;
            storage.due_set(&ReviewScope::Section(part_id), &catalog, today)?
        }
        (None, Some(path)) => {
            let catalog = StaticCatalog::load(&path)
                .with_context(|| format!("Failed to load catalog {}", path.display()))?;
            storage.due_set(&ReviewScope::All, &catalog, today)?
        }
        _ => storage.due_set(&ReviewScope::All, &EmptyCatalog, today)?,
    };

    if due.is_empty() {
        println!("{}", "Nothing due today.".dimmed());
        return Ok(());
    }

    println!("{} {}", due.len().to_string().cyan().bold(), "due today".white().bold());
    for node in &due {
        print_node(node);
    }
    Ok(())
}

fn print_node(node: &MemoryNode) {
    let s = &node.scheduler;
    println!(
        "  {:24} {:9} interval {:>4}d  rep {:>2}  ease {:.2}  due {}",
        node.id,
        s.maturity().to_string(),
        s.interval,
        s.repetition,
        s.ease_factor,
        s.due_date
    );
}

fn parse_key(id: &str) -> anyhow::Result<NodeKey> {
    NodeKey::parse_id(id).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid node id '{}'. Expected verse:S:A-B, mindmap:S or part_mindmap:P.",
            id
        )
    })
}

fn run_grade(storage: &mut Storage, id: &str, grade: Grade) -> anyhow::Result<()> {
    let now = Utc::now();
    let key = parse_key(id)?;
    storage.get_or_create_node(&key, now.date_naive())?;
    let outcome = storage.grade_node(&key.id(), grade, &NoSimilarity, now)?;

    let verdict = if grade.is_success() {
        "Remembered".green().bold()
    } else {
        "Forgot".red().bold()
    };
    println!("{} {}", verdict, key);
    print_node(&outcome.after);

    if let Some(error) = &outcome.review_error {
        if let (Some(surah), Some(anchor)) = (error.surah_id, error.anchor_id.as_deref()) {
            let failures = storage.anchor_failure_count(surah, anchor);
            let threshold = storage.config().suspension_threshold;
            println!(
                "  anchor {}/{}: {} of {} unresolved failures",
                surah, anchor, failures, threshold
            );
            if failures >= threshold {
                println!("  {}", "Anchor is now suspended.".yellow());
            }
        }
    }
    Ok(())
}

fn run_postpone(storage: &mut Storage, id: &str) -> anyhow::Result<()> {
    let node = storage.postpone_node(id, Utc::now())?;
    println!("{} {}", "Postponed".yellow().bold(), node.id);
    print_node(&node);
    Ok(())
}

fn run_set_maturity(storage: &mut Storage, id: &str, bucket: Maturity) -> anyhow::Result<()> {
    let now = Utc::now();
    let key = parse_key(id)?;
    storage.get_or_create_node(&key, now.date_naive())?;
    let node = storage.override_maturity(&key.id(), bucket, now)?;
    println!("{} {} -> {}", "Updated".green().bold(), node.id, bucket);
    print_node(&node);
    Ok(())
}

fn run_suspended(storage: &Storage) -> anyhow::Result<()> {
    let suspended = storage.suspended_anchors();
    if suspended.is_empty() {
        println!("{}", "No suspended anchors.".dimmed());
        return Ok(());
    }

    println!("{}", "=== Suspended Anchors ===".yellow().bold());
    for anchor in &suspended {
        let range = anchor
            .range
            .map(|(start, end)| format!("verses {}-{}", start, end))
            .unwrap_or_else(|| "anchor removed".to_string());
        println!(
            "  {}/{}  {}  {} failures",
            anchor.surah_id,
            anchor.anchor_id.bold(),
            range,
            anchor.failures.to_string().red()
        );
        for node_id in &anchor.node_ids {
            println!("    {}", node_id.dimmed());
        }
    }
    Ok(())
}

fn run_export(storage: &Storage, output: &Path) -> anyhow::Result<()> {
    let json = storage.export_json(Utc::now())?;
    std::fs::write(output, json)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "{} {} nodes to {}",
        "Exported".green().bold(),
        storage.state().nodes.len(),
        output.display()
    );
    Ok(())
}

fn run_import(storage: &mut Storage, file: &Path) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    storage.import_json(&json)?;
    println!(
        "{} {} nodes from {}",
        "Imported".green().bold(),
        storage.state().nodes.len(),
        file.display()
    );
    Ok(())
}

fn read_backup(path: &Path) -> anyhow::Result<BackupDocument> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(murajaah_core::backup::decode(&json)?)
}

fn run_merge(local: &Path, remote: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let local_doc = read_backup(local)?;
    let remote_doc = read_backup(remote)?;
    let outcome = merge(&local_doc, &remote_doc, Utc::now());

    println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    println!(
        "{}: {}",
        "Changed".white().bold(),
        if outcome.changed { "yes".green() } else { "no".dimmed() }
    );

    if let Some(path) = output {
        std::fs::write(path, murajaah_core::backup::encode(&outcome.merged)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Merged document written to {}", path.display());
    }
    Ok(())
}

async fn run_sync(storage: &mut Storage, remote: PathBuf) -> anyhow::Result<()> {
    let orchestrator = SyncOrchestrator::new(FileTransport::new(remote));
    let outcome = orchestrator.sync(storage, Utc::now()).await;

    match &outcome {
        SyncOutcome::Success {
            pushed, imported, ..
        } => println!(
            "{} (pushed: {}, imported: {})",
            "Sync complete".green().bold(),
            pushed,
            imported
        ),
        SyncOutcome::NoChange => println!("{}", "Already in sync".dimmed()),
        SyncOutcome::Error { message } => anyhow::bail!("Sync failed: {}", message),
    }
    Ok(())
}
