use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dialoguer::Confirm;
use dupecull::config::{DEFAULT_HASH_SIZE, DEFAULT_MAX_DISTANCE};
use dupecull::overlap::{self, OverlapReport};
use dupecull::purge::{self, AUGMENTED_MARKER, PurgeReport};
use dupecull::resolve::Outcome;
use dupecull::{
    DedupeConfig, DedupeReport, DuplicateAction, FileErrorKind, GroupingStrategy, HashAlgorithm,
    OverlapConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(
    name = "dupecull",
    version,
    about = "Find and remove duplicate images in a folder",
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    dedupe: DedupeArgs,
}

#[derive(Args, Debug)]
struct DedupeArgs {
    /// Path to the folder containing images
    #[arg(value_name = "FOLDER", required = true)]
    folder: Option<PathBuf>,

    /// Move duplicates to this folder instead of deleting
    #[arg(long, value_name = "DIR")]
    move_to: Option<PathBuf>,

    /// Perceptual hash size
    #[arg(long, default_value_t = DEFAULT_HASH_SIZE)]
    hash_size: u32,

    /// Maximum hash distance to consider images as duplicates
    #[arg(long, default_value_t = DEFAULT_MAX_DISTANCE)]
    max_distance: u32,

    /// Fingerprint algorithm
    #[arg(long, value_enum, default_value_t = HashAlgorithm::Phash)]
    algorithm: HashAlgorithm,

    /// How near fingerprints are combined into groups
    #[arg(long, value_enum, default_value_t = GroupingStrategy::FirstMatch)]
    strategy: GroupingStrategy,

    /// Only show what would be deleted or moved
    #[arg(long)]
    dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Delete without asking for confirmation
    #[arg(short, long)]
    yes: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report images shared between dataset splits (e.g. train and test)
    Overlaps {
        /// Split folders to compare pairwise
        #[arg(value_name = "DIR", required = true, num_args = 2..)]
        folders: Vec<PathBuf>,

        /// Perceptual hash size
        #[arg(long, default_value_t = DEFAULT_HASH_SIZE)]
        hash_size: u32,

        /// Fingerprint algorithm
        #[arg(long, value_enum, default_value_t = HashAlgorithm::Ahash)]
        algorithm: HashAlgorithm,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete augmented copies (files containing "_aug_" in their names)
    PurgeAugmented {
        /// Directory to search for files
        #[arg(value_name = "DIR")]
        folder: PathBuf,

        /// Show what would be deleted without actually deleting
        #[arg(long)]
        dry_run: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Overlaps {
            folders,
            hash_size,
            algorithm,
            json,
        }) => {
            let mut config = OverlapConfig::new(folders);
            config.hash_size = hash_size;
            config.algorithm = algorithm;
            run_overlaps(&config, json)
        }
        Some(Commands::PurgeAugmented {
            folder,
            dry_run,
            json,
        }) => run_purge(&folder, dry_run, json),
        None => run_dedupe(cli.dedupe),
    }
}

fn run_dedupe(args: DedupeArgs) -> Result<()> {
    let folder = args.folder.context("Missing folder to scan")?;
    let mut config = DedupeConfig::new(folder);
    config.hash_size = args.hash_size;
    config.max_distance = args.max_distance;
    config.algorithm = args.algorithm;
    config.strategy = args.strategy;
    config.move_to = args.move_to;
    config.dry_run = args.dry_run;

    if !args.json {
        println!("▶ Scanning {} for duplicate images…", config.folder.display());
    }
    let progress = progress_bar(args.json)?;
    let started = Instant::now();
    let analysis = dupecull::analyze(&config, &progress)
        .with_context(|| format!("Cannot scan {}", config.folder.display()))?;
    log::info!("Scanning and hashing took {:.2?}", started.elapsed());

    if !args.json {
        println!("Found {} unique images.", analysis.unique_fingerprints);
        println!(
            "Found {} duplicate images in {} groups.",
            analysis.duplicate_files(),
            analysis.groups.len()
        );
    }

    let needs_confirmation = config.action() == DuplicateAction::Delete
        && !config.dry_run
        && !args.yes
        && analysis.duplicate_files() > 0
        && std::io::stdin().is_terminal();
    if needs_confirmation {
        let proceed = Confirm::new()
            .with_prompt(format!(
                "Permanently delete {} duplicate images?",
                analysis.duplicate_files()
            ))
            .default(false)
            .interact()?;
        if !proceed {
            println!("Aborted; no files were changed.");
            return Ok(());
        }
    }

    let report = analysis.resolve(&config);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn run_overlaps(config: &OverlapConfig, json: bool) -> Result<()> {
    let progress = progress_bar(json)?;
    let report = overlap::check_splits(config, &progress).context("Cannot check splits")?;
    progress.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_overlaps(&report);
    }
    Ok(())
}

fn run_purge(folder: &Path, dry_run: bool, json: bool) -> Result<()> {
    let progress = progress_bar(json)?;
    let report = purge::purge_augmented(folder, dry_run, &progress)
        .with_context(|| format!("Cannot purge {}", folder.display()))?;
    progress.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_purge(&report);
    }
    Ok(())
}

fn print_purge(report: &PurgeReport) {
    if report.files.is_empty() {
        println!(
            "No files containing '{}' found in {}",
            AUGMENTED_MARKER,
            report.folder.display()
        );
        return;
    }
    println!(
        "Found {} files containing '{}'",
        report.matched(),
        AUGMENTED_MARKER
    );

    if report.dry_run {
        println!("\nDry run mode - no files will be deleted");
        for file in report.files.iter().filter(|f| f.outcome == Outcome::WouldDelete) {
            println!("   🗑️  [dry-run] Would delete: {}", file.path.display());
        }
    } else {
        println!(
            "\n✅ Successfully deleted {}/{} files",
            report.deleted(),
            report.matched()
        );
    }

    if !report.errors.is_empty() {
        println!("\n⚠️  Errors encountered:");
        for error in &report.errors {
            println!("   - {}", error.message);
        }
    }
}

fn print_report(report: &DedupeReport) {
    for (i, group) in report.groups.iter().enumerate() {
        println!("\n✨ Duplicate group {}:", i + 1);
        println!("   🏆 Original: {}", group.original().display());
        for resolved in report.resolved_for(group) {
            println!("   Duplicate: {}", resolved.path.display());
            match &resolved.outcome {
                Outcome::Deleted => println!("   🗑️  Deleted successfully"),
                Outcome::Moved { to } => println!("   📦 Moved to: {}", to.display()),
                Outcome::WouldDelete => println!("   🗑️  [dry-run] DELETE"),
                Outcome::WouldMove { to } => println!("   📦 [dry-run] MOVE → {}", to.display()),
                Outcome::Failed => println!("   ⚠️  Failed (see errors below)"),
            }
        }
    }

    println!("\nSummary:");
    println!("   files scanned:       {}", report.scanned_files);
    println!("   unique fingerprints: {}", report.unique_fingerprints);
    println!("   duplicate groups:    {}", report.group_count());
    println!("   duplicate files:     {}", report.duplicate_files);
    println!("   handled:             {}", report.handled());

    if !report.errors.is_empty() {
        println!("\n⚠️  {} error(s):", report.errors.len());
        for kind in [FileErrorKind::Decode, FileErrorKind::Delete, FileErrorKind::Move] {
            for error in report.errors_of(kind) {
                println!("   [{:?}] {}", kind, error.message);
            }
        }
    }

    if report.dry_run {
        println!("\n⚠️  Dry-run only; no files were changed.");
    } else {
        println!("\n✅ Duplicate removal process completed.");
    }
}

fn print_overlaps(report: &OverlapReport) {
    for pair in &report.pairs {
        let (left, right) = (pair.left.display(), pair.right.display());
        if pair.overlaps.is_empty() {
            println!("No overlaps between {} and {}", left, right);
            continue;
        }
        println!(
            "Found {} overlaps between {} and {}",
            pair.overlaps.len(),
            left,
            right
        );
        for overlap in &pair.overlaps {
            println!(
                "Hash {}: {:?} <-> {:?}",
                overlap.fingerprint, overlap.left, overlap.right
            );
        }
    }
    for error in &report.errors {
        eprintln!("⚠️  {}", error.message);
    }
}

fn progress_bar(hidden: bool) -> Result<ProgressBar> {
    if hidden {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template(
        "{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}",
    )?);
    bar.enable_steady_tick(Duration::from_millis(100));
    Ok(bar)
}
