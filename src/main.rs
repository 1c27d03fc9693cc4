use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;
use stickystudy_tools::config::{ConfigSource, Settings};
use stickystudy_tools::model::{JlptLevel, KanjiTable};
use stickystudy_tools::sync::{self, SortKey};
use stickystudy_tools::{Result, StudyError};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging().and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|error| StudyError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(&ConfigSource {
        config_file: cli.config_file,
        deck_dir: cli.deck_dir,
        data_dir: cli.data_dir,
    })?;

    match cli.command {
        Command::SyncKanji(args) => execute_sync_kanji(&settings, args),
        Command::SyncSubsets => sync::sync_subsets(&settings),
        Command::SyncCopy(args) => {
            sync::sync_copy(&settings, &args.deck, &args.label, args.with_kanji).map(|_| ())
        }
        Command::SyncAll => sync::sync_all(&settings),
        Command::Add(args) => execute_add(&settings, args),
        Command::Fix(args) => {
            print!("{}", sync::fix_export(&args.input_file)?);
            Ok(())
        }
    }
}

fn execute_sync_kanji(settings: &Settings, args: SyncKanjiArgs) -> Result<()> {
    let levels = args
        .levels
        .into_iter()
        .map(JlptLevel::try_from)
        .collect::<Result<Vec<_>>>()?;
    let input = args
        .input_file
        .unwrap_or_else(|| settings.current_list_path());
    let prefix = args
        .output_prefix
        .unwrap_or_else(|| settings.kanji_prefix.clone());
    sync::sync_kanji(settings, &levels, &input, &prefix).map(|_| ())
}

fn execute_add(settings: &Settings, args: AddArgs) -> Result<()> {
    let sort_by = args
        .sort_by
        .iter()
        .map(|key| key.parse::<SortKey>())
        .collect::<Result<Vec<_>>>()?;
    let master = args
        .input_file
        .unwrap_or_else(|| settings.master_list_path());
    let current = args
        .output_file
        .unwrap_or_else(|| settings.current_list_path());
    let assume_yes = args.yes;

    sync::add_kanji(&master, &current, args.num_kanji, &sort_by, |selection| {
        confirm_selection(selection, assume_yes)
    })
    .map(|_| ())
}

const CONFIRM_PROMPT: &str = "Add these kanji to the current study list?";

fn confirm_selection(selection: &KanjiTable, assume_yes: bool) -> Result<bool> {
    if !selection.is_empty() {
        println!("{}", sync::render_preview(selection));
    }
    if assume_yes {
        return Ok(true);
    }
    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(CONFIRM_PROMPT)
        .default(false)
        .interact()?;
    Ok(confirmed)
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Utilities for managing StickyStudy decks."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// StickyStudy deck directory (defaults to the StickyStudy iCloud folder).
    #[arg(long, global = true)]
    deck_dir: Option<PathBuf>,

    /// Directory holding the kanji list TSV files.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Path to a JSON settings file.
    #[arg(long, global = true)]
    config_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Sync the current kanji list with the ON/KUN/MEANING StickyStudy decks.
    SyncKanji(SyncKanjiArgs),
    /// Regenerate vocabulary subset decks from their source decks.
    SyncSubsets,
    /// Copy a deck into a reversed deck named <DECK>-<LABEL>.
    SyncCopy(SyncCopyArgs),
    /// Run sync-kanji (N5-N3), sync-subsets, and sync-copy in order.
    SyncAll,
    /// Add kanji from the master list to the current study list.
    Add(AddArgs),
    /// Fix mojibake in a StickyStudy CSV export.
    Fix(FixArgs),
}

#[derive(clap::Args)]
struct SyncKanjiArgs {
    /// JLPT levels to include.
    #[arg(long, num_args = 1.., required = true, value_parser = clap::value_parser!(u8).range(1..=5))]
    levels: Vec<u8>,

    /// Input TSV file of kanji data.
    #[arg(short, long)]
    input_file: Option<PathBuf>,

    /// Output prefix (either a full path prefix, or relative to the deck directory).
    #[arg(short, long)]
    output_prefix: Option<String>,
}

#[derive(clap::Args)]
struct SyncCopyArgs {
    /// Name of the deck to copy.
    deck: String,

    /// Label appended to the copied deck's name.
    #[arg(long)]
    label: String,

    /// Show the kanji spelling on the answer side instead of the reading.
    #[arg(long)]
    with_kanji: bool,
}

#[derive(clap::Args)]
struct AddArgs {
    /// Input TSV file of kanji data.
    #[arg(short, long)]
    input_file: Option<PathBuf>,

    /// Output TSV file of current kanji data.
    #[arg(short, long)]
    output_file: Option<PathBuf>,

    /// Number of kanji to add.
    #[arg(short, long, default_value_t = 3)]
    num_kanji: usize,

    /// Sort criteria.
    #[arg(short, long, num_args = 1.., default_values_t = ["jlpt".to_string(), "grade".to_string(), "freq".to_string()])]
    sort_by: Vec<String>,

    /// Add without asking for confirmation.
    #[arg(short, long)]
    yes: bool,
}

#[derive(clap::Args)]
struct FixArgs {
    /// CSV file exported by StickyStudy.
    input_file: PathBuf,
}
