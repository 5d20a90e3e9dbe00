use std::io::Read;
use std::path::{Path, PathBuf};

use aquifer_common::telemetry::{self, TelemetryConfig};
use aquifer_common::{EngineConfig, FileStore};
use aquifer_editor_core::{
    Candidate, CandidateDirectory, DetectedMention, Key, MarkupMap, MentionDetector, MentionSyntax,
    to_display_markup, to_persisted_text,
};
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::Deserialize;
use tracing::Level;

#[derive(Parser)]
#[command(version, about = "Aquifer - mention tokens for rich text editors", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Engine configuration file (.json or .toml)
    #[arg(long, global = true, env = "AQUIFER_CONFIG")]
    config: Option<PathBuf>,

    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn persisted text into display markup
    Render {
        /// Input file, stdin when omitted
        input: Option<PathBuf>,

        /// Candidate directory (JSON)
        #[arg(long)]
        directory: PathBuf,
    },
    /// Turn display markup back into persisted text
    Persist {
        /// Input file, stdin when omitted
        input: Option<PathBuf>,

        /// Candidate directory (JSON)
        #[arg(long)]
        directory: PathBuf,
    },
    /// Classify a cursor position in display markup
    Detect {
        /// Input file, stdin when omitted
        input: Option<PathBuf>,

        /// Candidate directory (JSON)
        #[arg(long)]
        directory: PathBuf,

        /// Visible-char offset of the cursor, end of text when omitted
        #[arg(long)]
        cursor: Option<usize>,

        /// Key that moved the cursor, as a DOM key name (e.g. ArrowLeft)
        #[arg(long)]
        key: Option<String>,
    },
}

/// The candidate directory file.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectoryFile {
    current_user: Candidate,
    #[serde(default)]
    candidates: Vec<Candidate>,
}

fn main() -> Result<()> {
    init_miette();

    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    telemetry::init(TelemetryConfig::from_env("aquifer-cli").with_level(level));

    let config = match &cli.config {
        Some(path) => EngineConfig::load(&FileStore::new(path))?,
        None => EngineConfig::default(),
    };
    let syntax = MentionSyntax::new(config.syntax.clone())?;

    match cli.command {
        Commands::Render { input, directory } => {
            let directory = load_directory(&directory)?;
            let text = read_input(input.as_deref())?;
            print!("{}", to_display_markup(&syntax, &text, directory.candidates()));
        }
        Commands::Persist { input, directory } => {
            let directory = load_directory(&directory)?;
            let markup = read_input(input.as_deref())?;
            print!("{}", to_persisted_text(&syntax, &markup, directory.candidates())?);
        }
        Commands::Detect {
            input,
            directory,
            cursor,
            key,
        } => {
            let directory = load_directory(&directory)?;
            let markup = read_input(input.as_deref())?;
            let key = key.as_deref().map(Key::parse);
            detect(syntax, &directory, &config, &markup, cursor, key.as_ref());
        }
    }

    Ok(())
}

fn detect(
    syntax: MentionSyntax,
    directory: &CandidateDirectory,
    config: &EngineConfig,
    markup: &str,
    cursor: Option<usize>,
    key: Option<&Key>,
) {
    let map = MarkupMap::new(markup);
    let cursor = cursor.unwrap_or(map.visible_len());
    let detector = MentionDetector::new(syntax);

    match detector.detect_in(&map, markup, cursor, key) {
        Some(DetectedMention::Working(mention)) => {
            println!("working {} {}..{}", mention.text, mention.start, mention.end);
            let eligible = directory.eligible(mention.query());
            let limit = config.popup.max_candidates.unwrap_or(eligible.len());
            for candidate in eligible.into_iter().take(limit) {
                println!("  {}\t{}", candidate.id, candidate.display_name);
            }
        }
        Some(DetectedMention::Completed(mention)) => {
            println!("completed {} {}..{}", mention.text, mention.start, mention.end);
        }
        None => println!("none"),
    }
}

fn load_directory(path: &Path) -> Result<CandidateDirectory> {
    let contents = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read directory {}", path.display()))?;
    let file: DirectoryFile = serde_json::from_str(&contents)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to parse directory {}", path.display()))?;
    tracing::debug!(
        candidates = file.candidates.len(),
        user = %file.current_user.display_name,
        "loaded directory"
    );
    Ok(CandidateDirectory::new(file.candidates, file.current_user))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .into_diagnostic()
                .wrap_err("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn init_miette() {
    // Keep a hook installed earlier.
    let _ = miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(2)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }));
    miette::set_panic_hook();
}
