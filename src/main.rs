//! flashcard CLI: generate, inspect and study flashcards.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use flashcard_rag::config::{self, Config};
use flashcard_rag::flashcard::FlashcardResponse;
use flashcard_rag::paths::AppPaths;
use flashcard_rag::pipeline::Pipeline;
use flashcard_rag::recovery::{RawModelResponse, ResponseRecovery};
use flashcard_rag::tui::StudyTui;

#[derive(Parser)]
#[command(name = "flashcard", version, about = "Generate flashcards from PDF documents")]
struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/flashcard-rag/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate flashcards from a document and print them as JSON.
    Generate {
        /// PDF (or .txt/.md) document.
        document: PathBuf,

        /// Write the JSON here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Recover flashcards from a saved raw model response.
    Recover {
        /// File with the model output; reads stdin when omitted.
        file: Option<PathBuf>,
    },

    /// Study flashcards in the terminal.
    Study {
        /// Generate cards from this document first.
        document: Option<PathBuf>,

        /// Load cards from a saved `{"flashcards": [...]}` JSON file.
        #[arg(long, conflicts_with = "document")]
        cards: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    // stdout carries JSON output; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,hnsw_rs=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Generate { document, out } => {
            let pipeline = Pipeline::from_config(&config)?;
            let report = pipeline.run(&document)?;
            tracing::info!(
                chunks = report.chunk_count,
                retrieved = report.retrieved,
                flashcards = report.flashcards.len(),
                "done"
            );
            let json = serde_json::to_string_pretty(&FlashcardResponse::new(report.flashcards))
                .into_diagnostic()?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json).into_diagnostic()?;
                    println!("Wrote {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        Commands::Recover { file } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(&path).into_diagnostic()?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf).into_diagnostic()?;
                    buf
                }
            };
            let recovery = ResponseRecovery::from_config(&config.recovery);
            let mapping = recovery.recover(&RawModelResponse::Text(text));
            let json =
                serde_json::to_string_pretty(&FlashcardResponse::from(mapping)).into_diagnostic()?;
            println!("{json}");
        }
        Commands::Study { document, cards } => {
            let (title, flashcards) = match (document, cards) {
                (Some(document), None) => {
                    let pipeline = Pipeline::from_config(&config)?;
                    let report = pipeline.run(&document)?;
                    (display_name(&document), report.flashcards)
                }
                (None, Some(path)) => {
                    let content = std::fs::read_to_string(&path).into_diagnostic()?;
                    let saved = FlashcardResponse::from_json(&content).into_diagnostic()?;
                    (display_name(&path), saved.flashcards)
                }
                _ => miette::bail!("pass a document to generate from, or --cards FILE"),
            };
            StudyTui::new(title, flashcards).run()?;
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Explicit `--config`, else the XDG config file if present, else defaults.
fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => AppPaths::resolve()
            .ok()
            .and_then(|paths| paths.existing_config_file()),
    };
    Ok(Config::load(path.as_deref(), &config::collect_env())?)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
