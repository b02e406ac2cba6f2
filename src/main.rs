// ABOUTME: Entry point for the wordledger binary.
// ABOUTME: Parses CLI arguments, initializes tracing, and dispatches ingest / query / serve commands.

mod documents;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use wordledger_core::{PlainTextSource, WordStatus};
use wordledger_server::{AppState, LedgerConfig, create_router};
use wordledger_store::{DEFAULT_LIST_LIMIT, Ledger, WordFilter};

#[derive(Parser)]
#[command(name = "wordledger", about = "Build a deduplicated vocabulary ledger from subtitles and transcripts", version)]
struct Cli {
    /// SQLite database file (overrides WORDLEDGER_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a text file, or every *.txt file under a directory
    Ingest {
        source: PathBuf,
        /// Write the JSON summary here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show one word with its example sentences
    Show { lemma: String },
    /// List words, most frequent first
    List {
        #[arg(long)]
        status: Option<WordStatus>,
        #[arg(long)]
        min_frequency: Option<u64>,
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Set the learning status of a word
    Status { lemma: String, status: WordStatus },
    /// Delete a word and all of its example sentences
    Delete { lemma: String },
    /// Print word / context / observation totals
    Stats,
    /// Start the HTTP API
    Serve {
        /// Socket address (overrides WORDLEDGER_BIND)
        #[arg(long)]
        bind: Option<std::net::SocketAddr>,
    },
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env before reading configuration; a missing file is fine.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordledger=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = LedgerConfig::from_env().context("loading configuration")?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    let mut ledger = Ledger::open(&config.db_path, config.ledger.clone())
        .with_context(|| format!("opening ledger at {}", config.db_path.display()))?;

    match cli.command {
        Commands::Ingest { source, output } => {
            let paths = documents::discover(&source)?;
            tracing::info!(documents = paths.len(), "starting ingest");
            let summary = documents::ingest_all(&mut ledger, &PlainTextSource::new(), &paths);

            let json = serde_json::to_string_pretty(&summary)?;
            match output {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{json}"),
            }

            if summary.failed_documents > 0 {
                tracing::error!(failed = summary.failed_documents, "some documents were not ingested");
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Show { lemma } => match ledger.fetch_word_with_contexts(&lemma)? {
            Some(detail) => print_json(&detail)?,
            None => {
                eprintln!("word not found: {lemma}");
                return Ok(ExitCode::FAILURE);
            }
        },

        Commands::List {
            status,
            min_frequency,
            limit,
            offset,
        } => {
            let words = ledger.list_words(&WordFilter {
                status,
                min_frequency,
                limit,
                offset,
            })?;
            print_json(&words)?;
        }

        Commands::Status { lemma, status } => match ledger.update_word_status(&lemma, status)? {
            Some(word) => print_json(&word)?,
            None => {
                eprintln!("word not found: {lemma}");
                return Ok(ExitCode::FAILURE);
            }
        },

        Commands::Delete { lemma } => {
            if !ledger.delete_word(&lemma)? {
                eprintln!("word not found: {lemma}");
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Stats => print_json(&ledger.stats()?)?,

        Commands::Serve { bind } => {
            let bind = bind.unwrap_or(config.bind);
            let state = Arc::new(AppState::new(ledger));
            let app = create_router(state);

            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("binding {bind}"))?;
            tracing::info!(%bind, "wordledger listening");
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    tokio::signal::ctrl_c().await.ok();
                    tracing::info!("shutting down");
                })
                .await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
