//! # doc-search CLI (`docsearch`)
//!
//! Runs the HTTP server and provides one-shot commands against the same
//! engine configuration.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docsearch serve` | Start the HTTP server |
//! | `docsearch init` | Create the index and field mappings if missing |
//! | `docsearch ping` | Check that the engine answers |
//! | `docsearch search ...` | Run a search and print the JSON response |
//! | `docsearch upsert <file>` | Index a document from a JSON file |
//! | `docsearch delete <id>` | Delete one document |
//! | `docsearch delete-all --yes` | Delete every document |

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;

use doc_search::config;
use doc_search::models::{Document, SearchParams, SortMode};
use doc_search::server;
use doc_search::service::SearchService;

/// Search gateway for an OpenSearch document index.
#[derive(Parser)]
#[command(name = "docsearch", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docsearch.toml")]
    config: PathBuf,

    /// Log at debug level (compiled queries, engine round-trips).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Create the index with its field mappings. Safe to run repeatedly.
    Init,

    /// Check that the engine is reachable.
    Ping,

    /// Run a search and print the response as JSON.
    Search {
        /// Free-text query.
        #[arg(long)]
        q: Option<String>,

        /// Exact phrase (small reorderings tolerated).
        #[arg(long)]
        phrase: Option<String>,

        /// Tag filter; repeat for any-of matching.
        #[arg(long = "tag")]
        tags: Vec<String>,

        #[arg(long)]
        category: Option<String>,

        /// Filter on the featured flag (`true` or `false`).
        #[arg(long, value_parser = clap::value_parser!(bool))]
        featured: Option<bool>,

        #[arg(long, value_enum)]
        sort: Option<SortArg>,

        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        page_size: Option<u32>,
    },

    /// Index (or fully replace) a document read from a JSON file.
    Upsert {
        /// Path to the document JSON.
        path: PathBuf,
    },

    /// Delete one document by id.
    Delete { id: String },

    /// Delete every document in the index.
    DeleteAll {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Relevance,
    Recent,
    Views,
}

impl From<SortArg> for SortMode {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Relevance => SortMode::Relevance,
            SortArg::Recent => SortMode::Recent,
            SortArg::Views => SortMode::Views,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Init => {
            let service = SearchService::from_config(&cfg)?;
            service.engine().ensure_index().await?;
            println!("Index '{}' ready.", cfg.engine.index);
        }
        Commands::Ping => {
            let service = SearchService::from_config(&cfg)?;
            service.engine().ping().await?;
            println!("ok");
        }
        Commands::Search {
            q,
            phrase,
            tags,
            category,
            featured,
            sort,
            page,
            page_size,
        } => {
            let params = SearchParams {
                q,
                phrase,
                tags: (!tags.is_empty()).then_some(tags),
                category,
                featured,
                sort: sort.map(SortMode::from),
                page,
                page_size,
            };
            let service = SearchService::from_config(&cfg)?;
            let response = service.search(&params).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Upsert { path } => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read document file: {}", path.display()))?;
            let doc: Document = serde_json::from_str(&content)
                .with_context(|| format!("Invalid document JSON in {}", path.display()))?;
            let service = SearchService::from_config(&cfg)?;
            service.upsert(&doc).await?;
            println!("Indexed document {}.", doc.id);
        }
        Commands::Delete { id } => {
            let service = SearchService::from_config(&cfg)?;
            service.remove(&id).await?;
            println!("Deleted document {}.", id);
        }
        Commands::DeleteAll { yes } => {
            if !yes {
                bail!("Refusing to delete every document without --yes");
            }
            let service = SearchService::from_config(&cfg)?;
            service.remove_all().await?;
            println!("Deleted all documents.");
        }
    }

    Ok(())
}
