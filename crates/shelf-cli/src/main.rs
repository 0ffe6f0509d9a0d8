//! SHELF CLI
//!
//! Command-line interface for SHELF - book shelves, favorites and search
//! history.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use shelf_core::{
    Config, FileMedium, LibraryStore, OrderBy, PersistentStore, ShelfName, SortOrder,
};

mod catalog;
mod commands;
mod editor;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "SHELF - Personal book shelves, favorites and search history")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file to use instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the catalog
    Search {
        /// Free-text query
        query: Option<String>,
        /// Match in title
        #[arg(long)]
        title: Option<String>,
        /// Match in author
        #[arg(long)]
        author: Option<String>,
        /// Match subject
        #[arg(long)]
        subject: Option<String>,
        /// Match ISBN
        #[arg(long)]
        isbn: Option<String>,
        /// Match publisher
        #[arg(long)]
        publisher: Option<String>,
        /// Browse books in a subject
        #[arg(long, conflicts_with_all = ["query", "popular", "recent", "by_author"])]
        category: Option<String>,
        /// Browse books by an author
        #[arg(long, conflicts_with_all = ["query", "popular", "recent"])]
        by_author: Option<String>,
        /// Browse popular books
        #[arg(long, conflicts_with_all = ["query", "recent"])]
        popular: bool,
        /// Browse books published this year
        #[arg(long, conflicts_with_all = ["query", "popular"])]
        recent: bool,
        /// Result page, starting at 1
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Result ordering (relevance, newest)
        #[arg(long)]
        order: Option<OrderBy>,
        /// Catalog filter (ebooks, free-ebooks, paid-ebooks, full, partial)
        #[arg(long)]
        filter: Option<String>,
        /// Restrict to a language code
        #[arg(long)]
        lang: Option<String>,
    },
    /// Show book details
    Show {
        /// Catalog book ID
        id: String,
    },
    /// Add a book to a shelf
    Add {
        /// Catalog book ID
        id: String,
        /// Shelf (to-read, reading, read)
        #[arg(short, long, default_value = "to-read")]
        shelf: ShelfName,
    },
    /// Remove a book from a shelf
    #[command(alias = "rm")]
    Remove {
        /// Catalog book ID
        id: String,
        /// Shelf to remove from (default: every shelf holding the book)
        #[arg(short, long)]
        shelf: Option<ShelfName>,
    },
    /// Move a book to another shelf
    #[command(alias = "mv")]
    Move {
        /// Catalog book ID
        id: String,
        /// Destination shelf
        to: ShelfName,
        /// Source shelf (required when the book is on several shelves)
        #[arg(long)]
        from: Option<ShelfName>,
    },
    /// Toggle a book's favorite status
    #[command(alias = "fav")]
    Favorite {
        /// Catalog book ID
        id: String,
    },
    /// List shelved books
    #[command(alias = "ls")]
    List {
        /// Only this shelf
        #[arg(short, long)]
        shelf: Option<ShelfName>,
        /// Sort order (date-added, title, author, rating)
        #[arg(long, default_value = "date-added")]
        sort: SortOrder,
        /// Only books without a category
        #[arg(long)]
        uncategorized: bool,
    },
    /// List favorite books
    Favorites {
        /// Sort order (date-added, title, author, rating)
        #[arg(long, default_value = "date-added")]
        sort: SortOrder,
    },
    /// Show recent searches
    History,
    /// Show library statistics
    Stats {
        /// Entries in top category/author lists
        #[arg(long)]
        top: Option<usize>,
    },
    /// List probable duplicate books
    Duplicates,
    /// Export the library
    Export {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import a JSON backup
    Import {
        /// Backup file, or - for stdin
        path: String,
    },
    /// Remove every book, favorite and search
    Reset {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Follow changes made by other shelf processes
    Watch {
        /// Poll interval in seconds
        #[arg(long, default_value_t = 2)]
        interval: u64,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, catalog_url, catalog_api_key, max_results, top_n, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let medium = FileMedium::open(config.storage_dir())
        .with_context(|| format!("Failed to open library at {:?}", config.storage_dir()))?;
    let mut store = LibraryStore::open(PersistentStore::standalone(medium));
    info!(context = %store.context(), "Opened library");

    match cli.command {
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Search {
            query,
            title,
            author,
            subject,
            isbn,
            publisher,
            category,
            by_author,
            popular,
            recent,
            page,
            order,
            filter,
            lang,
        } => {
            let request = commands::book::SearchRequest {
                query,
                advanced: shelf_core::AdvancedQuery {
                    title,
                    author,
                    subject,
                    isbn,
                    publisher,
                },
                category,
                by_author,
                popular,
                recent,
                page,
                order,
                filter,
                lang,
            };
            commands::book::search(&mut store, &config, request, &output).await
        }
        Commands::Show { id } => commands::book::show(&store, &config, &id, &output).await,
        Commands::Add { id, shelf } => {
            commands::book::add(&mut store, &config, &id, shelf, &output).await
        }
        Commands::Remove { id, shelf } => commands::book::remove(&mut store, &id, shelf, &output),
        Commands::Move { id, to, from } => {
            commands::book::move_book(&mut store, &id, from, to, &output)
        }
        Commands::Favorite { id } => {
            commands::book::favorite(&mut store, &config, &id, &output).await
        }
        Commands::List {
            shelf,
            sort,
            uncategorized,
        } => commands::library::list(&store, shelf, sort, uncategorized, &output),
        Commands::Favorites { sort } => commands::library::favorites(&store, sort, &output),
        Commands::History => commands::library::history(&store, &output),
        Commands::Stats { top } => {
            commands::library::stats(&store, top.unwrap_or(config.top_n), &output)
        }
        Commands::Duplicates => commands::library::duplicates(&store, &output),
        Commands::Export { format, output: path } => {
            commands::backup::export(&store, format, path.as_deref(), &output)
        }
        Commands::Import { path } => commands::backup::import(&mut store, &path, &output),
        Commands::Reset { yes } => commands::backup::reset(&mut store, yes, &output),
        Commands::Watch { interval } => commands::watch::watch(&mut store, interval, &output).await,
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging
///
/// Only initializes if SHELF_LOG environment variable is set.
/// Logs to config.log_file when set, stderr otherwise.
fn init_logging(config: &Config) {
    // Only log if SHELF_LOG is set
    let Ok(log_level) = std::env::var("SHELF_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!("shelf_core={},shelf_cli={}", log_level, log_level));

    match config.log_path() {
        Some(log_path) => {
            let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
                    return;
                }
            };

            // Ignore error if already initialized
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(log_file)
                .try_init();

            info!("Logging initialized to {:?}", log_path);
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
