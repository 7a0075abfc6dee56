use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Manage a personal book catalog from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a book to the catalog
    #[command(alias = "new")]
    Add {
        /// Book title
        title: String,
        /// Author name
        author: String,
        #[command(flatten)]
        fields: BookFields,
    },
    /// List books
    List {
        /// Number of books to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Only books in this category
        #[arg(long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search books by title or author
    Search {
        /// Search query
        query: String,
        /// Number of books to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing book
    Edit {
        /// Book ID or unique ID prefix
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New author
        #[arg(long)]
        author: Option<String>,
        #[command(flatten)]
        fields: BookFields,
    },
    /// Delete a book
    Delete {
        /// Book ID or unique ID prefix
        id: String,
    },
    /// Import books from a JSON file (localized column names welcome)
    Import {
        /// Input path
        input: PathBuf,
    },
    /// Export the catalog
    Export {
        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Synchronize with the configured remote repository
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Configure remote credentials and sync behavior
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

/// Optional catalog fields shared by add and edit.
#[derive(Args, Default)]
pub struct BookFields {
    /// Series the book belongs to
    #[arg(long)]
    pub series: Option<String>,
    /// Category (defaults to "uncategorized")
    #[arg(long)]
    pub category: Option<String>,
    /// Cabinet the book is shelved in
    #[arg(long)]
    pub cabinet: Option<String>,
    /// Shelf row within the cabinet
    #[arg(long)]
    pub row: Option<String>,
    /// Publisher
    #[arg(long)]
    pub publisher: Option<String>,
    /// Free-form description
    #[arg(long)]
    pub description: Option<String>,
    /// ISBN
    #[arg(long)]
    pub isbn: Option<String>,
    /// Private notes
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Push local changes into the remote document
    Push {
        /// Sync even if the last sync was recent
        #[arg(long)]
        force: bool,
    },
    /// Apply the remote document to the local catalog
    Pull {
        /// Apply even if the remote document is not newer
        #[arg(long)]
        force: bool,
    },
    /// Show watermark, pending changes, and consistency with the remote
    Status,
    /// Keep running, syncing periodically and on demand
    Watch,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Store the remote repository credentials and location
    SetRemote {
        /// API token with access to the repository
        #[arg(long, value_name = "TOKEN")]
        token: String,
        /// Repository in owner/name form
        #[arg(long, value_name = "OWNER/NAME")]
        repository: String,
        /// Branch holding the catalog document
        #[arg(long, default_value = "main")]
        branch: String,
        /// Path of the catalog document within the repository
        #[arg(long, default_value = "books.json")]
        file_path: String,
    },
    /// Adjust the automatic sync schedule
    SetSchedule {
        /// Enable or disable automatic sync
        #[arg(long)]
        enabled: Option<bool>,
        /// Minutes between periodic consistency checks
        #[arg(long)]
        interval_minutes: Option<u64>,
        /// Sync when the network comes back
        #[arg(long)]
        sync_on_reconnect: Option<bool>,
        /// Sync shortly after startup
        #[arg(long)]
        sync_on_startup: Option<bool>,
        /// Suppress success notifications for background syncs
        #[arg(long)]
        silent: Option<bool>,
    },
    /// Show the current configuration (token redacted)
    Show,
}
