use clap::{Parser, Subcommand, ValueEnum};

use crate::models::bookmark::SortBy;

#[derive(Parser)]
#[command(name = "rsmark", version, about = "A bookmark manager for the terminal")]
pub struct Cli {
    /// Database to operate on
    #[arg(short, long, global = true, default_value = "bookmarks")]
    pub name: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new bookmark
    New {
        url: String,
        #[arg(short, long, default_value = "")]
        title: String,
        /// Comma, space or newline separated
        #[arg(short = 'T', long, default_value = "")]
        tags: String,
        #[arg(short, long, default_value = "")]
        desc: String,
    },

    /// Edit bookmarks in the external editor
    Edit {
        /// Record ids
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Soft-delete bookmarks and compact the remaining ids
    Remove {
        ids: Vec<i64>,
        /// Pick ids interactively instead
        #[arg(long)]
        menu: bool,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Restore soft-deleted bookmarks
    Restore {
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// List bookmarks
    Records {
        /// Substring filter across id, title, url, tags and description
        query: Option<String>,
        /// Require every listed tag
        #[arg(short = 'T', long)]
        tags: Vec<String>,
        /// First letter of the first tag
        #[arg(long)]
        letter: Option<char>,
        #[arg(long)]
        favorites: bool,
        #[arg(long, value_enum, default_value_t = SortArg::Newest)]
        sort: SortArg,
        /// Emit the full records as JSON
        #[arg(long)]
        json: bool,
        /// Print a single field per line
        #[arg(long, value_enum)]
        field: Option<FieldArg>,
        /// Keep only the first N records
        #[arg(long)]
        head: Option<usize>,
        /// Keep only the last N records
        #[arg(long)]
        tail: Option<usize>,
    },

    /// List tags with usage counts
    Tags {
        #[arg(long)]
        json: bool,
    },

    /// Mark a bookmark visited and print its url
    Open { id: i64 },

    /// Toggle the favorite flag
    Favorite { id: i64 },

    /// Manage databases
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },

    /// Manage backups
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },

    /// Import bookmarks from an external source
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },

    /// Track databases in a git working tree
    Git {
        #[command(subcommand)]
        command: GitCommands,
    },

    /// Print the version
    Version,
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Create and initialize a database
    New {
        #[arg(short, long)]
        force: bool,
    },
    /// Delete a database file (and its ciphertext sibling)
    Drop {
        #[arg(short, long)]
        force: bool,
    },
    /// Show derived statistics
    Info {
        #[arg(long)]
        json: bool,
    },
    /// List databases under the data root
    List,
    /// Encrypt the database file in place
    Lock,
    /// Decrypt the database file in place
    Unlock,
    /// Rebuild the database file to reclaim pages
    Vacuum,
}

#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a dated copy and purge beyond the retention limit
    New {
        #[arg(short, long)]
        force: bool,
    },
    /// List backups, newest first
    List,
    /// Remove a backup by name
    Rm { backup: String },
}

#[derive(Subcommand)]
pub enum ImportCommands {
    /// From another database
    Database { source: String },
    /// From a backup of this database
    Backup { backup: String },
    /// From a Netscape bookmark file
    Html {
        file: String,
        /// Fetch missing titles and descriptions
        #[arg(long)]
        fetch: bool,
    },
    /// From a browser export (Netscape bookmark file)
    Browser {
        file: String,
        #[arg(long)]
        fetch: bool,
    },
    /// From a git-tracked repository
    Git { url: String },
}

#[derive(Subcommand)]
pub enum GitCommands {
    /// Initialize the tracker working tree
    Init {
        /// Recreate an existing repository
        #[arg(long)]
        redo: bool,
        /// Configure GPG encryption for the projections
        #[arg(long)]
        encrypt: bool,
        /// GPG recipient for --encrypt
        #[arg(long)]
        recipient: Option<String>,
    },
    /// Export and commit the current projections
    Commit {
        #[arg(short, long, default_value = "update")]
        message: String,
    },
    Push,
    Pull,
    /// Set or show the origin url
    Remote { url: Option<String> },
    /// Manage tracked databases
    Tracker {
        #[command(subcommand)]
        command: TrackerCommands,
    },
    /// Clone a tracked repository and import its records
    Import { url: String },
}

#[derive(Subcommand)]
pub enum TrackerCommands {
    /// Start tracking the selected database
    Add,
    /// Stop tracking the selected database
    Rm,
    /// List tracked databases
    List,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Newest,
    Oldest,
    LastVisit,
    MoreVisits,
    Favorites,
}

impl From<SortArg> for SortBy {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Newest => SortBy::Newest,
            SortArg::Oldest => SortBy::Oldest,
            SortArg::LastVisit => SortBy::LastVisit,
            SortArg::MoreVisits => SortBy::MoreVisits,
            SortArg::Favorites => SortBy::Favorites,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FieldArg {
    Id,
    Url,
    Title,
    Tags,
    Desc,
}
