use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "limber")]
#[command(about = "Log rehabilitation progress offline and sync it across devices")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a new entry (fields as a JSON object, or piped on stdin)
    #[command(alias = "new")]
    Add {
        /// Collection to add to
        #[arg(value_enum)]
        collection: Collection,
        /// Entry fields, e.g. '{"recordedAt":"2026-04-02T07:45:00Z","level":4,"location":"knee"}'
        fields: Option<String>,
    },
    /// List entries in a collection
    List {
        #[arg(value_enum)]
        collection: Collection,
        /// Only entries not yet pushed
        #[arg(long)]
        pending: bool,
        /// Number of entries to show (most recent first)
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show pending counts and sign-in state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push local changes and pull new entries from your account
    Sync {
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
        /// Keep syncing every SECONDS until interrupted
        #[arg(long, value_name = "SECONDS")]
        watch: Option<u64>,
    },
    /// Sign in with email/password and store the session in the keychain
    Login {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Sign out and clear the stored session
    Logout,
    /// Validate configuration and print the collection mapping
    Check,
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

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Collection {
    Exercise,
    Rom,
    Pain,
    Sleep,
    Supplement,
    Appointment,
    Journal,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
