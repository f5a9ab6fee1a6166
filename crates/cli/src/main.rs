mod cmd;
mod logging;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "vsync", version, about = "Keep a searchable index in sync with a markdown vault")]
struct Cli {
    /// Path to config file (default: $XDG_CONFIG_HOME/vaultsync/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Config profile to use
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Vault root, overriding the profile (works without a config file)
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scan the whole vault and bring the index up to date
    Scan(ScanArgs),

    /// Reindex a single document (or drop it if it no longer exists)
    Update(UpdateArgs),

    /// Full-text search across indexed documents
    Search(SearchArgs),

    /// List indexed documents
    Files(FilesArgs),

    /// Show everything indexed for one document
    Show(ShowArgs),

    /// List documents carrying a tag
    Tags(TagsArgs),

    /// List documents linking to a target
    Backlinks(BacklinksArgs),

    /// Show index location and row counts
    Status,

    /// Watch the vault and keep the index in sync until interrupted
    Watch(WatchArgs),
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Print every processed document
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Document path, relative to the vault root or absolute inside it
    pub path: PathBuf,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Search terms
    pub query: String,

    /// Maximum number of results
    #[arg(short, long, default_value_t = vaultsync_core::index::DEFAULT_LIMIT)]
    pub limit: usize,

    /// Match whole terms only (no prefix matching)
    #[arg(long)]
    pub exact: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct FilesArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Document path relative to the vault root
    pub path: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TagsArgs {
    /// Tag to look up, with or without the leading '#'
    pub tag: String,
}

#[derive(Debug, Args)]
pub struct BacklinksArgs {
    /// Link target as written in documents (extension optional)
    pub target: String,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Quiet period before queued changes are applied
    #[arg(long, default_value_t = 500)]
    pub debounce_ms: u64,
}

fn main() {
    let cli = Cli::parse();

    let rc =
        cmd::resolve_config(cli.config.as_deref(), cli.profile.as_deref(), cli.vault.as_deref());
    logging::init(&rc);

    match cli.command {
        Commands::Scan(args) => cmd::scan::run(&rc, args),
        Commands::Update(args) => cmd::update::run(&rc, args),
        Commands::Search(args) => cmd::search::run(&rc, args),
        Commands::Files(args) => cmd::files::run(&rc, args),
        Commands::Show(args) => cmd::show::run(&rc, args),
        Commands::Tags(args) => cmd::tags::run(&rc, args),
        Commands::Backlinks(args) => cmd::backlinks::run(&rc, args),
        Commands::Status => cmd::status::run(&rc),
        Commands::Watch(args) => cmd::watch::run(&rc, args),
    }
}
