//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    client::ClientCommands,
    history::HistoryArgs,
    init::InitArgs,
    link::LinkCommands,
    material::MaterialCommands,
    project::ProjectCommands,
    quote::QuoteCommands,
    tech::TechCommands,
    wo::WoCommands,
};

#[derive(Parser)]
#[command(name = "fst")]
#[command(author, version, about = "Field Service Toolkit")]
#[command(long_about = "A Unix-style toolkit for managing clients, quotes, and work orders as plain text files with a validated lifecycle and audit trail.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Answer yes to confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Actor recorded on audit entries (default: configured author)
    #[arg(long, global = true, env = "FST_AUTHOR")]
    pub actor: Option<String>,

    /// Workspace root (default: auto-detect by finding .fst/)
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new FST workspace
    Init(InitArgs),

    /// Client management
    #[command(subcommand)]
    Client(ClientCommands),

    /// Technician management
    #[command(subcommand)]
    Tech(TechCommands),

    /// Material catalog management
    #[command(subcommand)]
    Material(MaterialCommands),

    /// Project management (grouping work orders)
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Quote management (pricing, lifecycle)
    #[command(subcommand)]
    Quote(QuoteCommands),

    /// Work order management (scheduling, execution, evidence)
    #[command(subcommand)]
    Wo(WoCommands),

    /// Quote/work-order link management (convert, associate, unlink)
    #[command(subcommand)]
    Link(LinkCommands),

    /// View the change log for an entity
    History(HistoryArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// Just IDs, one per line
    Id,
}
