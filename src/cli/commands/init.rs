//! `fst init` command - Initialize a new FST workspace

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::core::workspace::{Workspace, WorkspaceError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Force initialization even if .fst/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let ws = if args.force {
        Workspace::init_force(&path)
    } else {
        Workspace::init(&path)
    };

    match ws {
        Ok(ws) => {
            println!(
                "{} Initialized FST workspace at {}",
                style("✓").green(),
                style(ws.root().display()).cyan()
            );
            println!();
            println!("Created workspace structure:");
            for dir in [
                ".fst/",
                "clients/",
                "technicians/",
                "materials/",
                "projects/",
                "quotes/",
                "work_orders/",
                "changelog/",
            ] {
                println!("  {}", style(dir).dim());
            }
            println!();
            println!("Next steps:");
            println!(
                "  {} Register your first client",
                style("fst client new").yellow()
            );
            println!(
                "  {} Draft a quote for them",
                style("fst quote new").yellow()
            );
            Ok(())
        }
        Err(WorkspaceError::AlreadyExists(path)) => {
            println!(
                "{} FST workspace already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!("  Use {} to reinitialize", style("--force").yellow());
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}
