//! `fst tech` command - Technician management

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{format_short_id, truncate_str, workspace};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::EntityPrefix;
use crate::core::loader;
use crate::core::Config;
use crate::entities::technician::Technician;

#[derive(Subcommand, Debug)]
pub enum TechCommands {
    /// Register a new technician
    New(NewArgs),

    /// List technicians
    List(ListArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Technician name
    pub name: String,

    /// Phone number
    #[arg(long)]
    pub phone: Option<String>,

    /// Specialty (hvac, electrical, plumbing, ...)
    #[arg(long, short = 's')]
    pub specialty: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Include inactive technicians
    #[arg(long)]
    pub all: bool,

    /// Filter by specialty
    #[arg(long, short = 's')]
    pub specialty: Option<String>,
}

pub fn run(cmd: TechCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        TechCommands::New(args) => run_new(args, global),
        TechCommands::List(args) => run_list(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let ws = workspace(global)?;
    let config = Config::load();

    let mut tech = Technician::new(&args.name, config.author());
    tech.phone = args.phone;
    tech.specialty = args.specialty;

    let path = ws.entity_path(EntityPrefix::Tech, &tech.id);
    loader::save_entity(&path, &tech)?;

    if !global.quiet {
        println!(
            "{} Registered technician {} ({})",
            style("✓").green(),
            style(&tech.name).yellow(),
            style(format_short_id(&tech.id)).cyan()
        );
    }
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = workspace(global)?;
    let mut techs: Vec<Technician> = loader::load_all(&ws.entity_dir(EntityPrefix::Tech))?;

    techs.retain(|t| args.all || t.active);
    if let Some(ref specialty) = args.specialty {
        let needle = specialty.to_lowercase();
        techs.retain(|t| {
            t.specialty
                .as_ref()
                .is_some_and(|s| s.to_lowercase().contains(&needle))
        });
    }
    techs.sort_by(|a, b| a.name.cmp(&b.name));

    if techs.is_empty() {
        println!("No technicians found.");
        return Ok(());
    }

    let format = match global.format {
        OutputFormat::Auto => OutputFormat::Tsv,
        f => f,
    };

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&techs).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&techs).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Id => {
            for tech in &techs {
                println!("{}", tech.id);
            }
        }
        _ => {
            println!(
                "{:<17} {:<22} {:<15} {:<14}",
                style("ID").bold(),
                style("NAME").bold(),
                style("SPECIALTY").bold(),
                style("PHONE").bold()
            );
            println!("{}", "-".repeat(70));
            for tech in &techs {
                println!(
                    "{:<17} {:<22} {:<15} {:<14}",
                    style(format_short_id(&tech.id)).cyan(),
                    truncate_str(&tech.name, 20),
                    tech.specialty.as_deref().unwrap_or("-"),
                    tech.phone.as_deref().unwrap_or("-")
                );
            }
            println!();
            println!("{} technician(s) found.", style(techs.len()).cyan());
        }
    }
    Ok(())
}
