//! `fst project` command - Grouping related work orders for a client

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{
    format_short_id, resolve_client_id, resolve_work_order, truncate_str, workspace,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::EntityPrefix;
use crate::core::loader;
use crate::core::Config;
use crate::entities::project::Project;

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a new project
    New(NewArgs),

    /// Attach a work order to a project
    AddWo(AddWoArgs),

    /// List projects
    List(ListArgs),

    /// Show a project's details
    Show(ShowArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Project title
    pub title: String,

    /// Client (name fragment or CLT id)
    #[arg(long, short = 'c')]
    pub client: Option<String>,

    /// Description
    #[arg(long, short = 'd')]
    pub description: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct AddWoArgs {
    /// Project ID or title fragment
    pub project: String,

    /// Work order number or ID
    pub wo: String,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Search in title
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Project ID or title fragment
    pub id: String,
}

pub fn run(cmd: ProjectCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ProjectCommands::New(args) => run_new(args, global),
        ProjectCommands::AddWo(args) => run_add_wo(args, global),
        ProjectCommands::List(args) => run_list(args, global),
        ProjectCommands::Show(args) => run_show(args, global),
    }
}

fn load_project(
    ws: &crate::core::Workspace,
    reference: &str,
) -> Result<(std::path::PathBuf, Project)> {
    let dir = ws.entity_dir(EntityPrefix::Prj);
    if let Some(found) = loader::load_entity::<Project>(&dir, reference)? {
        return Ok(found);
    }
    let needle = reference.to_lowercase();
    loader::load_all_with_paths::<Project>(&dir)?
        .into_iter()
        .find(|(_, p)| p.title.to_lowercase().contains(&needle))
        .ok_or_else(|| miette::miette!("No project found matching '{}'", reference))
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let ws = workspace(global)?;
    let config = Config::load();

    let mut project = Project::new(&args.title, config.author());
    if let Some(ref client_ref) = args.client {
        project.client = Some(resolve_client_id(&ws, client_ref)?);
    }
    project.description = args.description;

    let path = ws.entity_path(EntityPrefix::Prj, &project.id);
    loader::save_entity(&path, &project)?;

    if !global.quiet {
        println!(
            "{} Created project {} ({})",
            style("✓").green(),
            style(&project.title).yellow(),
            style(format_short_id(&project.id)).cyan()
        );
    }
    Ok(())
}

fn run_add_wo(args: AddWoArgs, global: &GlobalOpts) -> Result<()> {
    let ws = workspace(global)?;
    let (path, mut project) = load_project(&ws, &args.project)?;
    let wo = resolve_work_order(&ws, &args.wo)?;

    if project.work_orders.contains(&wo.id) {
        return Err(miette::miette!(
            "{} is already part of '{}'",
            wo.wo_number,
            project.title
        ));
    }
    project.work_orders.push(wo.id.clone());
    loader::save_entity(&path, &project)?;

    if !global.quiet {
        println!(
            "{} Added {} to project {}",
            style("✓").green(),
            style(&wo.wo_number).cyan(),
            style(&project.title).yellow()
        );
    }
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = workspace(global)?;
    let mut projects: Vec<Project> = loader::load_all(&ws.entity_dir(EntityPrefix::Prj))?;

    if let Some(ref search) = args.search {
        let needle = search.to_lowercase();
        projects.retain(|p| p.title.to_lowercase().contains(&needle));
    }
    projects.sort_by(|a, b| a.title.cmp(&b.title));

    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    let format = match global.format {
        OutputFormat::Auto => OutputFormat::Tsv,
        f => f,
    };

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&projects).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&projects).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Id => {
            for project in &projects {
                println!("{}", project.id);
            }
        }
        _ => {
            println!(
                "{:<17} {:<30} {:<10} {:>8}",
                style("ID").bold(),
                style("TITLE").bold(),
                style("STATUS").bold(),
                style("ORDERS").bold()
            );
            println!("{}", "-".repeat(70));
            for project in &projects {
                println!(
                    "{:<17} {:<30} {:<10} {:>8}",
                    style(format_short_id(&project.id)).cyan(),
                    truncate_str(&project.title, 28),
                    project.status,
                    project.work_orders.len()
                );
            }
            println!();
            println!("{} project(s) found.", style(projects.len()).cyan());
        }
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ws = workspace(global)?;
    let (_, project) = load_project(&ws, &args.id)?;

    match global.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&project).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Id => println!("{}", project.id),
        _ => {
            let yaml = serde_yml::to_string(&project).into_diagnostic()?;
            print!("{}", yaml);
        }
    }
    Ok(())
}
