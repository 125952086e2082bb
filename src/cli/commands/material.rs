//! `fst material` command - Material catalog management

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{format_short_id, truncate_str, workspace};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::EntityPrefix;
use crate::core::loader;
use crate::core::pricing::format_currency;
use crate::core::Config;
use crate::entities::material::Material;

#[derive(Subcommand, Debug)]
pub enum MaterialCommands {
    /// Add a material to the catalog
    New(NewArgs),

    /// List catalog materials
    List(ListArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Material name
    pub name: String,

    /// Unit price
    #[arg(long, short = 'p', allow_negative_numbers = true)]
    pub price: f64,

    /// Unit of measure (each, ft, lb, ...)
    #[arg(long, short = 'u')]
    pub unit: Option<String>,

    /// Vendor SKU
    #[arg(long)]
    pub sku: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Include inactive materials
    #[arg(long)]
    pub all: bool,

    /// Search in name
    #[arg(long)]
    pub search: Option<String>,
}

pub fn run(cmd: MaterialCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        MaterialCommands::New(args) => run_new(args, global),
        MaterialCommands::List(args) => run_list(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    if args.price < 0.0 {
        return Err(miette::miette!("Unit price cannot be negative"));
    }

    let ws = workspace(global)?;
    let config = Config::load();

    let mut material = Material::new(&args.name, args.price, config.author());
    material.unit = args.unit;
    material.sku = args.sku;

    let path = ws.entity_path(EntityPrefix::Mat, &material.id);
    loader::save_entity(&path, &material)?;

    if !global.quiet {
        println!(
            "{} Added material {} at {} ({})",
            style("✓").green(),
            style(&material.name).yellow(),
            style(format_currency(material.unit_price)).green(),
            style(format_short_id(&material.id)).cyan()
        );
    }
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = workspace(global)?;
    let mut materials: Vec<Material> = loader::load_all(&ws.entity_dir(EntityPrefix::Mat))?;

    materials.retain(|m| args.all || m.active);
    if let Some(ref search) = args.search {
        let needle = search.to_lowercase();
        materials.retain(|m| m.name.to_lowercase().contains(&needle));
    }
    materials.sort_by(|a, b| a.name.cmp(&b.name));

    if materials.is_empty() {
        println!("No materials found.");
        return Ok(());
    }

    let format = match global.format {
        OutputFormat::Auto => OutputFormat::Tsv,
        f => f,
    };

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&materials).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&materials).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Id => {
            for material in &materials {
                println!("{}", material.id);
            }
        }
        _ => {
            println!(
                "{:<17} {:<28} {:<10} {:<8} {:<12}",
                style("ID").bold(),
                style("NAME").bold(),
                style("PRICE").bold(),
                style("UNIT").bold(),
                style("SKU").bold()
            );
            println!("{}", "-".repeat(78));
            for material in &materials {
                println!(
                    "{:<17} {:<28} {:<10} {:<8} {:<12}",
                    style(format_short_id(&material.id)).cyan(),
                    truncate_str(&material.name, 26),
                    format_currency(material.unit_price),
                    material.unit.as_deref().unwrap_or("-"),
                    material.sku.as_deref().unwrap_or("-")
                );
            }
            println!();
            println!("{} material(s) found.", style(materials.len()).cyan());
        }
    }
    Ok(())
}
