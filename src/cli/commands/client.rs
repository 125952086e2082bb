//! `fst client` command - Client management

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{format_short_id, truncate_str, workspace};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::EntityPrefix;
use crate::core::loader;
use crate::core::Config;
use crate::entities::client::{Client, Location, Poc};

#[derive(Subcommand, Debug)]
pub enum ClientCommands {
    /// Create a new client
    New(NewArgs),

    /// List clients
    List(ListArgs),

    /// Show a client's details
    Show(ShowArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Client name
    pub name: String,

    /// Primary contact name
    #[arg(long)]
    pub contact: Option<String>,

    /// Primary contact phone
    #[arg(long)]
    pub phone: Option<String>,

    /// Primary contact email
    #[arg(long)]
    pub email: Option<String>,

    /// Service location as LABEL:ADDRESS (repeatable)
    #[arg(long, short = 'l')]
    pub location: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Include inactive clients
    #[arg(long)]
    pub all: bool,

    /// Search in name
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Client ID or name fragment
    pub id: String,
}

pub fn run(cmd: ClientCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ClientCommands::New(args) => run_new(args, global),
        ClientCommands::List(args) => run_list(args, global),
        ClientCommands::Show(args) => run_show(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let ws = workspace(global)?;
    let config = Config::load();

    let mut client = Client::new(&args.name, config.author());

    if args.contact.is_some() || args.phone.is_some() || args.email.is_some() {
        client.contact = Some(Poc {
            name: args.contact.unwrap_or_else(|| args.name.clone()),
            phone: args.phone,
            email: args.email,
        });
    }

    for loc in &args.location {
        let (label, address) = match loc.split_once(':') {
            Some((label, address)) => (label.to_string(), Some(address.to_string())),
            None => (loc.clone(), None),
        };
        client.locations.push(Location {
            label,
            address,
            city: None,
        });
    }

    let path = ws.entity_path(EntityPrefix::Clt, &client.id);
    loader::save_entity(&path, &client)?;

    if !global.quiet {
        println!(
            "{} Created client {} ({})",
            style("✓").green(),
            style(&client.name).yellow(),
            style(format_short_id(&client.id)).cyan()
        );
        println!("   {}", style(path.display()).dim());
    }
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = workspace(global)?;
    let mut clients: Vec<Client> = loader::load_all(&ws.entity_dir(EntityPrefix::Clt))?;

    clients.retain(|c| args.all || c.active);
    if let Some(ref search) = args.search {
        let needle = search.to_lowercase();
        clients.retain(|c| c.name.to_lowercase().contains(&needle));
    }
    clients.sort_by(|a, b| a.name.cmp(&b.name));

    if clients.is_empty() {
        println!("No clients found.");
        return Ok(());
    }

    let format = match global.format {
        OutputFormat::Auto => OutputFormat::Tsv,
        f => f,
    };

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&clients).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&clients).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Id => {
            for client in &clients {
                println!("{}", client.id);
            }
        }
        _ => {
            println!(
                "{:<17} {:<25} {:<20} {:<10}",
                style("ID").bold(),
                style("NAME").bold(),
                style("CONTACT").bold(),
                style("STATUS").bold()
            );
            println!("{}", "-".repeat(75));
            for client in &clients {
                let contact = client
                    .contact
                    .as_ref()
                    .map(|p| p.name.as_str())
                    .unwrap_or("-");
                let status = if client.active { "active" } else { "inactive" };
                println!(
                    "{:<17} {:<25} {:<20} {:<10}",
                    style(format_short_id(&client.id)).cyan(),
                    truncate_str(&client.name, 23),
                    truncate_str(contact, 18),
                    status
                );
            }
            println!();
            println!("{} client(s) found.", style(clients.len()).cyan());
        }
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ws = workspace(global)?;
    let dir = ws.entity_dir(EntityPrefix::Clt);

    let client = match loader::load_entity::<Client>(&dir, &args.id)? {
        Some((_, client)) => client,
        None => {
            let needle = args.id.to_lowercase();
            loader::load_all::<Client>(&dir)?
                .into_iter()
                .find(|c| c.name.to_lowercase().contains(&needle))
                .ok_or_else(|| miette::miette!("No client found matching '{}'", args.id))?
        }
    };

    match global.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&client).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Id => println!("{}", client.id),
        _ => {
            let yaml = serde_yml::to_string(&client).into_diagnostic()?;
            print!("{}", yaml);
        }
    }
    Ok(())
}
