//! `fst quote` command - Quote drafting, pricing, and lifecycle

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{
    format_short_id, open_store, parse_date, resolve_client_id, resolve_quote, transition_ctx,
    truncate_str,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::changelog::{ChangeLogEntry, EntityKind};
use crate::core::identity::EntityPrefix;
use crate::core::loader;
use crate::core::pricing::format_currency;
use crate::core::store::{Store, WriteBatch};
use crate::core::{quote_flow, Config};
use crate::entities::quote::{DiscountType, Quote, QuoteItem, QuoteItemKind, QuoteStatus};

#[derive(Subcommand, Debug)]
pub enum QuoteCommands {
    /// Draft a new quote
    New(NewArgs),

    /// Add a line item to a quote
    AddItem(AddItemArgs),

    /// Remove a line item from a quote
    RemoveItem(RemoveItemArgs),

    /// Update tax and discount settings
    SetPricing(SetPricingArgs),

    /// Mark a quote as sent to the client
    Send(RefArgs),

    /// Record client approval
    Approve(RefArgs),

    /// Record client rejection
    Reject(RefArgs),

    /// Expire a quote whose validity date has passed
    Expire(RefArgs),

    /// Reset a rejected or expired quote back to draft
    Reset(RefArgs),

    /// Show a quote's details
    Show(RefArgs),

    /// List quotes with filtering
    List(ListArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Quote title
    pub title: String,

    /// Client (name fragment or CLT id)
    #[arg(long, short = 'c')]
    pub client: Option<String>,

    /// Service location label
    #[arg(long, short = 'l')]
    pub location: Option<String>,

    /// Validity date (YYYY-MM-DD)
    #[arg(long)]
    pub valid_until: Option<String>,

    /// Apply tax to the subtotal
    #[arg(long)]
    pub tax: bool,

    /// Tax rate in percent (default: configured rate)
    #[arg(long)]
    pub tax_rate: Option<f64>,
}

#[derive(clap::Args, Debug)]
pub struct AddItemArgs {
    /// Quote number or ID
    pub quote: String,

    /// Item description
    #[arg(long, short = 'd')]
    pub description: String,

    /// Quantity
    #[arg(long, short = 'n', allow_negative_numbers = true)]
    pub qty: f64,

    /// Unit price (default: catalog price when --material is used)
    #[arg(long, short = 'p', allow_negative_numbers = true)]
    pub price: Option<f64>,

    /// Catalog material (name fragment or MAT id)
    #[arg(long, short = 'm')]
    pub material: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RemoveItemArgs {
    /// Quote number or ID
    pub quote: String,

    /// Display order of the item to remove (from `fst quote show`)
    pub item: u32,
}

#[derive(clap::Args, Debug)]
pub struct SetPricingArgs {
    /// Quote number or ID
    pub quote: String,

    /// Enable or disable tax
    #[arg(long)]
    pub tax: Option<bool>,

    /// Tax rate in percent
    #[arg(long)]
    pub tax_rate: Option<f64>,

    /// Discount type
    #[arg(long, value_parser = ["percentage", "fixed"])]
    pub discount_type: Option<String>,

    /// Discount value (percent or currency amount)
    #[arg(long)]
    pub discount: Option<f64>,
}

#[derive(clap::Args, Debug)]
pub struct RefArgs {
    /// Quote number or ID
    pub quote: String,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's')]
    pub status: Option<QuoteStatus>,

    /// Search in title
    #[arg(long)]
    pub search: Option<String>,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

pub fn run(cmd: QuoteCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        QuoteCommands::New(args) => run_new(args, global),
        QuoteCommands::AddItem(args) => run_add_item(args, global),
        QuoteCommands::RemoveItem(args) => run_remove_item(args, global),
        QuoteCommands::SetPricing(args) => run_set_pricing(args, global),
        QuoteCommands::Send(args) => run_transition(args, QuoteStatus::Sent, global),
        QuoteCommands::Approve(args) => run_transition(args, QuoteStatus::Approved, global),
        QuoteCommands::Reject(args) => run_transition(args, QuoteStatus::Rejected, global),
        QuoteCommands::Expire(args) => run_transition(args, QuoteStatus::Expired, global),
        QuoteCommands::Reset(args) => run_reset(args, global),
        QuoteCommands::Show(args) => run_show(args, global),
        QuoteCommands::List(args) => run_list(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut store = open_store(global)?;
    let config = Config::load();
    let ctx = transition_ctx(global);

    use chrono::Datelike;
    let number = store
        .workspace()
        .next_quote_number(ctx.today().year())
        .map_err(|e| miette::miette!("{}", e))?;

    let mut quote = Quote::new(&number, &args.title, &ctx.actor);
    quote.created = ctx.now;

    if let Some(ref client_ref) = args.client {
        quote.client = Some(resolve_client_id(store.workspace(), client_ref)?);
    }
    quote.location = args.location;
    if let Some(ref date) = args.valid_until {
        quote.valid_until = Some(parse_date(date)?);
    } else if let Some(days) = config.quote_validity_days {
        quote.valid_until = Some(ctx.today() + chrono::Duration::days(days));
    }
    if args.tax || args.tax_rate.is_some() {
        quote.apply_tax = true;
        quote.tax_rate = args.tax_rate.unwrap_or_else(|| config.tax_rate());
    }

    let entry = ChangeLogEntry::created(
        EntityKind::Quote,
        &quote.id.to_string(),
        &ctx.actor,
        ctx.now,
    );
    let batch = WriteBatch::new().with_quote(quote.clone()).with_log(vec![entry]);
    store.apply(batch).map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        println!(
            "{} Created quote {} ({})",
            style("✓").green(),
            style(&number).yellow(),
            style(format_short_id(&quote.id)).cyan()
        );
        if let Some(ref valid) = quote.valid_until {
            println!("   Valid until {}", style(valid).dim());
        }
    }
    Ok(())
}

fn run_add_item(args: AddItemArgs, global: &GlobalOpts) -> Result<()> {
    let mut store = open_store(global)?;
    let ctx = transition_ctx(global);
    let quote = resolve_quote(store.workspace(), &args.quote)?;

    let (kind, material, price) = match &args.material {
        Some(material_ref) => {
            use crate::entities::material::Material;
            let dir = store.workspace().entity_dir(EntityPrefix::Mat);
            let material = match loader::load_entity::<Material>(&dir, material_ref)? {
                Some((_, m)) => m,
                None => {
                    let needle = material_ref.to_lowercase();
                    loader::load_all::<Material>(&dir)?
                        .into_iter()
                        .find(|m| m.name.to_lowercase().contains(&needle))
                        .ok_or_else(|| {
                            miette::miette!("No material found matching '{}'", material_ref)
                        })?
                }
            };
            let price = args.price.unwrap_or(material.unit_price);
            (QuoteItemKind::Material, Some(material.id), price)
        }
        None => {
            let price = args
                .price
                .ok_or_else(|| miette::miette!("--price is required for custom items"))?;
            (QuoteItemKind::Custom, None, price)
        }
    };

    let item = QuoteItem {
        kind,
        material,
        description: args.description,
        quantity: args.qty,
        unit_price: price,
        display_order: 0,
    };

    let outcome =
        quote_flow::add_item(&quote, item, &ctx).map_err(|e| miette::miette!("{}", e))?;
    let total = outcome.quote.total;
    store
        .apply(outcome.into_batch())
        .map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        println!(
            "{} Added item to {} (total now {})",
            style("✓").green(),
            style(&quote.quote_number).yellow(),
            style(format_currency(total)).green()
        );
    }
    Ok(())
}

fn run_remove_item(args: RemoveItemArgs, global: &GlobalOpts) -> Result<()> {
    let mut store = open_store(global)?;
    let ctx = transition_ctx(global);
    let quote = resolve_quote(store.workspace(), &args.quote)?;

    let outcome = quote_flow::remove_item(&quote, args.item, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    let total = outcome.quote.total;
    store
        .apply(outcome.into_batch())
        .map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        println!(
            "{} Removed item {} from {} (total now {})",
            style("✓").green(),
            args.item,
            style(&quote.quote_number).yellow(),
            style(format_currency(total)).green()
        );
    }
    Ok(())
}

fn run_set_pricing(args: SetPricingArgs, global: &GlobalOpts) -> Result<()> {
    let mut store = open_store(global)?;
    let ctx = transition_ctx(global);
    let quote = resolve_quote(store.workspace(), &args.quote)?;

    let discount_type = match args.discount_type.as_deref() {
        Some("percentage") => Some(DiscountType::Percentage),
        Some("fixed") => Some(DiscountType::Fixed),
        Some(other) => return Err(miette::miette!("Unknown discount type '{}'", other)),
        None => None,
    };

    let patch = quote_flow::PricingPatch {
        apply_tax: args.tax,
        tax_rate: args.tax_rate,
        discount_type,
        discount_value: args.discount,
    };

    let outcome = quote_flow::update_pricing(&quote, patch, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;
    let total = outcome.quote.total;
    store
        .apply(outcome.into_batch())
        .map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        println!(
            "{} Updated pricing on {} (total now {})",
            style("✓").green(),
            style(&quote.quote_number).yellow(),
            style(format_currency(total)).green()
        );
    }
    Ok(())
}

fn run_transition(args: RefArgs, target: QuoteStatus, global: &GlobalOpts) -> Result<()> {
    let mut store = open_store(global)?;
    let ctx = transition_ctx(global);
    let quote = resolve_quote(store.workspace(), &args.quote)?;
    let from = quote.status;

    let outcome =
        quote_flow::transition(&quote, target, &ctx).map_err(|e| miette::miette!("{}", e))?;
    store
        .apply(outcome.into_batch())
        .map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        println!(
            "{} {} {} → {}",
            style("✓").green(),
            style(&quote.quote_number).yellow(),
            from,
            style(target).cyan()
        );
    }
    Ok(())
}

fn run_reset(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let mut store = open_store(global)?;
    let ctx = transition_ctx(global);
    let quote = resolve_quote(store.workspace(), &args.quote)?;
    let from = quote.status;

    let outcome =
        quote_flow::reset_to_draft(&quote, &ctx).map_err(|e| miette::miette!("{}", e))?;
    store
        .apply(outcome.into_batch())
        .map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        println!(
            "{} {} {} → {} (reset)",
            style("✓").green(),
            style(&quote.quote_number).yellow(),
            from,
            style("draft").cyan()
        );
    }
    Ok(())
}

fn run_show(args: RefArgs, global: &GlobalOpts) -> Result<()> {
    let store = open_store(global)?;
    let quote = resolve_quote(store.workspace(), &args.quote)?;

    match global.format {
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&quote).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&quote).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Id => println!("{}", quote.id),
        _ => {
            println!("{}", style("─".repeat(60)).dim());
            println!(
                "{}: {} ({})",
                style("Quote").bold(),
                style(&quote.quote_number).yellow(),
                style(&quote.id.to_string()).cyan()
            );
            println!("{}: {}", style("Title").bold(), quote.title);
            println!("{}: {}", style("Status").bold(), style(quote.status).cyan());
            if let Some(ref valid) = quote.valid_until {
                println!("{}: {}", style("Valid until").bold(), valid);
            }
            println!("{}", style("─".repeat(60)).dim());

            if quote.items.is_empty() {
                println!("(no items)");
            } else {
                for item in &quote.items {
                    println!(
                        "  [{}] {:<30} {:>8} x {:>10} = {:>10}",
                        item.display_order,
                        truncate_str(&item.description, 30),
                        item.quantity,
                        format_currency(item.unit_price),
                        format_currency(item.subtotal())
                    );
                }
            }

            println!("{}", style("─".repeat(60)).dim());
            println!("  Subtotal: {:>12}", format_currency(quote.subtotal));
            if quote.apply_tax {
                println!(
                    "  Tax ({}%): {:>10}",
                    quote.tax_rate,
                    format_currency(quote.tax_amount)
                );
            }
            if quote.discount_amount != 0.0 {
                println!("  Discount: {:>12}", format_currency(quote.discount_amount));
            }
            println!(
                "  {}: {:>15}",
                style("Total").bold(),
                style(format_currency(quote.total)).green()
            );
            println!("{}", style("─".repeat(60)).dim());
            println!(
                "{}: {} | {}: {} | {}: {}",
                style("Author").dim(),
                quote.author,
                style("Created").dim(),
                quote.created.format("%Y-%m-%d %H:%M"),
                style("Revision").dim(),
                quote.entity_revision
            );
        }
    }
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let store = open_store(global)?;
    let mut quotes: Vec<Quote> =
        loader::load_all(&store.workspace().entity_dir(EntityPrefix::Quo))?;

    if let Some(status) = args.status {
        quotes.retain(|q| q.status == status);
    }
    if let Some(ref search) = args.search {
        let needle = search.to_lowercase();
        quotes.retain(|q| q.title.to_lowercase().contains(&needle));
    }
    quotes.sort_by(|a, b| a.quote_number.cmp(&b.quote_number));
    if let Some(limit) = args.limit {
        quotes.truncate(limit);
    }

    if quotes.is_empty() {
        println!("No quotes found.");
        return Ok(());
    }

    let format = match global.format {
        OutputFormat::Auto => OutputFormat::Tsv,
        f => f,
    };

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&quotes).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&quotes).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Id => {
            for quote in &quotes {
                println!("{}", quote.id);
            }
        }
        _ => {
            println!(
                "{:<13} {:<28} {:<11} {:>12}",
                style("NUMBER").bold(),
                style("TITLE").bold(),
                style("STATUS").bold(),
                style("TOTAL").bold()
            );
            println!("{}", "-".repeat(68));
            for quote in &quotes {
                println!(
                    "{:<13} {:<28} {:<11} {:>12}",
                    style(&quote.quote_number).cyan(),
                    truncate_str(&quote.title, 26),
                    quote.status,
                    format_currency(quote.total)
                );
            }
            println!();
            println!("{} quote(s) found.", style(quotes.len()).cyan());
        }
    }
    Ok(())
}
