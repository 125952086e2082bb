//! `fst link` command - Quote/work-order conversion and association

use clap::Subcommand;
use console::style;
use dialoguer::Confirm;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{open_store, resolve_quote, resolve_work_order, transition_ctx};
use crate::cli::GlobalOpts;
use crate::core::association::AssociationManager;

#[derive(Subcommand, Debug)]
pub enum LinkCommands {
    /// Convert an approved quote into a new work order
    Convert(ConvertArgs),

    /// Link an approved quote to an existing work order
    Associate(AssociateArgs),

    /// Break the link, returning the quote to approved
    Unlink(UnlinkArgs),
}

#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
    /// Quote number or ID
    pub quote: String,
}

#[derive(clap::Args, Debug)]
pub struct AssociateArgs {
    /// Quote number or ID
    pub quote: String,

    /// Work order number or ID
    pub wo: String,
}

#[derive(clap::Args, Debug)]
pub struct UnlinkArgs {
    /// Quote number or ID
    pub quote: String,
}

pub fn run(cmd: LinkCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        LinkCommands::Convert(args) => run_convert(args, global),
        LinkCommands::Associate(args) => run_associate(args, global),
        LinkCommands::Unlink(args) => run_unlink(args, global),
    }
}

fn run_convert(args: ConvertArgs, global: &GlobalOpts) -> Result<()> {
    use chrono::Datelike;

    let mut store = open_store(global)?;
    let ctx = transition_ctx(global);
    let quote = resolve_quote(store.workspace(), &args.quote)?;

    let wo_number = store
        .workspace()
        .next_wo_number(ctx.today().year())
        .map_err(|e| miette::miette!("{}", e))?;

    let outcome = AssociationManager::new(&mut store)
        .convert(&quote, &wo_number, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        println!(
            "{} Converted {} → {}",
            style("✓").green(),
            style(&outcome.quote.quote_number).yellow(),
            style(&outcome.work_order.wo_number).cyan()
        );
        if !outcome.work_order.materials.is_empty() {
            println!(
                "   Seeded {} material line(s) from the quote",
                style(outcome.work_order.materials.len()).cyan()
            );
        }
        println!(
            "   Next: {} to put it on the calendar",
            style(format!("fst wo schedule {} <date>", outcome.work_order.wo_number)).yellow()
        );
    }
    Ok(())
}

fn run_associate(args: AssociateArgs, global: &GlobalOpts) -> Result<()> {
    let mut store = open_store(global)?;
    let ctx = transition_ctx(global);
    let quote = resolve_quote(store.workspace(), &args.quote)?;
    let wo = resolve_work_order(store.workspace(), &args.wo)?;

    let outcome = AssociationManager::new(&mut store)
        .associate(&quote, &wo, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        println!(
            "{} Linked {} → {}",
            style("✓").green(),
            style(&outcome.quote.quote_number).yellow(),
            style(&outcome.work_order.wo_number).cyan()
        );
    }
    Ok(())
}

fn run_unlink(args: UnlinkArgs, global: &GlobalOpts) -> Result<()> {
    let mut store = open_store(global)?;
    let ctx = transition_ctx(global);
    let quote = resolve_quote(store.workspace(), &args.quote)?;

    if !global.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Unlink {} from its work order? The quote returns to approved",
                quote.quote_number
            ))
            .default(false)
            .interact()
            .into_diagnostic()?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let outcome = AssociationManager::new(&mut store)
        .unlink(&quote, &ctx)
        .map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        println!(
            "{} Unlinked {} from {} (quote is {} again)",
            style("✓").green(),
            style(&outcome.quote.quote_number).yellow(),
            style(&outcome.work_order.wo_number).cyan(),
            style("approved").cyan()
        );
    }
    Ok(())
}
