//! `fst history` command - Per-entity change log

use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{open_store, resolve_quote, resolve_work_order};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::store::Store;

#[derive(clap::Args, Debug)]
pub struct HistoryArgs {
    /// Quote or work order (record number or entity ID)
    pub entity: String,

    /// Limit to the most recent N entries
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

pub fn run(args: HistoryArgs, global: &GlobalOpts) -> Result<()> {
    let store = open_store(global)?;

    // Record numbers carry their kind: Q- is a quote, WO- a work order.
    // Raw entity IDs are tried against both stores.
    let (entity_id, label) = if args.entity.starts_with("Q-") {
        let quote = resolve_quote(store.workspace(), &args.entity)?;
        (quote.id.to_string(), quote.quote_number)
    } else if let Ok(wo) = resolve_work_order(store.workspace(), &args.entity) {
        (wo.id.to_string(), wo.wo_number)
    } else {
        let quote = resolve_quote(store.workspace(), &args.entity)?;
        (quote.id.to_string(), quote.quote_number)
    };

    let mut entries = store
        .log_for(&entity_id)
        .map_err(|e| miette::miette!("{}", e))?;

    if let Some(limit) = args.limit {
        let skip = entries.len().saturating_sub(limit);
        entries.drain(..skip);
    }

    if entries.is_empty() {
        println!("No history recorded for {}.", label);
        return Ok(());
    }

    match global.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&entries).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&entries).into_diagnostic()?;
            print!("{}", yaml);
        }
        _ => {
            println!(
                "History for {} ({} entries)",
                style(&label).yellow(),
                style(entries.len()).cyan()
            );
            println!();

            let mut builder = Builder::default();
            builder.push_record(["WHEN", "ACTION", "FIELD", "CHANGE", "ACTOR"]);
            for entry in &entries {
                let change = match (&entry.old_value, &entry.new_value) {
                    (Some(old), Some(new)) => format!("{} → {}", old, new),
                    (None, Some(new)) => format!("+ {}", new),
                    (Some(old), None) => format!("- {}", old),
                    (None, None) => String::new(),
                };
                builder.push_record([
                    entry.created_at.format("%Y-%m-%d %H:%M").to_string(),
                    entry.action.to_string(),
                    entry.field.clone().unwrap_or_default(),
                    change,
                    entry.actor.clone(),
                ]);
            }

            let mut table = builder.build();
            table.with(Style::sharp());
            println!("{}", table);
        }
    }
    Ok(())
}
