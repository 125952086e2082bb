//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use miette::Result;

use crate::cli::GlobalOpts;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::loader;
use crate::core::workspace::Workspace;
use crate::core::yaml_store::YamlStore;
use crate::core::{Config, TransitionCtx};
use crate::entities::quote::Quote;
use crate::entities::work_order::WorkOrder;

/// Format an EntityId for display, truncating if too long
///
/// IDs longer than 16 characters are truncated to 13 chars with "..." suffix.
pub fn format_short_id(id: &EntityId) -> String {
    let s = id.to_string();
    if s.len() > 16 {
        format!("{}...", &s[..13])
    } else {
        s
    }
}

/// Truncate a string to max_len, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len.saturating_sub(3)])
    }
}

/// Discover the workspace, honoring --workspace
pub fn workspace(global: &GlobalOpts) -> Result<Workspace> {
    let ws = match &global.workspace {
        Some(path) => Workspace::discover_from(path),
        None => Workspace::discover(),
    };
    ws.map_err(|e| miette::miette!("{}", e))
}

/// Open a YAML store over the discovered workspace
pub fn open_store(global: &GlobalOpts) -> Result<YamlStore> {
    Ok(YamlStore::new(workspace(global)?))
}

/// Build the transition context from --actor or the configured author
pub fn transition_ctx(global: &GlobalOpts) -> TransitionCtx {
    let actor = global
        .actor
        .clone()
        .unwrap_or_else(|| Config::load().author());
    TransitionCtx::new(actor)
}

/// Resolve a quote from a record number ("Q-2026-0007") or an entity ID
/// (full or partial "QUO-...")
pub fn resolve_quote(ws: &Workspace, reference: &str) -> Result<Quote> {
    let dir = ws.entity_dir(EntityPrefix::Quo);

    if reference.starts_with("Q-") {
        if let Some((_, quote)) =
            loader::find_by_number::<Quote>(&dir, "quote_number", reference)?
        {
            return Ok(quote);
        }
    }
    if let Some((_, quote)) = loader::load_entity::<Quote>(&dir, reference)? {
        return Ok(quote);
    }
    Err(miette::miette!("No quote found matching '{}'", reference))
}

/// Resolve a work order from a record number ("WO-2026-0042") or an
/// entity ID (full or partial "WO-...")
pub fn resolve_work_order(ws: &Workspace, reference: &str) -> Result<WorkOrder> {
    let dir = ws.entity_dir(EntityPrefix::Wo);

    if let Some((_, wo)) =
        loader::find_by_number::<WorkOrder>(&dir, "wo_number", reference)?
    {
        return Ok(wo);
    }
    if let Some((_, wo)) = loader::load_entity::<WorkOrder>(&dir, reference)? {
        return Ok(wo);
    }
    Err(miette::miette!(
        "No work order found matching '{}'",
        reference
    ))
}

/// Look up a client's ID by name, ID fragment, or record ID
pub fn resolve_client_id(ws: &Workspace, reference: &str) -> Result<EntityId> {
    use crate::entities::client::Client;

    let dir = ws.entity_dir(EntityPrefix::Clt);
    if let Some((_, client)) = loader::load_entity::<Client>(&dir, reference)? {
        return Ok(client.id);
    }

    let clients: Vec<Client> = loader::load_all(&dir)?;
    let needle = reference.to_lowercase();
    clients
        .into_iter()
        .find(|c| c.name.to_lowercase().contains(&needle))
        .map(|c| c.id)
        .ok_or_else(|| miette::miette!("No client found matching '{}'", reference))
}

/// Parse a YYYY-MM-DD date argument
pub fn parse_date(input: &str) -> Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| miette::miette!("Invalid date '{}'. Expected YYYY-MM-DD", input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_short_id() {
        let id = EntityId::new(EntityPrefix::Quo);
        let formatted = format_short_id(&id);
        // ULID IDs are 30 chars (prefix + dash + 26 ULID), so should truncate
        assert!(formatted.len() <= 16);
        assert!(formatted.ends_with("..."));
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
    }

    #[test]
    fn test_parse_date() {
        assert!(parse_date("2026-09-10").is_ok());
        assert!(parse_date("10/09/2026").is_err());
    }
}
