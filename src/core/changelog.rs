//! Change log entries and field-level diffing
//!
//! Every mutation of a quote, work order, or project yields append-only
//! change log entries derived from field-level differences between the
//! old and new record. Entries are part of the same write batch as the
//! entity patch; they are never mutated or deleted once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which kind of entity a change log entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Quote,
    WorkOrder,
    Project,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Quote => write!(f, "quote"),
            EntityKind::WorkOrder => write!(f, "work_order"),
            EntityKind::Project => write!(f, "project"),
        }
    }
}

/// What happened to the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Created,
    StatusChanged,
    FieldUpdated,
    ItemAdded,
    ItemRemoved,
    ItemChanged,
    WoLinked,
    WoUnlinked,
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeAction::Created => write!(f, "created"),
            ChangeAction::StatusChanged => write!(f, "status_changed"),
            ChangeAction::FieldUpdated => write!(f, "field_updated"),
            ChangeAction::ItemAdded => write!(f, "item_added"),
            ChangeAction::ItemRemoved => write!(f, "item_removed"),
            ChangeAction::ItemChanged => write!(f, "item_changed"),
            ChangeAction::WoLinked => write!(f, "wo_linked"),
            ChangeAction::WoUnlinked => write!(f, "wo_unlinked"),
        }
    }
}

/// One immutable audit record of a single change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    /// Entity kind the change applies to
    pub entity_type: EntityKind,

    /// Full entity ID as string
    pub entity_id: String,

    /// What happened
    pub action: ChangeAction,

    /// Field name for field-level changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Previous value, string-rendered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,

    /// New value, string-rendered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,

    /// Who made the change
    pub actor: String,

    /// When the change was recorded
    pub created_at: DateTime<Utc>,
}

impl ChangeLogEntry {
    pub fn created(
        entity_type: EntityKind,
        entity_id: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.to_string(),
            action: ChangeAction::Created,
            field: None,
            old_value: None,
            new_value: None,
            actor: actor.to_string(),
            created_at: now,
        }
    }

    pub fn status_changed(
        entity_type: EntityKind,
        entity_id: &str,
        old: &str,
        new: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.to_string(),
            action: ChangeAction::StatusChanged,
            field: Some("status".to_string()),
            old_value: Some(old.to_string()),
            new_value: Some(new.to_string()),
            actor: actor.to_string(),
            created_at: now,
        }
    }

    pub fn field_updated(
        entity_type: EntityKind,
        entity_id: &str,
        field: &str,
        old: &str,
        new: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.to_string(),
            action: ChangeAction::FieldUpdated,
            field: Some(field.to_string()),
            old_value: Some(old.to_string()),
            new_value: Some(new.to_string()),
            actor: actor.to_string(),
            created_at: now,
        }
    }
}

/// Per-field display resolvers for semantic value rendering.
///
/// Some raw values are meaningless in an audit trail (a client ULID, a
/// technician id); a resolver turns the raw value into a display string.
/// Resolver failures never block logging: the entry falls back to the
/// raw value.
#[derive(Default)]
pub struct FieldResolvers {
    resolvers: HashMap<String, Box<dyn Fn(&str) -> Result<String, String>>>,
}

impl FieldResolvers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolver for a field name
    pub fn register<F>(mut self, field: &str, resolver: F) -> Self
    where
        F: Fn(&str) -> Result<String, String> + 'static,
    {
        self.resolvers.insert(field.to_string(), Box::new(resolver));
        self
    }

    /// Render a raw value for a field, falling back to the raw value on
    /// resolver failure or when no resolver is registered
    pub fn render(&self, field: &str, raw: &str) -> String {
        if raw.is_empty() {
            return "(none)".to_string();
        }
        match self.resolvers.get(field) {
            Some(resolve) => resolve(raw).unwrap_or_else(|_| raw.to_string()),
            None => raw.to_string(),
        }
    }
}

/// Diff two ordered field snapshots into change log entries.
///
/// One entry per changed field; a change to `status` is tagged
/// `status_changed`, everything else `field_updated`. Fields present in
/// only one snapshot are ignored (snapshots come from the same type and
/// normally agree on shape).
pub fn diff_fields(
    entity_type: EntityKind,
    entity_id: &str,
    old_fields: &[(&'static str, String)],
    new_fields: &[(&'static str, String)],
    resolvers: &FieldResolvers,
    actor: &str,
    now: DateTime<Utc>,
) -> Vec<ChangeLogEntry> {
    let old_map: HashMap<&str, &String> =
        old_fields.iter().map(|(k, v)| (*k, v)).collect();

    let mut entries = Vec::new();
    for (field, new_raw) in new_fields {
        let Some(old_raw) = old_map.get(field) else {
            continue;
        };
        if *old_raw == new_raw {
            continue;
        }

        let old_display = resolvers.render(field, old_raw);
        let new_display = resolvers.render(field, new_raw);

        if *field == "status" {
            entries.push(ChangeLogEntry::status_changed(
                entity_type,
                entity_id,
                &old_display,
                &new_display,
                actor,
                now,
            ));
        } else {
            entries.push(ChangeLogEntry::field_updated(
                entity_type,
                entity_id,
                field,
                &old_display,
                &new_display,
                actor,
                now,
            ));
        }
    }
    entries
}

/// A keyed item in a diffable collection (quote line items, work order
/// technicians/materials). `describe` carries names and quantities, not
/// raw ids, so the audit trail reads like a sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRef {
    pub key: String,
    pub describe: String,
}

impl ItemRef {
    pub fn new(key: impl Into<String>, describe: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            describe: describe.into(),
        }
    }
}

/// Diff two item collections as keyed sets.
///
/// Items present only in `new` yield `item_added`, items present only in
/// `old` yield `item_removed`, and items present in both with a changed
/// description yield `item_changed` (role or quantity edits).
pub fn diff_items(
    entity_type: EntityKind,
    entity_id: &str,
    field: &str,
    old: &[ItemRef],
    new: &[ItemRef],
    actor: &str,
    now: DateTime<Utc>,
) -> Vec<ChangeLogEntry> {
    let old_map: HashMap<&str, &ItemRef> =
        old.iter().map(|i| (i.key.as_str(), i)).collect();
    let new_map: HashMap<&str, &ItemRef> =
        new.iter().map(|i| (i.key.as_str(), i)).collect();

    let mut entries = Vec::new();

    for item in new {
        match old_map.get(item.key.as_str()) {
            None => entries.push(ChangeLogEntry {
                entity_type,
                entity_id: entity_id.to_string(),
                action: ChangeAction::ItemAdded,
                field: Some(field.to_string()),
                old_value: None,
                new_value: Some(item.describe.clone()),
                actor: actor.to_string(),
                created_at: now,
            }),
            Some(previous) if previous.describe != item.describe => {
                entries.push(ChangeLogEntry {
                    entity_type,
                    entity_id: entity_id.to_string(),
                    action: ChangeAction::ItemChanged,
                    field: Some(field.to_string()),
                    old_value: Some(previous.describe.clone()),
                    new_value: Some(item.describe.clone()),
                    actor: actor.to_string(),
                    created_at: now,
                })
            }
            Some(_) => {}
        }
    }

    for item in old {
        if !new_map.contains_key(item.key.as_str()) {
            entries.push(ChangeLogEntry {
                entity_type,
                entity_id: entity_id.to_string(),
                action: ChangeAction::ItemRemoved,
                field: Some(field.to_string()),
                old_value: Some(item.describe.clone()),
                new_value: None,
                actor: actor.to_string(),
                created_at: now,
            });
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&'static str, &str)]) -> Vec<(&'static str, String)> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_identical_records_diff_empty() {
        let old = fields(&[("title", "Fix AC"), ("status", "draft")]);
        let entries = diff_fields(
            EntityKind::Quote,
            "QUO-TEST",
            &old,
            &old,
            &FieldResolvers::new(),
            "jsmith",
            Utc::now(),
        );
        assert!(entries.is_empty());
    }

    #[test]
    fn test_status_only_diff_yields_one_status_changed() {
        let old = fields(&[("title", "Fix AC"), ("status", "draft")]);
        let new = fields(&[("title", "Fix AC"), ("status", "sent")]);
        let entries = diff_fields(
            EntityKind::Quote,
            "QUO-TEST",
            &old,
            &new,
            &FieldResolvers::new(),
            "jsmith",
            Utc::now(),
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, ChangeAction::StatusChanged);
        assert_eq!(entries[0].old_value.as_deref(), Some("draft"));
        assert_eq!(entries[0].new_value.as_deref(), Some("sent"));
    }

    #[test]
    fn test_field_update_uses_resolver() {
        let old = fields(&[("client", "CLT-AAA")]);
        let new = fields(&[("client", "CLT-BBB")]);
        let resolvers = FieldResolvers::new().register("client", |raw| {
            Ok(match raw {
                "CLT-AAA" => "Acme Corp".to_string(),
                "CLT-BBB" => "Borealis LLC".to_string(),
                other => other.to_string(),
            })
        });
        let entries = diff_fields(
            EntityKind::WorkOrder,
            "WO-TEST",
            &old,
            &new,
            &resolvers,
            "jsmith",
            Utc::now(),
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].old_value.as_deref(), Some("Acme Corp"));
        assert_eq!(entries[0].new_value.as_deref(), Some("Borealis LLC"));
    }

    #[test]
    fn test_resolver_failure_falls_back_to_raw() {
        let old = fields(&[("client", "CLT-AAA"), ("poc", "Dana")]);
        let new = fields(&[("client", "CLT-BBB"), ("poc", "Robin")]);
        let resolvers = FieldResolvers::new()
            .register("client", |_| Err("lookup failed".to_string()));
        let entries = diff_fields(
            EntityKind::WorkOrder,
            "WO-TEST",
            &old,
            &new,
            &resolvers,
            "jsmith",
            Utc::now(),
        );
        // Both fields still logged; the failed resolver used raw values
        assert_eq!(entries.len(), 2);
        let client = entries.iter().find(|e| e.field.as_deref() == Some("client"));
        assert_eq!(client.unwrap().new_value.as_deref(), Some("CLT-BBB"));
    }

    #[test]
    fn test_empty_value_renders_none() {
        let resolvers = FieldResolvers::new();
        assert_eq!(resolvers.render("poc", ""), "(none)");
    }

    #[test]
    fn test_item_diff_add_remove_change() {
        let old = vec![
            ItemRef::new("MAT-A", "Copper pipe x 3"),
            ItemRef::new("MAT-B", "Sealant x 1"),
        ];
        let new = vec![
            ItemRef::new("MAT-A", "Copper pipe x 5"),
            ItemRef::new("MAT-C", "Bracket x 2"),
        ];
        let entries = diff_items(
            EntityKind::Quote,
            "QUO-TEST",
            "items",
            &old,
            &new,
            "jsmith",
            Utc::now(),
        );

        assert_eq!(entries.len(), 3);
        assert!(entries.iter().any(|e| e.action == ChangeAction::ItemAdded
            && e.new_value.as_deref() == Some("Bracket x 2")));
        assert!(entries.iter().any(|e| e.action == ChangeAction::ItemRemoved
            && e.old_value.as_deref() == Some("Sealant x 1")));
        assert!(entries.iter().any(|e| e.action == ChangeAction::ItemChanged
            && e.new_value.as_deref() == Some("Copper pipe x 5")));
    }

    #[test]
    fn test_entry_roundtrip() {
        let entry = ChangeLogEntry::status_changed(
            EntityKind::WorkOrder,
            "WO-TEST",
            "scheduled",
            "in_progress",
            "jsmith",
            Utc::now(),
        );
        let yaml = serde_yml::to_string(&entry).unwrap();
        assert!(yaml.contains("action: status_changed"));
        let parsed: ChangeLogEntry = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed.action, ChangeAction::StatusChanged);
        assert_eq!(parsed.entity_id, "WO-TEST");
    }
}
