//! Entity trait - common interface for all entity types

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::core::identity::EntityId;

/// Common trait for all FST entities
pub trait Entity: Serialize + DeserializeOwned {
    /// The entity type prefix (e.g., "QUO", "WO")
    const PREFIX: &'static str;

    /// Get the entity's unique ID
    fn id(&self) -> &EntityId;

    /// Get the entity's display label (title or name)
    fn label(&self) -> &str;

    /// Get the entity's status
    fn status(&self) -> &str;

    /// Get the creation timestamp
    fn created(&self) -> DateTime<Utc>;

    /// Get the author
    fn author(&self) -> &str;
}

/// Snapshot of an entity's auditable fields.
///
/// Entities expose their mutable fields as ordered `(name, raw value)`
/// pairs so the change differ can compare two revisions without knowing
/// the concrete type. Identity and timestamp fields are excluded by the
/// implementations.
pub trait Auditable {
    fn audit_fields(&self) -> Vec<(&'static str, String)>;
}

/// Render an optional value for audit fields ("" means unset)
pub fn render_opt<T: std::fmt::Display>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}
