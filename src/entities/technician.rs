//! Technician entity type - field crew members

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};

/// A Technician entity - a field crew member assignable to work orders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Technician {
    /// Unique identifier
    pub id: EntityId,

    /// Full name
    pub name: String,

    /// Phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Specialty (electrical, plumbing, HVAC, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,

    /// Whether the technician is currently on the roster
    #[serde(default = "default_active")]
    pub active: bool,

    /// Tags for filtering
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Author (who created this record)
    pub author: String,

    /// Entity revision number
    #[serde(default = "default_revision")]
    pub entity_revision: u32,
}

fn default_active() -> bool {
    true
}

fn default_revision() -> u32 {
    1
}

impl Entity for Technician {
    const PREFIX: &'static str = "TECH";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn status(&self) -> &str {
        if self.active {
            "active"
        } else {
            "inactive"
        }
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl Technician {
    /// Create a new technician
    pub fn new(name: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Tech),
            name: name.into(),
            phone: None,
            specialty: None,
            active: true,
            tags: Vec::new(),
            created: Utc::now(),
            author: author.into(),
            entity_revision: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_technician_creation() {
        let tech = Technician::new("Sam Rivera", "test");
        assert!(tech.id.to_string().starts_with("TECH-"));
        assert_eq!(tech.name, "Sam Rivera");
        assert!(tech.active);
    }

    #[test]
    fn test_technician_roundtrip() {
        let mut tech = Technician::new("Sam Rivera", "test");
        tech.specialty = Some("HVAC".to_string());
        let yaml = serde_yml::to_string(&tech).unwrap();
        let parsed: Technician = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(tech.id, parsed.id);
        assert_eq!(parsed.specialty.as_deref(), Some("HVAC"));
    }
}
