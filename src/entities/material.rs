//! Material entity type - catalog items used on quotes and work orders

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};

/// A Material entity - a priced catalog item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    /// Unique identifier
    pub id: EntityId,

    /// Material name
    pub name: String,

    /// Unit of measure (each, ft, box, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Default unit price suggested when quoting
    #[serde(default)]
    pub unit_price: f64,

    /// Supplier part number or SKU
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,

    /// Whether the material is currently offered
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

impl Entity for Material {
    const PREFIX: &'static str = "MAT";

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

impl Material {
    /// Create a new material
    pub fn new(name: impl Into<String>, unit_price: f64, author: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Mat),
            name: name.into(),
            unit: None,
            unit_price,
            sku: None,
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
    fn test_material_creation() {
        let mat = Material::new("Copper pipe 1/2\"", 4.25, "test");
        assert!(mat.id.to_string().starts_with("MAT-"));
        assert_eq!(mat.unit_price, 4.25);
    }

    #[test]
    fn test_material_roundtrip() {
        let mut mat = Material::new("Sealant", 9.99, "test");
        mat.unit = Some("tube".to_string());
        let yaml = serde_yml::to_string(&mat).unwrap();
        let parsed: Material = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(mat.id, parsed.id);
        assert_eq!(parsed.unit.as_deref(), Some("tube"));
    }
}
