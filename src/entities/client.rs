//! Client entity type - companies/accounts the field crews work for

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};

/// A service location for a client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    /// Label (e.g., "Warehouse", "Main office")
    pub label: String,

    /// Street address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// City
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

/// A named point of contact at a client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Poc {
    /// Contact name
    pub name: String,

    /// Phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A Client entity - a company or account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// Unique identifier
    pub id: EntityId,

    /// Company/account name
    pub name: String,

    /// Primary contact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Poc>,

    /// Service locations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,

    /// Additional points of contact
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pocs: Vec<Poc>,

    /// Whether the account is active
    #[serde(default = "default_active")]
    pub active: bool,

    /// Tags for filtering
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Author (who created this client)
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

impl Entity for Client {
    const PREFIX: &'static str = "CLT";

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

impl Client {
    /// Create a new client
    pub fn new(name: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Clt),
            name: name.into(),
            contact: None,
            locations: Vec::new(),
            pocs: Vec::new(),
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
    fn test_client_creation() {
        let client = Client::new("Acme Corp", "test");
        assert!(client.id.to_string().starts_with("CLT-"));
        assert_eq!(client.name, "Acme Corp");
        assert!(client.active);
        assert_eq!(client.status(), "active");
    }

    #[test]
    fn test_client_roundtrip() {
        let mut client = Client::new("Acme Corp", "test");
        client.locations.push(Location {
            label: "Warehouse".to_string(),
            address: Some("12 Dock Rd".to_string()),
            city: None,
        });

        let yaml = serde_yml::to_string(&client).unwrap();
        let parsed: Client = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(client.id, parsed.id);
        assert_eq!(parsed.locations.len(), 1);
    }
}
