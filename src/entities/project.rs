//! Project entity type - groups related work orders for a client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{render_opt, Auditable, Entity};
use crate::core::identity::{EntityId, EntityPrefix};

/// Project status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum ProjectStatus {
    #[default]
    Active,
    Completed,
    Archived,
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectStatus::Active => write!(f, "active"),
            ProjectStatus::Completed => write!(f, "completed"),
            ProjectStatus::Archived => write!(f, "archived"),
        }
    }
}

/// A Project entity - a grouping of related work for one client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier
    pub id: EntityId,

    /// Project title
    pub title: String,

    /// Client the project belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<EntityId>,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Work orders in this project
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub work_orders: Vec<EntityId>,

    /// Status
    #[serde(default)]
    pub status: ProjectStatus,

    /// Tags for filtering
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Author (who created this project)
    pub author: String,

    /// Entity revision number
    #[serde(default = "default_revision")]
    pub entity_revision: u32,
}

fn default_revision() -> u32 {
    1
}

impl Entity for Project {
    const PREFIX: &'static str = "PRJ";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn status(&self) -> &str {
        match self.status {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl Auditable for Project {
    fn audit_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("title", self.title.clone()),
            ("client", render_opt(&self.client)),
            ("description", render_opt(&self.description)),
            ("status", self.status.to_string()),
        ]
    }
}

impl Project {
    /// Create a new project
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Prj),
            title: title.into(),
            client: None,
            description: None,
            work_orders: Vec::new(),
            status: ProjectStatus::default(),
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
    fn test_project_creation() {
        let project = Project::new("Campus retrofit", "test");
        assert!(project.id.to_string().starts_with("PRJ-"));
        assert_eq!(project.status, ProjectStatus::Active);
    }

    #[test]
    fn test_project_roundtrip() {
        let mut project = Project::new("Campus retrofit", "test");
        project.work_orders.push(EntityId::new(EntityPrefix::Wo));
        let yaml = serde_yml::to_string(&project).unwrap();
        let parsed: Project = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(project.id, parsed.id);
        assert_eq!(parsed.work_orders.len(), 1);
    }
}
