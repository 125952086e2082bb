//! Work order entity type - schedulable field work with completion evidence

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::changelog::ItemRef;
use crate::core::entity::{render_opt, Auditable, Entity};
use crate::core::identity::{EntityId, EntityPrefix};

/// Work order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum WorkOrderStatus {
    /// Created but not yet scheduled
    #[default]
    Draft,
    /// On the calendar
    Scheduled,
    /// Crew is on site
    InProgress,
    /// Paused mid-job
    OnHold,
    /// Done, evidence bundle complete
    Completed,
    /// Abandoned with a reason
    Cancelled,
}

impl std::fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkOrderStatus::Draft => write!(f, "draft"),
            WorkOrderStatus::Scheduled => write!(f, "scheduled"),
            WorkOrderStatus::InProgress => write!(f, "in_progress"),
            WorkOrderStatus::OnHold => write!(f, "on_hold"),
            WorkOrderStatus::Completed => write!(f, "completed"),
            WorkOrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for WorkOrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(WorkOrderStatus::Draft),
            "scheduled" => Ok(WorkOrderStatus::Scheduled),
            "in_progress" | "in-progress" => Ok(WorkOrderStatus::InProgress),
            "on_hold" | "on-hold" => Ok(WorkOrderStatus::OnHold),
            "completed" => Ok(WorkOrderStatus::Completed),
            "cancelled" => Ok(WorkOrderStatus::Cancelled),
            _ => Err(format!(
                "Invalid work order status: {}. Use draft, scheduled, in_progress, on_hold, completed, or cancelled",
                s
            )),
        }
    }
}

/// A technician assigned to the order. Carries the name so audit entries
/// read without an id lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicianAssignment {
    /// Technician ID
    pub technician: EntityId,

    /// Technician display name at assignment time
    pub name: String,

    /// Role on this job (lead, helper, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl TechnicianAssignment {
    /// Description for audit entries (name + role, not a raw id)
    pub fn describe(&self) -> String {
        match &self.role {
            Some(role) => format!("{} ({})", self.name, role),
            None => self.name.clone(),
        }
    }
}

/// Material consumed on the job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialUsage {
    /// Catalog material, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<EntityId>,

    /// Human-readable name
    pub description: String,

    /// Quantity used
    pub quantity: f64,
}

impl MaterialUsage {
    pub fn describe(&self) -> String {
        format!("{} x {}", self.description, self.quantity)
    }

    pub fn diff_key(&self) -> String {
        match &self.material {
            Some(id) => id.to_string(),
            None => self.description.clone(),
        }
    }
}

/// Evidence bundle required to complete the order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Before photos (URLs)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos_before: Vec<String>,

    /// After photos (URLs)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos_after: Vec<String>,

    /// Technician notes from the field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technician_notes: Option<String>,

    /// Client signature image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_signature: Option<String>,

    /// Name of the person who signed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_signature_name: Option<String>,
}

/// A WorkOrder entity - a schedulable unit of field work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    /// Unique identifier
    pub id: EntityId,

    /// Human-facing work order number (e.g., "WO-2026-0042")
    pub wo_number: String,

    /// Work order title/summary
    pub title: String,

    /// Client this work is for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<EntityId>,

    /// Point of contact at the site
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poc: Option<String>,

    /// Quote this order was converted from (mirrors Quote.converted_to)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<EntityId>,

    /// Lifecycle status
    #[serde(default)]
    pub status: WorkOrderStatus,

    /// Scheduled service date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDate>,

    /// Assigned technicians
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technicians: Vec<TechnicianAssignment>,

    /// Materials used
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<MaterialUsage>,

    /// Completion evidence
    #[serde(default)]
    pub evidence: Evidence,

    /// Set when work actually starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_start: Option<DateTime<Utc>>,

    /// Set when the order is completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_end: Option<DateTime<Utc>>,

    /// Reason recorded when the order was cancelled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,

    /// Tags for filtering
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Author (who created this order)
    pub author: String,

    /// Entity revision number, bumped on every applied patch
    #[serde(default = "default_revision")]
    pub entity_revision: u32,
}

fn default_revision() -> u32 {
    1
}

impl Entity for WorkOrder {
    const PREFIX: &'static str = "WO";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn status(&self) -> &str {
        match self.status {
            WorkOrderStatus::Draft => "draft",
            WorkOrderStatus::Scheduled => "scheduled",
            WorkOrderStatus::InProgress => "in_progress",
            WorkOrderStatus::OnHold => "on_hold",
            WorkOrderStatus::Completed => "completed",
            WorkOrderStatus::Cancelled => "cancelled",
        }
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl Auditable for WorkOrder {
    fn audit_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("title", self.title.clone()),
            ("client", render_opt(&self.client)),
            ("poc", render_opt(&self.poc)),
            ("status", self.status.to_string()),
            ("scheduled_date", render_opt(&self.scheduled_date)),
            (
                "technician_notes",
                render_opt(&self.evidence.technician_notes),
            ),
        ]
    }
}

impl WorkOrder {
    /// Create a new draft work order
    pub fn new(
        wo_number: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Wo),
            wo_number: wo_number.into(),
            title: title.into(),
            client: None,
            poc: None,
            quote: None,
            status: WorkOrderStatus::default(),
            scheduled_date: None,
            technicians: Vec::new(),
            materials: Vec::new(),
            evidence: Evidence::default(),
            actual_start: None,
            actual_end: None,
            cancel_reason: None,
            tags: Vec::new(),
            created: Utc::now(),
            author: author.into(),
            entity_revision: 1,
        }
    }

    /// Technician refs for set-based diffing
    pub fn technician_refs(&self) -> Vec<ItemRef> {
        self.technicians
            .iter()
            .map(|t| ItemRef::new(t.technician.to_string(), t.describe()))
            .collect()
    }

    /// Material refs for set-based diffing
    pub fn material_refs(&self) -> Vec<ItemRef> {
        self.materials
            .iter()
            .map(|m| ItemRef::new(m.diff_key(), m.describe()))
            .collect()
    }
}
