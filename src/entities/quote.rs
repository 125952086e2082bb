//! Quote entity type - priced proposals of line items for a client

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::changelog::ItemRef;
use crate::core::entity::{render_opt, Auditable, Entity};
use crate::core::identity::{EntityId, EntityPrefix};

/// Quote lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum QuoteStatus {
    /// Being drafted, items still editable
    #[default]
    Draft,
    /// Sent to the client, awaiting a decision
    Sent,
    /// Accepted by the client
    Approved,
    /// Declined by the client
    Rejected,
    /// Validity date passed without a decision
    Expired,
    /// Converted into a work order
    Converted,
}

impl std::fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuoteStatus::Draft => write!(f, "draft"),
            QuoteStatus::Sent => write!(f, "sent"),
            QuoteStatus::Approved => write!(f, "approved"),
            QuoteStatus::Rejected => write!(f, "rejected"),
            QuoteStatus::Expired => write!(f, "expired"),
            QuoteStatus::Converted => write!(f, "converted"),
        }
    }
}

impl std::str::FromStr for QuoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(QuoteStatus::Draft),
            "sent" => Ok(QuoteStatus::Sent),
            "approved" => Ok(QuoteStatus::Approved),
            "rejected" => Ok(QuoteStatus::Rejected),
            "expired" => Ok(QuoteStatus::Expired),
            "converted" => Ok(QuoteStatus::Converted),
            _ => Err(format!(
                "Invalid quote status: {}. Use draft, sent, approved, rejected, expired, or converted",
                s
            )),
        }
    }
}

/// How the discount value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum DiscountType {
    /// Percentage of the subtotal
    #[default]
    Percentage,
    /// Fixed monetary amount
    Fixed,
}

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscountType::Percentage => write!(f, "percentage"),
            DiscountType::Fixed => write!(f, "fixed"),
        }
    }
}

impl std::str::FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "percentage" | "percent" => Ok(DiscountType::Percentage),
            "fixed" => Ok(DiscountType::Fixed),
            _ => Err(format!(
                "Invalid discount type: {}. Use percentage or fixed",
                s
            )),
        }
    }
}

/// Line item kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum QuoteItemKind {
    /// References a catalog material
    Material,
    /// Free-form line (labor, trip charge, etc.)
    #[default]
    Custom,
}

/// A quote line item, owned exclusively by its quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteItem {
    /// Item kind
    #[serde(default)]
    pub kind: QuoteItemKind,

    /// Material ID (present iff kind is material)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<EntityId>,

    /// Human-readable description (material name or free text)
    pub description: String,

    /// Quantity (must be > 0)
    pub quantity: f64,

    /// Unit price (must be >= 0)
    pub unit_price: f64,

    /// Stable ordering, insertion order by default
    pub display_order: u32,
}

impl QuoteItem {
    /// Line subtotal (quantity x unit price), full precision
    pub fn subtotal(&self) -> f64 {
        self.quantity * self.unit_price
    }

    /// Description with quantity for audit entries
    pub fn describe(&self) -> String {
        format!("{} x {}", self.description, self.quantity)
    }

    /// Stable diff key: material id for catalog items, description plus
    /// order for custom lines
    pub fn diff_key(&self) -> String {
        match &self.material {
            Some(id) => id.to_string(),
            None => format!("{}#{}", self.description, self.display_order),
        }
    }
}

/// A Quote entity - a priced proposal progressing through the quote lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    /// Unique identifier
    pub id: EntityId,

    /// Human-facing quote number (e.g., "Q-2026-0042"); immutable once assigned
    pub quote_number: String,

    /// Quote title/summary
    pub title: String,

    /// Client this quote is for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<EntityId>,

    /// Service location label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Date the quote stops being valid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<NaiveDate>,

    /// Ordered line items
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<QuoteItem>,

    /// Whether tax applies
    #[serde(default)]
    pub apply_tax: bool,

    /// Tax rate in percent
    #[serde(default)]
    pub tax_rate: f64,

    /// Discount interpretation
    #[serde(default)]
    pub discount_type: DiscountType,

    /// Discount value (percent or fixed amount, >= 0)
    #[serde(default)]
    pub discount_value: f64,

    /// Derived: sum of line subtotals. Never hand-edited.
    #[serde(default)]
    pub subtotal: f64,

    /// Derived tax amount
    #[serde(default)]
    pub tax_amount: f64,

    /// Derived discount amount
    #[serde(default)]
    pub discount_amount: f64,

    /// Derived total (subtotal + tax - discount, may be negative)
    #[serde(default)]
    pub total: f64,

    /// Lifecycle status
    #[serde(default)]
    pub status: QuoteStatus,

    /// Work order this quote was converted to (set iff status is converted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_to: Option<EntityId>,

    /// Free-form notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Tags for filtering
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Author (who created this quote)
    pub author: String,

    /// Entity revision number, bumped on every applied patch
    #[serde(default = "default_revision")]
    pub entity_revision: u32,
}

fn default_revision() -> u32 {
    1
}

impl Entity for Quote {
    const PREFIX: &'static str = "QUO";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn status(&self) -> &str {
        match self.status {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Approved => "approved",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::Expired => "expired",
            QuoteStatus::Converted => "converted",
        }
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl Auditable for Quote {
    fn audit_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("title", self.title.clone()),
            ("client", render_opt(&self.client)),
            ("location", render_opt(&self.location)),
            ("valid_until", render_opt(&self.valid_until)),
            ("apply_tax", self.apply_tax.to_string()),
            ("tax_rate", self.tax_rate.to_string()),
            ("discount_type", self.discount_type.to_string()),
            ("discount_value", self.discount_value.to_string()),
            ("total", format!("{:.2}", self.total)),
            ("status", self.status.to_string()),
            ("notes", render_opt(&self.notes)),
        ]
    }
}

impl Quote {
    /// Create a new draft quote
    pub fn new(
        quote_number: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Quo),
            quote_number: quote_number.into(),
            title: title.into(),
            client: None,
            location: None,
            valid_until: None,
            items: Vec::new(),
            apply_tax: false,
            tax_rate: 0.0,
            discount_type: DiscountType::default(),
            discount_value: 0.0,
            subtotal: 0.0,
            tax_amount: 0.0,
            discount_amount: 0.0,
            total: 0.0,
            status: QuoteStatus::default(),
            converted_to: None,
            notes: None,
            tags: Vec::new(),
            created: Utc::now(),
            author: author.into(),
            entity_revision: 1,
        }
    }

    /// Next display order for a new line item. Line numbering is
    /// 1-based, matching what `show` prints.
    pub fn next_display_order(&self) -> u32 {
        self.items
            .iter()
            .map(|i| i.display_order)
            .max()
            .map(|m| m + 1)
            .unwrap_or(1)
    }

    /// Item refs for set-based diffing of the item collection
    pub fn item_refs(&self) -> Vec<ItemRef> {
        self.items
            .iter()
            .map(|i| ItemRef::new(i.diff_key(), i.describe()))
            .collect()
    }

    /// Whether the quote has passed its validity date
    pub fn is_past_validity(&self, today: NaiveDate) -> bool {
        self.valid_until.map(|d| d < today).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_creation() {
        let quote = Quote::new("Q-2026-0001", "HVAC replacement", "test");
        assert!(quote.id.to_string().starts_with("QUO-"));
        assert_eq!(quote.quote_number, "Q-2026-0001");
        assert_eq!(quote.status, QuoteStatus::Draft);
        assert!(quote.items.is_empty());
        assert_eq!(quote.total, 0.0);
    }

    #[test]
    fn test_item_subtotal_and_describe() {
        let item = QuoteItem {
            kind: QuoteItemKind::Custom,
            material: None,
            description: "Labor".to_string(),
            quantity: 4.0,
            unit_price: 85.0,
            display_order: 0,
        };
        assert_eq!(item.subtotal(), 340.0);
        assert_eq!(item.describe(), "Labor x 4");
    }

    #[test]
    fn test_next_display_order() {
        let mut quote = Quote::new("Q-2026-0001", "Test", "test");
        assert_eq!(quote.next_display_order(), 1);
        quote.items.push(QuoteItem {
            kind: QuoteItemKind::Custom,
            material: None,
            description: "Labor".to_string(),
            quantity: 1.0,
            unit_price: 10.0,
            display_order: 1,
        });
        assert_eq!(quote.next_display_order(), 2);
    }

    #[test]
    fn test_validity() {
        let mut quote = Quote::new("Q-2026-0001", "Test", "test");
        let today = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        assert!(!quote.is_past_validity(today));
        quote.valid_until = NaiveDate::from_ymd_opt(2026, 8, 1);
        assert!(quote.is_past_validity(today));
        quote.valid_until = NaiveDate::from_ymd_opt(2026, 8, 29);
        assert!(!quote.is_past_validity(today));
    }

    #[test]
    fn test_quote_roundtrip() {
        let mut quote = Quote::new("Q-2026-0001", "Water heater", "test");
        quote.apply_tax = true;
        quote.tax_rate = 8.25;
        quote.items.push(QuoteItem {
            kind: QuoteItemKind::Custom,
            material: None,
            description: "Heater unit".to_string(),
            quantity: 1.0,
            unit_price: 650.0,
            display_order: 0,
        });

        let yaml = serde_yml::to_string(&quote).unwrap();
        let parsed: Quote = serde_yml::from_str(&yaml).unwrap();

        assert_eq!(quote.id, parsed.id);
        assert_eq!(quote.quote_number, parsed.quote_number);
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.tax_rate, 8.25);
    }

    #[test]
    fn test_status_serialization() {
        let mut quote = Quote::new("Q-2026-0001", "Test", "test");
        quote.status = QuoteStatus::Sent;
        let yaml = serde_yml::to_string(&quote).unwrap();
        assert!(yaml.contains("status: sent"));
    }

    #[test]
    fn test_entity_trait_implementation() {
        let quote = Quote::new("Q-2026-0001", "Entity Test", "test_author");
        assert_eq!(Quote::PREFIX, "QUO");
        assert_eq!(quote.label(), "Entity Test");
        assert_eq!(quote.status(), "draft");
        assert_eq!(quote.author(), "test_author");
    }
}
