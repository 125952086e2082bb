//! Shared lifecycle types - transition context and error taxonomy
//!
//! All lifecycle failures are deterministic and locally detectable; they
//! are returned as typed results and never retried automatically. Only
//! storage I/O failures are candidates for caller-driven retry.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::core::pricing::PricingError;
use crate::core::store::StoreError;
use crate::entities::quote::QuoteStatus;
use crate::entities::work_order::WorkOrderStatus;

/// Who is making the change and when
#[derive(Debug, Clone)]
pub struct TransitionCtx {
    /// Actor identity recorded on audit entries
    pub actor: String,

    /// Timestamp used for audit entries and actual start/end dates
    pub now: DateTime<Utc>,
}

impl TransitionCtx {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            now: Utc::now(),
        }
    }

    /// Fixed-clock variant for tests and replays
    pub fn at(actor: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            actor: actor.into(),
            now,
        }
    }

    /// The context timestamp as a calendar date
    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

/// A missing piece of the completion evidence bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceItem {
    PhotosBefore,
    PhotosAfter,
    ClientSignature,
    ClientSignatureName,
}

impl std::fmt::Display for EvidenceItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvidenceItem::PhotosBefore => write!(f, "photos_before"),
            EvidenceItem::PhotosAfter => write!(f, "photos_after"),
            EvidenceItem::ClientSignature => write!(f, "client_signature"),
            EvidenceItem::ClientSignatureName => write!(f, "client_signature_name"),
        }
    }
}

fn join_items(items: &[EvidenceItem]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that can occur during lifecycle operations
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("invalid quote transition: {from} → {to}")]
    InvalidQuoteTransition {
        from: QuoteStatus,
        to: QuoteStatus,
    },

    #[error("invalid work order transition: {from} → {to}")]
    InvalidWorkOrderTransition {
        from: WorkOrderStatus,
        to: WorkOrderStatus,
    },

    #[error(transparent)]
    Validation(#[from] PricingError),

    #[error("stored totals are stale: stored total {stored:.4}, recomputed {computed:.4}; re-save the quote before transitioning")]
    StaleTotals { stored: f64, computed: f64 },

    #[error("quote cannot expire before its validity date{}", .valid_until.map(|d| format!(" ({})", d)).unwrap_or_default())]
    NotYetExpired { valid_until: Option<NaiveDate> },

    #[error("a quote can only become 'converted' through work order conversion")]
    MissingAssociation,

    #[error("work order is not editable in status '{status}'")]
    NotEditable { status: WorkOrderStatus },

    #[error("incomplete evidence, missing: {}", join_items(.missing))]
    IncompleteEvidence { missing: Vec<EvidenceItem> },

    #[error("cancellation requires a non-empty reason")]
    MissingReason,

    #[error("{entity} is already associated with {counterpart}")]
    AlreadyAssociated {
        entity: String,
        counterpart: String,
    },

    #[error("{entity} changed since it was read (revision {expected} → {actual}); re-fetch and retry")]
    StaleAssociation {
        entity: String,
        expected: u32,
        actual: u32,
    },

    #[error("quote is not linked to a work order")]
    NotAssociated,

    #[error("technician is not assigned to this work order")]
    TechnicianNotAssigned,

    #[error("no line item with display order {display_order}")]
    ItemNotFound { display_order: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}
