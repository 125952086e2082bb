//! Quote lifecycle - status transitions and item/pricing edits
//!
//! All operations are pure: they take the current quote plus a requested
//! change and return an updated quote with the change log entries to
//! persist, or a typed failure. The caller applies the result through
//! the storage collaborator as one atomic batch.

use crate::core::changelog::{
    diff_fields, ChangeAction, ChangeLogEntry, EntityKind, FieldResolvers,
};
use crate::core::entity::Auditable;
use crate::core::flow::{FlowError, TransitionCtx};
use crate::core::pricing;
use crate::core::identity::EntityId;
use crate::core::store::WriteBatch;
use crate::entities::quote::{DiscountType, Quote, QuoteItem, QuoteStatus};

/// Result of a successful quote operation
#[derive(Debug)]
pub struct QuoteOutcome {
    pub quote: Quote,
    pub log: Vec<ChangeLogEntry>,
}

impl QuoteOutcome {
    /// Package the outcome for atomic persistence
    pub fn into_batch(self) -> WriteBatch {
        WriteBatch::new().with_quote(self.quote).with_log(self.log)
    }
}

/// Partial update of a quote's pricing inputs
#[derive(Debug, Default, Clone)]
pub struct PricingPatch {
    pub apply_tax: Option<bool>,
    pub tax_rate: Option<f64>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<f64>,
}

/// Whether a status is terminal for normal editing
pub fn is_terminal(status: QuoteStatus) -> bool {
    matches!(
        status,
        QuoteStatus::Rejected | QuoteStatus::Expired | QuoteStatus::Converted
    )
}

/// Check if a status transition is reachable under the lifecycle table
pub fn is_valid_transition(from: QuoteStatus, to: QuoteStatus) -> bool {
    matches!(
        (from, to),
        (QuoteStatus::Draft, QuoteStatus::Sent)
            | (QuoteStatus::Sent, QuoteStatus::Approved)
            | (QuoteStatus::Sent, QuoteStatus::Rejected)
            // Validity lapse while awaiting a decision
            | (QuoteStatus::Draft, QuoteStatus::Expired)
            | (QuoteStatus::Sent, QuoteStatus::Expired)
            // Conversion (only through the association manager)
            | (QuoteStatus::Approved, QuoteStatus::Converted)
            // Explicit reset override
            | (QuoteStatus::Rejected, QuoteStatus::Draft)
            | (QuoteStatus::Expired, QuoteStatus::Draft)
    )
}

/// Get allowed transitions from the current status
pub fn allowed_transitions(current: QuoteStatus) -> Vec<QuoteStatus> {
    match current {
        QuoteStatus::Draft => vec![QuoteStatus::Sent, QuoteStatus::Expired],
        QuoteStatus::Sent => vec![
            QuoteStatus::Approved,
            QuoteStatus::Rejected,
            QuoteStatus::Expired,
        ],
        QuoteStatus::Approved => vec![QuoteStatus::Converted],
        QuoteStatus::Rejected => vec![QuoteStatus::Draft],
        QuoteStatus::Expired => vec![QuoteStatus::Draft],
        QuoteStatus::Converted => vec![],
    }
}

/// Stored totals must match a fresh computation before any transition
/// proceeds; a mismatch means the record is stale or was hand-edited.
fn check_totals_current(quote: &Quote) -> Result<(), FlowError> {
    match pricing::verify_stored_totals(quote)? {
        Some(_) => Ok(()),
        None => {
            let fresh = pricing::compute_quote_totals(quote)?;
            Err(FlowError::StaleTotals {
                stored: quote.total,
                computed: fresh.total,
            })
        }
    }
}

/// Request a status transition.
///
/// `converted` can never be entered here: conversion goes through the
/// association manager, which pairs the quote with a work order in the
/// same atomic batch. A direct request fails with `MissingAssociation`.
pub fn transition(
    quote: &Quote,
    target: QuoteStatus,
    ctx: &TransitionCtx,
) -> Result<QuoteOutcome, FlowError> {
    check_totals_current(quote)?;

    if target == QuoteStatus::Converted {
        return Err(FlowError::MissingAssociation);
    }
    if !is_valid_transition(quote.status, target) {
        return Err(FlowError::InvalidQuoteTransition {
            from: quote.status,
            to: target,
        });
    }
    if target == QuoteStatus::Expired && !quote.is_past_validity(ctx.today()) {
        return Err(FlowError::NotYetExpired {
            valid_until: quote.valid_until,
        });
    }

    let mut updated = quote.clone();
    updated.status = target;

    let entry = ChangeLogEntry::status_changed(
        EntityKind::Quote,
        &quote.id.to_string(),
        &quote.status.to_string(),
        &target.to_string(),
        &ctx.actor,
        ctx.now,
    );

    Ok(QuoteOutcome {
        quote: updated,
        log: vec![entry],
    })
}

/// Explicit authorized override returning a rejected or expired quote to
/// draft. Converted quotes must be unlinked first.
pub fn reset_to_draft(quote: &Quote, ctx: &TransitionCtx) -> Result<QuoteOutcome, FlowError> {
    check_totals_current(quote)?;

    if !matches!(quote.status, QuoteStatus::Rejected | QuoteStatus::Expired) {
        return Err(FlowError::InvalidQuoteTransition {
            from: quote.status,
            to: QuoteStatus::Draft,
        });
    }

    let mut updated = quote.clone();
    updated.status = QuoteStatus::Draft;

    let entry = ChangeLogEntry::status_changed(
        EntityKind::Quote,
        &quote.id.to_string(),
        &quote.status.to_string(),
        "draft",
        &ctx.actor,
        ctx.now,
    );

    Ok(QuoteOutcome {
        quote: updated,
        log: vec![entry],
    })
}

/// Add a line item. The item's display order is assigned here so
/// insertion order stays stable.
pub fn add_item(
    quote: &Quote,
    mut item: QuoteItem,
    ctx: &TransitionCtx,
) -> Result<QuoteOutcome, FlowError> {
    if is_terminal(quote.status) {
        return Err(FlowError::InvalidQuoteTransition {
            from: quote.status,
            to: quote.status,
        });
    }

    item.display_order = quote.next_display_order();

    let mut updated = quote.clone();
    updated.items.push(item.clone());

    let totals = pricing::compute_quote_totals(&updated)?;
    apply_totals(&mut updated, totals);

    let entry = ChangeLogEntry {
        entity_type: EntityKind::Quote,
        entity_id: quote.id.to_string(),
        action: ChangeAction::ItemAdded,
        field: Some("items".to_string()),
        old_value: None,
        new_value: Some(item.describe()),
        actor: ctx.actor.clone(),
        created_at: ctx.now,
    };

    Ok(QuoteOutcome {
        quote: updated,
        log: vec![entry],
    })
}

/// Remove the line item with the given display order
pub fn remove_item(
    quote: &Quote,
    display_order: u32,
    ctx: &TransitionCtx,
) -> Result<QuoteOutcome, FlowError> {
    if is_terminal(quote.status) {
        return Err(FlowError::InvalidQuoteTransition {
            from: quote.status,
            to: quote.status,
        });
    }

    let position = quote
        .items
        .iter()
        .position(|i| i.display_order == display_order)
        .ok_or(FlowError::ItemNotFound { display_order })?;

    let mut updated = quote.clone();
    let removed = updated.items.remove(position);

    let totals = pricing::compute_quote_totals(&updated)?;
    apply_totals(&mut updated, totals);

    let entry = ChangeLogEntry {
        entity_type: EntityKind::Quote,
        entity_id: quote.id.to_string(),
        action: ChangeAction::ItemRemoved,
        field: Some("items".to_string()),
        old_value: Some(removed.describe()),
        new_value: None,
        actor: ctx.actor.clone(),
        created_at: ctx.now,
    };

    Ok(QuoteOutcome {
        quote: updated,
        log: vec![entry],
    })
}

/// Update pricing inputs and recompute totals. Emits one field_updated
/// entry per changed input, derived through the change differ.
pub fn update_pricing(
    quote: &Quote,
    patch: PricingPatch,
    ctx: &TransitionCtx,
) -> Result<QuoteOutcome, FlowError> {
    if is_terminal(quote.status) {
        return Err(FlowError::InvalidQuoteTransition {
            from: quote.status,
            to: quote.status,
        });
    }

    let mut updated = quote.clone();
    if let Some(apply_tax) = patch.apply_tax {
        updated.apply_tax = apply_tax;
    }
    if let Some(tax_rate) = patch.tax_rate {
        updated.tax_rate = tax_rate;
    }
    if let Some(discount_type) = patch.discount_type {
        updated.discount_type = discount_type;
    }
    if let Some(discount_value) = patch.discount_value {
        updated.discount_value = discount_value;
    }

    let totals = pricing::compute_quote_totals(&updated)?;
    apply_totals(&mut updated, totals);

    let log = diff_fields(
        EntityKind::Quote,
        &quote.id.to_string(),
        &quote.audit_fields(),
        &updated.audit_fields(),
        &FieldResolvers::new(),
        &ctx.actor,
        ctx.now,
    );

    Ok(QuoteOutcome { quote: updated, log })
}

/// Internal: mark a quote converted. Only the association manager calls
/// this, inside the batch that also links the work order back.
pub(crate) fn mark_converted(
    quote: &Quote,
    wo_id: &EntityId,
    wo_number: &str,
    ctx: &TransitionCtx,
) -> Result<QuoteOutcome, FlowError> {
    check_totals_current(quote)?;

    if quote.status != QuoteStatus::Approved {
        return Err(FlowError::InvalidQuoteTransition {
            from: quote.status,
            to: QuoteStatus::Converted,
        });
    }

    let mut updated = quote.clone();
    updated.status = QuoteStatus::Converted;
    updated.converted_to = Some(wo_id.clone());

    let log = vec![
        ChangeLogEntry::status_changed(
            EntityKind::Quote,
            &quote.id.to_string(),
            "approved",
            "converted",
            &ctx.actor,
            ctx.now,
        ),
        ChangeLogEntry {
            entity_type: EntityKind::Quote,
            entity_id: quote.id.to_string(),
            action: ChangeAction::WoLinked,
            field: Some("converted_to".to_string()),
            old_value: None,
            new_value: Some(wo_number.to_string()),
            actor: ctx.actor.clone(),
            created_at: ctx.now,
        },
    ];

    Ok(QuoteOutcome { quote: updated, log })
}

/// Internal: clear the work order link and fall back to `approved`.
/// The pre-conversion status is not tracked; `approved` is the defined
/// fallback.
pub(crate) fn mark_unlinked(
    quote: &Quote,
    wo_number: &str,
    ctx: &TransitionCtx,
) -> Result<QuoteOutcome, FlowError> {
    if quote.status != QuoteStatus::Converted || quote.converted_to.is_none() {
        return Err(FlowError::NotAssociated);
    }

    let mut updated = quote.clone();
    updated.status = QuoteStatus::Approved;
    updated.converted_to = None;

    let log = vec![
        ChangeLogEntry::status_changed(
            EntityKind::Quote,
            &quote.id.to_string(),
            "converted",
            "approved",
            &ctx.actor,
            ctx.now,
        ),
        ChangeLogEntry {
            entity_type: EntityKind::Quote,
            entity_id: quote.id.to_string(),
            action: ChangeAction::WoUnlinked,
            field: Some("converted_to".to_string()),
            old_value: Some(wo_number.to_string()),
            new_value: None,
            actor: ctx.actor.clone(),
            created_at: ctx.now,
        },
    ];

    Ok(QuoteOutcome { quote: updated, log })
}

fn apply_totals(quote: &mut Quote, totals: pricing::Totals) {
    quote.subtotal = totals.subtotal;
    quote.tax_amount = totals.tax_amount;
    quote.discount_amount = totals.discount_amount;
    quote.total = totals.total;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::quote::QuoteItemKind;
    use chrono::NaiveDate;

    fn ctx() -> TransitionCtx {
        TransitionCtx::new("jsmith")
    }

    fn quote_with_item() -> Quote {
        let quote = Quote::new("Q-2026-0001", "Test quote", "test");
        let item = QuoteItem {
            kind: QuoteItemKind::Custom,
            material: None,
            description: "Labor".to_string(),
            quantity: 2.0,
            unit_price: 80.0,
            display_order: 0,
        };
        add_item(&quote, item, &ctx()).unwrap().quote
    }

    #[test]
    fn test_valid_transitions() {
        assert!(is_valid_transition(QuoteStatus::Draft, QuoteStatus::Sent));
        assert!(is_valid_transition(QuoteStatus::Sent, QuoteStatus::Approved));
        assert!(is_valid_transition(QuoteStatus::Sent, QuoteStatus::Rejected));
        assert!(is_valid_transition(QuoteStatus::Sent, QuoteStatus::Expired));
        assert!(is_valid_transition(QuoteStatus::Approved, QuoteStatus::Converted));

        assert!(!is_valid_transition(QuoteStatus::Draft, QuoteStatus::Approved));
        assert!(!is_valid_transition(QuoteStatus::Converted, QuoteStatus::Sent));
        assert!(!is_valid_transition(QuoteStatus::Approved, QuoteStatus::Draft));
    }

    #[test]
    fn test_transition_emits_one_status_entry() {
        let quote = quote_with_item();
        let outcome = transition(&quote, QuoteStatus::Sent, &ctx()).unwrap();
        assert_eq!(outcome.quote.status, QuoteStatus::Sent);
        assert_eq!(outcome.log.len(), 1);
        assert_eq!(outcome.log[0].action, ChangeAction::StatusChanged);
        assert_eq!(outcome.log[0].old_value.as_deref(), Some("draft"));
        assert_eq!(outcome.log[0].new_value.as_deref(), Some("sent"));
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let quote = quote_with_item();
        let err = transition(&quote, QuoteStatus::Approved, &ctx()).unwrap_err();
        assert!(matches!(
            err,
            FlowError::InvalidQuoteTransition {
                from: QuoteStatus::Draft,
                to: QuoteStatus::Approved,
            }
        ));
    }

    #[test]
    fn test_direct_converted_fails_with_missing_association() {
        let mut quote = quote_with_item();
        quote.status = QuoteStatus::Approved;
        let err = transition(&quote, QuoteStatus::Converted, &ctx()).unwrap_err();
        assert!(matches!(err, FlowError::MissingAssociation));
    }

    #[test]
    fn test_stale_totals_detected() {
        let mut quote = quote_with_item();
        quote.total += 10.0; // hand-edited record
        let err = transition(&quote, QuoteStatus::Sent, &ctx()).unwrap_err();
        assert!(matches!(err, FlowError::StaleTotals { .. }));
    }

    #[test]
    fn test_expire_requires_lapsed_validity() {
        let mut quote = quote_with_item();
        quote.status = QuoteStatus::Sent;

        // No validity date: cannot expire
        let err = transition(&quote, QuoteStatus::Expired, &ctx()).unwrap_err();
        assert!(matches!(err, FlowError::NotYetExpired { .. }));

        quote.valid_until = NaiveDate::from_ymd_opt(2000, 1, 1);
        let outcome = transition(&quote, QuoteStatus::Expired, &ctx()).unwrap();
        assert_eq!(outcome.quote.status, QuoteStatus::Expired);
    }

    #[test]
    fn test_reset_override_from_rejected() {
        let mut quote = quote_with_item();
        quote.status = QuoteStatus::Rejected;
        let outcome = reset_to_draft(&quote, &ctx()).unwrap();
        assert_eq!(outcome.quote.status, QuoteStatus::Draft);
        assert_eq!(outcome.log.len(), 1);
    }

    #[test]
    fn test_reset_not_allowed_from_converted() {
        let mut quote = quote_with_item();
        quote.status = QuoteStatus::Converted;
        quote.converted_to = Some(EntityId::new(
            crate::core::identity::EntityPrefix::Wo,
        ));
        assert!(reset_to_draft(&quote, &ctx()).is_err());
    }

    #[test]
    fn test_add_item_recomputes_totals_and_logs() {
        let quote = Quote::new("Q-2026-0001", "Test", "test");
        let item = QuoteItem {
            kind: QuoteItemKind::Custom,
            material: None,
            description: "Labor".to_string(),
            quantity: 2.0,
            unit_price: 80.0,
            display_order: 99, // reassigned on add
        };
        let outcome = add_item(&quote, item, &ctx()).unwrap();
        assert_eq!(outcome.quote.items[0].display_order, 1);
        assert_eq!(outcome.quote.subtotal, 160.0);
        assert_eq!(outcome.quote.total, 160.0);
        assert_eq!(outcome.log.len(), 1);
        assert_eq!(outcome.log[0].action, ChangeAction::ItemAdded);
        assert_eq!(outcome.log[0].new_value.as_deref(), Some("Labor x 2"));
    }

    #[test]
    fn test_add_invalid_item_rejected() {
        let quote = Quote::new("Q-2026-0001", "Test", "test");
        let item = QuoteItem {
            kind: QuoteItemKind::Custom,
            material: None,
            description: "Labor".to_string(),
            quantity: 0.0,
            unit_price: 80.0,
            display_order: 0,
        };
        assert!(matches!(
            add_item(&quote, item, &ctx()),
            Err(FlowError::Validation(_))
        ));
    }

    #[test]
    fn test_remove_item() {
        let quote = quote_with_item();
        let outcome = remove_item(&quote, 1, &ctx()).unwrap();
        assert!(outcome.quote.items.is_empty());
        assert_eq!(outcome.quote.total, 0.0);
        assert_eq!(outcome.log[0].action, ChangeAction::ItemRemoved);
        assert_eq!(outcome.log[0].old_value.as_deref(), Some("Labor x 2"));
    }

    #[test]
    fn test_remove_missing_item() {
        let quote = quote_with_item();
        assert!(matches!(
            remove_item(&quote, 7, &ctx()),
            Err(FlowError::ItemNotFound { display_order: 7 })
        ));
    }

    #[test]
    fn test_item_edit_rejected_in_terminal_state() {
        let mut quote = quote_with_item();
        quote.status = QuoteStatus::Rejected;
        let item = quote.items[0].clone();
        assert!(add_item(&quote, item, &ctx()).is_err());
        assert!(remove_item(&quote, 1, &ctx()).is_err());
    }

    #[test]
    fn test_update_pricing_logs_changed_fields() {
        let quote = quote_with_item();
        let patch = PricingPatch {
            apply_tax: Some(true),
            tax_rate: Some(8.25),
            ..Default::default()
        };
        let outcome = update_pricing(&quote, patch, &ctx()).unwrap();
        assert!((outcome.quote.tax_amount - 160.0 * 0.0825).abs() < 1e-9);
        // apply_tax, tax_rate, and the derived total all changed
        let fields: Vec<_> = outcome
            .log
            .iter()
            .filter_map(|e| e.field.as_deref())
            .collect();
        assert!(fields.contains(&"apply_tax"));
        assert!(fields.contains(&"tax_rate"));
        assert!(fields.contains(&"total"));
    }

    #[test]
    fn test_mark_converted_requires_approved() {
        let quote = quote_with_item();
        let wo_id = EntityId::new(crate::core::identity::EntityPrefix::Wo);
        assert!(mark_converted(&quote, &wo_id, "WO-2026-0001", &ctx()).is_err());

        let mut approved = quote.clone();
        approved.status = QuoteStatus::Approved;
        let outcome = mark_converted(&approved, &wo_id, "WO-2026-0001", &ctx()).unwrap();
        assert_eq!(outcome.quote.status, QuoteStatus::Converted);
        assert_eq!(outcome.quote.converted_to, Some(wo_id));
        assert_eq!(outcome.log.len(), 2);
        assert!(outcome.log.iter().any(|e| e.action == ChangeAction::WoLinked));
    }

    #[test]
    fn test_mark_unlinked_restores_approved() {
        let mut quote = quote_with_item();
        let wo_id = EntityId::new(crate::core::identity::EntityPrefix::Wo);
        quote.status = QuoteStatus::Converted;
        quote.converted_to = Some(wo_id);

        let outcome = mark_unlinked(&quote, "WO-2026-0001", &ctx()).unwrap();
        assert_eq!(outcome.quote.status, QuoteStatus::Approved);
        assert!(outcome.quote.converted_to.is_none());
        assert!(outcome
            .log
            .iter()
            .any(|e| e.action == ChangeAction::WoUnlinked));
    }
}
