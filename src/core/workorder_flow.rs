//! Work order lifecycle - scheduling, execution, evidence, cancellation
//!
//! Same shape as the quote lifecycle: pure operations that return the
//! updated order plus change log entries for the caller to persist
//! atomically.

use chrono::NaiveDate;

use crate::core::changelog::{
    diff_fields, diff_items, ChangeAction, ChangeLogEntry, EntityKind, FieldResolvers,
};
use crate::core::entity::Auditable;
use crate::core::flow::{EvidenceItem, FlowError, TransitionCtx};
use crate::core::store::WriteBatch;
use crate::entities::work_order::{
    MaterialUsage, TechnicianAssignment, WorkOrder, WorkOrderStatus,
};

/// Result of a successful work order operation
#[derive(Debug)]
pub struct WorkOrderOutcome {
    pub work_order: WorkOrder,
    pub log: Vec<ChangeLogEntry>,
}

impl WorkOrderOutcome {
    pub fn into_batch(self) -> WriteBatch {
        WriteBatch::new()
            .with_work_order(self.work_order)
            .with_log(self.log)
    }
}

/// Partial update of a work order's editable fields
#[derive(Debug, Default, Clone)]
pub struct WorkOrderPatch {
    pub title: Option<String>,
    pub poc: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub technician_notes: Option<String>,
}

/// Check if a status transition is reachable under the lifecycle table.
/// Reopening (completed/cancelled back to scheduled) is listed here but
/// only performed through [`reopen`].
pub fn is_valid_transition(from: WorkOrderStatus, to: WorkOrderStatus) -> bool {
    matches!(
        (from, to),
        (WorkOrderStatus::Draft, WorkOrderStatus::Scheduled)
            | (WorkOrderStatus::Scheduled, WorkOrderStatus::InProgress)
            | (WorkOrderStatus::InProgress, WorkOrderStatus::Completed)
            // Pause and resume mid-job
            | (WorkOrderStatus::InProgress, WorkOrderStatus::OnHold)
            | (WorkOrderStatus::OnHold, WorkOrderStatus::InProgress)
            // Cancellation from any non-terminal status
            | (WorkOrderStatus::Draft, WorkOrderStatus::Cancelled)
            | (WorkOrderStatus::Scheduled, WorkOrderStatus::Cancelled)
            | (WorkOrderStatus::InProgress, WorkOrderStatus::Cancelled)
            | (WorkOrderStatus::OnHold, WorkOrderStatus::Cancelled)
            // Reopen override
            | (WorkOrderStatus::Completed, WorkOrderStatus::Scheduled)
            | (WorkOrderStatus::Cancelled, WorkOrderStatus::Scheduled)
    )
}

/// Get allowed transitions from the current status
pub fn allowed_transitions(current: WorkOrderStatus) -> Vec<WorkOrderStatus> {
    match current {
        WorkOrderStatus::Draft => vec![WorkOrderStatus::Scheduled, WorkOrderStatus::Cancelled],
        WorkOrderStatus::Scheduled => {
            vec![WorkOrderStatus::InProgress, WorkOrderStatus::Cancelled]
        }
        WorkOrderStatus::InProgress => vec![
            WorkOrderStatus::Completed,
            WorkOrderStatus::OnHold,
            WorkOrderStatus::Cancelled,
        ],
        WorkOrderStatus::OnHold => {
            vec![WorkOrderStatus::InProgress, WorkOrderStatus::Cancelled]
        }
        WorkOrderStatus::Completed => vec![WorkOrderStatus::Scheduled],
        WorkOrderStatus::Cancelled => vec![WorkOrderStatus::Scheduled],
    }
}

/// Whether content edits (fields, crew, materials, evidence) are allowed
pub fn is_editable(status: WorkOrderStatus) -> bool {
    matches!(
        status,
        WorkOrderStatus::Draft | WorkOrderStatus::Scheduled | WorkOrderStatus::InProgress
    )
}

fn require_editable(wo: &WorkOrder) -> Result<(), FlowError> {
    if is_editable(wo.status) {
        Ok(())
    } else {
        Err(FlowError::NotEditable { status: wo.status })
    }
}

/// Evidence items still missing before the order can complete
pub fn missing_evidence(wo: &WorkOrder) -> Vec<EvidenceItem> {
    let mut missing = Vec::new();
    if wo.evidence.photos_before.is_empty() {
        missing.push(EvidenceItem::PhotosBefore);
    }
    if wo.evidence.photos_after.is_empty() {
        missing.push(EvidenceItem::PhotosAfter);
    }
    if wo.evidence.client_signature.is_none() {
        missing.push(EvidenceItem::ClientSignature);
    }
    if wo
        .evidence
        .client_signature_name
        .as_deref()
        .map(str::trim)
        .unwrap_or("")
        .is_empty()
    {
        missing.push(EvidenceItem::ClientSignatureName);
    }
    missing
}

fn status_entry(
    wo: &WorkOrder,
    to: WorkOrderStatus,
    ctx: &TransitionCtx,
) -> ChangeLogEntry {
    ChangeLogEntry::status_changed(
        EntityKind::WorkOrder,
        &wo.id.to_string(),
        &wo.status.to_string(),
        &to.to_string(),
        &ctx.actor,
        ctx.now,
    )
}

fn check_transition(wo: &WorkOrder, to: WorkOrderStatus) -> Result<(), FlowError> {
    if is_valid_transition(wo.status, to) {
        Ok(())
    } else {
        Err(FlowError::InvalidWorkOrderTransition {
            from: wo.status,
            to,
        })
    }
}

/// Put a draft order on the calendar
pub fn schedule(
    wo: &WorkOrder,
    date: NaiveDate,
    ctx: &TransitionCtx,
) -> Result<WorkOrderOutcome, FlowError> {
    check_transition(wo, WorkOrderStatus::Scheduled)?;

    let entry = status_entry(wo, WorkOrderStatus::Scheduled, ctx);
    let mut updated = wo.clone();
    updated.status = WorkOrderStatus::Scheduled;
    updated.scheduled_date = Some(date);

    Ok(WorkOrderOutcome {
        work_order: updated,
        log: vec![entry],
    })
}

/// Crew arrived on site; stamps the actual start time
pub fn start(wo: &WorkOrder, ctx: &TransitionCtx) -> Result<WorkOrderOutcome, FlowError> {
    check_transition(wo, WorkOrderStatus::InProgress)?;

    let entry = status_entry(wo, WorkOrderStatus::InProgress, ctx);
    let mut updated = wo.clone();
    updated.status = WorkOrderStatus::InProgress;
    updated.actual_start = Some(ctx.now);

    Ok(WorkOrderOutcome {
        work_order: updated,
        log: vec![entry],
    })
}

/// Pause a job mid-execution
pub fn hold(wo: &WorkOrder, ctx: &TransitionCtx) -> Result<WorkOrderOutcome, FlowError> {
    check_transition(wo, WorkOrderStatus::OnHold)?;

    let entry = status_entry(wo, WorkOrderStatus::OnHold, ctx);
    let mut updated = wo.clone();
    updated.status = WorkOrderStatus::OnHold;

    Ok(WorkOrderOutcome {
        work_order: updated,
        log: vec![entry],
    })
}

/// Resume a paused job. The original actual start time is kept.
pub fn resume(wo: &WorkOrder, ctx: &TransitionCtx) -> Result<WorkOrderOutcome, FlowError> {
    if wo.status != WorkOrderStatus::OnHold {
        return Err(FlowError::InvalidWorkOrderTransition {
            from: wo.status,
            to: WorkOrderStatus::InProgress,
        });
    }

    let entry = status_entry(wo, WorkOrderStatus::InProgress, ctx);
    let mut updated = wo.clone();
    updated.status = WorkOrderStatus::InProgress;

    Ok(WorkOrderOutcome {
        work_order: updated,
        log: vec![entry],
    })
}

/// Complete the order. Fails with the full list of missing evidence
/// items so the caller can report them all at once.
pub fn complete(wo: &WorkOrder, ctx: &TransitionCtx) -> Result<WorkOrderOutcome, FlowError> {
    check_transition(wo, WorkOrderStatus::Completed)?;

    let missing = missing_evidence(wo);
    if !missing.is_empty() {
        return Err(FlowError::IncompleteEvidence { missing });
    }

    let entry = status_entry(wo, WorkOrderStatus::Completed, ctx);
    let mut updated = wo.clone();
    updated.status = WorkOrderStatus::Completed;
    updated.actual_end = Some(ctx.now);

    Ok(WorkOrderOutcome {
        work_order: updated,
        log: vec![entry],
    })
}

/// Cancel the order with a reason
pub fn cancel(
    wo: &WorkOrder,
    reason: &str,
    ctx: &TransitionCtx,
) -> Result<WorkOrderOutcome, FlowError> {
    check_transition(wo, WorkOrderStatus::Cancelled)?;

    if reason.trim().is_empty() {
        return Err(FlowError::MissingReason);
    }

    let reason = reason.trim().to_string();
    let status = status_entry(wo, WorkOrderStatus::Cancelled, ctx);
    // Keep the reason in the audit trail, not just on the record
    let reason_entry = ChangeLogEntry::field_updated(
        EntityKind::WorkOrder,
        &wo.id.to_string(),
        "cancel_reason",
        "(none)",
        &reason,
        &ctx.actor,
        ctx.now,
    );

    let mut updated = wo.clone();
    updated.status = WorkOrderStatus::Cancelled;
    updated.cancel_reason = Some(reason);

    Ok(WorkOrderOutcome {
        work_order: updated,
        log: vec![status, reason_entry],
    })
}

/// Authorized override returning a completed or cancelled order to
/// `scheduled`. The end timestamp and cancel reason are cleared; the
/// evidence bundle is only cleared when asked.
pub fn reopen(
    wo: &WorkOrder,
    clear_evidence: bool,
    ctx: &TransitionCtx,
) -> Result<WorkOrderOutcome, FlowError> {
    if !matches!(
        wo.status,
        WorkOrderStatus::Completed | WorkOrderStatus::Cancelled
    ) {
        return Err(FlowError::InvalidWorkOrderTransition {
            from: wo.status,
            to: WorkOrderStatus::Scheduled,
        });
    }

    let entry = status_entry(wo, WorkOrderStatus::Scheduled, ctx);
    let mut updated = wo.clone();
    updated.status = WorkOrderStatus::Scheduled;
    updated.actual_end = None;
    updated.cancel_reason = None;
    if clear_evidence {
        updated.evidence = Default::default();
        updated.actual_start = None;
    }

    Ok(WorkOrderOutcome {
        work_order: updated,
        log: vec![entry],
    })
}

/// Update scalar fields. Entries come from the change differ, so only
/// fields that actually changed are logged.
pub fn update_fields(
    wo: &WorkOrder,
    patch: WorkOrderPatch,
    ctx: &TransitionCtx,
) -> Result<WorkOrderOutcome, FlowError> {
    require_editable(wo)?;

    let mut updated = wo.clone();
    if let Some(title) = patch.title {
        updated.title = title;
    }
    if let Some(poc) = patch.poc {
        updated.poc = Some(poc);
    }
    if let Some(date) = patch.scheduled_date {
        updated.scheduled_date = Some(date);
    }
    if let Some(notes) = patch.technician_notes {
        updated.evidence.technician_notes = Some(notes);
    }

    let log = diff_fields(
        EntityKind::WorkOrder,
        &wo.id.to_string(),
        &wo.audit_fields(),
        &updated.audit_fields(),
        &FieldResolvers::new(),
        &ctx.actor,
        ctx.now,
    );

    Ok(WorkOrderOutcome {
        work_order: updated,
        log,
    })
}

/// Assign a technician to the crew
pub fn assign_technician(
    wo: &WorkOrder,
    assignment: TechnicianAssignment,
    ctx: &TransitionCtx,
) -> Result<WorkOrderOutcome, FlowError> {
    require_editable(wo)?;

    if wo
        .technicians
        .iter()
        .any(|t| t.technician == assignment.technician)
    {
        return Err(FlowError::AlreadyAssociated {
            entity: assignment.describe(),
            counterpart: wo.wo_number.clone(),
        });
    }

    let mut updated = wo.clone();
    updated.technicians.push(assignment);

    let log = diff_items(
        EntityKind::WorkOrder,
        &wo.id.to_string(),
        "technicians",
        &wo.technician_refs(),
        &updated.technician_refs(),
        &ctx.actor,
        ctx.now,
    );

    Ok(WorkOrderOutcome {
        work_order: updated,
        log,
    })
}

/// Remove a technician from the crew
pub fn remove_technician(
    wo: &WorkOrder,
    technician: &crate::core::identity::EntityId,
    ctx: &TransitionCtx,
) -> Result<WorkOrderOutcome, FlowError> {
    require_editable(wo)?;

    if !wo.technicians.iter().any(|t| &t.technician == technician) {
        return Err(FlowError::TechnicianNotAssigned);
    }

    let mut updated = wo.clone();
    updated.technicians.retain(|t| &t.technician != technician);

    let log = diff_items(
        EntityKind::WorkOrder,
        &wo.id.to_string(),
        "technicians",
        &wo.technician_refs(),
        &updated.technician_refs(),
        &ctx.actor,
        ctx.now,
    );

    Ok(WorkOrderOutcome {
        work_order: updated,
        log,
    })
}

/// Record material used on the job. Recording the same material again
/// replaces its quantity instead of duplicating the line.
pub fn record_material(
    wo: &WorkOrder,
    usage: MaterialUsage,
    ctx: &TransitionCtx,
) -> Result<WorkOrderOutcome, FlowError> {
    require_editable(wo)?;

    let mut updated = wo.clone();
    match updated
        .materials
        .iter_mut()
        .find(|m| m.diff_key() == usage.diff_key())
    {
        Some(existing) => *existing = usage,
        None => updated.materials.push(usage),
    }

    let log = diff_items(
        EntityKind::WorkOrder,
        &wo.id.to_string(),
        "materials",
        &wo.material_refs(),
        &updated.material_refs(),
        &ctx.actor,
        ctx.now,
    );

    Ok(WorkOrderOutcome {
        work_order: updated,
        log,
    })
}

/// Attach a before or after photo URL to the evidence bundle
pub fn add_photo(
    wo: &WorkOrder,
    url: impl Into<String>,
    after: bool,
    ctx: &TransitionCtx,
) -> Result<WorkOrderOutcome, FlowError> {
    require_editable(wo)?;

    let url = url.into();
    let mut updated = wo.clone();
    let field = if after {
        updated.evidence.photos_after.push(url.clone());
        "photos_after"
    } else {
        updated.evidence.photos_before.push(url.clone());
        "photos_before"
    };

    let entry = ChangeLogEntry {
        entity_type: EntityKind::WorkOrder,
        entity_id: wo.id.to_string(),
        action: ChangeAction::ItemAdded,
        field: Some(field.to_string()),
        old_value: None,
        new_value: Some(url),
        actor: ctx.actor.clone(),
        created_at: ctx.now,
    };

    Ok(WorkOrderOutcome {
        work_order: updated,
        log: vec![entry],
    })
}

/// Capture the client signature and the signer's name
pub fn capture_signature(
    wo: &WorkOrder,
    signature: impl Into<String>,
    signer_name: impl Into<String>,
    ctx: &TransitionCtx,
) -> Result<WorkOrderOutcome, FlowError> {
    require_editable(wo)?;

    let signer_name = signer_name.into();
    let mut updated = wo.clone();
    updated.evidence.client_signature = Some(signature.into());
    updated.evidence.client_signature_name = Some(signer_name.clone());

    let entry = ChangeLogEntry {
        entity_type: EntityKind::WorkOrder,
        entity_id: wo.id.to_string(),
        action: ChangeAction::FieldUpdated,
        field: Some("client_signature".to_string()),
        old_value: wo.evidence.client_signature_name.clone(),
        new_value: Some(signer_name),
        actor: ctx.actor.clone(),
        created_at: ctx.now,
    };

    Ok(WorkOrderOutcome {
        work_order: updated,
        log: vec![entry],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::{EntityId, EntityPrefix};

    fn ctx() -> TransitionCtx {
        TransitionCtx::new("jsmith")
    }

    fn scheduled_wo() -> WorkOrder {
        let wo = WorkOrder::new("WO-2026-0001", "Panel upgrade", "test");
        schedule(&wo, NaiveDate::from_ymd_opt(2026, 9, 10).unwrap(), &ctx())
            .unwrap()
            .work_order
    }

    fn in_progress_wo() -> WorkOrder {
        start(&scheduled_wo(), &ctx()).unwrap().work_order
    }

    fn with_full_evidence(mut wo: WorkOrder) -> WorkOrder {
        wo.evidence.photos_before.push("b1.jpg".to_string());
        wo.evidence.photos_after.push("a1.jpg".to_string());
        wo.evidence.client_signature = Some("sig.png".to_string());
        wo.evidence.client_signature_name = Some("Dana Cole".to_string());
        wo
    }

    #[test]
    fn test_happy_path_to_completed() {
        let wo = with_full_evidence(in_progress_wo());
        assert!(wo.actual_start.is_some());

        let outcome = complete(&wo, &ctx()).unwrap();
        assert_eq!(outcome.work_order.status, WorkOrderStatus::Completed);
        assert!(outcome.work_order.actual_end.is_some());
        assert_eq!(outcome.log.len(), 1);
        assert_eq!(outcome.log[0].action, ChangeAction::StatusChanged);
    }

    #[test]
    fn test_complete_lists_all_missing_evidence() {
        let mut wo = in_progress_wo();
        wo.evidence.photos_before.push("b1.jpg".to_string());

        let err = complete(&wo, &ctx()).unwrap_err();
        match err {
            FlowError::IncompleteEvidence { missing } => {
                assert_eq!(
                    missing,
                    vec![
                        EvidenceItem::PhotosAfter,
                        EvidenceItem::ClientSignature,
                        EvidenceItem::ClientSignatureName,
                    ]
                );
            }
            other => panic!("expected IncompleteEvidence, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_signer_name_counts_as_missing() {
        let mut wo = with_full_evidence(in_progress_wo());
        wo.evidence.client_signature_name = Some("   ".to_string());
        assert!(matches!(
            complete(&wo, &ctx()),
            Err(FlowError::IncompleteEvidence { .. })
        ));
    }

    #[test]
    fn test_cannot_skip_scheduling() {
        let wo = WorkOrder::new("WO-2026-0001", "Test", "test");
        assert!(matches!(
            start(&wo, &ctx()),
            Err(FlowError::InvalidWorkOrderTransition {
                from: WorkOrderStatus::Draft,
                to: WorkOrderStatus::InProgress,
            })
        ));
    }

    #[test]
    fn test_cancel_requires_reason() {
        let wo = scheduled_wo();
        assert!(matches!(
            cancel(&wo, "  ", &ctx()),
            Err(FlowError::MissingReason)
        ));

        let outcome = cancel(&wo, "client postponed", &ctx()).unwrap();
        assert_eq!(outcome.work_order.status, WorkOrderStatus::Cancelled);
        assert_eq!(
            outcome.work_order.cancel_reason.as_deref(),
            Some("client postponed")
        );
        // reason lands in the audit trail alongside the status change
        assert_eq!(outcome.log.len(), 2);
        assert_eq!(outcome.log[1].field.as_deref(), Some("cancel_reason"));
        assert_eq!(outcome.log[1].new_value.as_deref(), Some("client postponed"));
    }

    #[test]
    fn test_hold_and_resume() {
        let wo = in_progress_wo();
        let held = hold(&wo, &ctx()).unwrap().work_order;
        assert_eq!(held.status, WorkOrderStatus::OnHold);

        let resumed = resume(&held, &ctx()).unwrap().work_order;
        assert_eq!(resumed.status, WorkOrderStatus::InProgress);
        // start time survives the pause
        assert_eq!(resumed.actual_start, wo.actual_start);
    }

    #[test]
    fn test_on_hold_can_cancel_but_not_complete() {
        let held = hold(&in_progress_wo(), &ctx()).unwrap().work_order;
        assert!(cancel(&held, "scope change", &ctx()).is_ok());
        assert!(complete(&with_full_evidence(held), &ctx()).is_err());
    }

    #[test]
    fn test_reopen_clears_outcome_fields() {
        let completed = complete(&with_full_evidence(in_progress_wo()), &ctx())
            .unwrap()
            .work_order;

        let reopened = reopen(&completed, false, &ctx()).unwrap().work_order;
        assert_eq!(reopened.status, WorkOrderStatus::Scheduled);
        assert!(reopened.actual_end.is_none());
        // evidence kept unless explicitly cleared
        assert!(!reopened.evidence.photos_before.is_empty());

        let wiped = reopen(&completed, true, &ctx()).unwrap().work_order;
        assert!(wiped.evidence.photos_before.is_empty());
        assert!(wiped.evidence.client_signature.is_none());
        assert!(wiped.actual_start.is_none());

        // cancel reason is an outcome field too: cleared even when the
        // evidence bundle is kept
        let cancelled = cancel(&scheduled_wo(), "weather", &ctx()).unwrap().work_order;
        let back = reopen(&cancelled, false, &ctx()).unwrap().work_order;
        assert!(back.cancel_reason.is_none());
        assert_eq!(back.status, WorkOrderStatus::Scheduled);
    }

    #[test]
    fn test_reopen_only_from_terminal() {
        let wo = scheduled_wo();
        assert!(reopen(&wo, false, &ctx()).is_err());
    }

    #[test]
    fn test_edits_rejected_after_completion() {
        let completed = complete(&with_full_evidence(in_progress_wo()), &ctx())
            .unwrap()
            .work_order;

        let patch = WorkOrderPatch {
            title: Some("New title".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            update_fields(&completed, patch, &ctx()),
            Err(FlowError::NotEditable {
                status: WorkOrderStatus::Completed
            })
        ));
        assert!(add_photo(&completed, "late.jpg", true, &ctx()).is_err());
    }

    #[test]
    fn test_update_fields_logs_only_changes() {
        let wo = scheduled_wo();
        let patch = WorkOrderPatch {
            title: Some("Panel upgrade and inspection".to_string()),
            ..Default::default()
        };
        let outcome = update_fields(&wo, patch, &ctx()).unwrap();
        assert_eq!(outcome.log.len(), 1);
        assert_eq!(outcome.log[0].field.as_deref(), Some("title"));
        assert_eq!(
            outcome.log[0].old_value.as_deref(),
            Some("Panel upgrade")
        );
    }

    #[test]
    fn test_assign_technician_logs_name_not_id() {
        let wo = scheduled_wo();
        let tech_id = EntityId::new(EntityPrefix::Tech);
        let assignment = TechnicianAssignment {
            technician: tech_id.clone(),
            name: "Sam Rivera".to_string(),
            role: Some("lead".to_string()),
        };

        let outcome = assign_technician(&wo, assignment.clone(), &ctx()).unwrap();
        assert_eq!(outcome.log.len(), 1);
        assert_eq!(outcome.log[0].action, ChangeAction::ItemAdded);
        assert_eq!(
            outcome.log[0].new_value.as_deref(),
            Some("Sam Rivera (lead)")
        );

        // duplicate assignment rejected
        assert!(assign_technician(&outcome.work_order, assignment, &ctx()).is_err());

        let removed = remove_technician(&outcome.work_order, &tech_id, &ctx()).unwrap();
        assert!(removed.work_order.technicians.is_empty());
        assert_eq!(removed.log[0].action, ChangeAction::ItemRemoved);
    }

    #[test]
    fn test_record_material_replaces_quantity() {
        let wo = in_progress_wo();
        let usage = MaterialUsage {
            material: None,
            description: "Copper pipe".to_string(),
            quantity: 3.0,
        };
        let once = record_material(&wo, usage.clone(), &ctx()).unwrap().work_order;
        let twice = record_material(
            &once,
            MaterialUsage {
                quantity: 5.0,
                ..usage
            },
            &ctx(),
        )
        .unwrap();

        assert_eq!(twice.work_order.materials.len(), 1);
        assert_eq!(twice.work_order.materials[0].quantity, 5.0);
        assert_eq!(twice.log[0].action, ChangeAction::ItemChanged);
    }

    #[test]
    fn test_capture_signature() {
        let wo = in_progress_wo();
        let outcome = capture_signature(&wo, "sig.png", "Dana Cole", &ctx()).unwrap();
        assert_eq!(
            outcome.work_order.evidence.client_signature_name.as_deref(),
            Some("Dana Cole")
        );
        assert_eq!(outcome.log[0].field.as_deref(), Some("client_signature"));
    }
}
