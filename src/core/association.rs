//! Quote / work order association - convert, associate, unlink
//!
//! The only place a quote can enter or leave `converted`. Both sides of
//! the link are patched through a single store batch, and every write is
//! guarded by a revision check against the snapshot the caller read, so
//! two operators racing on the same pair get a retryable conflict
//! instead of a half-written link.

use crate::core::changelog::{ChangeAction, ChangeLogEntry, EntityKind};
use crate::core::flow::{FlowError, TransitionCtx};
use crate::core::quote_flow;
use crate::core::store::{Store, WriteBatch};
use crate::core::workorder_flow;
use crate::entities::quote::{Quote, QuoteItemKind};
use crate::entities::work_order::{MaterialUsage, WorkOrder};

/// Both sides of the link, as stored after the batch applied
#[derive(Debug)]
pub struct AssociationOutcome {
    pub quote: Quote,
    pub work_order: WorkOrder,
}

/// Coordinates cross-entity link operations over a store
pub struct AssociationManager<'a, S: Store> {
    store: &'a mut S,
}

impl<'a, S: Store> AssociationManager<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Re-read the quote and fail if it moved since the caller's snapshot
    fn fresh_quote(&self, snapshot: &Quote) -> Result<Quote, FlowError> {
        let fresh = self.store.quote(&snapshot.id)?;
        if fresh.entity_revision != snapshot.entity_revision {
            return Err(FlowError::StaleAssociation {
                entity: snapshot.quote_number.clone(),
                expected: snapshot.entity_revision,
                actual: fresh.entity_revision,
            });
        }
        Ok(fresh)
    }

    fn fresh_work_order(&self, snapshot: &WorkOrder) -> Result<WorkOrder, FlowError> {
        let fresh = self.store.work_order(&snapshot.id)?;
        if fresh.entity_revision != snapshot.entity_revision {
            return Err(FlowError::StaleAssociation {
                entity: snapshot.wo_number.clone(),
                expected: snapshot.entity_revision,
                actual: fresh.entity_revision,
            });
        }
        Ok(fresh)
    }

    /// Convert an approved quote into a brand-new work order.
    ///
    /// The order is seeded from the quote: title, client, and one
    /// material line per material item. Custom items describe labor or
    /// one-offs and do not become material usage.
    pub fn convert(
        &mut self,
        quote: &Quote,
        wo_number: &str,
        ctx: &TransitionCtx,
    ) -> Result<AssociationOutcome, FlowError> {
        let fresh = self.fresh_quote(quote)?;

        let mut wo = WorkOrder::new(wo_number, &fresh.title, &ctx.actor);
        wo.created = ctx.now;
        wo.client = fresh.client.clone();
        wo.quote = Some(fresh.id.clone());
        wo.materials = fresh
            .items
            .iter()
            .filter(|i| i.kind == QuoteItemKind::Material)
            .map(|i| MaterialUsage {
                material: i.material.clone(),
                description: i.description.clone(),
                quantity: i.quantity,
            })
            .collect();

        let quote_outcome = quote_flow::mark_converted(&fresh, &wo.id, wo_number, ctx)?;

        let mut log = quote_outcome.log;
        log.push(ChangeLogEntry::created(
            EntityKind::WorkOrder,
            &wo.id.to_string(),
            &ctx.actor,
            ctx.now,
        ));
        log.push(wo_link_entry(&wo, &fresh.quote_number, true, ctx));

        let batch = WriteBatch::new()
            .with_quote(quote_outcome.quote)
            .with_work_order(wo.clone())
            .with_log(log);
        self.store.apply(batch)?;

        Ok(AssociationOutcome {
            quote: self.store.quote(&quote.id)?,
            work_order: self.store.work_order(&wo.id)?,
        })
    }

    /// Link an approved quote to an existing work order
    pub fn associate(
        &mut self,
        quote: &Quote,
        wo: &WorkOrder,
        ctx: &TransitionCtx,
    ) -> Result<AssociationOutcome, FlowError> {
        let fresh_quote = self.fresh_quote(quote)?;
        let fresh_wo = self.fresh_work_order(wo)?;

        if let Some(existing) = &fresh_quote.converted_to {
            return Err(FlowError::AlreadyAssociated {
                entity: fresh_quote.quote_number.clone(),
                counterpart: existing.to_string(),
            });
        }
        if let Some(existing) = &fresh_wo.quote {
            return Err(FlowError::AlreadyAssociated {
                entity: fresh_wo.wo_number.clone(),
                counterpart: existing.to_string(),
            });
        }
        if !workorder_flow::is_editable(fresh_wo.status) {
            return Err(FlowError::NotEditable {
                status: fresh_wo.status,
            });
        }

        let quote_outcome =
            quote_flow::mark_converted(&fresh_quote, &fresh_wo.id, &fresh_wo.wo_number, ctx)?;

        let mut updated_wo = fresh_wo.clone();
        updated_wo.quote = Some(fresh_quote.id.clone());

        let mut log = quote_outcome.log;
        log.push(wo_link_entry(&updated_wo, &fresh_quote.quote_number, true, ctx));

        let batch = WriteBatch::new()
            .with_quote(quote_outcome.quote)
            .with_work_order(updated_wo)
            .with_log(log);
        self.store.apply(batch)?;

        Ok(AssociationOutcome {
            quote: self.store.quote(&quote.id)?,
            work_order: self.store.work_order(&wo.id)?,
        })
    }

    /// Break the link between a converted quote and its work order.
    ///
    /// The quote falls back to `approved`; the work order keeps its own
    /// status and merely loses the back-reference.
    pub fn unlink(
        &mut self,
        quote: &Quote,
        ctx: &TransitionCtx,
    ) -> Result<AssociationOutcome, FlowError> {
        let fresh_quote = self.fresh_quote(quote)?;
        let wo_id = fresh_quote
            .converted_to
            .clone()
            .ok_or(FlowError::NotAssociated)?;
        let fresh_wo = self.store.work_order(&wo_id)?;

        let quote_outcome = quote_flow::mark_unlinked(&fresh_quote, &fresh_wo.wo_number, ctx)?;

        let mut updated_wo = fresh_wo.clone();
        updated_wo.quote = None;

        let mut log = quote_outcome.log;
        log.push(wo_link_entry(&updated_wo, &fresh_quote.quote_number, false, ctx));

        let batch = WriteBatch::new()
            .with_quote(quote_outcome.quote)
            .with_work_order(updated_wo)
            .with_log(log);
        self.store.apply(batch)?;

        Ok(AssociationOutcome {
            quote: self.store.quote(&quote.id)?,
            work_order: self.store.work_order(&wo_id)?,
        })
    }
}

/// Work-order-side link entry, mirroring the one on the quote
fn wo_link_entry(
    wo: &WorkOrder,
    quote_number: &str,
    linked: bool,
    ctx: &TransitionCtx,
) -> ChangeLogEntry {
    let (action, old_value, new_value) = if linked {
        (ChangeAction::WoLinked, None, Some(quote_number.to_string()))
    } else {
        (
            ChangeAction::WoUnlinked,
            Some(quote_number.to_string()),
            None,
        )
    };
    ChangeLogEntry {
        entity_type: EntityKind::WorkOrder,
        entity_id: wo.id.to_string(),
        action,
        field: Some("quote".to_string()),
        old_value,
        new_value,
        actor: ctx.actor.clone(),
        created_at: ctx.now,
    }
}
