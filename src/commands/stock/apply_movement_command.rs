use crate::{
    commands::{stock::MAX_WRITE_ATTEMPTS, Command},
    db::DbPool,
    entities::stock_movement::MovementKind,
    errors::ServiceError,
    events::{Event, EventSender},
    services::{inventory_store, movement_ledger},
    tenant::TenantContext,
};
use sea_orm::{DatabaseTransaction, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Signed delta against an existing inventory record. `kind` is limited to
/// the manual movement kinds; transfers and initial seeds go through their
/// own commands.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ApplyMovementCommand {
    pub ctx: TenantContext,
    pub inventory_id: Uuid,
    pub variant_sku: Option<String>,
    pub quantity_change: i32,
    pub kind: Option<MovementKind>,
    #[validate(length(min = 1, max = 255))]
    pub reason: String,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApplyMovementResult {
    pub movement_id: Uuid,
    pub quantity_after: i32,
}

#[async_trait::async_trait]
impl Command for ApplyMovementCommand {
    type Result = ApplyMovementResult;

    #[instrument(skip(self, db_pool, event_sender), fields(inventory_id = %self.inventory_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;
        let kind = self.movement_kind()?;

        let db = db_pool.as_ref();
        let mut attempt = 0;
        let result = loop {
            let txn = db.begin().await?;
            match self.apply(&txn, kind).await {
                Ok(result) => {
                    txn.commit().await?;
                    break result;
                }
                Err(ServiceError::ConcurrentModification(id)) if attempt < MAX_WRITE_ATTEMPTS => {
                    let _ = txn.rollback().await;
                    attempt += 1;
                    warn!(record_id = %id, attempt, "Optimistic write conflict, retrying");
                }
                Err(e) => {
                    let _ = txn.rollback().await;
                    return Err(e);
                }
            }
        };

        info!(
            inventory_id = %self.inventory_id,
            quantity_change = %self.quantity_change,
            movement_type = kind.as_str(),
            quantity_after = %result.quantity_after,
            "Stock movement applied"
        );
        event_sender
            .send(Event::StockMovementRecorded {
                movement_id: result.movement_id,
                inventory_id: self.inventory_id,
                movement_type: kind.as_str().to_string(),
                quantity_change: self.quantity_change,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(result)
    }
}

impl ApplyMovementCommand {
    fn movement_kind(&self) -> Result<MovementKind, ServiceError> {
        match self.kind {
            None => Ok(MovementKind::Adjustment),
            Some(kind @ (MovementKind::Add | MovementKind::Remove | MovementKind::Adjustment)) => {
                Ok(kind)
            }
            Some(other) => Err(ServiceError::InvalidInput(format!(
                "movement kind {} cannot be applied directly",
                other.as_str()
            ))),
        }
    }

    async fn apply(
        &self,
        txn: &DatabaseTransaction,
        kind: MovementKind,
    ) -> Result<ApplyMovementResult, ServiceError> {
        let record = inventory_store::find_by_id(txn, self.inventory_id).await?;
        self.ctx.ensure_owns(record.owner, "inventory record")?;
        super::check_variant_rule(record.is_variation(), self.variant_sku.as_deref())?;

        let (quantity_after, updated) = match self.variant_sku.as_deref() {
            Some(sku) => {
                let (new_total, new_variant, variations) = super::apply_variant_delta(
                    &record,
                    sku,
                    self.quantity_change,
                    self.quantity_change < 0,
                )?;
                let updated =
                    inventory_store::write_guarded(txn, &record, new_total, Some(variations))
                        .await?;
                (new_variant, updated)
            }
            None => {
                let updated =
                    inventory_store::apply_total_delta(txn, record.id, self.quantity_change)
                        .await?;
                (updated.quantity, updated)
            }
        };

        let movement = movement_ledger::append(
            txn,
            movement_ledger::NewMovement {
                kind,
                product_id: updated.product_id,
                location_id: updated.location_id,
                inventory_id: updated.id,
                variant_sku: self.variant_sku.clone(),
                quantity_change: self.quantity_change,
                quantity_after,
                reason: Some(self.reason.clone()),
                notes: self.notes.clone(),
                reference_id: None,
                owner: updated.owner,
                created_by: self.created_by.clone(),
            },
        )
        .await?;

        Ok(ApplyMovementResult {
            movement_id: movement.id,
            quantity_after,
        })
    }
}
