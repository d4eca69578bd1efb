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

/// Adjust-to-value against an existing inventory record. The logged change is
/// the difference to the previous quantity; a no-op adjustment (same value)
/// is still logged, never suppressed.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AdjustStockCommand {
    pub ctx: TenantContext,
    pub inventory_id: Uuid,
    pub variant_sku: Option<String>,
    #[validate(range(min = 0))]
    pub new_quantity: i32,
    #[validate(length(min = 1, max = 255))]
    pub reason: String,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdjustStockResult {
    pub movement_id: Uuid,
    pub quantity_change: i32,
    pub quantity_after: i32,
}

#[async_trait::async_trait]
impl Command for AdjustStockCommand {
    type Result = AdjustStockResult;

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

        let db = db_pool.as_ref();
        let mut attempt = 0;
        let result = loop {
            let txn = db.begin().await?;
            match self.apply(&txn).await {
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
            new_quantity = %self.new_quantity,
            reason = %self.reason,
            quantity_change = %result.quantity_change,
            "Stock adjusted"
        );
        event_sender
            .send(Event::StockAdjusted {
                inventory_id: self.inventory_id,
                movement_id: result.movement_id,
                quantity_change: result.quantity_change,
                quantity_after: result.quantity_after,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(result)
    }
}

impl AdjustStockCommand {
    async fn apply(&self, txn: &DatabaseTransaction) -> Result<AdjustStockResult, ServiceError> {
        let record = inventory_store::find_by_id(txn, self.inventory_id).await?;
        self.ctx.ensure_owns(record.owner, "inventory record")?;
        super::check_variant_rule(record.is_variation(), self.variant_sku.as_deref())?;

        let (change, quantity_after, updated) = match self.variant_sku.as_deref() {
            Some(sku) => {
                // Setting a never-stocked SKU creates its bucket.
                let current = record
                    .variations
                    .as_ref()
                    .and_then(|v| v.quantity_of(sku))
                    .unwrap_or(0);
                let change = self.new_quantity - current;
                let (new_total, new_variant, variations) =
                    super::apply_variant_delta(&record, sku, change, false)?;
                let updated =
                    inventory_store::write_guarded(txn, &record, new_total, Some(variations))
                        .await?;
                (change, new_variant, updated)
            }
            None => {
                let change = self.new_quantity - record.quantity;
                let updated =
                    inventory_store::write_guarded(txn, &record, self.new_quantity, None).await?;
                (change, updated.quantity, updated)
            }
        };

        let movement = movement_ledger::append(
            txn,
            movement_ledger::NewMovement {
                kind: MovementKind::Adjustment,
                product_id: updated.product_id,
                location_id: updated.location_id,
                inventory_id: updated.id,
                variant_sku: self.variant_sku.clone(),
                quantity_change: change,
                quantity_after,
                reason: Some(self.reason.clone()),
                notes: self.notes.clone(),
                reference_id: None,
                owner: updated.owner,
                created_by: self.created_by.clone(),
            },
        )
        .await?;

        Ok(AdjustStockResult {
            movement_id: movement.id,
            quantity_change: change,
            quantity_after,
        })
    }
}
