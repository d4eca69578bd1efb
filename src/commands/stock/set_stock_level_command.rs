use crate::{
    commands::{
        stock::{load_location, load_product, MAX_WRITE_ATTEMPTS},
        Command,
    },
    db::DbPool,
    entities::{inventory_record, stock_movement::MovementKind},
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

/// Sets the absolute stock level for a product at a location, lazily creating
/// the inventory record. The very first set on a fresh record is logged as
/// `INITIAL_SET`; later ones as `ADJUSTMENT`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SetStockLevelCommand {
    pub ctx: TenantContext,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub variant_sku: Option<String>,
    #[validate(range(min = 0))]
    pub new_quantity: i32,
    #[validate(length(min = 1, max = 255))]
    pub reason: String,
    pub created_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetStockLevelResult {
    pub inventory: inventory_record::Model,
    pub movement_id: Uuid,
    pub quantity_change: i32,
}

#[async_trait::async_trait]
impl Command for SetStockLevelCommand {
    type Result = SetStockLevelResult;

    #[instrument(skip(self, db_pool, event_sender), fields(product_id = %self.product_id, location_id = %self.location_id))]
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
            inventory_id = %result.inventory.id,
            new_quantity = %self.new_quantity,
            variant_sku = ?self.variant_sku,
            reason = %self.reason,
            "Stock level set"
        );
        event_sender
            .send(Event::StockAdjusted {
                inventory_id: result.inventory.id,
                movement_id: result.movement_id,
                quantity_change: result.quantity_change,
                quantity_after: self.new_quantity,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(result)
    }
}

impl SetStockLevelCommand {
    async fn apply(&self, txn: &DatabaseTransaction) -> Result<SetStockLevelResult, ServiceError> {
        let product = load_product(txn, self.product_id).await?;
        let location = load_location(txn, self.location_id).await?;
        self.ctx.ensure_owns(location.owner, "location")?;
        super::check_variant_rule(product.is_variation(), self.variant_sku.as_deref())?;

        let (record, created) = inventory_store::get_or_create(txn, &product, &location).await?;
        let kind = if created {
            MovementKind::InitialSet
        } else {
            MovementKind::Adjustment
        };

        let (change, updated) = match self.variant_sku.as_deref() {
            Some(sku) => {
                let current = record
                    .variations
                    .as_ref()
                    .and_then(|v| v.quantity_of(sku))
                    .unwrap_or(0);
                let change = self.new_quantity - current;
                let (new_total, _, variations) =
                    super::apply_variant_delta(&record, sku, change, false)?;
                let updated =
                    inventory_store::write_guarded(txn, &record, new_total, Some(variations))
                        .await?;
                (change, updated)
            }
            None => {
                let change = self.new_quantity - record.quantity;
                let updated =
                    inventory_store::write_guarded(txn, &record, self.new_quantity, None).await?;
                (change, updated)
            }
        };

        let movement = movement_ledger::append(
            txn,
            movement_ledger::NewMovement {
                kind,
                product_id: product.id,
                location_id: location.id,
                inventory_id: updated.id,
                variant_sku: self.variant_sku.clone(),
                quantity_change: change,
                quantity_after: self.new_quantity,
                reason: Some(self.reason.clone()),
                notes: None,
                reference_id: None,
                owner: updated.owner,
                created_by: self.created_by.clone(),
            },
        )
        .await?;

        Ok(SetStockLevelResult {
            inventory: updated,
            movement_id: movement.id,
            quantity_change: change,
        })
    }
}
