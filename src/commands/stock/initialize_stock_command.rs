use crate::{
    commands::{
        stock::{load_location, load_product},
        Command,
    },
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
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Seeds the first inventory record for a (product, location) pair. Only
/// valid once per pair; variation products are seeded per variant SKU through
/// the set-level operation instead.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InitializeStockCommand {
    pub ctx: TenantContext,
    pub product_id: Uuid,
    pub location_id: Uuid,
    #[validate(range(min = 0))]
    pub initial_quantity: i32,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InitializeStockResult {
    pub inventory_id: Uuid,
    pub movement_id: Uuid,
    pub quantity: i32,
}

#[async_trait::async_trait]
impl Command for InitializeStockCommand {
    type Result = InitializeStockResult;

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
        let txn = db.begin().await?;
        let result = match self.apply(&txn).await {
            Ok(result) => {
                txn.commit().await?;
                result
            }
            Err(e) => {
                let _ = txn.rollback().await;
                return Err(e);
            }
        };

        info!(
            inventory_id = %result.inventory_id,
            quantity = %result.quantity,
            "Stock initialized"
        );
        event_sender
            .send(Event::StockInitialized {
                inventory_id: result.inventory_id,
                product_id: self.product_id,
                location_id: self.location_id,
                quantity: result.quantity,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(result)
    }
}

impl InitializeStockCommand {
    async fn apply(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<InitializeStockResult, ServiceError> {
        let product = load_product(txn, self.product_id).await?;
        let location = load_location(txn, self.location_id).await?;
        self.ctx.ensure_owns(location.owner, "location")?;

        if product.is_variation() {
            return Err(ServiceError::VariantRequired(
                "variation products are seeded per variant SKU via set-level".to_string(),
            ));
        }

        let (record, created) = inventory_store::get_or_create(txn, &product, &location).await?;
        if !created {
            return Err(ServiceError::AlreadyInitialized(format!(
                "product {} already has stock at location {}",
                self.product_id, self.location_id
            )));
        }

        let updated =
            inventory_store::write_guarded(txn, &record, self.initial_quantity, None).await?;

        let movement = movement_ledger::append(
            txn,
            movement_ledger::NewMovement {
                kind: MovementKind::Initial,
                product_id: product.id,
                location_id: location.id,
                inventory_id: updated.id,
                variant_sku: None,
                quantity_change: self.initial_quantity,
                quantity_after: updated.quantity,
                reason: None,
                notes: self.notes.clone(),
                reference_id: None,
                owner: updated.owner,
                created_by: self.created_by.clone(),
            },
        )
        .await?;

        Ok(InitializeStockResult {
            inventory_id: updated.id,
            movement_id: movement.id,
            quantity: updated.quantity,
        })
    }
}
