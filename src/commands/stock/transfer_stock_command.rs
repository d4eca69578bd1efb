use crate::{
    commands::{
        stock::{load_location, load_product, MAX_WRITE_ATTEMPTS},
        Command,
    },
    db::DbPool,
    entities::{location, product, stock_movement::MovementKind},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{inventory_store, movement_ledger},
    tenant::TenantContext,
};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use sea_orm::{DatabaseTransaction, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

lazy_static! {
    static ref STOCK_TRANSFERS: IntCounter = IntCounter::new(
        "stockledger_stock_transfers_total",
        "Total number of completed stock transfers"
    )
    .expect("metric can be created");
}

/// Moves `amount` units of a product between two locations of the same
/// tenant. The two ledger entries share a reference id; total units are
/// conserved across the pair of records.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransferStockCommand {
    pub ctx: TenantContext,
    pub product_id: Uuid,
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    pub variant_sku: Option<String>,
    #[validate(range(min = 1))]
    pub amount: i32,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    pub reference_id: Option<Uuid>,
    pub created_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferStockResult {
    pub transfer_out_movement_id: Uuid,
    pub transfer_in_movement_id: Uuid,
    pub reference_id: Uuid,
    pub source_quantity: i32,
    pub destination_quantity: i32,
}

#[async_trait::async_trait]
impl Command for TransferStockCommand {
    type Result = TransferStockResult;

    #[instrument(skip(self, db_pool, event_sender), fields(product_id = %self.product_id, from = %self.from_location_id, to = %self.to_location_id))]
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
        if self.from_location_id == self.to_location_id {
            return Err(ServiceError::InvalidInput(
                "source and destination location are the same".to_string(),
            ));
        }

        let reference_id = self.reference_id.unwrap_or_else(Uuid::new_v4);
        let db = db_pool.as_ref();
        let mut attempt = 0;
        let result = loop {
            let txn = db.begin().await?;
            match self.apply(&txn, reference_id).await {
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

        STOCK_TRANSFERS.inc();
        info!(
            product_id = %self.product_id,
            from = %self.from_location_id,
            to = %self.to_location_id,
            amount = %self.amount,
            reference_id = %reference_id,
            "Stock transferred"
        );
        event_sender
            .send(Event::StockTransferred {
                product_id: self.product_id,
                from_location_id: self.from_location_id,
                to_location_id: self.to_location_id,
                amount: self.amount,
                reference_id,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(result)
    }
}

impl TransferStockCommand {
    fn authorize(
        &self,
        source: &location::Model,
        destination: &location::Model,
    ) -> Result<(), ServiceError> {
        self.ctx.ensure_owns(source.owner, "source location")?;
        self.ctx.ensure_owns(destination.owner, "destination location")?;
        // Conservative reading: a transfer never crosses a tenant boundary,
        // even under the administrative context.
        if source.owner != destination.owner {
            return Err(ServiceError::PermissionDenied(
                "source and destination locations belong to different tenants".to_string(),
            ));
        }
        Ok(())
    }

    async fn apply(
        &self,
        txn: &DatabaseTransaction,
        reference_id: Uuid,
    ) -> Result<TransferStockResult, ServiceError> {
        let product = load_product(txn, self.product_id).await?;
        let source = load_location(txn, self.from_location_id).await?;
        let destination = load_location(txn, self.to_location_id).await?;
        self.authorize(&source, &destination)?;
        super::check_variant_rule(product.is_variation(), self.variant_sku.as_deref())?;

        let source_record = inventory_store::find_by_target(txn, product.id, source.id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "no inventory for product {} at location {}",
                    product.id, source.id
                ))
            })?;
        let (destination_record, _) =
            inventory_store::get_or_create(txn, &product, &destination).await?;

        let (source_after, source_updated) = self
            .move_side(txn, &source_record, -self.amount, true)
            .await?;
        let out_movement = movement_ledger::append(
            txn,
            self.movement(
                &product,
                source.id,
                source_updated.id,
                MovementKind::TransferOut,
                -self.amount,
                source_after,
                reference_id,
                source_updated.owner,
            ),
        )
        .await?;

        let (destination_after, destination_updated) = self
            .move_side(txn, &destination_record, self.amount, false)
            .await?;
        let in_movement = movement_ledger::append(
            txn,
            self.movement(
                &product,
                destination.id,
                destination_updated.id,
                MovementKind::TransferIn,
                self.amount,
                destination_after,
                reference_id,
                destination_updated.owner,
            ),
        )
        .await?;

        Ok(TransferStockResult {
            transfer_out_movement_id: out_movement.id,
            transfer_in_movement_id: in_movement.id,
            reference_id,
            source_quantity: source_updated.quantity,
            destination_quantity: destination_updated.quantity,
        })
    }

    /// Applies one side of the transfer, returning the logged quantity-after
    /// (variant quantity when a SKU is in play, else the location total) and
    /// the updated record.
    async fn move_side(
        &self,
        txn: &DatabaseTransaction,
        record: &crate::entities::inventory_record::Model,
        delta: i32,
        require_existing: bool,
    ) -> Result<(i32, crate::entities::inventory_record::Model), ServiceError> {
        match self.variant_sku.as_deref() {
            Some(sku) => {
                let (new_total, new_variant, variations) =
                    super::apply_variant_delta(record, sku, delta, require_existing)?;
                let updated =
                    inventory_store::write_guarded(txn, record, new_total, Some(variations))
                        .await?;
                Ok((new_variant, updated))
            }
            None => {
                let updated = inventory_store::apply_total_delta(txn, record.id, delta).await?;
                Ok((updated.quantity, updated))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn movement(
        &self,
        product: &product::Model,
        location_id: Uuid,
        inventory_id: Uuid,
        kind: MovementKind,
        quantity_change: i32,
        quantity_after: i32,
        reference_id: Uuid,
        owner: Option<Uuid>,
    ) -> movement_ledger::NewMovement {
        movement_ledger::NewMovement {
            kind,
            product_id: product.id,
            location_id,
            inventory_id,
            variant_sku: self.variant_sku.clone(),
            quantity_change,
            quantity_after,
            reason: None,
            notes: self.notes.clone(),
            reference_id: Some(reference_id),
            owner,
            created_by: self.created_by.clone(),
        }
    }
}
