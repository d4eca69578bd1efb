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
use lazy_static::lazy_static;
use prometheus::{IntCounterVec, Opts};
use sea_orm::{DatabaseTransaction, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

lazy_static! {
    static ref STOCK_OPERATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "stockledger_product_stock_operations_total",
            "Total number of product-scoped stock operations"
        ),
        &["operation"]
    )
    .expect("metric can be created");
    static ref STOCK_OPERATION_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "stockledger_product_stock_operation_failures_total",
            "Total number of failed product-scoped stock operations"
        ),
        &["error_type"]
    )
    .expect("metric can be created");
}

/// Product-scoped operation kinds accepted at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockOperation {
    Add,
    Remove,
    Adjustment,
}

impl StockOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockOperation::Add => "ADD",
            StockOperation::Remove => "REMOVE",
            StockOperation::Adjustment => "ADJUSTMENT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ADD" => Some(StockOperation::Add),
            "REMOVE" => Some(StockOperation::Remove),
            "ADJUSTMENT" => Some(StockOperation::Adjustment),
            _ => None,
        }
    }
}

/// Add / Remove / Adjust stock addressed by (product, location, variant SKU),
/// lazily creating the inventory record. `amount` is the moved quantity for
/// Add/Remove and the new absolute value for Adjustment.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProductStockOperationCommand {
    pub ctx: TenantContext,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub variant_sku: Option<String>,
    pub operation: StockOperation,
    #[validate(range(min = 0))]
    pub amount: i32,
    #[validate(length(min = 1, max = 255))]
    pub reason: String,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductStockOperationResult {
    pub inventory: inventory_record::Model,
    pub movement_id: Uuid,
    pub quantity_change: i32,
    pub quantity_after: i32,
}

#[async_trait::async_trait]
impl Command for ProductStockOperationCommand {
    type Result = ProductStockOperationResult;

    #[instrument(skip(self, db_pool, event_sender), fields(product_id = %self.product_id, location_id = %self.location_id, operation = self.operation.as_str()))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            STOCK_OPERATION_FAILURES
                .with_label_values(&["validation_error"])
                .inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;
        if matches!(self.operation, StockOperation::Add | StockOperation::Remove)
            && self.amount == 0
        {
            STOCK_OPERATION_FAILURES
                .with_label_values(&["validation_error"])
                .inc();
            return Err(ServiceError::InvalidInput(
                "amount must be positive for ADD and REMOVE".to_string(),
            ));
        }

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
                    STOCK_OPERATION_FAILURES
                        .with_label_values(&[match &e {
                            ServiceError::InsufficientStock(_) => "insufficient_stock",
                            ServiceError::NotFound(_) => "not_found",
                            ServiceError::PermissionDenied(_) => "permission_denied",
                            _ => "other",
                        }])
                        .inc();
                    return Err(e);
                }
            }
        };

        STOCK_OPERATIONS
            .with_label_values(&[self.operation.as_str()])
            .inc();
        info!(
            inventory_id = %result.inventory.id,
            operation = self.operation.as_str(),
            amount = %self.amount,
            reason = %self.reason,
            quantity_after = %result.quantity_after,
            "Product stock operation applied"
        );
        event_sender
            .send(Event::StockMovementRecorded {
                movement_id: result.movement_id,
                inventory_id: result.inventory.id,
                movement_type: self.operation.as_str().to_string(),
                quantity_change: result.quantity_change,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(result)
    }
}

impl ProductStockOperationCommand {
    async fn apply(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<ProductStockOperationResult, ServiceError> {
        let product = load_product(txn, self.product_id).await?;
        let location = load_location(txn, self.location_id).await?;
        self.ctx.ensure_owns(location.owner, "location")?;
        super::check_variant_rule(product.is_variation(), self.variant_sku.as_deref())?;

        let (record, _) = inventory_store::get_or_create(txn, &product, &location).await?;

        let (kind, change, quantity_after, updated) = match self.operation {
            StockOperation::Add => {
                self.apply_delta(txn, &record, MovementKind::Add, self.amount)
                    .await?
            }
            StockOperation::Remove => {
                self.apply_delta(txn, &record, MovementKind::Remove, -self.amount)
                    .await?
            }
            StockOperation::Adjustment => {
                let current = match self.variant_sku.as_deref() {
                    Some(sku) => record
                        .variations
                        .as_ref()
                        .and_then(|v| v.quantity_of(sku))
                        .unwrap_or(0),
                    None => record.quantity,
                };
                let change = self.amount - current;
                self.apply_delta(txn, &record, MovementKind::Adjustment, change)
                    .await?
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
                quantity_after,
                reason: Some(self.reason.clone()),
                notes: self.notes.clone(),
                reference_id: None,
                owner: updated.owner,
                created_by: self.created_by.clone(),
            },
        )
        .await?;

        Ok(ProductStockOperationResult {
            inventory: updated,
            movement_id: movement.id,
            quantity_change: change,
            quantity_after,
        })
    }

    async fn apply_delta(
        &self,
        txn: &DatabaseTransaction,
        record: &inventory_record::Model,
        kind: MovementKind,
        delta: i32,
    ) -> Result<(MovementKind, i32, i32, inventory_record::Model), ServiceError> {
        match self.variant_sku.as_deref() {
            Some(sku) => {
                let require_existing = kind == MovementKind::Remove;
                let (new_total, new_variant, variations) =
                    super::apply_variant_delta(record, sku, delta, require_existing)?;
                let updated =
                    inventory_store::write_guarded(txn, record, new_total, Some(variations))
                        .await?;
                Ok((kind, delta, new_variant, updated))
            }
            // Adjust-to-value needs the version guard: the target is absolute,
            // so an atomic increment from a stale read would not be safe.
            None if kind == MovementKind::Adjustment => {
                let new_total = record.quantity + delta;
                if new_total < 0 {
                    return Err(ServiceError::InsufficientStock(format!(
                        "{} on hand, {} requested",
                        record.quantity, -delta
                    )));
                }
                let updated = inventory_store::write_guarded(txn, record, new_total, None).await?;
                Ok((kind, delta, updated.quantity, updated))
            }
            None => {
                let updated = inventory_store::apply_total_delta(txn, record.id, delta).await?;
                Ok((kind, delta, updated.quantity, updated))
            }
        }
    }
}
