//! One command per stock operation. Every command follows the same shape:
//! validate the input, run the state transition inside a single database
//! transaction (store write + ledger append), retry on optimistic write
//! conflicts, then publish a domain event.

pub mod adjust_stock_command;
pub mod apply_movement_command;
pub mod initialize_stock_command;
pub mod product_stock_operation_command;
pub mod set_stock_level_command;
pub mod transfer_stock_command;

pub use adjust_stock_command::{AdjustStockCommand, AdjustStockResult};
pub use apply_movement_command::{ApplyMovementCommand, ApplyMovementResult};
pub use initialize_stock_command::{InitializeStockCommand, InitializeStockResult};
pub use product_stock_operation_command::{
    ProductStockOperationCommand, ProductStockOperationResult, StockOperation,
};
pub use set_stock_level_command::{SetStockLevelCommand, SetStockLevelResult};
pub use transfer_stock_command::{TransferStockCommand, TransferStockResult};

use crate::entities::{
    inventory_record::{self, VariantStockList},
    location, product,
};
use crate::errors::ServiceError;
use sea_orm::{ConnectionTrait, EntityTrait};
use uuid::Uuid;

/// Optimistic write conflicts are retried this many times before the
/// operation fails `ConcurrentModification`.
pub(crate) const MAX_WRITE_ATTEMPTS: u32 = 3;

pub(crate) async fn load_product<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<product::Model, ServiceError> {
    product::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
}

pub(crate) async fn load_location<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<location::Model, ServiceError> {
    location::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Location {} not found", id)))
}

/// Enforces the variable-product rule: variation records are only operated on
/// through a variant SKU, simple records never take one.
pub(crate) fn check_variant_rule(
    is_variation: bool,
    variant_sku: Option<&str>,
) -> Result<(), ServiceError> {
    match (is_variation, variant_sku) {
        (true, None) => Err(ServiceError::VariantRequired(
            "operation on a variation product requires a variant SKU".to_string(),
        )),
        (false, Some(sku)) => Err(ServiceError::InvalidInput(format!(
            "simple product does not take a variant SKU (got {})",
            sku
        ))),
        _ => Ok(()),
    }
}

/// Applies `delta` to one variant bucket and the record total in lockstep,
/// keeping the total == sum-of-variants invariant. Returns the new total, the
/// new variant quantity, and the rewritten variant list.
///
/// `require_existing` is set on removal paths: taking stock out of a SKU that
/// has never been stocked is a distinct error from running a bucket dry.
pub(crate) fn apply_variant_delta(
    record: &inventory_record::Model,
    sku: &str,
    delta: i32,
    require_existing: bool,
) -> Result<(i32, i32, VariantStockList), ServiceError> {
    let mut variations = record
        .variations
        .clone()
        .ok_or_else(|| ServiceError::InternalError("variant delta on a simple record".to_string()))?;

    let current = variations.quantity_of(sku);
    if require_existing && current.is_none() {
        return Err(ServiceError::VariantNotFound(format!(
            "variant {} has never been stocked at this location",
            sku
        )));
    }
    let current = current.unwrap_or(0);

    let new_variant = current + delta;
    if new_variant < 0 {
        return Err(ServiceError::InsufficientStock(format!(
            "variant {}: {} on hand, {} requested",
            sku, current, -delta
        )));
    }

    let new_total = record.quantity + delta;
    if new_total < 0 {
        return Err(ServiceError::InsufficientStock(format!(
            "{} on hand, {} requested",
            record.quantity, -delta
        )));
    }

    variations.set(sku, new_variant);
    Ok((new_total, new_variant, variations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::inventory_record::VariantStock;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use uuid::Uuid;

    fn variation_record(buckets: Vec<(&str, i32)>) -> inventory_record::Model {
        let list = VariantStockList(
            buckets
                .iter()
                .map(|(sku, quantity)| VariantStock {
                    sku: sku.to_string(),
                    quantity: *quantity,
                })
                .collect(),
        );
        inventory_record::Model {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            owner: None,
            quantity: list.total(),
            variations: Some(list),
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn variant_delta_moves_total_and_bucket_together() {
        let record = variation_record(vec![("red", 5), ("blue", 2)]);
        let (total, variant, list) = apply_variant_delta(&record, "red", -3, true).unwrap();
        assert_eq!(total, 4);
        assert_eq!(variant, 2);
        assert_eq!(list.total(), total);
    }

    #[test]
    fn variant_delta_creates_bucket_on_add() {
        let record = variation_record(vec![("red", 5)]);
        let (total, variant, list) = apply_variant_delta(&record, "green", 2, false).unwrap();
        assert_eq!(total, 7);
        assert_eq!(variant, 2);
        assert!(list.contains("green"));
    }

    #[test]
    fn removal_from_unstocked_variant_is_rejected() {
        let record = variation_record(vec![("red", 5)]);
        assert_matches!(
            apply_variant_delta(&record, "green", -1, true),
            Err(ServiceError::VariantNotFound(_))
        );
    }

    #[test]
    fn variant_bucket_cannot_go_negative() {
        let record = variation_record(vec![("red", 2)]);
        assert_matches!(
            apply_variant_delta(&record, "red", -3, true),
            Err(ServiceError::InsufficientStock(_))
        );
    }

    #[test]
    fn variant_rule_rejects_mismatches() {
        assert_matches!(
            check_variant_rule(true, None),
            Err(ServiceError::VariantRequired(_))
        );
        assert_matches!(
            check_variant_rule(false, Some("red")),
            Err(ServiceError::InvalidInput(_))
        );
        assert!(check_variant_rule(true, Some("red")).is_ok());
        assert!(check_variant_rule(false, None).is_ok());
    }
}
