//! Write primitives for the current-state projection.
//!
//! Two write paths exist, both safe under concurrent callers:
//! an atomic guarded increment for total-only deltas, and a version-checked
//! full-row write for anything that rewrites the variant list or sets an
//! absolute value. Callers run these inside the operation transaction.

use crate::entities::{
    inventory_record::{self, Entity as InventoryRecord, VariantStockList},
    location, product,
};
use crate::errors::ServiceError;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

pub async fn find_by_id<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<inventory_record::Model, ServiceError> {
    InventoryRecord::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Inventory record {} not found", id)))
}

pub async fn find_by_target<C: ConnectionTrait>(
    db: &C,
    product_id: Uuid,
    location_id: Uuid,
) -> Result<Option<inventory_record::Model>, ServiceError> {
    InventoryRecord::find()
        .filter(inventory_record::Column::ProductId.eq(product_id))
        .filter(inventory_record::Column::LocationId.eq(location_id))
        .one(db)
        .await
        .map_err(ServiceError::DatabaseError)
}

/// Returns the record for (product, location), creating it with quantity 0
/// if absent. Variation products start with an empty variant list. The owner
/// is denormalized from the location. The boolean is true when the record was
/// created by this call.
pub async fn get_or_create<C: ConnectionTrait>(
    db: &C,
    product: &product::Model,
    location: &location::Model,
) -> Result<(inventory_record::Model, bool), ServiceError> {
    if let Some(existing) = find_by_target(db, product.id, location.id).await? {
        return Ok((existing, false));
    }

    let now = Utc::now();
    let fresh = inventory_record::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        location_id: Set(location.id),
        owner: Set(location.owner),
        quantity: Set(0),
        variations: Set(product
            .is_variation()
            .then(VariantStockList::default)),
        version: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
    };

    match fresh.insert(db).await {
        Ok(model) => Ok((model, true)),
        // Lost a creation race on the unique (product, location) index.
        Err(err) if matches!(err.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) => {
            let existing = find_by_target(db, product.id, location.id)
                .await?
                .ok_or_else(|| {
                    ServiceError::InternalError(
                        "Inventory record vanished after duplicate-key insert".to_string(),
                    )
                })?;
            Ok((existing, false))
        }
        Err(err) => Err(ServiceError::DatabaseError(err)),
    }
}

/// Atomically moves the total quantity by `delta` with a non-negativity guard
/// in the same statement. Only valid for records without a variant list; a
/// variant record's total must move through [`write_guarded`] together with
/// its variant bucket.
pub async fn apply_total_delta<C: ConnectionTrait>(
    db: &C,
    record_id: Uuid,
    delta: i32,
) -> Result<inventory_record::Model, ServiceError> {
    let mut update = InventoryRecord::update_many()
        .col_expr(
            inventory_record::Column::Quantity,
            Expr::col(inventory_record::Column::Quantity).add(delta),
        )
        .col_expr(
            inventory_record::Column::Version,
            Expr::col(inventory_record::Column::Version).add(1),
        )
        .col_expr(
            inventory_record::Column::UpdatedAt,
            Expr::value(Utc::now()),
        )
        .filter(inventory_record::Column::Id.eq(record_id));

    if delta < 0 {
        update = update.filter(inventory_record::Column::Quantity.gte(-delta));
    }

    let result = update.exec(db).await?;
    if result.rows_affected == 0 {
        // Either the record is gone or the guard rejected a negative result.
        return match InventoryRecord::find_by_id(record_id).one(db).await? {
            None => Err(ServiceError::NotFound(format!(
                "Inventory record {} not found",
                record_id
            ))),
            Some(record) => Err(ServiceError::InsufficientStock(format!(
                "{} on hand, {} requested",
                record.quantity, -delta
            ))),
        };
    }

    find_by_id(db, record_id).await
}

/// Writes a new total and variant list against the version read earlier.
/// Fails `ConcurrentModification` when another writer got there first; the
/// caller retries the whole operation.
pub async fn write_guarded<C: ConnectionTrait>(
    db: &C,
    current: &inventory_record::Model,
    new_total: i32,
    new_variations: Option<VariantStockList>,
) -> Result<inventory_record::Model, ServiceError> {
    debug_assert!(new_total >= 0);

    let result = InventoryRecord::update_many()
        .col_expr(inventory_record::Column::Quantity, Expr::value(new_total))
        .col_expr(
            inventory_record::Column::Variations,
            Expr::value(new_variations),
        )
        .col_expr(
            inventory_record::Column::Version,
            Expr::col(inventory_record::Column::Version).add(1),
        )
        .col_expr(
            inventory_record::Column::UpdatedAt,
            Expr::value(Utc::now()),
        )
        .filter(inventory_record::Column::Id.eq(current.id))
        .filter(inventory_record::Column::Version.eq(current.version))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(current.id));
    }

    find_by_id(db, current.id).await
}
