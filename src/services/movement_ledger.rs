//! Append-only writer for the audit trail.
//!
//! The ledger has exactly one write operation: `append`. No update or delete
//! path exists; every entry is final once the surrounding transaction
//! commits. A failed operation rolls its entry back with the transaction, so
//! the ledger never carries a movement whose store update did not land.

use crate::entities::stock_movement::{self, MovementKind};
use crate::errors::ServiceError;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use uuid::Uuid;

/// Input for one ledger entry.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub kind: MovementKind,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub inventory_id: Uuid,
    pub variant_sku: Option<String>,
    pub quantity_change: i32,
    pub quantity_after: i32,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub reference_id: Option<Uuid>,
    pub owner: Option<Uuid>,
    pub created_by: Option<String>,
}

pub async fn append<C: ConnectionTrait>(
    db: &C,
    entry: NewMovement,
) -> Result<stock_movement::Model, ServiceError> {
    let movement = stock_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        movement_type: Set(entry.kind.as_str().to_string()),
        product_id: Set(entry.product_id),
        location_id: Set(entry.location_id),
        inventory_id: Set(entry.inventory_id),
        variant_sku: Set(entry.variant_sku),
        quantity_change: Set(entry.quantity_change),
        quantity_after: Set(entry.quantity_after),
        reason: Set(entry.reason),
        notes: Set(entry.notes),
        reference_id: Set(entry.reference_id),
        owner: Set(entry.owner),
        created_by: Set(entry.created_by),
        created_at: Set(Utc::now()),
    };

    movement
        .insert(db)
        .await
        .map_err(ServiceError::DatabaseError)
}
