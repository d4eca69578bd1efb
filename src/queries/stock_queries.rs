//! Read-only reporting views over the inventory store and the movement
//! ledger. Queries never mutate state, and repeated executions with no
//! intervening writes return identical results. Joins against product and
//! location metadata are null-tolerant: a row deleted out-of-band shows up
//! as a missing name, not as an error.

use crate::{
    entities::{
        inventory_record::{self, VariantStockList},
        location, product,
        stock_movement::{self, Entity as StockMovement},
    },
    errors::ServiceError,
    tenant::TenantContext,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;
use uuid::Uuid;

const DEFAULT_MOVEMENT_LIMIT: u64 = 50;
const MAX_MOVEMENT_LIMIT: u64 = 500;

#[async_trait]
pub trait Query: Send + Sync {
    type Result: Send + Sync;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError>;
}

fn clamp_limit(limit: Option<u64>) -> u64 {
    limit.unwrap_or(DEFAULT_MOVEMENT_LIMIT).clamp(1, MAX_MOVEMENT_LIMIT)
}

/// Per-variant quantity as exposed by the read views.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VariantStockView {
    pub sku: String,
    pub quantity: i32,
}

impl From<&VariantStockList> for Vec<VariantStockView> {
    fn from(list: &VariantStockList) -> Self {
        list.0
            .iter()
            .map(|v| VariantStockView {
                sku: v.sku.clone(),
                quantity: v.quantity,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Locations with totals

#[derive(Debug, Serialize, ToSchema)]
pub struct LocationStockTotal {
    pub location_id: Uuid,
    pub name: String,
    pub total_quantity: i64,
}

#[derive(Debug, Clone)]
pub struct GetLocationsWithTotalsQuery {
    pub ctx: TenantContext,
}

#[async_trait]
impl Query for GetLocationsWithTotalsQuery {
    type Result = Vec<LocationStockTotal>;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let rows: Vec<(Uuid, String, Option<i64>)> = location::Entity::find()
            .left_join(inventory_record::Entity)
            .select_only()
            .column(location::Column::Id)
            .column(location::Column::Name)
            .column_as(inventory_record::Column::Quantity.sum(), "total_quantity")
            .filter(self.ctx.scope_condition(location::Column::Owner))
            .group_by(location::Column::Id)
            .group_by(location::Column::Name)
            .order_by_asc(location::Column::Name)
            .into_tuple()
            .all(db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(location_id, name, total)| LocationStockTotal {
                location_id,
                name,
                total_quantity: total.unwrap_or(0),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Inventory levels

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryLevelView {
    pub inventory_id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub location_id: Uuid,
    pub location_name: Option<String>,
    pub quantity: i32,
    pub variations: Option<Vec<VariantStockView>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct GetInventoryLevelsQuery {
    pub ctx: TenantContext,
    pub product_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

#[async_trait]
impl Query for GetInventoryLevelsQuery {
    type Result = Vec<InventoryLevelView>;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let mut select = inventory_record::Entity::find()
            .filter(self.ctx.scope_condition(inventory_record::Column::Owner));
        if let Some(product_id) = self.product_id {
            select = select.filter(inventory_record::Column::ProductId.eq(product_id));
        }
        if let Some(location_id) = self.location_id {
            select = select.filter(inventory_record::Column::LocationId.eq(location_id));
        }
        let records = select
            .order_by_desc(inventory_record::Column::UpdatedAt)
            .all(db)
            .await?;

        let product_names = product_name_map(
            db,
            records.iter().map(|r| r.product_id).collect(),
        )
        .await?;
        let location_names = location_name_map(
            db,
            records.iter().map(|r| r.location_id).collect(),
        )
        .await?;

        Ok(records
            .into_iter()
            .map(|record| InventoryLevelView {
                inventory_id: record.id,
                product_id: record.product_id,
                product_name: product_names.get(&record.product_id).cloned(),
                location_id: record.location_id,
                location_name: location_names.get(&record.location_id).cloned(),
                quantity: record.quantity,
                variations: record.variations.as_ref().map(Into::into),
                updated_at: record.updated_at,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Per-product total across a tenant's locations

#[derive(Debug, Clone)]
pub struct GetProductStockTotalQuery {
    pub ctx: TenantContext,
    pub product_id: Uuid,
}

#[async_trait]
impl Query for GetProductStockTotalQuery {
    type Result = i64;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let total: Option<i64> = inventory_record::Entity::find()
            .select_only()
            .column_as(inventory_record::Column::Quantity.sum(), "total")
            .filter(inventory_record::Column::ProductId.eq(self.product_id))
            .filter(self.ctx.scope_condition(inventory_record::Column::Owner))
            .into_tuple()
            .one(db)
            .await?
            .flatten();

        Ok(total.unwrap_or(0))
    }
}

// ---------------------------------------------------------------------------
// Stock valuation

#[derive(Debug, Serialize, ToSchema)]
pub struct StockValueSummary {
    pub total_value: Decimal,
    pub total_units: i64,
    pub records: u64,
}

#[derive(Debug, Clone)]
pub struct GetStockValueQuery {
    pub ctx: TenantContext,
}

#[async_trait]
impl Query for GetStockValueQuery {
    type Result = StockValueSummary;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let records = inventory_record::Entity::find()
            .filter(self.ctx.scope_condition(inventory_record::Column::Owner))
            .all(db)
            .await?;

        let prices: HashMap<Uuid, Decimal> = product::Entity::find()
            .filter(
                product::Column::Id
                    .is_in(records.iter().map(|r| r.product_id).collect::<HashSet<_>>()),
            )
            .all(db)
            .await?
            .into_iter()
            // A product without a price contributes zero to the valuation.
            .filter_map(|p| p.retail_price.map(|price| (p.id, price)))
            .collect();

        let mut total_value = Decimal::ZERO;
        let mut total_units = 0i64;
        for record in &records {
            total_units += record.quantity as i64;
            if let Some(price) = prices.get(&record.product_id) {
                total_value += Decimal::from(record.quantity) * *price;
            }
        }

        Ok(StockValueSummary {
            total_value,
            total_units,
            records: records.len() as u64,
        })
    }
}

// ---------------------------------------------------------------------------
// Movement views

#[derive(Debug, Serialize, ToSchema)]
pub struct MovementView {
    pub movement_id: Uuid,
    pub movement_type: String,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub location_id: Uuid,
    pub location_name: Option<String>,
    pub inventory_id: Uuid,
    pub variant_sku: Option<String>,
    pub quantity_change: i32,
    pub quantity_after: i32,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub reference_id: Option<Uuid>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct GetMovementsQuery {
    pub ctx: TenantContext,
    pub product_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub inventory_id: Option<Uuid>,
    pub limit: Option<u64>,
}

#[async_trait]
impl Query for GetMovementsQuery {
    type Result = Vec<MovementView>;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let mut select = StockMovement::find()
            .filter(self.ctx.scope_condition(stock_movement::Column::Owner));
        if let Some(product_id) = self.product_id {
            select = select.filter(stock_movement::Column::ProductId.eq(product_id));
        }
        if let Some(location_id) = self.location_id {
            select = select.filter(stock_movement::Column::LocationId.eq(location_id));
        }
        if let Some(inventory_id) = self.inventory_id {
            select = select.filter(stock_movement::Column::InventoryId.eq(inventory_id));
        }

        let movements = select
            .order_by_desc(stock_movement::Column::CreatedAt)
            .limit(clamp_limit(self.limit))
            .all(db)
            .await?;

        build_movement_views(db, movements).await
    }
}

/// Latest N ledger entries for one product, newest first.
#[derive(Debug, Clone)]
pub struct GetLatestMovementsForProductQuery {
    pub ctx: TenantContext,
    pub product_id: Uuid,
    pub limit: Option<u64>,
}

#[async_trait]
impl Query for GetLatestMovementsForProductQuery {
    type Result = Vec<MovementView>;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        GetMovementsQuery {
            ctx: self.ctx.clone(),
            product_id: Some(self.product_id),
            location_id: None,
            inventory_id: None,
            limit: self.limit,
        }
        .execute(db)
        .await
    }
}

/// Full chronological history for one inventory record. This is a
/// single-record read path, so the scope guard is a capability check against
/// the record, not just a filter.
#[derive(Debug, Clone)]
pub struct GetMovementHistoryQuery {
    pub ctx: TenantContext,
    pub inventory_id: Uuid,
}

#[async_trait]
impl Query for GetMovementHistoryQuery {
    type Result = Vec<stock_movement::Model>;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let record = inventory_record::Entity::find_by_id(self.inventory_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Inventory record {} not found",
                    self.inventory_id
                ))
            })?;
        self.ctx.ensure_owns(record.owner, "inventory record")?;

        StockMovement::find()
            .filter(stock_movement::Column::InventoryId.eq(self.inventory_id))
            .order_by_asc(stock_movement::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }
}

// ---------------------------------------------------------------------------
// Stock for one SKU

#[derive(Debug, Clone)]
pub struct GetStockForSkuQuery {
    pub ctx: TenantContext,
    pub product_id: Uuid,
    pub sku: String,
}

#[async_trait]
impl Query for GetStockForSkuQuery {
    type Result = i64;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let product = product::Entity::find_by_id(self.product_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", self.product_id))
            })?;

        let records = inventory_record::Entity::find()
            .filter(inventory_record::Column::ProductId.eq(self.product_id))
            .filter(self.ctx.scope_condition(inventory_record::Column::Owner))
            .all(db)
            .await?;

        let total = if product.is_variation() {
            records
                .iter()
                .filter_map(|r| r.variations.as_ref())
                .filter_map(|v| v.quantity_of(&self.sku))
                .map(i64::from)
                .sum()
        } else if product.sku == self.sku {
            records.iter().map(|r| i64::from(r.quantity)).sum()
        } else {
            0
        };

        Ok(total)
    }
}

// ---------------------------------------------------------------------------
// Shared name lookups

async fn product_name_map(
    db: &DatabaseConnection,
    ids: HashSet<Uuid>,
) -> Result<HashMap<Uuid, String>, ServiceError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(product::Entity::find()
        .filter(product::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect())
}

async fn location_name_map(
    db: &DatabaseConnection,
    ids: HashSet<Uuid>,
) -> Result<HashMap<Uuid, String>, ServiceError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(location::Entity::find()
        .filter(location::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|l| (l.id, l.name))
        .collect())
}

async fn build_movement_views(
    db: &DatabaseConnection,
    movements: Vec<stock_movement::Model>,
) -> Result<Vec<MovementView>, ServiceError> {
    let product_names =
        product_name_map(db, movements.iter().map(|m| m.product_id).collect()).await?;
    let location_names =
        location_name_map(db, movements.iter().map(|m| m.location_id).collect()).await?;

    Ok(movements
        .into_iter()
        .map(|m| MovementView {
            movement_id: m.id,
            movement_type: m.movement_type,
            product_id: m.product_id,
            product_name: product_names.get(&m.product_id).cloned(),
            location_id: m.location_id,
            location_name: location_names.get(&m.location_id).cloned(),
            inventory_id: m.inventory_id,
            variant_sku: m.variant_sku,
            quantity_change: m.quantity_change,
            quantity_after: m.quantity_after,
            reason: m.reason,
            notes: m.notes,
            reference_id: m.reference_id,
            created_by: m.created_by,
            created_at: m.created_at,
        })
        .collect())
}
