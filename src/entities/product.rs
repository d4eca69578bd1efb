use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a product tracks stock: a single implicit SKU, or one quantity
/// bucket per variant SKU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryType {
    Simple,
    Variation,
}

impl InventoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryType::Simple => "simple",
            InventoryType::Variation => "variation",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "simple" => Some(InventoryType::Simple),
            "variation" => Some(InventoryType::Variation),
            _ => None,
        }
    }
}

/// Catalog read-model. Products are owned by the external catalog subsystem;
/// the engine only reads the fields it needs for variant rules and valuation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub inventory_type: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub retail_price: Option<Decimal>,
    pub owner: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn inventory_type(&self) -> InventoryType {
        InventoryType::from_str(&self.inventory_type).unwrap_or(InventoryType::Simple)
    }

    pub fn is_variation(&self) -> bool {
        self.inventory_type() == InventoryType::Variation
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_record::Entity")]
    InventoryRecords,
    #[sea_orm(has_many = "super::stock_movement::Entity")]
    StockMovements,
}

impl Related<super::inventory_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryRecords.def()
    }
}

impl Related<super::stock_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockMovements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
