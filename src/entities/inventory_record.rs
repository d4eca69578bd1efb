use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Quantity bucket for one variant SKU.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantStock {
    pub sku: String,
    pub quantity: i32,
}

/// Embedded per-variant quantities for variation products. The record total
/// must always equal the sum over this list.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult,
)]
pub struct VariantStockList(pub Vec<VariantStock>);

impl VariantStockList {
    pub fn quantity_of(&self, sku: &str) -> Option<i32> {
        self.0.iter().find(|v| v.sku == sku).map(|v| v.quantity)
    }

    pub fn contains(&self, sku: &str) -> bool {
        self.0.iter().any(|v| v.sku == sku)
    }

    /// Inserts or overwrites the bucket for `sku`.
    pub fn set(&mut self, sku: &str, quantity: i32) {
        match self.0.iter_mut().find(|v| v.sku == sku) {
            Some(entry) => entry.quantity = quantity,
            None => self.0.push(VariantStock {
                sku: sku.to_string(),
                quantity,
            }),
        }
    }

    pub fn total(&self) -> i32 {
        self.0.iter().map(|v| v.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Current-state projection of the movement ledger, keyed uniquely on
/// (product_id, location_id). `variations` is `Some` exactly when the product
/// tracks per-variant stock. `version` backs the optimistic write guard.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub owner: Option<Uuid>,
    pub quantity: i32,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub variations: Option<VariantStockList>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// True when this record tracks per-variant quantities.
    pub fn is_variation(&self) -> bool {
        self.variations.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::LocationId",
        to = "super::location::Column::Id"
    )]
    Location,
    #[sea_orm(has_many = "super::stock_movement::Entity")]
    StockMovements,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl Related<super::stock_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockMovements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_list_set_and_total() {
        let mut list = VariantStockList::default();
        list.set("red", 5);
        list.set("blue", 2);
        assert_eq!(list.total(), 7);
        assert_eq!(list.quantity_of("red"), Some(5));

        list.set("red", 3);
        assert_eq!(list.total(), 5);
        assert_eq!(list.0.len(), 2);
        assert!(!list.contains("green"));
    }
}
