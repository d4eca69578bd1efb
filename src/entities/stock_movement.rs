use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of ledger entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementKind {
    Initial,
    InitialSet,
    Adjustment,
    Add,
    Remove,
    TransferOut,
    TransferIn,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Initial => "INITIAL",
            MovementKind::InitialSet => "INITIAL_SET",
            MovementKind::Adjustment => "ADJUSTMENT",
            MovementKind::Add => "ADD",
            MovementKind::Remove => "REMOVE",
            MovementKind::TransferOut => "TRANSFER_OUT",
            MovementKind::TransferIn => "TRANSFER_IN",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "INITIAL" => Some(MovementKind::Initial),
            "INITIAL_SET" => Some(MovementKind::InitialSet),
            "ADJUSTMENT" => Some(MovementKind::Adjustment),
            "ADD" => Some(MovementKind::Add),
            "REMOVE" => Some(MovementKind::Remove),
            "TRANSFER_OUT" => Some(MovementKind::TransferOut),
            "TRANSFER_IN" => Some(MovementKind::TransferIn),
            _ => None,
        }
    }
}

/// One immutable ledger entry. Entries are write-once: no update path exists,
/// and the engine appends exactly one entry per logical state transition
/// (two for transfers). `quantity_after` is the variant quantity when
/// `variant_sku` is set, otherwise the location total.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub movement_type: String,
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
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn kind(&self) -> Option<MovementKind> {
        MovementKind::from_str(&self.movement_type)
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
    #[sea_orm(
        belongs_to = "super::inventory_record::Entity",
        from = "Column::InventoryId",
        to = "super::inventory_record::Column::Id"
    )]
    InventoryRecord,
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

impl Related<super::inventory_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryRecord.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
