mod common;

use assert_matches::assert_matches;
use common::{seed_location, seed_product, setup};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use stockledger_api::{
    commands::stock::{InitializeStockCommand, SetStockLevelCommand, TransferStockCommand},
    entities::{
        inventory_record::{self, Entity as InventoryRecord},
        product::InventoryType,
        stock_movement::{Entity as StockMovement, MovementKind},
    },
    errors::ServiceError,
    tenant::TenantContext,
};
use uuid::Uuid;

fn transfer(
    product_id: Uuid,
    from: Uuid,
    to: Uuid,
    amount: i32,
) -> TransferStockCommand {
    TransferStockCommand {
        ctx: TenantContext::Global,
        product_id,
        from_location_id: from,
        to_location_id: to,
        variant_sku: None,
        amount,
        notes: None,
        reference_id: None,
        created_by: None,
    }
}

async fn record_at(
    db: &sea_orm::DatabaseConnection,
    product_id: Uuid,
    location_id: Uuid,
) -> Option<inventory_record::Model> {
    InventoryRecord::find()
        .filter(inventory_record::Column::ProductId.eq(product_id))
        .filter(inventory_record::Column::LocationId.eq(location_id))
        .one(db)
        .await
        .unwrap()
}

#[tokio::test]
async fn transfer_conserves_units_and_lazily_creates_destination() {
    let app = setup().await;
    let product = seed_product(&app.db, "Widget", "WID-1", InventoryType::Simple, None, None).await;
    let l1 = seed_location(&app.db, "L1", None).await;
    let l2 = seed_location(&app.db, "L2", None).await;

    app.stock
        .initialize_stock(InitializeStockCommand {
            ctx: TenantContext::Global,
            product_id: product.id,
            location_id: l1.id,
            initial_quantity: 6,
            notes: None,
            created_by: None,
        })
        .await
        .unwrap();

    let result = app
        .stock
        .transfer_stock(transfer(product.id, l1.id, l2.id, 3))
        .await
        .expect("transfer failed");

    let source = record_at(&app.db, product.id, l1.id).await.unwrap();
    let destination = record_at(&app.db, product.id, l2.id).await.unwrap();
    assert_eq!(source.quantity, 3);
    assert_eq!(destination.quantity, 3);
    // Conservation: 6 + 0 before == 3 + 3 after.
    assert_eq!(source.quantity + destination.quantity, 6);

    let out = StockMovement::find_by_id(result.transfer_out_movement_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    let into = StockMovement::find_by_id(result.transfer_in_movement_id)
        .one(app.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(out.kind(), Some(MovementKind::TransferOut));
    assert_eq!(out.quantity_change, -3);
    assert_eq!(out.quantity_after, 3);
    assert_eq!(into.kind(), Some(MovementKind::TransferIn));
    assert_eq!(into.quantity_change, 3);
    assert_eq!(into.quantity_after, 3);
    assert_eq!(out.reference_id, into.reference_id);
    assert_eq!(out.reference_id, Some(result.reference_id));
}

#[tokio::test]
async fn transfer_rejects_same_location() {
    let app = setup().await;
    let product = seed_product(&app.db, "Widget", "WID-1", InventoryType::Simple, None, None).await;
    let l1 = seed_location(&app.db, "L1", None).await;

    let err = app
        .stock
        .transfer_stock(transfer(product.id, l1.id, l1.id, 3))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidInput(_));
}

#[tokio::test]
async fn transfer_rejects_insufficient_source_stock() {
    let app = setup().await;
    let product = seed_product(&app.db, "Widget", "WID-1", InventoryType::Simple, None, None).await;
    let l1 = seed_location(&app.db, "L1", None).await;
    let l2 = seed_location(&app.db, "L2", None).await;

    app.stock
        .initialize_stock(InitializeStockCommand {
            ctx: TenantContext::Global,
            product_id: product.id,
            location_id: l1.id,
            initial_quantity: 2,
            notes: None,
            created_by: None,
        })
        .await
        .unwrap();

    let err = app
        .stock
        .transfer_stock(transfer(product.id, l1.id, l2.id, 5))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    // Nothing moved, no destination record created, no ledger entries.
    let source = record_at(&app.db, product.id, l1.id).await.unwrap();
    assert_eq!(source.quantity, 2);
    assert!(record_at(&app.db, product.id, l2.id).await.is_none());
    let movements = StockMovement::find()
        .filter(
            stockledger_api::entities::stock_movement::Column::MovementType
                .eq(MovementKind::TransferOut.as_str()),
        )
        .all(app.db.as_ref())
        .await
        .unwrap();
    assert!(movements.is_empty());
}

#[tokio::test]
async fn transfer_from_unstocked_location_fails_not_found() {
    let app = setup().await;
    let product = seed_product(&app.db, "Widget", "WID-1", InventoryType::Simple, None, None).await;
    let l1 = seed_location(&app.db, "L1", None).await;
    let l2 = seed_location(&app.db, "L2", None).await;

    let err = app
        .stock
        .transfer_stock(transfer(product.id, l1.id, l2.id, 1))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn transfer_moves_variant_and_total_in_lockstep() {
    let app = setup().await;
    let product = seed_product(
        &app.db,
        "Shirt",
        "SHIRT",
        InventoryType::Variation,
        None,
        None,
    )
    .await;
    let l1 = seed_location(&app.db, "L1", None).await;
    let l2 = seed_location(&app.db, "L2", None).await;

    app.stock
        .set_stock_level(SetStockLevelCommand {
            ctx: TenantContext::Global,
            product_id: product.id,
            location_id: l1.id,
            variant_sku: Some("red".to_string()),
            new_quantity: 5,
            reason: "opening balance".to_string(),
            created_by: None,
        })
        .await
        .unwrap();

    // A variation product cannot be transferred without a SKU.
    let err = app
        .stock
        .transfer_stock(transfer(product.id, l1.id, l2.id, 2))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::VariantRequired(_));

    let mut command = transfer(product.id, l1.id, l2.id, 2);
    command.variant_sku = Some("red".to_string());
    app.stock
        .transfer_stock(command)
        .await
        .expect("variant transfer failed");

    let source = record_at(&app.db, product.id, l1.id).await.unwrap();
    let destination = record_at(&app.db, product.id, l2.id).await.unwrap();
    assert_eq!(source.quantity, 3);
    assert_eq!(
        source.variations.as_ref().unwrap().quantity_of("red"),
        Some(3)
    );
    assert_eq!(destination.quantity, 2);
    assert_eq!(
        destination.variations.as_ref().unwrap().quantity_of("red"),
        Some(2)
    );
    // Variant-total consistency holds on both sides.
    assert_eq!(source.variations.as_ref().unwrap().total(), source.quantity);
    assert_eq!(
        destination.variations.as_ref().unwrap().total(),
        destination.quantity
    );
}

#[tokio::test]
async fn transfer_keeps_caller_supplied_reference_id() {
    let app = setup().await;
    let product = seed_product(&app.db, "Widget", "WID-1", InventoryType::Simple, None, None).await;
    let l1 = seed_location(&app.db, "L1", None).await;
    let l2 = seed_location(&app.db, "L2", None).await;

    app.stock
        .initialize_stock(InitializeStockCommand {
            ctx: TenantContext::Global,
            product_id: product.id,
            location_id: l1.id,
            initial_quantity: 4,
            notes: None,
            created_by: None,
        })
        .await
        .unwrap();

    let reference = Uuid::new_v4();
    let mut command = transfer(product.id, l1.id, l2.id, 1);
    command.reference_id = Some(reference);
    let result = app.stock.transfer_stock(command).await.unwrap();
    assert_eq!(result.reference_id, reference);
}
