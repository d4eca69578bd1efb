mod common;

use common::{seed_location, seed_product, setup};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stockledger_api::{
    commands::stock::{
        InitializeStockCommand, ProductStockOperationCommand, SetStockLevelCommand,
        StockOperation, TransferStockCommand,
    },
    entities::{product::InventoryType, stock_movement::MovementKind},
    queries::stock_queries::{
        GetLatestMovementsForProductQuery, GetLocationsWithTotalsQuery, GetMovementHistoryQuery,
        GetProductStockTotalQuery, GetStockForSkuQuery, GetStockValueQuery,
    },
    tenant::TenantContext,
};
use uuid::Uuid;

fn initialize(product_id: Uuid, location_id: Uuid, quantity: i32) -> InitializeStockCommand {
    InitializeStockCommand {
        ctx: TenantContext::Global,
        product_id,
        location_id,
        initial_quantity: quantity,
        notes: None,
        created_by: None,
    }
}

#[tokio::test]
async fn location_totals_cover_empty_locations() {
    let app = setup().await;
    let product = seed_product(&app.db, "Widget", "WID-1", InventoryType::Simple, None, None).await;
    let l1 = seed_location(&app.db, "Alpha", None).await;
    let l2 = seed_location(&app.db, "Beta", None).await;
    seed_location(&app.db, "Gamma", None).await;

    app.stock
        .initialize_stock(initialize(product.id, l1.id, 10))
        .await
        .unwrap();
    app.stock
        .initialize_stock(initialize(product.id, l2.id, 4))
        .await
        .unwrap();

    let totals = app
        .stock
        .locations_with_totals(GetLocationsWithTotalsQuery {
            ctx: TenantContext::Global,
        })
        .await
        .unwrap();

    assert_eq!(totals.len(), 3);
    assert_eq!(totals[0].name, "Alpha");
    assert_eq!(totals[0].total_quantity, 10);
    assert_eq!(totals[1].name, "Beta");
    assert_eq!(totals[1].total_quantity, 4);
    // A location with no inventory reports zero rather than disappearing.
    assert_eq!(totals[2].name, "Gamma");
    assert_eq!(totals[2].total_quantity, 0);
}

#[tokio::test]
async fn product_total_spans_locations() {
    let app = setup().await;
    let product = seed_product(&app.db, "Widget", "WID-1", InventoryType::Simple, None, None).await;
    let l1 = seed_location(&app.db, "Alpha", None).await;
    let l2 = seed_location(&app.db, "Beta", None).await;

    app.stock
        .initialize_stock(initialize(product.id, l1.id, 10))
        .await
        .unwrap();
    app.stock
        .transfer_stock(TransferStockCommand {
            ctx: TenantContext::Global,
            product_id: product.id,
            from_location_id: l1.id,
            to_location_id: l2.id,
            variant_sku: None,
            amount: 3,
            notes: None,
            reference_id: None,
            created_by: None,
        })
        .await
        .unwrap();

    let total = app
        .stock
        .product_stock_total(GetProductStockTotalQuery {
            ctx: TenantContext::Global,
            product_id: product.id,
        })
        .await
        .unwrap();
    // Transfers conserve the product total.
    assert_eq!(total, 10);
}

#[tokio::test]
async fn stock_value_treats_missing_prices_as_zero() {
    let app = setup().await;
    let priced = seed_product(
        &app.db,
        "Widget",
        "WID-1",
        InventoryType::Simple,
        Some(dec!(2.50)),
        None,
    )
    .await;
    let unpriced =
        seed_product(&app.db, "Gadget", "GAD-1", InventoryType::Simple, None, None).await;
    let location = seed_location(&app.db, "Main", None).await;

    app.stock
        .initialize_stock(initialize(priced.id, location.id, 4))
        .await
        .unwrap();
    app.stock
        .initialize_stock(initialize(unpriced.id, location.id, 100))
        .await
        .unwrap();

    let summary = app
        .stock
        .stock_value(GetStockValueQuery {
            ctx: TenantContext::Global,
        })
        .await
        .unwrap();

    assert_eq!(summary.total_value, dec!(10.00));
    assert_eq!(summary.total_units, 104);
    assert_eq!(summary.records, 2);
}

#[tokio::test]
async fn movement_history_is_chronological_and_latest_view_is_reversed() {
    let app = setup().await;
    let product = seed_product(&app.db, "Widget", "WID-1", InventoryType::Simple, None, None).await;
    let location = seed_location(&app.db, "Main", None).await;

    let init = app
        .stock
        .initialize_stock(initialize(product.id, location.id, 10))
        .await
        .unwrap();
    app.stock
        .product_stock_operation(ProductStockOperationCommand {
            ctx: TenantContext::Global,
            product_id: product.id,
            location_id: location.id,
            variant_sku: None,
            operation: StockOperation::Remove,
            amount: 4,
            reason: "damage".to_string(),
            notes: None,
            created_by: None,
        })
        .await
        .unwrap();
    app.stock
        .product_stock_operation(ProductStockOperationCommand {
            ctx: TenantContext::Global,
            product_id: product.id,
            location_id: location.id,
            variant_sku: None,
            operation: StockOperation::Add,
            amount: 1,
            reason: "found".to_string(),
            notes: None,
            created_by: None,
        })
        .await
        .unwrap();

    let history = app
        .stock
        .movement_history(GetMovementHistoryQuery {
            ctx: TenantContext::Global,
            inventory_id: init.inventory_id,
        })
        .await
        .unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].kind(), Some(MovementKind::Initial));
    assert_eq!(history[1].kind(), Some(MovementKind::Remove));
    assert_eq!(history[2].kind(), Some(MovementKind::Add));
    assert_eq!(
        history.iter().map(|m| m.quantity_after).collect::<Vec<_>>(),
        vec![10, 6, 7]
    );

    let latest = app
        .stock
        .latest_movements_for_product(GetLatestMovementsForProductQuery {
            ctx: TenantContext::Global,
            product_id: product.id,
            limit: Some(2),
        })
        .await
        .unwrap();
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].movement_type, MovementKind::Add.as_str());
    assert_eq!(latest[1].movement_type, MovementKind::Remove.as_str());
    assert_eq!(latest[0].product_name.as_deref(), Some("Widget"));
    assert_eq!(latest[0].location_name.as_deref(), Some("Main"));
}

#[tokio::test]
async fn read_views_are_idempotent() {
    let app = setup().await;
    let product = seed_product(
        &app.db,
        "Widget",
        "WID-1",
        InventoryType::Simple,
        Some(Decimal::ONE),
        None,
    )
    .await;
    let location = seed_location(&app.db, "Main", None).await;
    app.stock
        .initialize_stock(initialize(product.id, location.id, 9))
        .await
        .unwrap();

    let first = app
        .stock
        .stock_value(GetStockValueQuery {
            ctx: TenantContext::Global,
        })
        .await
        .unwrap();
    let second = app
        .stock
        .stock_value(GetStockValueQuery {
            ctx: TenantContext::Global,
        })
        .await
        .unwrap();
    assert_eq!(first.total_value, second.total_value);
    assert_eq!(first.total_units, second.total_units);

    let totals_first = app
        .stock
        .locations_with_totals(GetLocationsWithTotalsQuery {
            ctx: TenantContext::Global,
        })
        .await
        .unwrap();
    let totals_second = app
        .stock
        .locations_with_totals(GetLocationsWithTotalsQuery {
            ctx: TenantContext::Global,
        })
        .await
        .unwrap();
    assert_eq!(totals_first.len(), totals_second.len());
    for (a, b) in totals_first.iter().zip(totals_second.iter()) {
        assert_eq!(a.location_id, b.location_id);
        assert_eq!(a.total_quantity, b.total_quantity);
    }
}

#[tokio::test]
async fn stock_for_sku_reads_variant_buckets_and_simple_totals() {
    let app = setup().await;
    let shirt = seed_product(
        &app.db,
        "Shirt",
        "SHIRT",
        InventoryType::Variation,
        None,
        None,
    )
    .await;
    let widget =
        seed_product(&app.db, "Widget", "WID-1", InventoryType::Simple, None, None).await;
    let l1 = seed_location(&app.db, "Alpha", None).await;
    let l2 = seed_location(&app.db, "Beta", None).await;

    for (location_id, quantity) in [(l1.id, 5), (l2.id, 2)] {
        app.stock
            .set_stock_level(SetStockLevelCommand {
                ctx: TenantContext::Global,
                product_id: shirt.id,
                location_id,
                variant_sku: Some("red".to_string()),
                new_quantity: quantity,
                reason: "seed".to_string(),
                created_by: None,
            })
            .await
            .unwrap();
    }
    app.stock
        .initialize_stock(initialize(widget.id, l1.id, 7))
        .await
        .unwrap();

    let red = app
        .stock
        .stock_for_sku(GetStockForSkuQuery {
            ctx: TenantContext::Global,
            product_id: shirt.id,
            sku: "red".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(red, 7);

    let missing = app
        .stock
        .stock_for_sku(GetStockForSkuQuery {
            ctx: TenantContext::Global,
            product_id: shirt.id,
            sku: "green".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(missing, 0);

    let simple = app
        .stock
        .stock_for_sku(GetStockForSkuQuery {
            ctx: TenantContext::Global,
            product_id: widget.id,
            sku: "WID-1".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(simple, 7);
}
