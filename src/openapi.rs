use utoipa::OpenApi;

use crate::{
    errors::ErrorResponse,
    handlers::{locations, stock},
    queries::stock_queries::{
        InventoryLevelView, LocationStockTotal, MovementView, StockValueSummary, VariantStockView,
    },
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "StockLedger API",
        description = "Multi-tenant inventory ledger and stock movement engine"
    ),
    paths(
        stock::initialize_stock,
        stock::adjust_stock,
        stock::apply_movement,
        stock::transfer_stock,
        stock::set_stock_level,
        stock::product_stock_operation,
        stock::inventory_levels,
        stock::stock_value,
        stock::list_movements,
        stock::latest_movements_for_product,
        stock::movement_history,
        stock::product_stock_total,
        stock::stock_for_sku,
        locations::list_locations,
        locations::create_location,
        locations::locations_with_totals,
        locations::delete_location,
    ),
    components(schemas(
        ErrorResponse,
        VariantStockView,
        InventoryLevelView,
        LocationStockTotal,
        MovementView,
        StockValueSummary,
        stock::InitializeStockRequest,
        stock::AdjustStockRequest,
        stock::ApplyMovementRequest,
        stock::TransferStockRequest,
        stock::SetStockLevelRequest,
        stock::ProductStockOperationRequest,
        stock::InventoryStateResponse,
        stock::InitializeStockResponse,
        stock::AdjustStockResponse,
        stock::ApplyMovementResponse,
        stock::TransferStockResponse,
        stock::StockOperationResponse,
        stock::MovementEntryResponse,
        locations::CreateLocationRequest,
        locations::LocationResponse,
    )),
    tags(
        (name = "stock", description = "Stock operations and reporting"),
        (name = "locations", description = "Storage location management")
    )
)]
pub struct ApiDoc;
