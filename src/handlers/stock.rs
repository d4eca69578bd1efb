use crate::{
    commands::stock::{
        AdjustStockCommand, ApplyMovementCommand, InitializeStockCommand,
        ProductStockOperationCommand, SetStockLevelCommand, StockOperation, TransferStockCommand,
    },
    entities::{inventory_record, stock_movement, stock_movement::MovementKind},
    errors::ServiceError,
    handlers::{actor_from_headers, tenant_from_headers},
    queries::stock_queries::{
        GetInventoryLevelsQuery, GetLatestMovementsForProductQuery, GetMovementHistoryQuery,
        GetMovementsQuery, GetProductStockTotalQuery, GetStockForSkuQuery, GetStockValueQuery,
        InventoryLevelView, MovementView, StockValueSummary, VariantStockView,
    },
    ApiResponse, AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Request / response DTOs

#[derive(Debug, Deserialize, ToSchema)]
pub struct InitializeStockRequest {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub initial_quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustStockRequest {
    pub variant_sku: Option<String>,
    pub new_quantity: i32,
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyMovementRequest {
    pub variant_sku: Option<String>,
    pub quantity_change: i32,
    /// ADD, REMOVE or ADJUSTMENT; defaults to ADJUSTMENT
    pub kind: Option<String>,
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferStockRequest {
    pub product_id: Uuid,
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    pub variant_sku: Option<String>,
    pub amount: i32,
    pub notes: Option<String>,
    pub reference_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetStockLevelRequest {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub variant_sku: Option<String>,
    pub new_quantity: i32,
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductStockOperationRequest {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub variant_sku: Option<String>,
    /// ADD, REMOVE or ADJUSTMENT
    pub operation: String,
    pub amount: i32,
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LevelsFilter {
    pub product_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MovementsFilter {
    pub product_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub inventory_id: Option<Uuid>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LimitFilter {
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryStateResponse {
    pub inventory_id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub quantity: i32,
    pub variations: Option<Vec<VariantStockView>>,
}

impl From<inventory_record::Model> for InventoryStateResponse {
    fn from(model: inventory_record::Model) -> Self {
        Self {
            inventory_id: model.id,
            product_id: model.product_id,
            location_id: model.location_id,
            quantity: model.quantity,
            variations: model.variations.as_ref().map(Into::into),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InitializeStockResponse {
    pub inventory_id: Uuid,
    pub movement_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdjustStockResponse {
    pub movement_id: Uuid,
    pub quantity_change: i32,
    pub quantity_after: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApplyMovementResponse {
    pub movement_id: Uuid,
    pub quantity_after: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferStockResponse {
    pub transfer_out_movement_id: Uuid,
    pub transfer_in_movement_id: Uuid,
    pub reference_id: Uuid,
    pub source_quantity: i32,
    pub destination_quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockOperationResponse {
    pub inventory: InventoryStateResponse,
    pub movement_id: Uuid,
    pub quantity_change: i32,
    pub quantity_after: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovementEntryResponse {
    pub movement_id: Uuid,
    pub movement_type: String,
    pub variant_sku: Option<String>,
    pub quantity_change: i32,
    pub quantity_after: i32,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub reference_id: Option<Uuid>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<stock_movement::Model> for MovementEntryResponse {
    fn from(model: stock_movement::Model) -> Self {
        Self {
            movement_id: model.id,
            movement_type: model.movement_type,
            variant_sku: model.variant_sku,
            quantity_change: model.quantity_change,
            quantity_after: model.quantity_after,
            reason: model.reason,
            notes: model.notes,
            reference_id: model.reference_id,
            created_by: model.created_by,
            created_at: model.created_at,
        }
    }
}

fn parse_operation(raw: &str) -> Result<StockOperation, ServiceError> {
    StockOperation::from_str(raw).ok_or_else(|| {
        ServiceError::InvalidInput(format!(
            "unknown stock operation {} (expected ADD, REMOVE or ADJUSTMENT)",
            raw
        ))
    })
}

fn parse_kind(raw: Option<&str>) -> Result<Option<MovementKind>, ServiceError> {
    raw.map(|value| {
        MovementKind::from_str(value)
            .ok_or_else(|| ServiceError::InvalidInput(format!("unknown movement kind {}", value)))
    })
    .transpose()
}

// ---------------------------------------------------------------------------
// Routers

/// Stock operation + reporting routes
pub fn stock_router() -> Router<AppState> {
    Router::new()
        .route("/initialize", post(initialize_stock))
        .route("/transfer", post(transfer_stock))
        .route("/set-level", post(set_stock_level))
        .route("/operation", post(product_stock_operation))
        .route("/levels", get(inventory_levels))
        .route("/value", get(stock_value))
        .route("/movements", get(list_movements))
}

/// Routes addressed by inventory record id
pub fn inventory_router() -> Router<AppState> {
    Router::new()
        .route("/:id/adjust", post(adjust_stock))
        .route("/:id/movements", post(apply_movement))
        .route("/:id/history", get(movement_history))
}

/// Product-scoped read routes
pub fn product_router() -> Router<AppState> {
    Router::new()
        .route("/:id/movements", get(latest_movements_for_product))
        .route("/:id/total", get(product_stock_total))
        .route("/:id/sku/:sku", get(stock_for_sku))
}

// ---------------------------------------------------------------------------
// Write handlers

/// Initialize stock for a product at a location
#[utoipa::path(
    post,
    path = "/api/v1/stock/initialize",
    request_body = InitializeStockRequest,
    responses(
        (status = 201, description = "Stock initialized", body = InitializeStockResponse),
        (status = 409, description = "Pair already initialized")
    )
)]
pub async fn initialize_stock(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<InitializeStockRequest>,
) -> Result<(StatusCode, Json<ApiResponse<InitializeStockResponse>>), ServiceError> {
    let ctx = tenant_from_headers(&headers)?;
    let result = state
        .stock_service
        .initialize_stock(InitializeStockCommand {
            ctx,
            product_id: payload.product_id,
            location_id: payload.location_id,
            initial_quantity: payload.initial_quantity,
            notes: payload.notes,
            created_by: actor_from_headers(&headers),
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(InitializeStockResponse {
            inventory_id: result.inventory_id,
            movement_id: result.movement_id,
            quantity: result.quantity,
        })),
    ))
}

/// Adjust an inventory record to an absolute quantity
#[utoipa::path(
    post,
    path = "/api/v1/inventory/{id}/adjust",
    params(("id" = Uuid, Path, description = "Inventory record id")),
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = AdjustStockResponse)
    )
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustStockRequest>,
) -> Result<Json<ApiResponse<AdjustStockResponse>>, ServiceError> {
    let ctx = tenant_from_headers(&headers)?;
    let result = state
        .stock_service
        .adjust_stock(AdjustStockCommand {
            ctx,
            inventory_id: id,
            variant_sku: payload.variant_sku,
            new_quantity: payload.new_quantity,
            reason: payload.reason,
            notes: payload.notes,
            created_by: actor_from_headers(&headers),
        })
        .await?;
    Ok(Json(ApiResponse::success(AdjustStockResponse {
        movement_id: result.movement_id,
        quantity_change: result.quantity_change,
        quantity_after: result.quantity_after,
    })))
}

/// Apply a signed quantity change to an inventory record
#[utoipa::path(
    post,
    path = "/api/v1/inventory/{id}/movements",
    params(("id" = Uuid, Path, description = "Inventory record id")),
    request_body = ApplyMovementRequest,
    responses(
        (status = 200, description = "Movement applied", body = ApplyMovementResponse),
        (status = 422, description = "Would drive stock negative")
    )
)]
pub async fn apply_movement(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApplyMovementRequest>,
) -> Result<Json<ApiResponse<ApplyMovementResponse>>, ServiceError> {
    let ctx = tenant_from_headers(&headers)?;
    let kind = parse_kind(payload.kind.as_deref())?;
    let result = state
        .stock_service
        .apply_movement(ApplyMovementCommand {
            ctx,
            inventory_id: id,
            variant_sku: payload.variant_sku,
            quantity_change: payload.quantity_change,
            kind,
            reason: payload.reason,
            notes: payload.notes,
            created_by: actor_from_headers(&headers),
        })
        .await?;
    Ok(Json(ApiResponse::success(ApplyMovementResponse {
        movement_id: result.movement_id,
        quantity_after: result.quantity_after,
    })))
}

/// Transfer stock between two locations
#[utoipa::path(
    post,
    path = "/api/v1/stock/transfer",
    request_body = TransferStockRequest,
    responses(
        (status = 200, description = "Stock transferred", body = TransferStockResponse),
        (status = 422, description = "Insufficient stock at source")
    )
)]
pub async fn transfer_stock(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TransferStockRequest>,
) -> Result<Json<ApiResponse<TransferStockResponse>>, ServiceError> {
    let ctx = tenant_from_headers(&headers)?;
    let result = state
        .stock_service
        .transfer_stock(TransferStockCommand {
            ctx,
            product_id: payload.product_id,
            from_location_id: payload.from_location_id,
            to_location_id: payload.to_location_id,
            variant_sku: payload.variant_sku,
            amount: payload.amount,
            notes: payload.notes,
            reference_id: payload.reference_id,
            created_by: actor_from_headers(&headers),
        })
        .await?;
    Ok(Json(ApiResponse::success(TransferStockResponse {
        transfer_out_movement_id: result.transfer_out_movement_id,
        transfer_in_movement_id: result.transfer_in_movement_id,
        reference_id: result.reference_id,
        source_quantity: result.source_quantity,
        destination_quantity: result.destination_quantity,
    })))
}

/// Set the absolute stock level for a product at a location
#[utoipa::path(
    post,
    path = "/api/v1/stock/set-level",
    request_body = SetStockLevelRequest,
    responses(
        (status = 200, description = "Stock level set", body = StockOperationResponse)
    )
)]
pub async fn set_stock_level(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SetStockLevelRequest>,
) -> Result<Json<ApiResponse<StockOperationResponse>>, ServiceError> {
    let ctx = tenant_from_headers(&headers)?;
    let result = state
        .stock_service
        .set_stock_level(SetStockLevelCommand {
            ctx,
            product_id: payload.product_id,
            location_id: payload.location_id,
            variant_sku: payload.variant_sku,
            new_quantity: payload.new_quantity,
            reason: payload.reason,
            created_by: actor_from_headers(&headers),
        })
        .await?;
    Ok(Json(ApiResponse::success(StockOperationResponse {
        movement_id: result.movement_id,
        quantity_change: result.quantity_change,
        quantity_after: payload.new_quantity,
        inventory: result.inventory.into(),
    })))
}

/// Add, remove or adjust stock addressed by product and location
#[utoipa::path(
    post,
    path = "/api/v1/stock/operation",
    request_body = ProductStockOperationRequest,
    responses(
        (status = 200, description = "Operation applied", body = StockOperationResponse),
        (status = 404, description = "Removal from a never-stocked variant")
    )
)]
pub async fn product_stock_operation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ProductStockOperationRequest>,
) -> Result<Json<ApiResponse<StockOperationResponse>>, ServiceError> {
    let ctx = tenant_from_headers(&headers)?;
    let operation = parse_operation(&payload.operation)?;
    let result = state
        .stock_service
        .product_stock_operation(ProductStockOperationCommand {
            ctx,
            product_id: payload.product_id,
            location_id: payload.location_id,
            variant_sku: payload.variant_sku,
            operation,
            amount: payload.amount,
            reason: payload.reason,
            notes: payload.notes,
            created_by: actor_from_headers(&headers),
        })
        .await?;
    Ok(Json(ApiResponse::success(StockOperationResponse {
        movement_id: result.movement_id,
        quantity_change: result.quantity_change,
        quantity_after: result.quantity_after,
        inventory: result.inventory.into(),
    })))
}

// ---------------------------------------------------------------------------
// Read handlers

/// Current inventory levels, optionally filtered by product or location
#[utoipa::path(
    get,
    path = "/api/v1/stock/levels",
    params(LevelsFilter),
    responses(
        (status = 200, description = "Levels returned", body = [InventoryLevelView])
    )
)]
pub async fn inventory_levels(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<LevelsFilter>,
) -> Result<Json<ApiResponse<Vec<InventoryLevelView>>>, ServiceError> {
    let ctx = tenant_from_headers(&headers)?;
    let levels = state
        .stock_service
        .inventory_levels(GetInventoryLevelsQuery {
            ctx,
            product_id: filter.product_id,
            location_id: filter.location_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(levels)))
}

/// Total stock value across the tenant's inventory
#[utoipa::path(
    get,
    path = "/api/v1/stock/value",
    responses(
        (status = 200, description = "Valuation returned", body = StockValueSummary)
    )
)]
pub async fn stock_value(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<StockValueSummary>>, ServiceError> {
    let ctx = tenant_from_headers(&headers)?;
    let summary = state
        .stock_service
        .stock_value(GetStockValueQuery { ctx })
        .await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// Recent stock movements, newest first
#[utoipa::path(
    get,
    path = "/api/v1/stock/movements",
    params(MovementsFilter),
    responses(
        (status = 200, description = "Movements returned", body = [MovementView])
    )
)]
pub async fn list_movements(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<MovementsFilter>,
) -> Result<Json<ApiResponse<Vec<MovementView>>>, ServiceError> {
    let ctx = tenant_from_headers(&headers)?;
    let movements = state
        .stock_service
        .movements(GetMovementsQuery {
            ctx,
            product_id: filter.product_id,
            location_id: filter.location_id,
            inventory_id: filter.inventory_id,
            limit: filter.limit,
        })
        .await?;
    Ok(Json(ApiResponse::success(movements)))
}

/// Latest movements for one product, newest first
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/movements",
    params(("id" = Uuid, Path, description = "Product id"), LimitFilter),
    responses(
        (status = 200, description = "Movements returned", body = [MovementView])
    )
)]
pub async fn latest_movements_for_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Query(filter): Query<LimitFilter>,
) -> Result<Json<ApiResponse<Vec<MovementView>>>, ServiceError> {
    let ctx = tenant_from_headers(&headers)?;
    let movements = state
        .stock_service
        .latest_movements_for_product(GetLatestMovementsForProductQuery {
            ctx,
            product_id: id,
            limit: filter.limit,
        })
        .await?;
    Ok(Json(ApiResponse::success(movements)))
}

/// Chronological movement history for one inventory record
#[utoipa::path(
    get,
    path = "/api/v1/inventory/{id}/history",
    params(("id" = Uuid, Path, description = "Inventory record id")),
    responses(
        (status = 200, description = "History returned", body = [MovementEntryResponse])
    )
)]
pub async fn movement_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<MovementEntryResponse>>>, ServiceError> {
    let ctx = tenant_from_headers(&headers)?;
    let history = state
        .stock_service
        .movement_history(GetMovementHistoryQuery {
            ctx,
            inventory_id: id,
        })
        .await?;
    Ok(Json(ApiResponse::success(
        history.into_iter().map(Into::into).collect(),
    )))
}

/// Total stock of a product across the tenant's locations
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/total",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Total returned", body = i64)
    )
)]
pub async fn product_stock_total(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<i64>>, ServiceError> {
    let ctx = tenant_from_headers(&headers)?;
    let total = state
        .stock_service
        .product_stock_total(GetProductStockTotalQuery {
            ctx,
            product_id: id,
        })
        .await?;
    Ok(Json(ApiResponse::success(total)))
}

/// Stock on hand for one SKU of a product
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/sku/{sku}",
    params(
        ("id" = Uuid, Path, description = "Product id"),
        ("sku" = String, Path, description = "Variant or product SKU")
    ),
    responses(
        (status = 200, description = "Quantity returned", body = i64)
    )
)]
pub async fn stock_for_sku(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, sku)): Path<(Uuid, String)>,
) -> Result<Json<ApiResponse<i64>>, ServiceError> {
    let ctx = tenant_from_headers(&headers)?;
    let total = state
        .stock_service
        .stock_for_sku(GetStockForSkuQuery {
            ctx,
            product_id: id,
            sku,
        })
        .await?;
    Ok(Json(ApiResponse::success(total)))
}
