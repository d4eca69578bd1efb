use crate::{
    errors::ServiceError,
    handlers::tenant_from_headers,
    queries::stock_queries::{GetLocationsWithTotalsQuery, LocationStockTotal},
    ApiResponse, AppState,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLocationRequest {
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LocationResponse {
    pub id: Uuid,
    pub name: String,
    pub owner: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<crate::entities::location::Model> for LocationResponse {
    fn from(model: crate::entities::location::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            owner: model.owner,
            created_at: model.created_at,
        }
    }
}

/// Create the locations router
pub fn location_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_locations).post(create_location))
        .route("/totals", get(locations_with_totals))
        .route("/:id", delete(delete_location))
}

/// List the calling tenant's locations
#[utoipa::path(
    get,
    path = "/api/v1/locations",
    responses(
        (status = 200, description = "Locations returned", body = [LocationResponse])
    )
)]
pub async fn list_locations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<LocationResponse>>>, ServiceError> {
    let ctx = tenant_from_headers(&headers)?;
    let locations = state.location_service.list_locations(&ctx).await?;
    Ok(Json(ApiResponse::success(
        locations.into_iter().map(Into::into).collect(),
    )))
}

/// Create a location
#[utoipa::path(
    post,
    path = "/api/v1/locations",
    request_body = CreateLocationRequest,
    responses(
        (status = 201, description = "Location created", body = LocationResponse),
        (status = 409, description = "Location name already in use")
    )
)]
pub async fn create_location(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateLocationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LocationResponse>>), ServiceError> {
    let ctx = tenant_from_headers(&headers)?;
    let created = state
        .location_service
        .create_location(&ctx, &payload.name)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(created.into())),
    ))
}

/// Per-location total stock quantities
#[utoipa::path(
    get,
    path = "/api/v1/locations/totals",
    responses(
        (status = 200, description = "Totals returned", body = [LocationStockTotal])
    )
)]
pub async fn locations_with_totals(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<LocationStockTotal>>>, ServiceError> {
    let ctx = tenant_from_headers(&headers)?;
    let totals = state
        .stock_service
        .locations_with_totals(GetLocationsWithTotalsQuery { ctx })
        .await?;
    Ok(Json(ApiResponse::success(totals)))
}

/// Delete a location with no inventory records
#[utoipa::path(
    delete,
    path = "/api/v1/locations/{id}",
    params(("id" = Uuid, Path, description = "Location id")),
    responses(
        (status = 200, description = "Location deleted"),
        (status = 409, description = "Location still referenced by inventory")
    )
)]
pub async fn delete_location(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    let ctx = tenant_from_headers(&headers)?;
    state.location_service.delete_location(&ctx, id).await?;
    Ok(Json(ApiResponse::message_only("location deleted")))
}
