mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use common::{seed_location, seed_product, setup, TestApp};
use serde_json::{json, Value};
use stockledger_api::{app_router, config::AppConfig, entities::product::InventoryType, AppState};
use tower::ServiceExt;
use uuid::Uuid;

async fn router_for(app: &TestApp) -> Router {
    let cfg = AppConfig::new(
        "sqlite::memory:".to_string(),
        "127.0.0.1".to_string(),
        18080,
        "test".to_string(),
    );
    let (tx, rx) = tokio::sync::mpsc::channel(1024);
    tokio::spawn(stockledger_api::events::process_events(rx));
    let state = AppState::new(
        app.db.clone(),
        cfg,
        stockledger_api::events::EventSender::new(tx),
    );
    app_router(state)
}

fn json_request(method: Method, uri: &str, tenant: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(tenant) = tenant {
        builder = builder.header("x-tenant-id", tenant);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn initialize_endpoint_creates_and_conflicts_on_repeat() {
    let app = setup().await;
    let router = router_for(&app).await;
    let product = seed_product(&app.db, "Widget", "WID-1", InventoryType::Simple, None, None).await;
    let location = seed_location(&app.db, "Main", None).await;

    let payload = json!({
        "product_id": product.id,
        "location_id": location.id,
        "initial_quantity": 10
    });

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/stock/initialize",
            None,
            payload.clone(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["quantity"], json!(10));

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/stock/initialize",
            None,
            payload,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn insufficient_stock_maps_to_unprocessable_entity() {
    let app = setup().await;
    let router = router_for(&app).await;
    let product = seed_product(&app.db, "Widget", "WID-1", InventoryType::Simple, None, None).await;
    let location = seed_location(&app.db, "Main", None).await;

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/stock/initialize",
            None,
            json!({
                "product_id": product.id,
                "location_id": location.id,
                "initial_quantity": 2
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/stock/operation",
            None,
            json!({
                "product_id": product.id,
                "location_id": location.id,
                "operation": "REMOVE",
                "amount": 5,
                "reason": "damage"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"], json!("Unprocessable Entity"));
}

#[tokio::test]
async fn tenant_header_scopes_and_denies() {
    let app = setup().await;
    let router = router_for(&app).await;
    let tenant_a = Uuid::new_v4();
    let tenant_b = Uuid::new_v4();
    let product = seed_product(
        &app.db,
        "Widget",
        "WID-1",
        InventoryType::Simple,
        None,
        Some(tenant_a),
    )
    .await;
    let location = seed_location(&app.db, "A-Warehouse", Some(tenant_a)).await;

    // Wrong tenant is denied.
    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/stock/initialize",
            Some(&tenant_b.to_string()),
            json!({
                "product_id": product.id,
                "location_id": location.id,
                "initial_quantity": 1
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Matching tenant succeeds.
    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/stock/initialize",
            Some(&tenant_a.to_string()),
            json!({
                "product_id": product.id,
                "location_id": location.id,
                "initial_quantity": 1
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Malformed tenant header is a caller error.
    let response = router
        .clone()
        .oneshot(json_request(
            Method::GET,
            "/api/v1/locations",
            Some("not-a-uuid"),
            json!(null),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn location_listing_is_tenant_scoped() {
    let app = setup().await;
    let router = router_for(&app).await;
    let tenant_a = Uuid::new_v4();
    seed_location(&app.db, "A-Warehouse", Some(tenant_a)).await;
    seed_location(&app.db, "B-Warehouse", Some(Uuid::new_v4())).await;

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/api/v1/locations")
                .header("x-tenant-id", tenant_a.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], json!("A-Warehouse"));
}
