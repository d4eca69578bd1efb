//! StockLedger API Library
//!
//! Multi-tenant inventory ledger and stock movement engine: current
//! quantities per (product, location) are a projection of an append-only
//! movement ledger, and every quantity change flows through one command
//! pipeline that keeps the two consistent.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod commands;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod queries;
pub mod services;
pub mod tenant;

use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub stock_service: services::stock::StockService,
    pub location_service: services::locations::LocationService,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let event_sender = Arc::new(event_sender);
        let stock_service =
            services::stock::StockService::new(db.clone(), event_sender.clone());
        let location_service =
            services::locations::LocationService::new(db.clone(), event_sender.clone());
        Self {
            db,
            config,
            event_sender,
            stock_service,
            location_service,
        }
    }
}

// Common response wrapper
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// Builds the full application router.
pub fn app_router(state: AppState) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/ready", get(handlers::health::readiness))
        .nest("/api/v1/stock", handlers::stock::stock_router())
        .nest("/api/v1/inventory", handlers::stock::inventory_router())
        .nest("/api/v1/products", handlers::stock::product_router())
        .nest("/api/v1/locations", handlers::locations::location_router())
        .with_state(state)
}
