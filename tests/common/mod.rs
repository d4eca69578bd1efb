#![allow(dead_code)]

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use stockledger_api::{
    entities::{location, product, product::InventoryType},
    events::{process_events, EventSender},
    migrator::Migrator,
    services::{locations::LocationService, stock::StockService},
};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Test harness backed by an in-memory SQLite database with the embedded
/// migrations applied. A single pooled connection keeps the database alive
/// for the duration of the test.
pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub stock: StockService,
    pub locations: LocationService,
}

pub async fn setup() -> TestApp {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options.max_connections(1).min_connections(1);

    let db = Database::connect(options)
        .await
        .expect("failed to open in-memory database");
    Migrator::up(&db, None)
        .await
        .expect("failed to run migrations");
    let db = Arc::new(db);

    let (tx, rx) = mpsc::channel(1024);
    tokio::spawn(process_events(rx));
    let event_sender = Arc::new(EventSender::new(tx));

    TestApp {
        db: db.clone(),
        stock: StockService::new(db.clone(), event_sender.clone()),
        locations: LocationService::new(db, event_sender),
    }
}

pub async fn seed_product(
    db: &DatabaseConnection,
    name: &str,
    sku: &str,
    inventory_type: InventoryType,
    retail_price: Option<Decimal>,
    owner: Option<Uuid>,
) -> product::Model {
    let now = Utc::now();
    let model = product::ActiveModel {
        id: Set(Uuid::new_v4()),
        sku: Set(sku.to_string()),
        name: Set(name.to_string()),
        inventory_type: Set(inventory_type.as_str().to_string()),
        retail_price: Set(retail_price),
        owner: Set(owner),
        created_at: Set(now),
        updated_at: Set(now),
    };
    model.insert(db).await.expect("failed to seed product")
}

pub async fn seed_location(
    db: &DatabaseConnection,
    name: &str,
    owner: Option<Uuid>,
) -> location::Model {
    let now = Utc::now();
    let model = location::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        owner: Set(owner),
        created_at: Set(now),
        updated_at: Set(now),
    };
    model.insert(db).await.expect("failed to seed location")
}
