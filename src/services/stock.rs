use crate::{
    commands::{
        stock::{
            AdjustStockCommand, AdjustStockResult, ApplyMovementCommand, ApplyMovementResult,
            InitializeStockCommand, InitializeStockResult, ProductStockOperationCommand,
            ProductStockOperationResult, SetStockLevelCommand, SetStockLevelResult,
            TransferStockCommand, TransferStockResult,
        },
        Command,
    },
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    queries::stock_queries::{
        GetInventoryLevelsQuery, GetLatestMovementsForProductQuery, GetLocationsWithTotalsQuery,
        GetMovementHistoryQuery, GetMovementsQuery, GetProductStockTotalQuery, GetStockForSkuQuery,
        GetStockValueQuery, InventoryLevelView, LocationStockTotal, MovementView, Query,
        StockValueSummary,
    },
};
use std::sync::Arc;

/// Facade over the stock operation commands and reporting queries. The HTTP
/// layer and tests talk to this; all writes go through the command pipeline.
#[derive(Clone)]
pub struct StockService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl StockService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    pub async fn initialize_stock(
        &self,
        command: InitializeStockCommand,
    ) -> Result<InitializeStockResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    pub async fn adjust_stock(
        &self,
        command: AdjustStockCommand,
    ) -> Result<AdjustStockResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    pub async fn apply_movement(
        &self,
        command: ApplyMovementCommand,
    ) -> Result<ApplyMovementResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    pub async fn transfer_stock(
        &self,
        command: TransferStockCommand,
    ) -> Result<TransferStockResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    pub async fn set_stock_level(
        &self,
        command: SetStockLevelCommand,
    ) -> Result<SetStockLevelResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    pub async fn product_stock_operation(
        &self,
        command: ProductStockOperationCommand,
    ) -> Result<ProductStockOperationResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    pub async fn locations_with_totals(
        &self,
        query: GetLocationsWithTotalsQuery,
    ) -> Result<Vec<LocationStockTotal>, ServiceError> {
        query.execute(&self.db_pool).await
    }

    pub async fn inventory_levels(
        &self,
        query: GetInventoryLevelsQuery,
    ) -> Result<Vec<InventoryLevelView>, ServiceError> {
        query.execute(&self.db_pool).await
    }

    pub async fn product_stock_total(
        &self,
        query: GetProductStockTotalQuery,
    ) -> Result<i64, ServiceError> {
        query.execute(&self.db_pool).await
    }

    pub async fn stock_value(
        &self,
        query: GetStockValueQuery,
    ) -> Result<StockValueSummary, ServiceError> {
        query.execute(&self.db_pool).await
    }

    pub async fn movements(
        &self,
        query: GetMovementsQuery,
    ) -> Result<Vec<MovementView>, ServiceError> {
        query.execute(&self.db_pool).await
    }

    pub async fn latest_movements_for_product(
        &self,
        query: GetLatestMovementsForProductQuery,
    ) -> Result<Vec<MovementView>, ServiceError> {
        query.execute(&self.db_pool).await
    }

    pub async fn movement_history(
        &self,
        query: GetMovementHistoryQuery,
    ) -> Result<Vec<crate::entities::stock_movement::Model>, ServiceError> {
        query.execute(&self.db_pool).await
    }

    pub async fn stock_for_sku(&self, query: GetStockForSkuQuery) -> Result<i64, ServiceError> {
        query.execute(&self.db_pool).await
    }
}
