use crate::{
    db::DbPool,
    entities::{inventory_record, location},
    errors::ServiceError,
    events::{Event, EventSender},
    tenant::TenantContext,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Service for managing storage locations.
#[derive(Clone)]
pub struct LocationService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl LocationService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a location owned by the calling tenant. Names are unique
    /// within a tenant.
    #[instrument(skip(self))]
    pub async fn create_location(
        &self,
        ctx: &TenantContext,
        name: &str,
    ) -> Result<location::Model, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::InvalidInput(
                "location name must not be empty".to_string(),
            ));
        }

        let db = self.db_pool.as_ref();
        let duplicate = location::Entity::find()
            .filter(location::Column::Name.eq(name))
            .filter(ctx.scope_condition(location::Column::Owner))
            .one(db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "location name {} already in use",
                name
            )));
        }

        let now = Utc::now();
        let model = location::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            owner: Set(ctx.as_owner()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = model.insert(db).await.map_err(|err| {
            // The unique (owner, name) index backstops the pre-check.
            if matches!(
                err.sql_err(),
                Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
            ) {
                ServiceError::Conflict(format!("location name {} already in use", name))
            } else {
                ServiceError::DatabaseError(err)
            }
        })?;

        info!(location_id = %created.id, name = %created.name, "Location created");
        self.event_sender
            .send(Event::LocationCreated(created.id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_location(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<location::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        let found = location::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Location {} not found", id)))?;
        ctx.ensure_owns(found.owner, "location")?;
        Ok(found)
    }

    #[instrument(skip(self))]
    pub async fn list_locations(
        &self,
        ctx: &TenantContext,
    ) -> Result<Vec<location::Model>, ServiceError> {
        let db = self.db_pool.as_ref();
        location::Entity::find()
            .filter(ctx.scope_condition(location::Column::Owner))
            .order_by_asc(location::Column::Name)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Deletes a location, refused while any inventory record references it.
    #[instrument(skip(self))]
    pub async fn delete_location(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        let found = location::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Location {} not found", id)))?;
        ctx.ensure_owns(found.owner, "location")?;

        let references = inventory_record::Entity::find()
            .filter(inventory_record::Column::LocationId.eq(id))
            .count(db)
            .await?;
        if references > 0 {
            return Err(ServiceError::Conflict(format!(
                "location {} is referenced by {} inventory records",
                id, references
            )));
        }

        found.delete(db).await?;
        info!(location_id = %id, "Location deleted");
        self.event_sender
            .send(Event::LocationDeleted(id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(())
    }
}
