//! Component service layer - audited CRUD for inventory components
//!
//! Create, update, and delete each run in one transaction that locks the
//! component row and appends the matching audit record, so a plain edit can
//! never interleave with an in-flight reservation transition.

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::audit::{self, ActionKind, EntityRef};
use crate::component::model::{
    Component, ComponentFilter, CreateComponentInput, UpdateComponentInput,
};
use crate::component::store;
use crate::error::{DomainError, DomainResult};

/// Component service for managing the inventory catalogue
#[derive(Clone)]
pub struct ComponentService {
    db_pool: PgPool,
}

impl ComponentService {
    /// Create a new component service instance
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Create a component and record the creation in the ledger
    pub async fn create_component(
        &self,
        actor_id: Uuid,
        input: CreateComponentInput,
    ) -> DomainResult<Component> {
        input.validate()?;

        let mut tx = self.db_pool.begin().await?;

        let component = store::insert(&mut tx, &input, chrono::Utc::now()).await?;

        audit::append(
            &mut tx,
            actor_id,
            ActionKind::Create,
            EntityRef::Component(component.id),
            json!({
                "component_name": component.name,
                "category": component.category,
                "quantity": component.quantity,
                "location": component.location,
            }),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(component_id = %component.id, name = %component.name, "component created");

        Ok(component)
    }

    /// Get a component by id
    pub async fn get_component(&self, id: Uuid) -> DomainResult<Component> {
        let mut conn = self.db_pool.acquire().await?;
        store::get(&mut conn, id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("component {}", id)))
    }

    /// List components with optional filtering
    pub async fn list_components(&self, filter: ComponentFilter) -> DomainResult<Vec<Component>> {
        let mut conn = self.db_pool.acquire().await?;
        store::list(&mut conn, &filter).await
    }

    /// Update a component's catalogue fields, recording old and new values
    pub async fn update_component(
        &self,
        actor_id: Uuid,
        id: Uuid,
        input: UpdateComponentInput,
    ) -> DomainResult<Component> {
        input.validate()?;

        let mut tx = self.db_pool.begin().await?;

        let mut component = store::get_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("component {}", id)))?;

        let old_values = json!({
            "name": component.name,
            "category": component.category,
            "quantity": component.quantity,
            "description": component.description,
            "image_url": component.image_url,
            "location": component.location,
        });

        if let Some(name) = input.name {
            component.name = name;
        }
        if let Some(category) = input.category {
            component.category = category;
        }
        if let Some(quantity) = input.quantity {
            component.quantity = quantity;
        }
        if let Some(description) = input.description {
            component.description = Some(description);
        }
        if let Some(image_url) = input.image_url {
            component.image_url = Some(image_url);
        }
        if let Some(location) = input.location {
            component.location = location;
        }

        let updated = store::update(&mut tx, &component).await?;

        let new_values = json!({
            "name": updated.name,
            "category": updated.category,
            "quantity": updated.quantity,
            "description": updated.description,
            "image_url": updated.image_url,
            "location": updated.location,
        });

        audit::append(
            &mut tx,
            actor_id,
            ActionKind::Update,
            EntityRef::Component(updated.id),
            json!({
                "component_name": updated.name,
                "old_values": old_values,
                "new_values": new_values,
            }),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(component_id = %updated.id, "component updated");

        Ok(updated)
    }

    /// Delete a component
    ///
    /// Refused while any request against the component is non-terminal: a
    /// pending request would dangle and an approved one still holds stock a
    /// return must credit back.
    pub async fn delete_component(&self, actor_id: Uuid, id: Uuid) -> DomainResult<()> {
        let mut tx = self.db_pool.begin().await?;

        let component = store::get_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("component {}", id)))?;

        let (open_requests,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM borrow_requests
            WHERE component_id = $1 AND status IN ('pending', 'approved')
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if open_requests > 0 {
            return Err(DomainError::InvalidState(format!(
                "component has {} unresolved request(s)",
                open_requests
            )));
        }

        audit::append(
            &mut tx,
            actor_id,
            ActionKind::Delete,
            EntityRef::Component(component.id),
            json!({
                "component_name": component.name,
                "category": component.category,
                "quantity": component.quantity,
                "location": component.location,
            }),
        )
        .await?;

        store::delete(&mut tx, id).await?;

        tx.commit().await?;

        tracing::info!(component_id = %id, "component deleted");

        Ok(())
    }
}
