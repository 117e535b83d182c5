//! Storage primitives for components
//!
//! Connection-scoped functions, called with `&mut *tx` so every access joins
//! the caller's transaction. `adjust_quantity` is the single enforcement
//! point for the `quantity >= 0` invariant: the check and the write happen in
//! one conditional UPDATE, so no interleaving can drive stock negative.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::component::model::{Component, ComponentFilter, CreateComponentInput};
use crate::error::{DomainError, DomainResult};

/// Fetch a component by id
pub async fn get(conn: &mut PgConnection, id: Uuid) -> DomainResult<Option<Component>> {
    let component = sqlx::query_as::<_, Component>("SELECT * FROM components WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(component)
}

/// Fetch a component by id, taking a row lock for the enclosing transaction
pub async fn get_for_update(conn: &mut PgConnection, id: Uuid) -> DomainResult<Option<Component>> {
    let component =
        sqlx::query_as::<_, Component>("SELECT * FROM components WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(component)
}

/// Apply a quantity delta if, and only if, the current quantity is at least
/// `expected_minimum` and the result stays non-negative.
///
/// The condition is evaluated at commit time under the row lock the UPDATE
/// itself takes, so a racing caller observes the already-adjusted value and
/// fails here rather than overdrawing stock.
pub async fn adjust_quantity(
    conn: &mut PgConnection,
    id: Uuid,
    delta: i32,
    expected_minimum: i32,
) -> DomainResult<Component> {
    let updated = sqlx::query_as::<_, Component>(
        r#"
        UPDATE components
        SET quantity = quantity + $2, updated_at = $3
        WHERE id = $1 AND quantity >= $4 AND quantity + $2 >= 0
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(delta)
    .bind(Utc::now())
    .bind(expected_minimum)
    .fetch_optional(&mut *conn)
    .await?;

    match updated {
        Some(component) => Ok(component),
        // Zero rows: either the component is gone or the condition failed.
        None => {
            let current = sqlx::query_as::<_, (i32,)>("SELECT quantity FROM components WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

            match current {
                Some((available,)) => Err(DomainError::InsufficientStock {
                    available,
                    requested: delta.unsigned_abs() as i32,
                }),
                None => Err(DomainError::NotFound(format!("component {}", id))),
            }
        }
    }
}

/// Insert a new component
pub async fn insert(
    conn: &mut PgConnection,
    input: &CreateComponentInput,
    now: DateTime<Utc>,
) -> DomainResult<Component> {
    let component = sqlx::query_as::<_, Component>(
        r#"
        INSERT INTO components (
            id, name, category, quantity, description, image_url, location,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&input.name)
    .bind(&input.category)
    .bind(input.quantity)
    .bind(&input.description)
    .bind(&input.image_url)
    .bind(&input.location)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(component)
}

/// Write back every mutable field of an already-loaded component
pub async fn update(conn: &mut PgConnection, component: &Component) -> DomainResult<Component> {
    let updated = sqlx::query_as::<_, Component>(
        r#"
        UPDATE components
        SET name = $2, category = $3, quantity = $4, description = $5,
            image_url = $6, location = $7, updated_at = $8
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(component.id)
    .bind(&component.name)
    .bind(&component.category)
    .bind(component.quantity)
    .bind(&component.description)
    .bind(&component.image_url)
    .bind(&component.location)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    Ok(updated)
}

/// Delete a component row
pub async fn delete(conn: &mut PgConnection, id: Uuid) -> DomainResult<()> {
    let result = sqlx::query("DELETE FROM components WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DomainError::NotFound(format!("component {}", id)));
    }

    Ok(())
}

/// List components with optional filtering, ordered by name
pub async fn list(conn: &mut PgConnection, filter: &ComponentFilter) -> DomainResult<Vec<Component>> {
    let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
        sqlx::QueryBuilder::new("SELECT * FROM components WHERE 1=1");

    if let Some(category) = &filter.category {
        query_builder.push(" AND category = ");
        query_builder.push_bind(category);
    }
    if let Some(search) = &filter.search {
        query_builder.push(" AND name ILIKE ");
        query_builder.push_bind(format!("%{}%", search));
    }
    if filter.available_only.unwrap_or(false) {
        query_builder.push(" AND quantity > 0");
    }

    query_builder.push(" ORDER BY name");

    let components = query_builder
        .build_query_as::<Component>()
        .fetch_all(&mut *conn)
        .await?;

    Ok(components)
}
