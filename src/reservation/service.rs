//! Reservation coordinator - the transactional boundary for borrow requests
//!
//! Every operation is one transaction spanning the request row, the component
//! row, and the audit insert: all three commit or none do. The request row is
//! locked `FOR UPDATE` before any precondition check, and the inventory delta
//! goes through the conditional update in `component::store`, so two racing
//! approvals serialise on the component row and the loser fails with
//! `InsufficientStock` instead of overdrawing.

use chrono::Utc;
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::audit::{self, EntityRef};
use crate::component::{self, Component};
use crate::error::{DomainError, DomainResult};
use crate::request::{BorrowRequest, CreateRequestInput, RequestFilter, RequestStatus, ReservationAction};

/// Coordinator for the borrow request lifecycle
#[derive(Clone)]
pub struct ReservationService {
    db_pool: PgPool,
}

impl ReservationService {
    /// Create a new reservation service instance
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Create a new borrow request in the Pending state
    ///
    /// The stock check here is the loose early one: it rejects requests that
    /// are impossible right now, but approval re-checks authoritatively.
    pub async fn create_request(
        &self,
        requester_id: Uuid,
        input: CreateRequestInput,
    ) -> DomainResult<BorrowRequest> {
        if input.quantity <= 0 {
            return Err(DomainError::InvalidQuantity(format!(
                "requested quantity must be positive, got {}",
                input.quantity
            )));
        }

        let mut tx = self.db_pool.begin().await?;

        let comp = component::store::get(&mut tx, input.component_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("component {}", input.component_id)))?;

        if comp.quantity == 0 || input.quantity > comp.quantity {
            return Err(DomainError::InsufficientStock {
                available: comp.quantity,
                requested: input.quantity,
            });
        }

        let request = sqlx::query_as::<_, BorrowRequest>(
            r#"
            INSERT INTO borrow_requests (id, requester_id, component_id, quantity, status, requested_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(requester_id)
        .bind(input.component_id)
        .bind(input.quantity)
        .bind(RequestStatus::Pending)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        audit::append(
            &mut tx,
            requester_id,
            audit::ActionKind::Request,
            EntityRef::Request(request.id),
            json!({
                "component_id": comp.id,
                "component_name": comp.name,
                "quantity": request.quantity,
            }),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            request_id = %request.id,
            component_id = %comp.id,
            quantity = request.quantity,
            "borrow request created"
        );

        Ok(request)
    }

    /// Approve a pending request, reserving stock
    ///
    /// The component quantity is re-read and decremented in one conditional
    /// update inside this transaction; the value seen at creation time is
    /// never trusted.
    pub async fn approve_request(
        &self,
        request_id: Uuid,
        approver_id: Uuid,
    ) -> DomainResult<BorrowRequest> {
        let mut tx = self.db_pool.begin().await?;

        let request = load_for_update(&mut tx, request_id).await?;
        let next = request.status.transition(ReservationAction::Approve)?;

        let comp = component::store::adjust_quantity(
            &mut tx,
            request.component_id,
            ReservationAction::Approve.quantity_delta(request.quantity),
            request.quantity,
        )
        .await?;

        let updated = sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET status = $2, processed_at = $3, processed_by = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(request.id)
        .bind(next)
        .bind(Utc::now())
        .bind(approver_id)
        .fetch_one(&mut *tx)
        .await?;

        append_transition_record(
            &mut tx,
            approver_id,
            ReservationAction::Approve,
            &updated,
            &comp,
            json!({
                "previous_component_quantity": comp.quantity + request.quantity,
                "new_component_quantity": comp.quantity,
            }),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            request_id = %updated.id,
            component_id = %comp.id,
            remaining = comp.quantity,
            "borrow request approved"
        );

        Ok(updated)
    }

    /// Reject a pending request
    ///
    /// A pure status change: stock is never consulted and never touched.
    pub async fn reject_request(
        &self,
        request_id: Uuid,
        approver_id: Uuid,
        reason: Option<String>,
    ) -> DomainResult<BorrowRequest> {
        let mut tx = self.db_pool.begin().await?;

        let request = load_for_update(&mut tx, request_id).await?;
        let next = request.status.transition(ReservationAction::Reject)?;

        let updated = sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET status = $2, processed_at = $3, processed_by = $4, rejection_reason = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(request.id)
        .bind(next)
        .bind(Utc::now())
        .bind(approver_id)
        .bind(&reason)
        .fetch_one(&mut *tx)
        .await?;

        let comp = component::store::get(&mut tx, request.component_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("component {}", request.component_id)))?;

        append_transition_record(
            &mut tx,
            approver_id,
            ReservationAction::Reject,
            &updated,
            &comp,
            json!({ "rejection_reason": reason }),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(request_id = %updated.id, "borrow request rejected");

        Ok(updated)
    }

    /// Mark an approved request as returned, restoring stock
    ///
    /// Fenced by `returned_at`: once set, a second return fails before any
    /// mutation happens, even under concurrent invocation.
    pub async fn return_request(
        &self,
        request_id: Uuid,
        processor_id: Uuid,
    ) -> DomainResult<BorrowRequest> {
        let mut tx = self.db_pool.begin().await?;

        let request = load_for_update(&mut tx, request_id).await?;

        if request.returned_at.is_some() {
            return Err(DomainError::AlreadyReturned);
        }

        let next = request.status.transition(ReservationAction::Return)?;

        let comp = component::store::adjust_quantity(
            &mut tx,
            request.component_id,
            ReservationAction::Return.quantity_delta(request.quantity),
            0,
        )
        .await?;

        let updated = sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET status = $2, returned_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(request.id)
        .bind(next)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        append_transition_record(
            &mut tx,
            processor_id,
            ReservationAction::Return,
            &updated,
            &comp,
            json!({
                "previous_component_quantity": comp.quantity - request.quantity,
                "new_component_quantity": comp.quantity,
            }),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            request_id = %updated.id,
            component_id = %comp.id,
            restored = comp.quantity,
            "borrow request returned"
        );

        Ok(updated)
    }

    /// Get a request by id
    pub async fn get_request(&self, id: Uuid) -> DomainResult<BorrowRequest> {
        let request =
            sqlx::query_as::<_, BorrowRequest>("SELECT * FROM borrow_requests WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.db_pool)
                .await?
                .ok_or_else(|| DomainError::NotFound(format!("request {}", id)))?;

        Ok(request)
    }

    /// List requests with filtering and pagination, most recent first
    pub async fn list_requests(&self, filter: RequestFilter) -> DomainResult<Vec<BorrowRequest>> {
        let page = filter.page.unwrap_or(1).max(1);
        let limit = filter.limit.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * limit;

        let mut query_builder: sqlx::QueryBuilder<Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM borrow_requests WHERE 1=1");

        if let Some(requester_id) = filter.requester_id {
            query_builder.push(" AND requester_id = ");
            query_builder.push_bind(requester_id);
        }
        if let Some(component_id) = filter.component_id {
            query_builder.push(" AND component_id = ");
            query_builder.push_bind(component_id);
        }
        if let Some(status) = filter.status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
        }

        query_builder.push(" ORDER BY requested_at DESC LIMIT ");
        query_builder.push_bind(limit as i64);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset as i64);

        let requests = query_builder
            .build_query_as::<BorrowRequest>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(requests)
    }
}

/// Load a request and lock its row for the rest of the transaction
async fn load_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> DomainResult<BorrowRequest> {
    sqlx::query_as::<_, BorrowRequest>("SELECT * FROM borrow_requests WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("request {}", id)))
}

/// Append the ledger record for a state transition
async fn append_transition_record(
    tx: &mut Transaction<'_, Postgres>,
    actor_id: Uuid,
    action: ReservationAction,
    request: &BorrowRequest,
    comp: &Component,
    extra: serde_json::Value,
) -> DomainResult<()> {
    let mut details = json!({
        "component_id": comp.id,
        "component_name": comp.name,
        "quantity": request.quantity,
    });

    if let (Some(base), Some(more)) = (details.as_object_mut(), extra.as_object()) {
        for (key, value) in more {
            base.insert(key.clone(), value.clone());
        }
    }

    audit::append(
        &mut *tx,
        actor_id,
        action.action_kind(),
        EntityRef::Request(request.id),
        details,
    )
    .await?;

    Ok(())
}
