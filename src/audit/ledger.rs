//! Audit ledger append and query paths
//!
//! `append` is connection-scoped: callers pass `&mut *tx` so the record
//! commits, or rolls back, together with the mutation it documents. A record
//! must never exist without its mutation, and a mutation must never commit
//! without its record.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::audit::model::{ActionKind, AuditFilter, AuditRecord, EntityRef};
use crate::error::DomainResult;

/// Append one record inside the caller's transaction
pub async fn append(
    conn: &mut PgConnection,
    actor_id: Uuid,
    action: ActionKind,
    entity: EntityRef,
    details: serde_json::Value,
) -> DomainResult<AuditRecord> {
    let record = sqlx::query_as::<_, AuditRecord>(
        r#"
        INSERT INTO audit_records (actor_id, action, entity_kind, entity_id, details, occurred_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(actor_id)
    .bind(action)
    .bind(entity.kind())
    .bind(entity.id())
    .bind(details)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    Ok(record)
}

/// One page of ledger results
#[derive(Debug, serde::Serialize)]
pub struct AuditPage {
    pub records: Vec<AuditRecord>,
    /// Total matching rows, independent of pagination
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Read service over the ledger, used by reporting
#[derive(Clone)]
pub struct AuditLedger {
    db_pool: PgPool,
}

impl AuditLedger {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Query records with filtering and pagination, most recent first
    pub async fn query(&self, filter: AuditFilter) -> DomainResult<AuditPage> {
        let (limit, offset) = filter.page();

        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM audit_records WHERE 1=1");
        let mut count_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT COUNT(*) FROM audit_records WHERE 1=1");

        if let Some(start) = filter.start_date {
            query_builder.push(" AND occurred_at >= ");
            query_builder.push_bind(start);
            count_builder.push(" AND occurred_at >= ");
            count_builder.push_bind(start);
        }
        if let Some(end) = filter.end_date {
            query_builder.push(" AND occurred_at <= ");
            query_builder.push_bind(end);
            count_builder.push(" AND occurred_at <= ");
            count_builder.push_bind(end);
        }
        if let Some(actor_id) = filter.actor_id {
            query_builder.push(" AND actor_id = ");
            query_builder.push_bind(actor_id);
            count_builder.push(" AND actor_id = ");
            count_builder.push_bind(actor_id);
        }
        if let Some(action) = filter.action {
            query_builder.push(" AND action = ");
            query_builder.push_bind(action);
            count_builder.push(" AND action = ");
            count_builder.push_bind(action);
        }
        if let Some(entity) = filter.entity {
            query_builder.push(" AND entity_kind = ");
            query_builder.push_bind(entity.kind());
            query_builder.push(" AND entity_id = ");
            query_builder.push_bind(entity.id());
            count_builder.push(" AND entity_kind = ");
            count_builder.push_bind(entity.kind());
            count_builder.push(" AND entity_id = ");
            count_builder.push_bind(entity.id());
        }
        if let Some(subject) = &filter.subject {
            let pattern = format!("%{}%", subject);
            query_builder.push(" AND details->>'component_name' ILIKE ");
            query_builder.push_bind(pattern.clone());
            count_builder.push(" AND details->>'component_name' ILIKE ");
            count_builder.push_bind(pattern);
        }

        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db_pool)
            .await?;

        // Tie-break on id so same-instant records keep a stable order
        query_builder.push(" ORDER BY occurred_at DESC, id DESC LIMIT ");
        query_builder.push_bind(limit);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        let records = query_builder
            .build_query_as::<AuditRecord>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(AuditPage {
            records,
            total,
            limit,
            offset,
        })
    }
}
