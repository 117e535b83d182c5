//! Audit record models

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

/// Action kinds recorded in the ledger
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "audit_action", rename_all = "lowercase")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
    Request,
    Approve,
    Reject,
    Return,
}

/// Entity kinds an audit record can point at
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "audit_entity", rename_all = "lowercase")]
pub enum EntityKind {
    Component,
    Request,
    User,
}

/// Tagged reference to the subject of an audit record
///
/// The ledger table stores this as an `(entity_kind, entity_id)` pair; the
/// sum type keeps the id from being interpreted against the wrong table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    Component(Uuid),
    Request(Uuid),
    User(Uuid),
}

impl EntityRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Component(_) => EntityKind::Component,
            EntityRef::Request(_) => EntityKind::Request,
            EntityRef::User(_) => EntityKind::User,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            EntityRef::Component(id) | EntityRef::Request(id) | EntityRef::User(id) => *id,
        }
    }
}

/// One committed mutation. Never updated or deleted once written.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct AuditRecord {
    pub id: i64,
    pub actor_id: Uuid,
    pub action: ActionKind,
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub details: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

/// Query parameters for the ledger read path
#[derive(Debug, Default, Deserialize)]
pub struct AuditFilter {
    /// Records at or after this instant
    pub start_date: Option<DateTime<Utc>>,
    /// Records at or before this instant
    pub end_date: Option<DateTime<Utc>>,
    /// Filter by acting user
    pub actor_id: Option<Uuid>,
    /// Filter by action kind
    pub action: Option<ActionKind>,
    /// Filter by subject entity
    #[serde(skip)]
    pub entity: Option<EntityRef>,
    /// Case-insensitive substring match on the denormalized component name
    /// inside `details`
    pub subject: Option<String>,
    /// Page size, clamped to 1..=1000 (default 100)
    pub limit: Option<i64>,
    /// Rows to skip (default 0)
    pub offset: Option<i64>,
}

pub const DEFAULT_PAGE_LIMIT: i64 = 100;
pub const MAX_PAGE_LIMIT: i64 = 1000;

impl AuditFilter {
    /// Normalize pagination inputs to (limit, offset) within bounds
    pub fn page(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}
