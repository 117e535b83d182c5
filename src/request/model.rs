//! Borrow request models and input payloads

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::request::state::RequestStatus;

/// Borrow request model
///
/// `quantity` is fixed at creation; after that only `status` and the
/// timestamp/processor fields ever change, and only through the coordinator.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct BorrowRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub component_id: Uuid,
    pub quantity: i32,
    pub status: RequestStatus,
    pub rejection_reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<Uuid>,
    pub returned_at: Option<DateTime<Utc>>,
}

/// Input payload for creating a borrow request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRequestInput {
    pub component_id: Uuid,

    #[validate(range(min = 1))]
    pub quantity: i32,
}

/// Query parameters for listing requests
#[derive(Debug, Default, Deserialize)]
pub struct RequestFilter {
    pub requester_id: Option<Uuid>,
    pub component_id: Option<Uuid>,
    pub status: Option<RequestStatus>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}
