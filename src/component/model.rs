//! Component models and input payloads

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Component model for laboratory inventory items
///
/// `quantity` counts the units not currently reserved. It is mutated only
/// through the reservation coordinator or the audited CRUD path, both of
/// which serialise on the component row.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Component {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub quantity: i32,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input payload for creating a component
#[derive(Debug, Deserialize, Validate)]
pub struct CreateComponentInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(min = 1, max = 50))]
    pub category: String,

    #[validate(range(min = 0))]
    pub quantity: i32,

    pub description: Option<String>,

    #[validate(url)]
    pub image_url: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub location: String,
}

/// Input payload for updating a component; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateComponentInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,

    #[validate(range(min = 0))]
    pub quantity: Option<i32>,

    pub description: Option<String>,

    #[validate(url)]
    pub image_url: Option<String>,

    pub location: Option<String>,
}

/// Query parameters for listing components
#[derive(Debug, Default, Deserialize)]
pub struct ComponentFilter {
    /// Filter by category
    pub category: Option<String>,
    /// Case-insensitive substring match on the component name
    pub search: Option<String>,
    /// Only components with quantity > 0
    pub available_only: Option<bool>,
}
