use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct JobPosting {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Backend Engineer")]
    pub title: String,
    pub description: String,
    #[schema(value_type = String, format = "date-time")]
    pub posted_date: DateTime<Utc>,
    pub recruiter_id: String,
}
