use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Team {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Platform")]
    pub name: String,
    /// User id of the team's manager. Leave requests snapshot this value at
    /// submission time.
    pub manager_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct TeamMember {
    pub team_id: i64,
    pub user_id: String,
    #[schema(value_type = String, format = "date-time")]
    pub joined_at: DateTime<Utc>,
}
