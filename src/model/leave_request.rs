use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: i64,
    pub employee_id: String,
    #[schema(example = 1)]
    pub team_id: i64,
    #[schema(example = "2026-09-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-09-05", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Pending")]
    pub status: String,
    /// Manager responsible for the decision, copied from the team when the
    /// request was submitted. Later manager changes do not retarget it.
    pub manager_id: Option<String>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, AsRefStr, EnumString)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}
