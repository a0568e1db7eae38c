use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct JobApplication {
    #[schema(example = 1)]
    pub id: i64,
    /// Applicant's full name captured when the application was created; it
    /// does not follow later profile edits.
    #[schema(example = "Casey Quinn")]
    pub applicant_name: String,
    #[schema(example = "casey@example.com", format = "email")]
    pub applicant_email: String,
    #[schema(example = "https://files.example.com/casey.pdf")]
    pub resume_url: String,
    #[schema(example = "Pending")]
    pub status: String,
    #[schema(example = 1)]
    pub job_posting_id: i64,
    /// Set only when the application is denied.
    pub denial_reason: Option<String>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, AsRefStr, EnumString)]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Denied,
}
