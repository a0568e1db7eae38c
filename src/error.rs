use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failure kinds produced by the workflow services. Every variant except
/// `Database` is a business-rule violation detected synchronously inside the
/// operation; none of them are retryable.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("not authorized to act on this {0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    ValidationFailed(String),

    #[error("an existing leave request overlaps the selected dates")]
    OverlappingRequest,

    #[error("too many approved leave requests for this team over the selected dates")]
    TeamCapacityExceeded,

    #[error("employee does not belong to any team")]
    NotOnTeam,

    #[error("a pending application already exists for this applicant")]
    DuplicatePendingApplication,

    #[error("{0} has already been decided")]
    AlreadyDecided(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl WorkflowError {
    pub fn validation(msg: impl Into<String>) -> Self {
        WorkflowError::ValidationFailed(msg.into())
    }
}

impl ResponseError for WorkflowError {
    fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
            WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,
            WorkflowError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            WorkflowError::OverlappingRequest
            | WorkflowError::TeamCapacityExceeded
            | WorkflowError::NotOnTeam
            | WorkflowError::DuplicatePendingApplication
            | WorkflowError::AlreadyDecided(_) => StatusCode::CONFLICT,
            WorkflowError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let WorkflowError::Database(e) = self {
            error!(error = %e, "workflow database error");
            return HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            }));
        }

        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string()
        }))
    }
}
