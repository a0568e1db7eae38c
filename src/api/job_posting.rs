use actix_web::{web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::error::WorkflowError;
use crate::model::job_application::JobApplication;
use crate::service::application::ApplicationService;
use crate::validation;

#[derive(Deserialize, ToSchema)]
pub struct CreatePosting {
    #[schema(example = "Backend Engineer")]
    pub title: String,
    #[schema(example = "Own the service layer of our internal tools.")]
    pub description: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePosting {
    pub title: String,
    pub description: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ApplyReq {
    #[schema(example = "https://files.example.com/casey.pdf")]
    pub resume_url: String,
}

/// A posting joined with the recruiter who published it.
#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct PostingResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[schema(value_type = String, format = "date-time")]
    pub posted_date: DateTime<Utc>,
    pub recruiter_id: String,
    pub recruiter_name: String,
}

fn validate_posting_fields(title: &str, description: &str) -> Result<(), WorkflowError> {
    validation::validate_length(
        "title",
        title,
        validation::JOB_TITLE_MIN,
        validation::JOB_TITLE_MAX,
    )?;
    validation::validate_length(
        "description",
        description,
        validation::JOB_DESCRIPTION_MIN,
        validation::JOB_DESCRIPTION_MAX,
    )
}

/// List postings
#[utoipa::path(
    get,
    path = "/api/v1/postings",
    responses(
        (status = 200, description = "All job postings", body = [PostingResponse]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Postings"
)]
pub async fn list_postings(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> Result<impl Responder, WorkflowError> {
    let postings = sqlx::query_as::<_, PostingResponse>(
        "SELECT jp.id, jp.title, jp.description, jp.posted_date, jp.recruiter_id, \
                u.first_name || ' ' || u.last_name AS recruiter_name \
         FROM job_postings jp \
         JOIN users u ON u.id = jp.recruiter_id \
         ORDER BY jp.posted_date DESC",
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(postings))
}

/// Create posting (Recruiter/Admin)
#[utoipa::path(
    post,
    path = "/api/v1/postings",
    request_body = CreatePosting,
    responses(
        (status = 201, description = "Posting created"),
        (status = 400, description = "Invalid title or description"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Postings"
)]
pub async fn create_posting(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<CreatePosting>,
) -> actix_web::Result<impl Responder> {
    auth.require_recruiter_or_admin()?;
    validate_posting_fields(&payload.title, &payload.description)?;

    let id = sqlx::query(
        "INSERT INTO job_postings (title, description, posted_date, recruiter_id) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(payload.title.trim())
    .bind(payload.description.trim())
    .bind(Utc::now())
    .bind(&auth.user_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create job posting");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?
    .last_insert_rowid();

    Ok(HttpResponse::Created().json(json!({
        "message": "Job posting created",
        "id": id
    })))
}

/// Get posting by id
#[utoipa::path(
    get,
    path = "/api/v1/postings/{posting_id}",
    params(
        ("posting_id" = i64, Path, description = "Job posting ID")
    ),
    responses(
        (status = 200, description = "Posting found", body = PostingResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Posting not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Postings"
)]
pub async fn get_posting(
    _auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<impl Responder, WorkflowError> {
    let posting_id = path.into_inner();

    let posting = sqlx::query_as::<_, PostingResponse>(
        "SELECT jp.id, jp.title, jp.description, jp.posted_date, jp.recruiter_id, \
                u.first_name || ' ' || u.last_name AS recruiter_name \
         FROM job_postings jp \
         JOIN users u ON u.id = jp.recruiter_id \
         WHERE jp.id = ?",
    )
    .bind(posting_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or(WorkflowError::NotFound("job posting"))?;

    Ok(HttpResponse::Ok().json(posting))
}

/// Update posting (Recruiter/Admin)
#[utoipa::path(
    put,
    path = "/api/v1/postings/{posting_id}",
    params(
        ("posting_id" = i64, Path, description = "Job posting ID")
    ),
    request_body = UpdatePosting,
    responses(
        (status = 200, description = "Posting updated"),
        (status = 400, description = "Invalid title or description"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Posting not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Postings"
)]
pub async fn update_posting(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<UpdatePosting>,
) -> actix_web::Result<impl Responder> {
    auth.require_recruiter_or_admin()?;
    validate_posting_fields(&payload.title, &payload.description)?;

    let posting_id = path.into_inner();
    let affected = sqlx::query("UPDATE job_postings SET title = ?, description = ? WHERE id = ?")
        .bind(payload.title.trim())
        .bind(payload.description.trim())
        .bind(posting_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, posting_id, "Failed to update job posting");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
        .rows_affected();

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Job posting not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Job posting updated"
    })))
}

/// Delete posting (Recruiter/Admin)
#[utoipa::path(
    delete,
    path = "/api/v1/postings/{posting_id}",
    params(
        ("posting_id" = i64, Path, description = "Job posting ID")
    ),
    responses(
        (status = 200, description = "Posting deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Posting not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Postings"
)]
pub async fn delete_posting(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    auth.require_recruiter_or_admin()?;

    let posting_id = path.into_inner();
    let affected = sqlx::query("DELETE FROM job_postings WHERE id = ?")
        .bind(posting_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, posting_id, "Failed to delete job posting");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
        .rows_affected();

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Job posting not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Job posting deleted"
    })))
}

/// Pending applicants for a posting (Recruiter/Admin)
#[utoipa::path(
    get,
    path = "/api/v1/postings/{posting_id}/applicants",
    params(
        ("posting_id" = i64, Path, description = "Job posting ID")
    ),
    responses(
        (status = 200, description = "Applications still awaiting a decision", body = [JobApplication]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Postings"
)]
pub async fn list_posting_applicants(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    auth.require_recruiter_or_admin()?;

    let applications = ApplicationService::new(pool.get_ref().clone())
        .list_applicants(path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(applications))
}

/// Apply for a posting
#[utoipa::path(
    post,
    path = "/api/v1/postings/{posting_id}/apply",
    params(
        ("posting_id" = i64, Path, description = "Job posting ID")
    ),
    request_body = ApplyReq,
    responses(
        (status = 201, description = "Application submitted", body = JobApplication),
        (status = 400, description = "Invalid resume URL"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Posting not found"),
        (status = 409, description = "A pending application already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Postings"
)]
pub async fn apply(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<ApplyReq>,
) -> Result<impl Responder, WorkflowError> {
    let application = ApplicationService::new(pool.get_ref().clone())
        .apply(path.into_inner(), &auth.email, &payload.resume_url)
        .await?;

    Ok(HttpResponse::Created().json(application))
}
