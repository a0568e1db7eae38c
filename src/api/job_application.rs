use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::service::application::{ApplicationService, ProcessedApplication, ProcessedFilter};

#[derive(Deserialize, ToSchema)]
pub struct ApproveApplicationReq {
    #[schema(example = 60000.0)]
    pub salary: f64,
    #[schema(example = 2)]
    pub team_id: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct DenyApplicationReq {
    #[schema(example = "Position has been filled")]
    pub reason: String,
}

#[derive(Deserialize, IntoParams)]
pub struct ProcessedQuery {
    /// Substring match on the posting title
    pub title: Option<String>,
    /// Exact posting date
    #[param(value_type = Option<String>, example = "2026-08-01")]
    pub posted_date: Option<chrono::NaiveDate>,
    /// Substring match on the recruiter's name or email
    pub recruiter: Option<String>,
    /// Substring match on the applicant's name
    pub applicant_name: Option<String>,
}

/* =========================
Approve application (Recruiter/Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/applications/{application_id}/approve",
    params(
        ("application_id" = i64, Path, description = "Job application ID")
    ),
    request_body = ApproveApplicationReq,
    responses(
        (status = 200, description = "Application approved; applicant hired into the team"),
        (status = 400, description = "Invalid salary"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Application, applicant or team not found"),
        (status = 409, description = "Already decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Applications"
)]
pub async fn approve_application(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<ApproveApplicationReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_recruiter_or_admin()?;

    ApplicationService::new(pool.get_ref().clone())
        .approve(path.into_inner(), payload.salary, payload.team_id)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Application approved"
    })))
}

/* =========================
Deny application (Recruiter/Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/applications/{application_id}/deny",
    params(
        ("application_id" = i64, Path, description = "Job application ID")
    ),
    request_body = DenyApplicationReq,
    responses(
        (status = 200, description = "Application denied"),
        (status = 400, description = "Missing denial reason"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Already decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Applications"
)]
pub async fn deny_application(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<DenyApplicationReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_recruiter_or_admin()?;

    ApplicationService::new(pool.get_ref().clone())
        .deny(path.into_inner(), &payload.reason)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Application denied"
    })))
}

/* =========================
Processed-applications log (Recruiter/Admin/HR)
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/applications/log",
    params(ProcessedQuery),
    responses(
        (status = 200, description = "Approved and denied applications", body = [ProcessedApplication]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Applications"
)]
pub async fn processed_log(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<ProcessedQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_recruiting_staff()?;

    let filter = ProcessedFilter {
        title: query.title.clone(),
        posted_date: query.posted_date,
        recruiter: query.recruiter.clone(),
        applicant_name: query.applicant_name.clone(),
    };

    let processed = ApplicationService::new(pool.get_ref().clone())
        .list_processed(&filter)
        .await?;

    Ok(HttpResponse::Ok().json(processed))
}
