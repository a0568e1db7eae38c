use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::WorkflowError;
use crate::model::leave_request::LeaveRequest;
use crate::service::leave::{LeaveDecision, LeavePolicy, LeaveService};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-09-01", format = "date", value_type = String)]
    pub start_date: chrono::NaiveDate,
    #[schema(example = "2026-09-05", format = "date", value_type = String)]
    pub end_date: chrono::NaiveDate,
}

fn leave_service(pool: &web::Data<SqlitePool>, config: &web::Data<Config>) -> LeaveService {
    LeaveService::new(
        pool.get_ref().clone(),
        LeavePolicy {
            capacity_guard: config.leave_capacity_guard,
        },
    )
}

/* =========================
Submit leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/leave",
    request_body = CreateLeave,
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "Invalid date range"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Overlapping request, no team membership, or team capacity reached")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn submit_leave(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    payload: web::Json<CreateLeave>,
) -> Result<impl Responder, WorkflowError> {
    let request = leave_service(&pool, &config)
        .submit(&auth.user_id, payload.start_date, payload.end_date)
        .await?;

    Ok(HttpResponse::Created().json(request))
}

/* =========================
My upcoming leave
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave",
    responses(
        (status = 200, description = "Caller's leave requests that have not ended yet", body = [LeaveRequest]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn my_leave(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> Result<impl Responder, WorkflowError> {
    let requests = leave_service(&pool, &config)
        .list_upcoming(&auth.user_id, Utc::now().date_naive())
        .await?;

    Ok(HttpResponse::Ok().json(requests))
}

/* =========================
Review queue (Manager/Admin)
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave/review",
    responses(
        (status = 200, description = "Requests awaiting this reviewer", body = [LeaveRequest]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn review_queue(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_admin()?;

    let requests = leave_service(&pool, &config)
        .list_for_review(Some(&auth.user_id), auth.is_admin())
        .await?;

    Ok(HttpResponse::Ok().json(requests))
}

/* =========================
Approve leave (Manager/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/approve",
    params(
        ("leave_id" = i64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the assigned manager"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Already decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_admin()?;

    leave_service(&pool, &config)
        .decide(
            path.into_inner(),
            &auth.user_id,
            auth.is_admin(),
            LeaveDecision::Approve,
        )
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave approved"
    })))
}

/* =========================
Reject leave (Manager/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/reject",
    params(
        ("leave_id" = i64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the assigned manager"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Already decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_admin()?;

    leave_service(&pool, &config)
        .decide(
            path.into_inner(),
            &auth.user_id,
            auth.is_admin(),
            LeaveDecision::Reject,
        )
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave rejected"
    })))
}
