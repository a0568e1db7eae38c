use actix_web::{web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::error::WorkflowError;
use crate::service::{identity, membership};
use crate::validation;

#[derive(Deserialize, ToSchema)]
pub struct CreateTeam {
    #[schema(example = "Platform")]
    pub name: String,
    pub manager_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateTeam {
    pub name: String,
    pub manager_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AddMemberReq {
    pub user_id: String,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct TeamSummary {
    pub id: i64,
    pub name: String,
    pub manager_id: String,
    pub manager_name: String,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct TeamMemberDetail {
    pub user_id: String,
    pub name: String,
    #[schema(format = "email")]
    pub email: String,
    #[schema(value_type = String, format = "date-time")]
    pub joined_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct TeamDetails {
    pub id: i64,
    pub name: String,
    pub manager_id: String,
    pub manager_name: String,
    pub members: Vec<TeamMemberDetail>,
}

async fn ensure_manager_exists(pool: &SqlitePool, manager_id: &str) -> Result<(), WorkflowError> {
    let mut conn = pool.acquire().await?;
    identity::find_by_id(&mut conn, manager_id)
        .await?
        .map(|_| ())
        .ok_or(WorkflowError::NotFound("manager"))
}

/// List teams
#[utoipa::path(
    get,
    path = "/api/v1/teams",
    responses(
        (status = 200, description = "All teams with their managers", body = [TeamSummary]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Teams"
)]
pub async fn list_teams(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> actix_web::Result<impl Responder> {
    auth.require_staff()?;

    let teams = sqlx::query_as::<_, TeamSummary>(
        "SELECT t.id, t.name, t.manager_id, \
                u.first_name || ' ' || u.last_name AS manager_name \
         FROM teams t \
         JOIN users u ON u.id = t.manager_id \
         ORDER BY t.name",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(WorkflowError::Database)?;

    Ok(HttpResponse::Ok().json(teams))
}

/// Team details with members
#[utoipa::path(
    get,
    path = "/api/v1/teams/{team_id}",
    params(
        ("team_id" = i64, Path, description = "Team ID")
    ),
    responses(
        (status = 200, description = "Team with manager and members", body = TeamDetails),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Team not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Teams"
)]
pub async fn get_team(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    auth.require_staff()?;

    let team_id = path.into_inner();
    let summary = sqlx::query_as::<_, TeamSummary>(
        "SELECT t.id, t.name, t.manager_id, \
                u.first_name || ' ' || u.last_name AS manager_name \
         FROM teams t \
         JOIN users u ON u.id = t.manager_id \
         WHERE t.id = ?",
    )
    .bind(team_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(WorkflowError::Database)?
    .ok_or(WorkflowError::NotFound("team"))?;

    let members = sqlx::query_as::<_, TeamMemberDetail>(
        "SELECT tm.user_id, u.first_name || ' ' || u.last_name AS name, u.email, tm.joined_at \
         FROM team_members tm \
         JOIN users u ON u.id = tm.user_id \
         WHERE tm.team_id = ? \
         ORDER BY tm.joined_at",
    )
    .bind(team_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(WorkflowError::Database)?;

    Ok(HttpResponse::Ok().json(TeamDetails {
        id: summary.id,
        name: summary.name,
        manager_id: summary.manager_id,
        manager_name: summary.manager_name,
        members,
    }))
}

/// Create team (Admin)
#[utoipa::path(
    post,
    path = "/api/v1/teams",
    request_body = CreateTeam,
    responses(
        (status = 201, description = "Team created"),
        (status = 400, description = "Invalid team name"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Manager not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Teams"
)]
pub async fn create_team(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<CreateTeam>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    validation::validate_length(
        "team name",
        &payload.name,
        validation::TEAM_NAME_MIN,
        validation::TEAM_NAME_MAX,
    )?;
    ensure_manager_exists(pool.get_ref(), &payload.manager_id).await?;

    let id = sqlx::query("INSERT INTO teams (name, manager_id) VALUES (?, ?)")
        .bind(payload.name.trim())
        .bind(&payload.manager_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create team");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
        .last_insert_rowid();

    info!(team_id = id, "team created");
    Ok(HttpResponse::Created().json(json!({
        "message": "Team created",
        "id": id
    })))
}

/// Update team (Admin)
#[utoipa::path(
    put,
    path = "/api/v1/teams/{team_id}",
    params(
        ("team_id" = i64, Path, description = "Team ID")
    ),
    request_body = UpdateTeam,
    responses(
        (status = 200, description = "Team updated"),
        (status = 400, description = "Invalid team name"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Team or manager not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Teams"
)]
pub async fn update_team(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<UpdateTeam>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    validation::validate_length(
        "team name",
        &payload.name,
        validation::TEAM_NAME_MIN,
        validation::TEAM_NAME_MAX,
    )?;
    ensure_manager_exists(pool.get_ref(), &payload.manager_id).await?;

    let team_id = path.into_inner();
    let affected = sqlx::query("UPDATE teams SET name = ?, manager_id = ? WHERE id = ?")
        .bind(payload.name.trim())
        .bind(&payload.manager_id)
        .bind(team_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, team_id, "Failed to update team");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
        .rows_affected();

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Team not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Team updated"
    })))
}

/// Delete team (Admin)
#[utoipa::path(
    delete,
    path = "/api/v1/teams/{team_id}",
    params(
        ("team_id" = i64, Path, description = "Team ID")
    ),
    responses(
        (status = 200, description = "Team deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Team not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Teams"
)]
pub async fn delete_team(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let team_id = path.into_inner();
    let affected = sqlx::query("DELETE FROM teams WHERE id = ?")
        .bind(team_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, team_id, "Failed to delete team");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
        .rows_affected();

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Team not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Team deleted"
    })))
}

/// Add member (Manager/Admin)
#[utoipa::path(
    post,
    path = "/api/v1/teams/{team_id}/members",
    params(
        ("team_id" = i64, Path, description = "Team ID")
    ),
    request_body = AddMemberReq,
    responses(
        (status = 200, description = "Member added"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Team or user not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Teams"
)]
pub async fn add_team_member(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<AddMemberReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_admin()?;

    let team_id = path.into_inner();
    let mut conn = pool.acquire().await.map_err(WorkflowError::Database)?;

    let team_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teams WHERE id = ?)")
        .bind(team_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(WorkflowError::Database)?;
    if !team_exists {
        return Err(WorkflowError::NotFound("team").into());
    }
    identity::find_by_id(&mut conn, &payload.user_id)
        .await
        .map_err(WorkflowError::Database)?
        .ok_or(WorkflowError::NotFound("user"))?;

    membership::add_member(&mut conn, team_id, &payload.user_id, Utc::now())
        .await
        .map_err(WorkflowError::Database)?;

    info!(team_id, user_id = %payload.user_id, "team member added");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Member added to team"
    })))
}

/// Remove member (Manager/Admin)
#[utoipa::path(
    delete,
    path = "/api/v1/teams/{team_id}/members/{user_id}",
    params(
        ("team_id" = i64, Path, description = "Team ID"),
        ("user_id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Member removed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Membership not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Teams"
)]
pub async fn remove_team_member(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<(i64, String)>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_admin()?;

    let (team_id, user_id) = path.into_inner();
    let mut conn = pool.acquire().await.map_err(WorkflowError::Database)?;

    let removed = membership::remove_member(&mut conn, team_id, &user_id)
        .await
        .map_err(WorkflowError::Database)?;
    if !removed {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Team member not found"
        })));
    }

    info!(team_id, user_id = %user_id, "team member removed");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Member removed from team"
    })))
}
