use actix_web::{web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::error::WorkflowError;
use crate::service::identity;

#[derive(Debug, Deserialize, IntoParams)]
pub struct UserQuery {
    /// Substring match on first name, last name, full name or email
    pub search: Option<String>,
    /// Substring match on a team the user belongs to
    pub team: Option<String>,
    /// Exact role name, e.g. "Manager"
    pub role: Option<String>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct UserSummary {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[schema(format = "email")]
    pub email: String,
    pub salary: Option<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct UserDetail {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[schema(format = "email")]
    pub email: String,
    pub salary: Option<f64>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    pub roles: Vec<String>,
    pub teams: Vec<String>,
}

/// User directory with filters (Admin)
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserQuery),
    responses(
        (status = 200, description = "Users matching the filters", body = [UserSummary]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<UserQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    // ---------- build WHERE clause dynamically ----------
    let mut conditions: Vec<&str> = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        conditions.push(
            "(lower(u.first_name) LIKE ? OR lower(u.last_name) LIKE ? \
             OR lower(u.email) LIKE ? OR lower(u.first_name || ' ' || u.last_name) LIKE ?)",
        );
        let like = format!("%{}%", search.trim().to_lowercase());
        bindings.extend([like.clone(), like.clone(), like.clone(), like]);
    }

    if let Some(team) = query.team.as_deref().filter(|t| !t.trim().is_empty()) {
        conditions.push(
            "EXISTS (SELECT 1 FROM team_members tm \
             JOIN teams t ON t.id = tm.team_id \
             WHERE tm.user_id = u.id AND lower(t.name) LIKE ?)",
        );
        bindings.push(format!("%{}%", team.trim().to_lowercase()));
    }

    if let Some(role) = query.role.as_deref().filter(|r| !r.trim().is_empty()) {
        conditions.push(
            "EXISTS (SELECT 1 FROM user_roles ur \
             JOIN roles r ON r.id = ur.role_id \
             WHERE ur.user_id = u.id AND r.name = ?)",
        );
        bindings.push(role.trim().to_owned());
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT u.id, u.first_name, u.last_name, u.email, u.salary \
         FROM users u {} ORDER BY u.last_name, u.first_name",
        where_clause
    );
    debug!(sql = %sql, bindings = ?bindings, "Listing users");

    let mut data_query = sqlx::query_as::<_, UserSummary>(&sql);
    for b in &bindings {
        data_query = data_query.bind(b);
    }

    let users = data_query
        .fetch_all(pool.get_ref())
        .await
        .map_err(WorkflowError::Database)?;

    Ok(HttpResponse::Ok().json(users))
}

/// User detail with roles and teams (Admin)
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    params(
        ("user_id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = UserDetail),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_user(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let user_id = path.into_inner();
    let mut conn = pool.acquire().await.map_err(WorkflowError::Database)?;

    let user = identity::find_by_id(&mut conn, &user_id)
        .await
        .map_err(WorkflowError::Database)?
        .ok_or(WorkflowError::NotFound("user"))?;

    let roles = identity::role_names(&mut conn, &user_id)
        .await
        .map_err(WorkflowError::Database)?;

    let teams: Vec<String> = sqlx::query_scalar(
        "SELECT t.name FROM teams t \
         JOIN team_members tm ON tm.team_id = t.id \
         WHERE tm.user_id = ? \
         ORDER BY t.name",
    )
    .bind(&user_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(WorkflowError::Database)?;

    Ok(HttpResponse::Ok().json(UserDetail {
        id: user.id,
        first_name: user.first_name,
        last_name: user.last_name,
        email: user.email,
        salary: user.salary,
        created_at: user.created_at,
        roles,
        teams,
    }))
}
