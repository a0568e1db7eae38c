use crate::{
    auth::{
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    model::{role::Role, user::User},
    models::{LoginReq, RegisterReq, TokenType},
    service::identity,
    validation,
};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

#[derive(Serialize, Deserialize)]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
}

/// Self-service registration. New accounts start with the generic "User"
/// role; the job-application workflow upgrades them to "Employee".
pub async fn register(payload: web::Json<RegisterReq>, pool: web::Data<SqlitePool>) -> impl Responder {
    let first_name = payload.first_name.trim();
    let last_name = payload.last_name.trim();
    let email = payload.email.trim();

    for check in [
        validation::validate_length(
            "first name",
            first_name,
            validation::USER_FIRST_NAME_MIN,
            validation::USER_FIRST_NAME_MAX,
        ),
        validation::validate_length(
            "last name",
            last_name,
            validation::USER_LAST_NAME_MIN,
            validation::USER_LAST_NAME_MAX,
        ),
        validation::validate_email(email),
    ] {
        if let Err(e) = check {
            return HttpResponse::BadRequest().json(json!({ "error": e.to_string() }));
        }
    }

    if payload.password.chars().count() < validation::PASSWORD_MIN {
        return HttpResponse::BadRequest().json(json!({
            "error": format!("password must be at least {} characters", validation::PASSWORD_MIN)
        }));
    }

    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(e) => {
            error!(error = %e, "Failed to open transaction for registration");
            return HttpResponse::InternalServerError().finish();
        }
    };

    match identity::find_by_email(&mut tx, email).await {
        Ok(Some(_)) => {
            return HttpResponse::Conflict().json(json!({
                "error": "Email already registered"
            }));
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "Database error while checking email");
            return HttpResponse::InternalServerError().finish();
        }
    }

    let hashed = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "Failed to hash password");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let user_id = Uuid::new_v4().to_string();
    let inserted = sqlx::query(
        "INSERT INTO users (id, first_name, last_name, email, password, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&user_id)
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .bind(&hashed)
    .bind(chrono::Utc::now())
    .execute(&mut *tx)
    .await;

    if let Err(e) = inserted {
        error!(error = %e, "Failed to register user");
        return HttpResponse::InternalServerError().json(json!({
            "error": "Failed to register user"
        }));
    }

    if let Err(e) = identity::grant_role(&mut tx, &user_id, Role::User).await {
        error!(error = %e, "Failed to grant initial role");
        return HttpResponse::InternalServerError().finish();
    }

    if let Err(e) = tx.commit().await {
        error!(error = %e, "Failed to commit registration");
        return HttpResponse::InternalServerError().finish();
    }

    info!(user_id = %user_id, "user registered");
    HttpResponse::Created().json(json!({
        "message": "User registered successfully"
    }))
}

#[instrument(
    name = "auth_login",
    skip(pool, config, payload),
    fields(email = %payload.email)
)]
pub async fn login(
    payload: web::Json<LoginReq>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    if payload.email.trim().is_empty() || payload.password.is_empty() {
        info!("Validation failed: empty email or password");
        return HttpResponse::BadRequest().body("Email and password required");
    }

    debug!("Fetching user from database");

    let db_user = match sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower(?)")
        .bind(payload.email.trim())
        .fetch_optional(pool.get_ref())
        .await
    {
        Ok(Some(user)) => {
            debug!(user_id = %user.id, "User found");
            user
        }
        Ok(None) => {
            info!("Invalid credentials: user not found");
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if verify_password(&payload.password, &db_user.password).is_err() {
        info!("Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().body("Invalid credentials");
    }

    debug!("Password verified, resolving role");

    let role_id = {
        let mut conn = match pool.acquire().await {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, "Failed to acquire connection");
                return HttpResponse::InternalServerError().finish();
            }
        };
        match identity::primary_role_id(&mut conn, &db_user.id).await {
            Ok(id) => id.unwrap_or(Role::User.id()),
            Err(e) => {
                error!(error = %e, "Failed to resolve role");
                return HttpResponse::InternalServerError().finish();
            }
        }
    };

    let access_token = generate_access_token(
        &db_user.id,
        db_user.email.clone(),
        role_id,
        &config.jwt_secret,
        config.access_token_ttl,
    );

    let (refresh_token, refresh_claims) = generate_refresh_token(
        &db_user.id,
        db_user.email.clone(),
        role_id,
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    debug!(jti = %refresh_claims.jti, "Storing refresh token");

    if let Err(e) = sqlx::query("INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, ?)")
        .bind(&db_user.id)
        .bind(&refresh_claims.jti)
        .bind(refresh_claims.exp as i64)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to store refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
        .bind(chrono::Utc::now())
        .bind(&db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
        // intentionally not failing login
    }

    info!("Login successful");

    HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
    })
}

pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> impl Responder {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return HttpResponse::Unauthorized().body("No token"),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return HttpResponse::Unauthorized().body("Invalid token"),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::Unauthorized().finish(),
    };

    if claims.token_type != TokenType::Refresh {
        return HttpResponse::Unauthorized().finish();
    }

    let record = match sqlx::query_as::<_, (i64, String, i64)>(
        "SELECT id, user_id, revoked FROM refresh_tokens WHERE jti = ?",
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "Failed to look up refresh token");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let (record_id, user_id, _) = match record {
        Some(r) if r.2 == 0 => r,
        _ => return HttpResponse::Unauthorized().finish(),
    };

    // rotate: the presented refresh token is spent either way
    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE id = ?")
        .bind(record_id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    let (new_refresh_token, new_claims) = generate_refresh_token(
        &user_id,
        claims.sub.clone(),
        claims.role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    if let Err(e) = sqlx::query("INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, ?)")
        .bind(&user_id)
        .bind(&new_claims.jti)
        .bind(new_claims.exp as i64)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to store rotated refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    let access_token = generate_access_token(
        &user_id,
        claims.sub.clone(),
        claims.role,
        &config.jwt_secret,
        config.access_token_ttl,
    );

    HttpResponse::Ok().json(json!({
        "access_token": access_token,
        "refresh_token": new_refresh_token
    }))
}

pub async fn logout(
    req: HttpRequest,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> impl Responder {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return HttpResponse::NoContent().finish(),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return HttpResponse::NoContent().finish(),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    // revoke is idempotent; missing tokens are fine
    let _ = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await;

    HttpResponse::NoContent().finish()
}
