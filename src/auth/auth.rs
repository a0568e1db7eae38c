use crate::config::Config;
use crate::model::role::Role;
use crate::models::Claims;
use actix_web::{dev::Payload, error::ErrorUnauthorized, web::Data, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, DecodingKey, Validation};

/// The authenticated principal, decoded from the bearer token. Handlers pass
/// its fields to the workflow services explicitly; the services themselves
/// never read request state.
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )))
            }
        };

        let data = match decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(d) => d,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        let role = match Role::from_id(data.claims.role) {
            Some(r) => r,
            None => return ready(Err(ErrorUnauthorized("Invalid role"))),
        };

        ready(Ok(AuthUser {
            user_id: data.claims.user_id,
            email: data.claims.sub,
            role,
        }))
    }
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin only"))
        }
    }

    pub fn require_manager_or_admin(&self) -> actix_web::Result<()> {
        if matches!(self.role, Role::Admin | Role::Manager) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Manager/Admin only"))
        }
    }

    pub fn require_recruiter_or_admin(&self) -> actix_web::Result<()> {
        if matches!(self.role, Role::Admin | Role::Recruiter) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Recruiter/Admin only"))
        }
    }

    /// Roles allowed to browse recruiting history: Recruiter, Admin and HR.
    pub fn require_recruiting_staff(&self) -> actix_web::Result<()> {
        if matches!(self.role, Role::Admin | Role::Recruiter | Role::Hr) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Recruiter/Admin/HR only"))
        }
    }

    /// Internal staff (everyone except self-registered applicants).
    pub fn require_staff(&self) -> actix_web::Result<()> {
        if matches!(
            self.role,
            Role::Admin | Role::Hr | Role::Recruiter | Role::Manager | Role::Employee
        ) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Staff only"))
        }
    }
}
