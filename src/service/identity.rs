//! The slice of the identity store the workflows are allowed to touch:
//! resolving users, reading and mutating role membership, and the salary
//! side effect of an approval. Every function takes an explicit connection
//! so callers can run them inside a surrounding transaction.

use sqlx::SqliteConnection;

use crate::model::role::Role;
use crate::model::user::User;

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(conn)
        .await
}

pub async fn find_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower(?)")
        .bind(email.trim())
        .fetch_optional(conn)
        .await
}

pub async fn role_names(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT r.name FROM roles r \
         JOIN user_roles ur ON ur.role_id = r.id \
         WHERE ur.user_id = ? \
         ORDER BY r.id",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
}

/// Id of the most privileged role held, used as the JWT role claim.
pub async fn primary_role_id(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Option<u8>, sqlx::Error> {
    let id: Option<i64> =
        sqlx::query_scalar("SELECT MIN(role_id) FROM user_roles WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(conn)
            .await?;
    Ok(id.map(|id| id as u8))
}

pub async fn has_role(
    conn: &mut SqliteConnection,
    user_id: &str,
    role: Role,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM user_roles WHERE user_id = ? AND role_id = ?)",
    )
    .bind(user_id)
    .bind(role.id() as i64)
    .fetch_one(conn)
    .await
}

pub async fn grant_role(
    conn: &mut SqliteConnection,
    user_id: &str,
    role: Role,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(role.id() as i64)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn revoke_role(
    conn: &mut SqliteConnection,
    user_id: &str,
    role: Role,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role_id = ?")
        .bind(user_id)
        .bind(role.id() as i64)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn set_salary(
    conn: &mut SqliteConnection,
    user_id: &str,
    salary: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET salary = ? WHERE id = ?")
        .bind(salary)
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}
