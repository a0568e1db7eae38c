use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::auth::password::hash_password;
use crate::model::role::Role;
use crate::service::{identity, membership};

pub async fn init_db(database_url: &str) -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .expect("Failed to connect to database");

    apply_pragmas(&pool)
        .await
        .expect("Failed to apply database pragmas");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    pool
}

async fn apply_pragmas(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("PRAGMA foreign_keys = ON;").execute(pool).await?;
    sqlx::query("PRAGMA journal_mode = WAL;").fetch_one(pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000;").execute(pool).await?;
    Ok(())
}

/// Inserts a small fixture data set (admin, manager, recruiter, one team) so
/// a fresh install has someone who can log in. Safe to run repeatedly.
pub async fn seed_demo_data(pool: &SqlitePool) -> anyhow::Result<()> {
    let mut conn = pool.acquire().await?;

    let fixtures = [
        ("admin@hr.local", "Alex", "Admin", Role::Admin),
        ("manager@hr.local", "Morgan", "Reyes", Role::Manager),
        ("recruiter@hr.local", "Robin", "Hale", Role::Recruiter),
    ];

    for (email, first, last, role) in fixtures {
        let existing = identity::find_by_email(&mut conn, email).await?;
        let user_id = match existing {
            Some(user) => user.id,
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                let hashed = hash_password("ChangeMe123!")
                    .map_err(|e| anyhow::anyhow!("failed to hash seed password: {e}"))?;
                sqlx::query(
                    "INSERT INTO users (id, first_name, last_name, email, password, created_at) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(&id)
                .bind(first)
                .bind(last)
                .bind(email)
                .bind(hashed)
                .bind(chrono::Utc::now())
                .execute(&mut *conn)
                .await?;
                info!(email, "seeded demo user");
                id
            }
        };
        identity::grant_role(&mut conn, &user_id, role).await?;

        if role == Role::Manager {
            let team_exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teams WHERE name = 'Platform')")
                    .fetch_one(&mut *conn)
                    .await?;
            if !team_exists {
                let team_id = sqlx::query("INSERT INTO teams (name, manager_id) VALUES ('Platform', ?)")
                    .bind(&user_id)
                    .execute(&mut *conn)
                    .await?
                    .last_insert_rowid();
                membership::add_member(&mut conn, team_id, &user_id, chrono::Utc::now()).await?;
                info!(team_id, "seeded demo team");
            }
        }
    }

    Ok(())
}

/// Isolated in-memory database for tests. A single connection keeps the
/// database alive and serializes access the way the tests expect.
#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("connect in-memory sqlite");

    sqlx::query("PRAGMA foreign_keys = ON;")
        .execute(&pool)
        .await
        .expect("enable foreign keys");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");

    pool
}
