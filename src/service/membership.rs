//! Single writer for `team_members` rows. Both the job-application approval
//! workflow and the team administration API mutate memberships through this
//! module, so there is exactly one place that owns the table.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::model::team::TeamMember;

/// A user's membership joined with the owning team, as needed by the leave
/// workflow (team id plus the manager to snapshot).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Membership {
    pub team_id: i64,
    pub user_id: String,
    pub joined_at: DateTime<Utc>,
    pub team_name: String,
    pub manager_id: String,
}

/// First membership by join date, or `None` when the user is on no team.
pub async fn membership_of(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Option<Membership>, sqlx::Error> {
    sqlx::query_as::<_, Membership>(
        "SELECT tm.team_id, tm.user_id, tm.joined_at, t.name AS team_name, t.manager_id \
         FROM team_members tm \
         JOIN teams t ON t.id = tm.team_id \
         WHERE tm.user_id = ? \
         ORDER BY tm.joined_at, tm.team_id \
         LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await
}

pub async fn members_of(
    conn: &mut SqliteConnection,
    team_id: i64,
) -> Result<Vec<TeamMember>, sqlx::Error> {
    sqlx::query_as::<_, TeamMember>(
        "SELECT team_id, user_id, joined_at FROM team_members \
         WHERE team_id = ? ORDER BY joined_at",
    )
    .bind(team_id)
    .fetch_all(conn)
    .await
}

/// Idempotent on the (team, user) key: an existing membership is left as is,
/// so an approval does not fail when an admin already added the member.
pub async fn add_member(
    conn: &mut SqliteConnection,
    team_id: i64,
    user_id: &str,
    joined_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO team_members (team_id, user_id, joined_at) VALUES (?, ?, ?)")
        .bind(team_id)
        .bind(user_id)
        .bind(joined_at)
        .execute(conn)
        .await?;
    Ok(())
}

/// Returns false when no such membership existed.
pub async fn remove_member(
    conn: &mut SqliteConnection,
    team_id: i64,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM team_members WHERE team_id = ? AND user_id = ?")
        .bind(team_id)
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
