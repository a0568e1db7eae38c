//! Leave request workflow: submission with overlap and team-capacity
//! guards, the employee's upcoming view, the reviewer queue, and the
//! manager/admin gated decision.
//!
//! Overlap policy: the personal check counts Pending and Approved requests
//! and ignores Rejected ones, so a rejected range can be requested again.
//! The capacity guard counts Approved requests only.

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::WorkflowError;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::service::membership;

/// Share of a team allowed to be on approved leave at once.
const CAPACITY_RATIO: f64 = 0.05;

#[derive(Debug, Copy, Clone)]
pub struct LeavePolicy {
    pub capacity_guard: bool,
}

impl Default for LeavePolicy {
    fn default() -> Self {
        Self {
            capacity_guard: true,
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub enum LeaveDecision {
    Approve,
    Reject,
}

impl LeaveDecision {
    fn status(self) -> LeaveStatus {
        match self {
            LeaveDecision::Approve => LeaveStatus::Approved,
            LeaveDecision::Reject => LeaveStatus::Rejected,
        }
    }
}

#[derive(Clone)]
pub struct LeaveService {
    pool: SqlitePool,
    policy: LeavePolicy,
}

impl LeaveService {
    pub fn new(pool: SqlitePool, policy: LeavePolicy) -> Self {
        Self { pool, policy }
    }

    /// Submits a leave request for the employee. The membership lookup, the
    /// guards and the insert share one transaction so two concurrent
    /// submissions cannot both pass the overlap check.
    pub async fn submit(
        &self,
        employee_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<LeaveRequest, WorkflowError> {
        if end_date < start_date {
            return Err(WorkflowError::validation(
                "end date cannot be before start date",
            ));
        }

        let mut tx = self.pool.begin().await?;

        let membership = membership::membership_of(&mut tx, employee_id)
            .await?
            .ok_or(WorkflowError::NotOnTeam)?;

        let overlapping: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM leave_requests \
             WHERE employee_id = ? AND status <> ? AND start_date <= ? AND end_date >= ?)",
        )
        .bind(employee_id)
        .bind(LeaveStatus::Rejected.as_ref())
        .bind(end_date)
        .bind(start_date)
        .fetch_one(&mut *tx)
        .await?;
        if overlapping {
            return Err(WorkflowError::OverlappingRequest);
        }

        if self.policy.capacity_guard {
            check_team_capacity(&mut tx, membership.team_id, start_date, end_date).await?;
        }

        let manager_id = membership.manager_id.clone();
        let id = sqlx::query(
            "INSERT INTO leave_requests (employee_id, team_id, start_date, end_date, status, manager_id) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(employee_id)
        .bind(membership.team_id)
        .bind(start_date)
        .bind(end_date)
        .bind(LeaveStatus::Pending.as_ref())
        .bind(&manager_id)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;

        info!(
            employee_id,
            request_id = id,
            team_id = membership.team_id,
            "leave request submitted"
        );

        Ok(LeaveRequest {
            id,
            employee_id: employee_id.to_owned(),
            team_id: membership.team_id,
            start_date,
            end_date,
            status: LeaveStatus::Pending.to_string(),
            manager_id: Some(manager_id),
        })
    }

    /// Requests of any status whose end date has not passed, earliest first.
    pub async fn list_upcoming(
        &self,
        employee_id: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<LeaveRequest>, WorkflowError> {
        let requests = sqlx::query_as::<_, LeaveRequest>(
            "SELECT id, employee_id, team_id, start_date, end_date, status, manager_id \
             FROM leave_requests \
             WHERE employee_id = ? AND end_date >= ? \
             ORDER BY start_date",
        )
        .bind(employee_id)
        .bind(as_of)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    /// The reviewer queue. Elevated reviewers see every pending request
    /// across teams; a manager sees the requests assigned to them. A missing
    /// reviewer identity yields an empty list rather than an error.
    pub async fn list_for_review(
        &self,
        reviewer_id: Option<&str>,
        elevated: bool,
    ) -> Result<Vec<LeaveRequest>, WorkflowError> {
        if elevated {
            let requests = sqlx::query_as::<_, LeaveRequest>(
                "SELECT id, employee_id, team_id, start_date, end_date, status, manager_id \
                 FROM leave_requests \
                 WHERE status = ? \
                 ORDER BY start_date DESC",
            )
            .bind(LeaveStatus::Pending.as_ref())
            .fetch_all(&self.pool)
            .await?;
            return Ok(requests);
        }

        let Some(reviewer_id) = reviewer_id else {
            return Ok(Vec::new());
        };

        let requests = sqlx::query_as::<_, LeaveRequest>(
            "SELECT id, employee_id, team_id, start_date, end_date, status, manager_id \
             FROM leave_requests \
             WHERE manager_id = ? \
             ORDER BY start_date DESC",
        )
        .bind(reviewer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    /// Applies an approve/reject decision. Only the manager snapshotted at
    /// submission time (or an elevated reviewer) may decide, and a decided
    /// request never changes status again.
    pub async fn decide(
        &self,
        request_id: i64,
        reviewer_id: &str,
        elevated: bool,
        decision: LeaveDecision,
    ) -> Result<(), WorkflowError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT manager_id FROM leave_requests WHERE id = ?")
                .bind(request_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (manager_id,) = row.ok_or(WorkflowError::NotFound("leave request"))?;

        if !elevated && manager_id.as_deref() != Some(reviewer_id) {
            return Err(WorkflowError::Forbidden("leave request"));
        }

        let updated = sqlx::query("UPDATE leave_requests SET status = ? WHERE id = ? AND status = ?")
            .bind(decision.status().as_ref())
            .bind(request_id)
            .bind(LeaveStatus::Pending.as_ref())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(WorkflowError::AlreadyDecided("leave request"));
        }

        tx.commit().await?;

        info!(
            request_id,
            reviewer_id,
            decision = ?decision,
            "leave request decided"
        );
        Ok(())
    }
}

/// Rejects the submission when the team already has too many approved
/// requests overlapping the proposed range. The threshold scales with team
/// size: `ceil(team_size * CAPACITY_RATIO)`.
async fn check_team_capacity(
    conn: &mut SqliteConnection,
    team_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<(), WorkflowError> {
    let team_size: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM team_members WHERE team_id = ?")
        .bind(team_id)
        .fetch_one(&mut *conn)
        .await?;

    let approved_overlapping: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM leave_requests \
         WHERE team_id = ? AND status = ? AND start_date <= ? AND end_date >= ?",
    )
    .bind(team_id)
    .bind(LeaveStatus::Approved.as_ref())
    .bind(end_date)
    .bind(start_date)
    .fetch_one(&mut *conn)
    .await?;

    let threshold = (team_size as f64 * CAPACITY_RATIO).ceil() as i64;
    if approved_overlapping >= threshold {
        return Err(WorkflowError::TeamCapacityExceeded);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::{Duration, Utc};

    async fn seed_user(pool: &SqlitePool, id: &str) {
        sqlx::query(
            "INSERT INTO users (id, first_name, last_name, email, password, created_at) \
             VALUES (?, 'Test', 'User', ? || '@corp.test', 'x', ?)",
        )
        .bind(id)
        .bind(id)
        .bind(Utc::now())
        .execute(pool)
        .await
        .expect("insert user");
    }

    async fn seed_team(pool: &SqlitePool, id: i64, manager_id: &str) {
        sqlx::query("INSERT INTO teams (id, name, manager_id) VALUES (?, 'Team', ?)")
            .bind(id)
            .bind(manager_id)
            .execute(pool)
            .await
            .expect("insert team");
    }

    async fn join_team(pool: &SqlitePool, team_id: i64, user_id: &str) {
        let mut conn = pool.acquire().await.expect("acquire");
        membership::add_member(&mut conn, team_id, user_id, Utc::now())
            .await
            .expect("add member");
    }

    async fn seed_request(
        pool: &SqlitePool,
        employee_id: &str,
        team_id: i64,
        start: NaiveDate,
        end: NaiveDate,
        status: LeaveStatus,
        manager_id: &str,
    ) -> i64 {
        sqlx::query(
            "INSERT INTO leave_requests (employee_id, team_id, start_date, end_date, status, manager_id) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(employee_id)
        .bind(team_id)
        .bind(start)
        .bind(end)
        .bind(status.as_ref())
        .bind(manager_id)
        .execute(pool)
        .await
        .expect("insert leave request")
        .last_insert_rowid()
    }

    async fn status_of(pool: &SqlitePool, id: i64) -> String {
        sqlx::query_scalar("SELECT status FROM leave_requests WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .expect("status")
    }

    fn day(offset: i64) -> NaiveDate {
        Utc::now().date_naive() + Duration::days(offset)
    }

    /// One employee on team 1 managed by m1; capacity guard off unless a
    /// test opts in.
    async fn setup() -> (SqlitePool, LeaveService) {
        let pool = db::memory_pool().await;
        seed_user(&pool, "m1").await;
        seed_user(&pool, "emp-1").await;
        seed_team(&pool, 1, "m1").await;
        join_team(&pool, 1, "emp-1").await;
        let service = LeaveService::new(
            pool.clone(),
            LeavePolicy {
                capacity_guard: false,
            },
        );
        (pool, service)
    }

    #[tokio::test]
    async fn submit_snapshots_manager_and_lists_upcoming() {
        let (_pool, service) = setup().await;

        let request = service
            .submit("emp-1", day(5), day(10))
            .await
            .expect("submit");
        assert_eq!(request.status, "Pending");
        assert_eq!(request.manager_id.as_deref(), Some("m1"));
        assert_eq!(request.team_id, 1);

        let upcoming = service.list_upcoming("emp-1", day(0)).await.expect("list");
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].start_date, day(5));
    }

    #[tokio::test]
    async fn submit_rejects_end_before_start() {
        let (_pool, service) = setup().await;

        let err = service.submit("emp-1", day(5), day(4)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::ValidationFailed(_)));
        assert!(service
            .list_upcoming("emp-1", day(0))
            .await
            .expect("list")
            .is_empty());
    }

    #[tokio::test]
    async fn submit_requires_team_membership() {
        let (pool, service) = setup().await;
        seed_user(&pool, "loner").await;

        let err = service.submit("loner", day(1), day(2)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotOnTeam));
    }

    #[tokio::test]
    async fn submit_rejects_overlapping_request() {
        let (_pool, service) = setup().await;

        service
            .submit("emp-1", day(1), day(5))
            .await
            .expect("first submit");
        let err = service.submit("emp-1", day(3), day(6)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::OverlappingRequest));
    }

    #[tokio::test]
    async fn overlap_is_inclusive_at_the_edges() {
        let (_pool, service) = setup().await;

        service
            .submit("emp-1", day(1), day(5))
            .await
            .expect("first submit");
        // a range starting the day the existing one ends still overlaps
        let err = service.submit("emp-1", day(5), day(8)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::OverlappingRequest));
        // the day after is free
        service
            .submit("emp-1", day(6), day(8))
            .await
            .expect("adjacent submit");
    }

    #[tokio::test]
    async fn single_day_leave_is_a_one_point_range() {
        let (_pool, service) = setup().await;

        service
            .submit("emp-1", day(3), day(3))
            .await
            .expect("single-day submit");
        let err = service.submit("emp-1", day(3), day(3)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::OverlappingRequest));
        service
            .submit("emp-1", day(4), day(4))
            .await
            .expect("next day submit");
    }

    #[tokio::test]
    async fn rejected_requests_do_not_block_resubmission() {
        let (pool, service) = setup().await;
        seed_request(
            &pool,
            "emp-1",
            1,
            day(1),
            day(5),
            LeaveStatus::Rejected,
            "m1",
        )
        .await;

        service
            .submit("emp-1", day(2), day(6))
            .await
            .expect("resubmit over rejected range");
    }

    #[tokio::test]
    async fn capacity_guard_counts_approved_overlaps() {
        let pool = db::memory_pool().await;
        seed_user(&pool, "m1").await;
        seed_user(&pool, "emp-1").await;
        seed_user(&pool, "emp-2").await;
        seed_team(&pool, 1, "m1").await;
        join_team(&pool, 1, "emp-1").await;
        join_team(&pool, 1, "emp-2").await;
        // two members -> threshold ceil(2 * 0.05) = 1
        seed_request(
            &pool,
            "emp-2",
            1,
            day(3),
            day(4),
            LeaveStatus::Approved,
            "m1",
        )
        .await;

        let guarded = LeaveService::new(pool.clone(), LeavePolicy::default());
        let err = guarded.submit("emp-1", day(1), day(5)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::TeamCapacityExceeded));

        // a non-overlapping range passes the guard
        guarded
            .submit("emp-1", day(10), day(12))
            .await
            .expect("non-overlapping submit");

        // with the guard off the overlapping range is accepted
        let unguarded = LeaveService::new(
            pool.clone(),
            LeavePolicy {
                capacity_guard: false,
            },
        );
        unguarded
            .submit("emp-1", day(1), day(5))
            .await
            .expect("submit with guard off");
    }

    #[tokio::test]
    async fn pending_requests_do_not_trip_capacity_guard() {
        let pool = db::memory_pool().await;
        seed_user(&pool, "m1").await;
        seed_user(&pool, "emp-1").await;
        seed_user(&pool, "emp-2").await;
        seed_team(&pool, 1, "m1").await;
        join_team(&pool, 1, "emp-1").await;
        join_team(&pool, 1, "emp-2").await;
        seed_request(
            &pool,
            "emp-2",
            1,
            day(3),
            day(4),
            LeaveStatus::Pending,
            "m1",
        )
        .await;

        let guarded = LeaveService::new(pool, LeavePolicy::default());
        guarded
            .submit("emp-1", day(1), day(5))
            .await
            .expect("pending overlap of a teammate is not capacity");
    }

    #[tokio::test]
    async fn list_upcoming_hides_past_requests_keeps_all_statuses() {
        let (pool, service) = setup().await;
        seed_request(
            &pool,
            "emp-1",
            1,
            day(-10),
            day(-5),
            LeaveStatus::Approved,
            "m1",
        )
        .await;
        seed_request(
            &pool,
            "emp-1",
            1,
            day(6),
            day(10),
            LeaveStatus::Rejected,
            "m1",
        )
        .await;
        seed_request(
            &pool,
            "emp-1",
            1,
            day(1),
            day(5),
            LeaveStatus::Pending,
            "m1",
        )
        .await;

        let upcoming = service.list_upcoming("emp-1", day(0)).await.expect("list");
        assert_eq!(upcoming.len(), 2);
        assert_eq!(upcoming[0].start_date, day(1));
        assert_eq!(upcoming[1].start_date, day(6));
    }

    #[tokio::test]
    async fn review_queue_is_scoped_to_the_assigned_manager() {
        let (pool, service) = setup().await;
        seed_user(&pool, "m2").await;
        seed_user(&pool, "emp-2").await;
        seed_team(&pool, 2, "m2").await;
        join_team(&pool, 2, "emp-2").await;

        service.submit("emp-1", day(1), day(2)).await.expect("submit");
        service.submit("emp-2", day(3), day(4)).await.expect("submit");

        let mine = service
            .list_for_review(Some("m1"), false)
            .await
            .expect("list");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].employee_id, "emp-1");

        let all = service.list_for_review(Some("m1"), true).await.expect("list");
        assert_eq!(all.len(), 2);
        // descending by start date
        assert_eq!(all[0].employee_id, "emp-2");

        let anonymous = service.list_for_review(None, false).await.expect("list");
        assert!(anonymous.is_empty());
    }

    #[tokio::test]
    async fn elevated_review_queue_shows_pending_only() {
        let (pool, service) = setup().await;
        seed_request(
            &pool,
            "emp-1",
            1,
            day(1),
            day(2),
            LeaveStatus::Approved,
            "m1",
        )
        .await;
        service.submit("emp-1", day(4), day(5)).await.expect("submit");

        let all = service.list_for_review(Some("m1"), true).await.expect("list");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, "Pending");
    }

    #[tokio::test]
    async fn decide_enforces_manager_and_terminality() {
        let (pool, service) = setup().await;
        let request = service.submit("emp-1", day(1), day(2)).await.expect("submit");

        let err = service
            .decide(request.id, "someone-else", false, LeaveDecision::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        service
            .decide(request.id, "m1", false, LeaveDecision::Approve)
            .await
            .expect("decide");
        assert_eq!(status_of(&pool, request.id).await, "Approved");

        // terminal: a second decision fails and the status stays put
        let err = service
            .decide(request.id, "m1", false, LeaveDecision::Reject)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::AlreadyDecided(_)));
        assert_eq!(status_of(&pool, request.id).await, "Approved");
    }

    #[tokio::test]
    async fn decide_missing_request_is_not_found() {
        let (_pool, service) = setup().await;
        let err = service
            .decide(999, "m1", true, LeaveDecision::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }

    #[tokio::test]
    async fn elevated_reviewer_bypasses_manager_check() {
        let (pool, service) = setup().await;
        let request = service.submit("emp-1", day(1), day(2)).await.expect("submit");

        service
            .decide(request.id, "some-admin", true, LeaveDecision::Reject)
            .await
            .expect("elevated decide");
        assert_eq!(status_of(&pool, request.id).await, "Rejected");
    }

    #[tokio::test]
    async fn manager_snapshot_survives_team_reassignment() {
        let (pool, service) = setup().await;
        seed_user(&pool, "m2").await;
        let request = service.submit("emp-1", day(1), day(2)).await.expect("submit");

        sqlx::query("UPDATE teams SET manager_id = 'm2' WHERE id = 1")
            .execute(&pool)
            .await
            .expect("reassign manager");

        // the new team manager was never assigned to this request
        let err = service
            .decide(request.id, "m2", false, LeaveDecision::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        // the snapshotted manager still can decide it
        service
            .decide(request.id, "m1", false, LeaveDecision::Approve)
            .await
            .expect("snapshot manager decides");
    }
}
