//! Job application workflow: applying against a posting, the recruiter's
//! pending queue, the processed-history log, and the approve/deny decisions.
//! Approval mutates the applicant's roles, salary and team membership
//! together with the application status inside a single transaction.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;
use utoipa::ToSchema;

use crate::error::WorkflowError;
use crate::model::job_application::{ApplicationStatus, JobApplication};
use crate::model::job_posting::JobPosting;
use crate::model::role::Role;
use crate::model::team::Team;
use crate::service::{identity, membership};
use crate::validation;

#[derive(Clone)]
pub struct ApplicationService {
    pool: SqlitePool,
}

/// Filters for the processed-applications log. All text filters are
/// case-insensitive substring matches.
#[derive(Debug, Default)]
pub struct ProcessedFilter {
    pub title: Option<String>,
    pub posted_date: Option<NaiveDate>,
    pub recruiter: Option<String>,
    pub applicant_name: Option<String>,
}

/// An approved or denied application joined with its posting and recruiter,
/// as shown in the audit log.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct ProcessedApplication {
    pub id: i64,
    pub applicant_name: String,
    pub applicant_email: String,
    pub status: String,
    pub denial_reason: Option<String>,
    pub job_title: String,
    #[schema(value_type = String, format = "date-time")]
    pub posted_date: chrono::DateTime<Utc>,
    pub recruiter_name: String,
}

enum FilterValue {
    Str(String),
    Date(NaiveDate),
}

impl ApplicationService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates a Pending application. The applicant's display name is
    /// captured from their profile at this moment and never updated.
    pub async fn apply(
        &self,
        job_posting_id: i64,
        applicant_email: &str,
        resume_url: &str,
    ) -> Result<JobApplication, WorkflowError> {
        validation::validate_email(applicant_email)?;
        validation::validate_resume_url(resume_url)?;

        let mut tx = self.pool.begin().await?;

        let posting = sqlx::query_as::<_, JobPosting>("SELECT * FROM job_postings WHERE id = ?")
            .bind(job_posting_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(WorkflowError::NotFound("job posting"))?;

        let applicant = identity::find_by_email(&mut tx, applicant_email)
            .await?
            .ok_or(WorkflowError::NotFound("applicant"))?;

        // one outstanding application system-wide, regardless of posting
        let has_pending: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM job_applications \
             WHERE lower(applicant_email) = lower(?) AND status = ?)",
        )
        .bind(applicant_email.trim())
        .bind(ApplicationStatus::Pending.as_ref())
        .fetch_one(&mut *tx)
        .await?;
        if has_pending {
            return Err(WorkflowError::DuplicatePendingApplication);
        }

        let applicant_name = applicant.full_name();
        let resume_url = resume_url.trim();
        let email = applicant_email.trim();
        let id = sqlx::query(
            "INSERT INTO job_applications \
             (applicant_name, applicant_email, resume_url, status, job_posting_id) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&applicant_name)
        .bind(email)
        .bind(resume_url)
        .bind(ApplicationStatus::Pending.as_ref())
        .bind(posting.id)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;

        info!(
            application_id = id,
            job_posting_id, "job application submitted"
        );

        Ok(JobApplication {
            id,
            applicant_name,
            applicant_email: email.to_owned(),
            resume_url: resume_url.to_owned(),
            status: ApplicationStatus::Pending.to_string(),
            job_posting_id: posting.id,
            denial_reason: None,
        })
    }

    /// Approves a pending application. Role swap, salary, team membership
    /// and the status flip land in one transaction; any failure leaves the
    /// application Pending with none of the side effects applied.
    pub async fn approve(
        &self,
        application_id: i64,
        salary: f64,
        team_id: i64,
    ) -> Result<(), WorkflowError> {
        if !salary.is_finite() || salary < 0.0 {
            return Err(WorkflowError::validation("salary must be a non-negative amount"));
        }

        let mut tx = self.pool.begin().await?;

        let application =
            sqlx::query_as::<_, JobApplication>("SELECT * FROM job_applications WHERE id = ?")
                .bind(application_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(WorkflowError::NotFound("job application"))?;
        if application.status != ApplicationStatus::Pending.as_ref() {
            return Err(WorkflowError::AlreadyDecided("job application"));
        }

        let applicant = identity::find_by_email(&mut tx, &application.applicant_email)
            .await?
            .ok_or(WorkflowError::NotFound("applicant"))?;

        let team = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = ?")
            .bind(team_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(WorkflowError::NotFound("team"))?;

        if identity::has_role(&mut tx, &applicant.id, Role::User).await? {
            identity::revoke_role(&mut tx, &applicant.id, Role::User).await?;
        }
        if !identity::has_role(&mut tx, &applicant.id, Role::Employee).await? {
            identity::grant_role(&mut tx, &applicant.id, Role::Employee).await?;
        }
        identity::set_salary(&mut tx, &applicant.id, salary).await?;
        membership::add_member(&mut tx, team.id, &applicant.id, Utc::now()).await?;

        let updated =
            sqlx::query("UPDATE job_applications SET status = ? WHERE id = ? AND status = ?")
                .bind(ApplicationStatus::Approved.as_ref())
                .bind(application_id)
                .bind(ApplicationStatus::Pending.as_ref())
                .execute(&mut *tx)
                .await?
                .rows_affected();
        if updated == 0 {
            return Err(WorkflowError::AlreadyDecided("job application"));
        }

        tx.commit().await?;

        info!(
            application_id,
            applicant_id = %applicant.id,
            team_id,
            "job application approved"
        );
        Ok(())
    }

    /// Denies a pending application with a mandatory reason.
    pub async fn deny(&self, application_id: i64, reason: &str) -> Result<(), WorkflowError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::validation("denial reason is required"));
        }

        let mut tx = self.pool.begin().await?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM job_applications WHERE id = ?)")
                .bind(application_id)
                .fetch_one(&mut *tx)
                .await?;
        if !exists {
            return Err(WorkflowError::NotFound("job application"));
        }

        let updated = sqlx::query(
            "UPDATE job_applications SET status = ?, denial_reason = ? WHERE id = ? AND status = ?",
        )
        .bind(ApplicationStatus::Denied.as_ref())
        .bind(reason)
        .bind(application_id)
        .bind(ApplicationStatus::Pending.as_ref())
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(WorkflowError::AlreadyDecided("job application"));
        }

        tx.commit().await?;

        info!(application_id, "job application denied");
        Ok(())
    }

    /// The recruiter's working queue: applications for the posting that
    /// still await a decision.
    pub async fn list_applicants(
        &self,
        job_posting_id: i64,
    ) -> Result<Vec<JobApplication>, WorkflowError> {
        let applications = sqlx::query_as::<_, JobApplication>(
            "SELECT * FROM job_applications \
             WHERE job_posting_id = ? AND status NOT IN (?, ?) \
             ORDER BY id",
        )
        .bind(job_posting_id)
        .bind(ApplicationStatus::Approved.as_ref())
        .bind(ApplicationStatus::Denied.as_ref())
        .fetch_all(&self.pool)
        .await?;
        Ok(applications)
    }

    /// Approved/denied history across postings with optional filters.
    pub async fn list_processed(
        &self,
        filter: &ProcessedFilter,
    ) -> Result<Vec<ProcessedApplication>, WorkflowError> {
        let mut sql = String::from(
            "SELECT ja.id, ja.applicant_name, ja.applicant_email, ja.status, ja.denial_reason, \
                    jp.title AS job_title, jp.posted_date, \
                    u.first_name || ' ' || u.last_name AS recruiter_name \
             FROM job_applications ja \
             JOIN job_postings jp ON jp.id = ja.job_posting_id \
             JOIN users u ON u.id = jp.recruiter_id \
             WHERE ja.status IN (?, ?)",
        );
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(title) = filter.title.as_deref().filter(|t| !t.trim().is_empty()) {
            sql.push_str(" AND lower(jp.title) LIKE ?");
            args.push(FilterValue::Str(like_pattern(title)));
        }
        if let Some(date) = filter.posted_date {
            sql.push_str(" AND date(jp.posted_date) = ?");
            args.push(FilterValue::Date(date));
        }
        if let Some(recruiter) = filter.recruiter.as_deref().filter(|r| !r.trim().is_empty()) {
            sql.push_str(
                " AND (lower(u.first_name) LIKE ? OR lower(u.last_name) LIKE ? OR lower(u.email) LIKE ?)",
            );
            let pattern = like_pattern(recruiter);
            args.push(FilterValue::Str(pattern.clone()));
            args.push(FilterValue::Str(pattern.clone()));
            args.push(FilterValue::Str(pattern));
        }
        if let Some(name) = filter
            .applicant_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
        {
            sql.push_str(" AND lower(ja.applicant_name) LIKE ?");
            args.push(FilterValue::Str(like_pattern(name)));
        }

        sql.push_str(" ORDER BY jp.posted_date DESC, ja.id DESC");

        let mut query = sqlx::query_as::<_, ProcessedApplication>(&sql)
            .bind(ApplicationStatus::Approved.as_ref())
            .bind(ApplicationStatus::Denied.as_ref());
        for arg in args {
            query = match arg {
                FilterValue::Str(s) => query.bind(s),
                FilterValue::Date(d) => query.bind(d),
            };
        }

        let processed = query.fetch_all(&self.pool).await?;
        Ok(processed)
    }
}

fn like_pattern(term: &str) -> String {
    format!("%{}%", term.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::model::user::User;

    async fn seed_user(pool: &SqlitePool, id: &str, first: &str, last: &str, email: &str) {
        sqlx::query(
            "INSERT INTO users (id, first_name, last_name, email, password, created_at) \
             VALUES (?, ?, ?, ?, 'x', ?)",
        )
        .bind(id)
        .bind(first)
        .bind(last)
        .bind(email)
        .bind(Utc::now())
        .execute(pool)
        .await
        .expect("insert user");
    }

    async fn seed_posting(pool: &SqlitePool, id: i64, title: &str, recruiter_id: &str) {
        sqlx::query(
            "INSERT INTO job_postings (id, title, description, posted_date, recruiter_id) \
             VALUES (?, ?, 'A role description', ?, ?)",
        )
        .bind(id)
        .bind(title)
        .bind(Utc::now())
        .bind(recruiter_id)
        .execute(pool)
        .await
        .expect("insert posting");
    }

    async fn grant(pool: &SqlitePool, user_id: &str, role: Role) {
        let mut conn = pool.acquire().await.expect("acquire");
        identity::grant_role(&mut conn, user_id, role)
            .await
            .expect("grant role");
    }

    async fn user(pool: &SqlitePool, id: &str) -> User {
        let mut conn = pool.acquire().await.expect("acquire");
        identity::find_by_id(&mut conn, id)
            .await
            .expect("query")
            .expect("user exists")
    }

    async fn roles(pool: &SqlitePool, id: &str) -> Vec<String> {
        let mut conn = pool.acquire().await.expect("acquire");
        identity::role_names(&mut conn, id).await.expect("roles")
    }

    async fn app_status(pool: &SqlitePool, id: i64) -> String {
        sqlx::query_scalar("SELECT status FROM job_applications WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .expect("status")
    }

    /// Recruiter rec-1 with posting 7, candidate cand-1 holding role "User",
    /// and team 2 available for placement.
    async fn setup() -> (SqlitePool, ApplicationService) {
        let pool = db::memory_pool().await;
        seed_user(&pool, "rec-1", "Robin", "Hale", "robin@corp.test").await;
        seed_user(&pool, "m1", "Morgan", "Reyes", "morgan@corp.test").await;
        seed_user(&pool, "cand-1", "Casey", "Quinn", "casey@jobs.test").await;
        grant(&pool, "rec-1", Role::Recruiter).await;
        grant(&pool, "cand-1", Role::User).await;
        seed_posting(&pool, 7, "Backend Engineer", "rec-1").await;
        sqlx::query("INSERT INTO teams (id, name, manager_id) VALUES (2, 'Platform', 'm1')")
            .execute(&pool)
            .await
            .expect("insert team");
        let service = ApplicationService::new(pool.clone());
        (pool, service)
    }

    #[tokio::test]
    async fn apply_creates_pending_application_with_name_snapshot() {
        let (pool, service) = setup().await;

        let application = service
            .apply(7, "casey@jobs.test", "https://files.example.com/casey.pdf")
            .await
            .expect("apply");
        assert_eq!(application.status, "Pending");
        assert_eq!(application.applicant_name, "Casey Quinn");

        // renaming the user later must not touch the stored snapshot
        sqlx::query("UPDATE users SET first_name = 'Cass' WHERE id = 'cand-1'")
            .execute(&pool)
            .await
            .expect("rename");
        let stored: String =
            sqlx::query_scalar("SELECT applicant_name FROM job_applications WHERE id = ?")
                .bind(application.id)
                .fetch_one(&pool)
                .await
                .expect("fetch");
        assert_eq!(stored, "Casey Quinn");
    }

    #[tokio::test]
    async fn apply_requires_an_existing_posting() {
        let (_pool, service) = setup().await;
        let err = service
            .apply(999, "casey@jobs.test", "https://files.example.com/casey.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound("job posting")));
    }

    #[tokio::test]
    async fn apply_rejects_malformed_input() {
        let (_pool, service) = setup().await;
        let err = service
            .apply(7, "not-an-email", "https://files.example.com/casey.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ValidationFailed(_)));

        let err = service
            .apply(7, "casey@jobs.test", "ftp://files.example.com/casey.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn one_pending_application_per_email_across_postings() {
        let (pool, service) = setup().await;
        seed_posting(&pool, 8, "Support Engineer", "rec-1").await;

        service
            .apply(7, "casey@jobs.test", "https://files.example.com/casey.pdf")
            .await
            .expect("first apply");

        // different posting, different case, same applicant
        let err = service
            .apply(8, "CASEY@JOBS.TEST", "https://files.example.com/casey.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::DuplicatePendingApplication));
    }

    #[tokio::test]
    async fn denied_application_frees_the_applicant_to_reapply() {
        let (_pool, service) = setup().await;
        let first = service
            .apply(7, "casey@jobs.test", "https://files.example.com/casey.pdf")
            .await
            .expect("apply");
        service
            .deny(first.id, "position filled")
            .await
            .expect("deny");

        service
            .apply(7, "casey@jobs.test", "https://files.example.com/casey.pdf")
            .await
            .expect("second apply after denial");
    }

    #[tokio::test]
    async fn approve_applies_every_side_effect_together() {
        let (pool, service) = setup().await;
        let application = service
            .apply(7, "casey@jobs.test", "https://files.example.com/casey.pdf")
            .await
            .expect("apply");

        service
            .approve(application.id, 60_000.0, 2)
            .await
            .expect("approve");

        let applicant = user(&pool, "cand-1").await;
        assert_eq!(applicant.salary, Some(60_000.0));

        let role_names = roles(&pool, "cand-1").await;
        assert!(role_names.contains(&"Employee".to_string()));
        assert!(!role_names.contains(&"User".to_string()));

        {
            let mut conn = pool.acquire().await.expect("acquire");
            let membership = membership::membership_of(&mut conn, "cand-1")
                .await
                .expect("query")
                .expect("membership");
            assert_eq!(membership.team_id, 2);
        }

        assert_eq!(app_status(&pool, application.id).await, "Approved");
    }

    #[tokio::test]
    async fn approve_with_unknown_team_changes_nothing() {
        let (pool, service) = setup().await;
        let application = service
            .apply(7, "casey@jobs.test", "https://files.example.com/casey.pdf")
            .await
            .expect("apply");

        let err = service.approve(application.id, 60_000.0, 999).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound("team")));

        // nothing from the aborted transaction may be visible
        let applicant = user(&pool, "cand-1").await;
        assert_eq!(applicant.salary, None);
        assert!(roles(&pool, "cand-1").await.contains(&"User".to_string()));
        assert_eq!(app_status(&pool, application.id).await, "Pending");
    }

    #[tokio::test]
    async fn approve_is_terminal() {
        let (pool, service) = setup().await;
        let application = service
            .apply(7, "casey@jobs.test", "https://files.example.com/casey.pdf")
            .await
            .expect("apply");
        service.deny(application.id, "not a fit").await.expect("deny");

        let err = service.approve(application.id, 60_000.0, 2).await.unwrap_err();
        assert!(matches!(err, WorkflowError::AlreadyDecided(_)));

        // the denial stands and none of the approval side effects leaked
        assert_eq!(app_status(&pool, application.id).await, "Denied");
        assert_eq!(user(&pool, "cand-1").await.salary, None);
        assert!(!roles(&pool, "cand-1").await.contains(&"Employee".to_string()));
    }

    #[tokio::test]
    async fn deny_requires_a_reason() {
        let (pool, service) = setup().await;
        let application = service
            .apply(7, "casey@jobs.test", "https://files.example.com/casey.pdf")
            .await
            .expect("apply");

        let err = service.deny(application.id, "   ").await.unwrap_err();
        assert!(matches!(err, WorkflowError::ValidationFailed(_)));
        assert_eq!(app_status(&pool, application.id).await, "Pending");
    }

    #[tokio::test]
    async fn deny_stores_reason_and_is_terminal() {
        let (pool, service) = setup().await;
        let application = service
            .apply(7, "casey@jobs.test", "https://files.example.com/casey.pdf")
            .await
            .expect("apply");

        service
            .deny(application.id, "position filled")
            .await
            .expect("deny");
        let reason: Option<String> =
            sqlx::query_scalar("SELECT denial_reason FROM job_applications WHERE id = ?")
                .bind(application.id)
                .fetch_one(&pool)
                .await
                .expect("fetch");
        assert_eq!(reason.as_deref(), Some("position filled"));

        let err = service.deny(application.id, "again").await.unwrap_err();
        assert!(matches!(err, WorkflowError::AlreadyDecided(_)));
    }

    #[tokio::test]
    async fn deny_missing_application_is_not_found() {
        let (_pool, service) = setup().await;
        let err = service.deny(999, "whatever").await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }

    #[tokio::test]
    async fn applicant_queue_shows_pending_only() {
        let (pool, service) = setup().await;
        seed_user(&pool, "cand-2", "Dana", "Frost", "dana@jobs.test").await;
        let first = service
            .apply(7, "casey@jobs.test", "https://files.example.com/casey.pdf")
            .await
            .expect("apply");
        service
            .apply(7, "dana@jobs.test", "https://files.example.com/dana.pdf")
            .await
            .expect("apply");
        service.deny(first.id, "position filled").await.expect("deny");

        let queue = service.list_applicants(7).await.expect("queue");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].applicant_email, "dana@jobs.test");
    }

    #[tokio::test]
    async fn processed_log_filters_by_title_and_applicant() {
        let (pool, service) = setup().await;
        seed_user(&pool, "cand-2", "Dana", "Frost", "dana@jobs.test").await;
        seed_posting(&pool, 8, "Support Engineer", "rec-1").await;

        let casey = service
            .apply(7, "casey@jobs.test", "https://files.example.com/casey.pdf")
            .await
            .expect("apply");
        let dana = service
            .apply(8, "dana@jobs.test", "https://files.example.com/dana.pdf")
            .await
            .expect("apply");
        service.approve(casey.id, 55_000.0, 2).await.expect("approve");
        service.deny(dana.id, "role closed").await.expect("deny");

        // pending rows never show up
        let all = service
            .list_processed(&ProcessedFilter::default())
            .await
            .expect("log");
        assert_eq!(all.len(), 2);

        let backend = service
            .list_processed(&ProcessedFilter {
                title: Some("backend".into()),
                ..Default::default()
            })
            .await
            .expect("log");
        assert_eq!(backend.len(), 1);
        assert_eq!(backend[0].applicant_name, "Casey Quinn");
        assert_eq!(backend[0].recruiter_name, "Robin Hale");

        let dana_rows = service
            .list_processed(&ProcessedFilter {
                applicant_name: Some("FROST".into()),
                ..Default::default()
            })
            .await
            .expect("log");
        assert_eq!(dana_rows.len(), 1);
        assert_eq!(dana_rows[0].status, "Denied");
        assert_eq!(dana_rows[0].denial_reason.as_deref(), Some("role closed"));

        let nobody = service
            .list_processed(&ProcessedFilter {
                recruiter: Some("zzz".into()),
                ..Default::default()
            })
            .await
            .expect("log");
        assert!(nobody.is_empty());
    }
}
