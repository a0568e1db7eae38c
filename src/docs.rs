use crate::api::admin::{UserDetail, UserSummary};
use crate::api::job_application::{ApproveApplicationReq, DenyApplicationReq};
use crate::api::job_posting::{ApplyReq, CreatePosting, PostingResponse, UpdatePosting};
use crate::api::leave_request::CreateLeave;
use crate::api::team::{AddMemberReq, CreateTeam, TeamDetails, TeamMemberDetail, TeamSummary, UpdateTeam};
use crate::model::job_application::JobApplication;
use crate::model::job_posting::JobPosting;
use crate::model::leave_request::LeaveRequest;
use crate::model::team::{Team, TeamMember};
use crate::models::{LoginReq, RegisterReq};
use crate::service::application::ProcessedApplication;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{openapi, Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HR Platform API",
        version = "1.0.0",
        description = r#"
## HR Platform

Internal HR backend: employees submit leave requests and managers review
them, recruiters post jobs and process applications, admins manage users
and teams.

### Key areas
- **Leave** — submit, view upcoming, review and decide leave requests
- **Postings** — publish job postings and collect applications
- **Applications** — approve (hire into a team) or deny with a reason
- **Teams** — team and membership administration
- **Admin** — user directory

### Security
All non-auth endpoints require **JWT Bearer authentication**.
"#,
    ),
    paths(
        crate::api::leave_request::submit_leave,
        crate::api::leave_request::my_leave,
        crate::api::leave_request::review_queue,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,

        crate::api::job_posting::list_postings,
        crate::api::job_posting::create_posting,
        crate::api::job_posting::get_posting,
        crate::api::job_posting::update_posting,
        crate::api::job_posting::delete_posting,
        crate::api::job_posting::list_posting_applicants,
        crate::api::job_posting::apply,

        crate::api::job_application::approve_application,
        crate::api::job_application::deny_application,
        crate::api::job_application::processed_log,

        crate::api::team::list_teams,
        crate::api::team::get_team,
        crate::api::team::create_team,
        crate::api::team::update_team,
        crate::api::team::delete_team,
        crate::api::team::add_team_member,
        crate::api::team::remove_team_member,

        crate::api::admin::list_users,
        crate::api::admin::get_user
    ),
    components(
        schemas(
            CreateLeave,
            LeaveRequest,
            CreatePosting,
            UpdatePosting,
            ApplyReq,
            PostingResponse,
            JobPosting,
            JobApplication,
            ApproveApplicationReq,
            DenyApplicationReq,
            ProcessedApplication,
            CreateTeam,
            UpdateTeam,
            AddMemberReq,
            Team,
            TeamMember,
            TeamSummary,
            TeamMemberDetail,
            TeamDetails,
            UserSummary,
            UserDetail,
            RegisterReq,
            LoginReq
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave request workflow"),
        (name = "Postings", description = "Job posting management"),
        (name = "Applications", description = "Job application workflow"),
        (name = "Teams", description = "Team administration"),
        (name = "Admin", description = "User administration"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
