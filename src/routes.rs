use crate::{
    api::{admin, job_application, job_posting, leave_request, team},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    governor::middleware::NoOpMiddleware, Governor, GovernorConfig, GovernorConfigBuilder,
    PeerIpKeyExtractor,
};
use actix_web::{middleware::from_fn, web};

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter configuration
    fn limiter_config(requests_per_min: u32) -> GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap()
    }

    let login_conf = limiter_config(config.rate_login_per_min);
    let register_conf = limiter_config(config.rate_register_per_min);
    let refresh_conf = limiter_config(config.rate_refresh_per_min);
    let protected_conf = limiter_config(config.rate_protected_per_min);

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(Governor::new(&login_conf))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(Governor::new(&register_conf))
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(Governor::new(&refresh_conf))
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(Governor::new(&login_conf))
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(Governor::new(&protected_conf)) // rate limiting
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::my_leave))
                            .route(web::post().to(leave_request::submit_leave)),
                    )
                    // /leave/review
                    .service(
                        web::resource("/review")
                            .route(web::get().to(leave_request::review_queue)),
                    )
                    // /leave/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    // /leave/{id}/reject
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    ),
            )
            .service(
                web::scope("/postings")
                    // /postings
                    .service(
                        web::resource("")
                            .route(web::get().to(job_posting::list_postings))
                            .route(web::post().to(job_posting::create_posting)),
                    )
                    // /postings/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(job_posting::get_posting))
                            .route(web::put().to(job_posting::update_posting))
                            .route(web::delete().to(job_posting::delete_posting)),
                    )
                    // /postings/{id}/applicants
                    .service(
                        web::resource("/{id}/applicants")
                            .route(web::get().to(job_posting::list_posting_applicants)),
                    )
                    // /postings/{id}/apply
                    .service(
                        web::resource("/{id}/apply").route(web::post().to(job_posting::apply)),
                    ),
            )
            .service(
                web::scope("/applications")
                    // /applications/log
                    .service(
                        web::resource("/log")
                            .route(web::get().to(job_application::processed_log)),
                    )
                    // /applications/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::post().to(job_application::approve_application)),
                    )
                    // /applications/{id}/deny
                    .service(
                        web::resource("/{id}/deny")
                            .route(web::post().to(job_application::deny_application)),
                    ),
            )
            .service(
                web::scope("/teams")
                    // /teams
                    .service(
                        web::resource("")
                            .route(web::get().to(team::list_teams))
                            .route(web::post().to(team::create_team)),
                    )
                    // /teams/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(team::get_team))
                            .route(web::put().to(team::update_team))
                            .route(web::delete().to(team::delete_team)),
                    )
                    // /teams/{id}/members
                    .service(
                        web::resource("/{id}/members")
                            .route(web::post().to(team::add_team_member)),
                    )
                    // /teams/{id}/members/{user_id}
                    .service(
                        web::resource("/{id}/members/{user_id}")
                            .route(web::delete().to(team::remove_team_member)),
                    ),
            )
            .service(
                web::scope("/users")
                    // /users
                    .service(web::resource("").route(web::get().to(admin::list_users)))
                    // /users/{id}
                    .service(web::resource("/{id}").route(web::get().to(admin::get_user))),
            ),
    );
}
