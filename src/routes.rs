use crate::{
    api::{attendance, employee, leave, notification, payroll},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let burst = requests_per_min.max(1);
        let per_ms = (60_000 / burst as u64).max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(burst)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap_or_default();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter)
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter)
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(web::resource("/me").route(web::get().to(handlers::me)))
            .service(
                web::scope("/employee")
                    // /employee
                    .service(web::resource("").route(web::get().to(employee::list_employees)))
                    // /employee/{id}
                    .service(web::resource("/{id}").route(web::get().to(employee::get_employee))),
            )
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("")
                            .route(web::put().to(attendance::check_out))
                            .route(web::post().to(attendance::check_in)),
                    )
                    .service(web::resource("/me").route(web::get().to(attendance::my_attendance)))
                    .service(web::resource("/day").route(web::get().to(attendance::daily_attendance)))
                    // /attendance/month/2024-05
                    .service(
                        web::resource("/month/{month}")
                            .route(web::get().to(attendance::monthly_attendance)),
                    )
                    .service(
                        web::resource("/employee/{id}")
                            .route(web::get().to(attendance::employee_attendance)),
                    )
                    .service(
                        web::resource("/employee/{id}/calendar")
                            .route(web::get().to(attendance::employee_calendar)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave::list_leave))
                            .route(web::post().to(leave::submit_leave)),
                    )
                    // static segments before /leave/{id}
                    .service(web::resource("/pending").route(web::get().to(leave::pending_leave)))
                    .service(
                        web::resource("/employee/{id}").route(web::get().to(leave::employee_leave)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave::get_leave))
                            .route(web::patch().to(leave::update_leave)),
                    )
                    .service(web::resource("/{id}/approve").route(web::put().to(leave::approve_leave)))
                    .service(web::resource("/{id}/reject").route(web::put().to(leave::reject_leave))),
            )
            .service(
                web::scope("/notification")
                    // /notification
                    .service(
                        web::resource("")
                            .route(web::get().to(notification::list_notifications))
                            .route(web::post().to(notification::create_notification)),
                    )
                    // /notification/{user_id}
                    .service(
                        web::resource("/{user_id}")
                            .route(web::get().to(notification::user_notifications)),
                    ),
            )
            .service(
                web::scope("/payroll")
                    .service(web::resource("/pay-date").route(web::get().to(payroll::pay_date)))
                    // /payroll/staff?month=2024-05
                    .service(web::resource("/staff").route(web::get().to(payroll::staff)))
                    .service(
                        web::resource("/employee/{id}/stats")
                            .route(web::get().to(payroll::employee_stats)),
                    )
                    .service(
                        web::resource("/employee/{id}/months")
                            .route(web::get().to(payroll::employee_months)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns new access_token and refresh_token
