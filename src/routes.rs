use crate::{
    api::{attendance, payroll, staff},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::Condition, web};

// Helper to build the per-IP limiter; `requests_per_min` must be non-zero
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("period and burst are both non-zero");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let limiter = Condition::new(
        config.rate_protected_per_min > 0,
        build_limiter(config.rate_protected_per_min),
    );

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(limiter) // rate limiting
            .service(
                web::scope("/attendance")
                    // /attendance/{staff_id}?month=&year=
                    .service(
                        web::resource("/{staff_id}")
                            .route(web::get().to(attendance::monthly_attendance)),
                    )
                    // /attendance/{staff_id}/{date}
                    .service(
                        web::resource("/{staff_id}/{date}")
                            .route(web::put().to(attendance::mark_attendance)),
                    ),
            )
            .service(
                web::scope("/staff")
                    .service(
                        web::resource("/{staff_id}/salary").route(web::get().to(staff::get_salary)),
                    ),
            )
            .service(
                web::scope("/payroll")
                    // /payroll?month=&year=&staff_id=
                    .service(web::resource("").route(web::get().to(payroll::list_payrolls)))
                    // /payroll/generate
                    .service(
                        web::resource("/generate").route(web::post().to(payroll::generate_payroll)),
                    ),
            ),
    );
}
