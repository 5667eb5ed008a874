use std::sync::Arc;

use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;

use crate::{
    api::{assignment, time_log, work_hours},
    config::Config,
    error::AppError,
};

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Built once in `main` so every worker shares the same buckets.
#[derive(Clone)]
pub struct Limiters {
    protected: Limiter,
    assign: Limiter,
}

impl Limiters {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            protected: Arc::new(build_limiter(config.rate_protected_per_min)?),
            assign: Arc::new(build_limiter(config.rate_assign_per_min)?),
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, api_prefix: &str, limiters: &Limiters) {
    cfg.app_data(query_config()).app_data(json_config()).service(
        web::scope(api_prefix)
            .wrap(limiters.protected.clone())
            .service(
                web::scope("/assignments")
                    // placement hits the employee directory, keep it tighter
                    .wrap(limiters.assign.clone())
                    .configure(assignment::routes),
            )
            .service(
                web::scope("/timelogs")
                    .configure(time_log::routes)
                    .configure(work_hours::routes),
            ),
    );
}

fn build_limiter(requests_per_min: u32) -> anyhow::Result<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit: {} per minute", requests_per_min))?;
    Ok(Governor::new(&cfg))
}

/// Malformed query strings and bodies get the same envelope as every other 400.
fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into())
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into())
}
