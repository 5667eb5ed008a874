use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;

mod api;
mod clients;
mod clock;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod service;
mod store;
mod utils;

use crate::clients::appointment_directory::HttpAppointmentDirectory;
use crate::clients::employee_directory::HttpEmployeeDirectory;
use crate::clients::notification::HttpNotificationDispatcher;
use crate::clients::{AppointmentDirectory, EmployeeDirectory, NotificationDispatcher, http_client};
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, StoreBackend};
use crate::docs::ApiDoc;
use crate::routes::Limiters;
use crate::service::aggregator::DailyHoursAggregator;
use crate::service::assignment_manager::AssignmentManager;
use crate::service::events::{self, Notifier};
use crate::service::time_tracker::TimeTracker;
use crate::store::WorkStore;
use crate::store::memory::MemoryStore;
use crate::store::mysql::MySqlStore;
use db::init_db;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Workforce service is running"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(backend = %config.store_backend, "Server starting...");

    let store: Arc<dyn WorkStore> = match config.store_backend {
        StoreBackend::Mysql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set when STORE_BACKEND is mysql")?;
            Arc::new(MySqlStore::new(init_db(url, config.db_max_connections).await?))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let http = http_client(config.upstream_timeout)?;
    let employees: Arc<dyn EmployeeDirectory> =
        Arc::new(HttpEmployeeDirectory::new(http.clone(), &config.employee_directory_url));
    let appointments: Arc<dyn AppointmentDirectory> =
        Arc::new(HttpAppointmentDirectory::new(http.clone(), &config.appointment_directory_url));
    let notifications: Arc<dyn NotificationDispatcher> =
        Arc::new(HttpNotificationDispatcher::new(http, &config.notification_url));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let (sink, rx) = events::channel(config.notify_queue_capacity);
    let notifier = Notifier::new(notifications, appointments.clone(), config.fallback_sms_number.clone());
    actix_web::rt::spawn(notifier.run(rx));

    let aggregator = Arc::new(DailyHoursAggregator::new(store.clone(), clock.clone()));
    let tracker = Data::new(TimeTracker::new(store.clone(), aggregator.clone(), clock.clone()));
    let manager = Data::new(AssignmentManager::new(store, employees, appointments, clock, sink));
    let aggregator = Data::from(aggregator);

    let limiters = Limiters::from_config(&config)?;
    let api_prefix = config.api_prefix.clone();
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard so the JS/CSS assets resolve
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(manager.clone())
            .app_data(tracker.clone())
            .app_data(aggregator.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, &api_prefix, &limiters))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {}", server_addr))?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}
