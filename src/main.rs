use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;

mod api;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod routes;
mod service;
mod store;
mod utils;

use api::AppState;
use config::Config;
use db::{init_db, run_migrations};
use store::{Backend, MemoryStore, MySqlStore};
use utils::salary_cache::SalaryCache;

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Hotel payroll service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let backend: Arc<dyn Backend> = if config.uses_memory_store() {
        warn!("DATABASE_URL=memory, data will not survive a restart");
        let store = MemoryStore::new();
        for (staff_id, basic_salary) in &config.memory_staff {
            store.put_staff(staff_id, *basic_salary);
        }
        info!(staff = config.memory_staff.len(), "Memory store seeded");
        Arc::new(store)
    } else {
        let pool = init_db(&config.database_url, config.backend_timeout).await?;
        if config.run_migrations {
            run_migrations(&pool).await?;
            info!("Migrations applied");
        }
        Arc::new(MySqlStore::new(pool, config.backend_timeout))
    };

    let state = Data::new(AppState::new(
        backend,
        SalaryCache::new(config.salary_cache_ttl),
        config.payroll_policy,
    ));

    // Clone values for the closure (avoid move issues)
    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
