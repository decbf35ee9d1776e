//! Backend entry point: wires the stores, services, routes, and the daily
//! reset scheduler.

use actix_web::{web, App, HttpServer};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};
#[cfg(debug_assertions)]
use utoipa::OpenApi;

use dispatch_backend::api::health::HealthState;
#[cfg(debug_assertions)]
use dispatch_backend::doc::ApiDoc;
use dispatch_backend::server::{
    build_services, configure_api, scheduler, seed_example_data, Config, Stores,
};
use dispatch_backend::Trace;

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let config = Config::parse();
    let stores = Stores::new();
    if config.seed {
        seed_example_data(&stores)
            .await
            .map_err(|err| std::io::Error::other(format!("seeding failed: {err}")))?;
    }

    let services = web::Data::new(build_services(&stores, config.lockout_hours));
    let reset_job = services.reset_job.clone();
    let health_state = web::Data::new(HealthState::new());
    let server_health_state = health_state.clone();
    let server_services = services.clone();

    let server = HttpServer::new(move || {
        let app = App::new()
            .app_data(server_health_state.clone())
            .app_data(server_services.clone())
            .wrap(Trace)
            .configure(configure_api);
        #[cfg(debug_assertions)]
        let app = app.route(
            "/api-docs/openapi.json",
            web::get().to(|| async { web::Json(ApiDoc::openapi()) }),
        );
        app
    })
    .bind((config.bind_addr.as_str(), config.port))?;

    let scheduler_handle = scheduler::spawn_daily_reset(reset_job, config.reset_hour);
    health_state.mark_ready();
    let result = server.run().await;
    scheduler_handle.abort();
    result
}
