use actix_cors::Cors;
use actix_web::{App, HttpServer, http::header, middleware::Logger, web};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;

use attendance_be::{
    AppState, Config, Stores, clock::SystemClock, database::init_database, routes,
};

#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init();

    let config = Config::from_env()?;
    log::info!(
        "Configuration loaded (environment: {}, zone: {})",
        config.environment,
        config.app_tz
    );

    let pool = init_database(&config.database_url()).await?;
    log::info!("Database initialized");

    let clock = Arc::new(SystemClock::new(config.business_zone()?));
    let state = web::Data::new(AppState::new(
        config.clone(),
        clock,
        Stores::postgres(pool),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = if config.leave_scheduler_enabled {
        Some(tokio::spawn(state.leave_scheduler().run(shutdown_rx)))
    } else {
        log::info!("Leave scheduler disabled");
        None
    };

    let server_address = config.server_address();
    log::info!("Server starting on http://{}", server_address);

    let origins = config.cors_allow_origins.clone();
    let server = HttpServer::new(move || {
        let cors = origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::ACCEPT,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .configure(routes::configure)
    })
    .bind(&server_address)?
    .run();

    let result = server.await;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = scheduler {
        if let Err(err) = handle.await {
            log::error!("Leave scheduler task failed: {}", err);
        }
    }

    result.map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
