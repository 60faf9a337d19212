use actix_web::{web, App, HttpResponse, HttpServer};
use std::io;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use listing_service::db::{PgBoostScheduleStore, PgModerationLogStore, PgPostStore};
use listing_service::jobs::Scheduler;
use listing_service::Config;

struct HealthState {
    db_pool: sqlx::PgPool,
}

async fn health_summary(state: web::Data<HealthState>) -> HttpResponse {
    match sqlx::query("SELECT 1").fetch_one(&state.db_pool).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "listing-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("PostgreSQL connection failed: {}", e),
            "service": "listing-service"
        })),
    }
}

async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}

async fn metrics_export() -> HttpResponse {
    match listing_service::metrics::export() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => {
            tracing::error!("Metrics encoding failed: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting listing-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    // Initialize database connection pool
    let mut db_cfg = db_pool::DbConfig::from_env("listing-service").unwrap_or_default();
    if db_cfg.database_url.is_empty() {
        db_cfg.database_url = config.database.url.clone();
    }
    if db_cfg.max_connections < config.database.max_connections {
        db_cfg.max_connections = config.database.max_connections;
    }

    db_cfg.log_config();
    let db_pool = match db_pool::create_pool(db_cfg).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database pool creation failed: {:#}", e);
            eprintln!("ERROR: Failed to create database pool: {}", e);
            std::process::exit(1);
        }
    };

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|e| {
            tracing::error!("Migration failed: {}", e);
            io::Error::new(io::ErrorKind::Other, format!("migration failed: {e}"))
        })?;
    tracing::info!("Migrations completed successfully");

    // Wire the stores and start the lifecycle scheduler
    let posts = Arc::new(PgPostStore::new(db_pool.clone()));
    let boosts = Arc::new(PgBoostScheduleStore::new(db_pool.clone()));
    let moderation_log = Arc::new(PgModerationLogStore::new(db_pool.clone()));

    let scheduler = Scheduler::start(
        posts,
        boosts,
        moderation_log,
        &config.scheduler,
    );

    // Health and metrics surface; the marketplace API lives elsewhere
    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let health_pool = db_pool.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(HealthState {
                db_pool: health_pool.clone(),
            }))
            .route("/health", web::get().to(health_summary))
            .route("/health/live", web::get().to(liveness_check))
            .route("/metrics", web::get().to(metrics_export))
    })
    .bind(&bind_address)?
    .disable_signals()
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");

    // Stop taking traffic first, then drain the workers
    server_handle.stop(true).await;
    scheduler.shutdown().await;

    if let Err(e) = server_task.await {
        tracing::warn!("HTTP server task failed: {}", e);
    }

    tracing::info!("listing-service stopped");
    Ok(())
}
