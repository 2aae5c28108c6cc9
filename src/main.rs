mod collectors;
mod config;
mod db;
mod error;
mod models;
mod routes;

use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use clap::Parser;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::config::{Command, Config, ScrapeArgs};

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn readyz(pool: PgPool) -> impl IntoResponse {
    let result: Result<(i32,), _> = sqlx::query_as("SELECT 1").fetch_one(&pool).await;
    match result {
        Ok(_) => (StatusCode::OK, "ready"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready"),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("actuaryboard=info,tower_http=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;

    if config.run_migrations {
        tracing::info!("Running database migrations...");
        db::run_migrations(&pool).await?;
        tracing::info!("Migrations complete");
    }
    Ok(pool)
}

async fn serve(config: &Config, listen_addr: &str) -> anyhow::Result<()> {
    let pool = connect(config).await?;

    let readyz_pool = pool.clone();
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(move || readyz(readyz_pool.clone())))
        .merge(routes::api::router(pool))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!("Listening on {listen_addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn scrape(config: &Config, args: &ScrapeArgs) -> anyhow::Result<()> {
    let pool = if args.dry_run {
        None
    } else {
        Some(connect(config).await?)
    };

    let report = collectors::runner::run(pool, args).await?;
    match report.summary {
        Some(summary) => tracing::info!(
            run_id = %report.run_id,
            "Scrape finished: {} scraped, {} saved, {} duplicates, {} failed",
            report.scraped,
            summary.saved,
            summary.duplicates,
            summary.failed
        ),
        None => tracing::info!(
            run_id = %report.run_id,
            "Scrape finished: {} scraped, nothing written",
            report.scraped
        ),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();
    init_tracing(config.log_json);

    match config.resolved_command() {
        Command::Serve { listen_addr } => serve(&config, &listen_addr).await,
        Command::Scrape(args) => scrape(&config, &args).await,
    }
}
