mod admin;
mod auth;
mod codes;
mod config;
mod context;
mod dao;
mod error;
mod hasher;
mod ledger;
mod mail;
mod migrations;
mod model;
mod routes;
mod stats;
mod store;
mod tasks;
mod tracking;
mod utils;

use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use axum::{serve, Router};
use config::AppConfig;
use context::AppContext;
use dotenvy::dotenv;
use ledger::VisitorLedger;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::compression::CompressionLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_TRACING_LEVEL: &str = "portfolio_site=debug";
const DATABASE_MAX_CONNECTIONS: u32 = 5;
const PRUNING_JOB_CRON_EXPRESSION: &str = "0 0 4 * * *";

#[tokio::main]
async fn main() {
    _ = dotenv();
    configure_tracing();
    let config = AppConfig::from_env();
    let db_connection_pool = create_db_connection_pool(&config.database_url).await;
    migrations::run(&db_connection_pool)
        .await
        .expect("Applying schema migrations failed");
    let context = AppContext::new(config.clone(), db_connection_pool.clone())
        .expect("Building application context failed");
    prune_on_startup(&context);
    configure_scheduler(db_connection_pool).await;
    let listener = create_listener(&config.server_address).await;
    let router = create_router(context);
    serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server failed to start");
}

fn configure_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or(DEFAULT_TRACING_LEVEL.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn create_db_connection_pool(database_url: &str) -> SqlitePool {
    let options = database_url
        .parse::<SqliteConnectOptions>()
        .expect("Invalid DATABASE_URL")
        .create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(DATABASE_MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .expect("Creating database connection pool failed")
}

fn prune_on_startup(context: &Arc<AppContext>) {
    let ledger = context.ledger.clone();
    context.tasks.dispatch("retention-pruning", async move {
        let removed = ledger.prune_expired().await?;
        tracing::info!(removed, "pruned expired visitor records");
        Ok(())
    });
}

async fn configure_scheduler(db_connection_pool: SqlitePool) {
    let scheduler = JobScheduler::new()
        .await
        .expect("Creating scheduler failed");
    scheduler
        .add(create_pruning_job(
            PRUNING_JOB_CRON_EXPRESSION,
            db_connection_pool,
        ))
        .await
        .expect("Adding pruning job to scheduler failed");
    scheduler.start().await.expect("Starting scheduler failed");
}

fn create_pruning_job(cron_expression: &str, db_connection_pool: SqlitePool) -> Job {
    Job::new_async(cron_expression, move |_, _| {
        let ledger = VisitorLedger::new(db_connection_pool.clone());
        Box::pin(async move {
            match ledger.prune_expired().await {
                Ok(removed) => tracing::info!(removed, "pruned expired visitor records"),
                Err(err) => tracing::warn!(error = %err, "retention pruning failed"),
            }
        })
    })
    .expect("Creating pruning job failed")
}

async fn create_listener(server_address: &str) -> TcpListener {
    let listener = TcpListener::bind(&server_address)
        .await
        .expect("Creating tcp listener failed");
    tracing::info!("Listening on address: {}", server_address);
    listener
}

fn create_router(context: Arc<AppContext>) -> Router {
    Router::new()
        .route_service("/", ServeFile::new("static/index.html"))
        .route("/shorten-url", post(routes::shorten))
        .route("/s/:code", get(routes::redirect))
        .route("/contact", post(routes::contact))
        .route("/resume", get(routes::resume))
        .route("/health", get(routes::health))
        .nest("/admin", admin_router(context.clone()))
        .nest_service("/static", ServeDir::new("static"))
        .nest_service("/images", ServeDir::new("images"))
        .layer(from_fn_with_state(context.clone(), tracking::track_visitor))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(context)
}

fn admin_router(context: Arc<AppContext>) -> Router<Arc<AppContext>> {
    let protected = Router::new()
        .route("/stats", get(admin::stats))
        .route("/urls", get(admin::list_urls))
        .route("/urls/:code", delete(admin::delete_url))
        .route("/visitors", get(admin::list_visitors))
        .route_layer(from_fn_with_state(context, auth::admin_auth));
    Router::new()
        .route("/login", post(admin::login))
        .route("/logout", get(admin::logout))
        .merge(protected)
}
