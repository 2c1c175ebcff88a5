mod auth;
mod config;
mod dao;
mod error;
mod flash;
mod images;
mod lifecycle;
mod model;
mod routes;
mod store;
mod upload;
mod utils;

use auth::auth;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::{serve, Router};
use config::Config;
use images::{ImageStore, RandomIdGenerator};
use lifecycle::LinkLifecycleManager;
use routes::{
    add_form, create_link, delete_link, edit_form, health, list_links, update_link, AppState,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use std::time::Duration;
use store::PgLinkStore;
use tokio::net::TcpListener;
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_TRACING_LEVEL: &str = "link_gallery=debug";
const DATABASE_MAX_CONNECTIONS: u32 = 20;

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    configure_tracing();
    let db_connection_pool = create_db_connection_pool(&config.database_url).await;
    let images = ImageStore::new(&config.image_directory, Arc::new(RandomIdGenerator));
    images
        .ensure_directory()
        .await
        .expect("Creating image directory failed");
    let state = AppState::new(Arc::new(PgLinkStore::new(db_connection_pool)), images);
    configure_scheduler(
        &config.orphan_sweep_cron,
        state.links.clone(),
        config.orphan_grace,
    )
    .await;
    let listener = create_listener(&config.server_address).await;
    let router = create_router(state, config.max_upload_bytes);
    serve(listener, router)
        .await
        .expect("Server failed to start");
}

fn configure_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or(DEFAULT_TRACING_LEVEL.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn create_db_connection_pool(database_url: &str) -> Pool<Postgres> {
    let pool = PgPoolOptions::new()
        .max_connections(DATABASE_MAX_CONNECTIONS)
        .connect(database_url)
        .await
        .expect("Creating database connection pool failed");
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Running database migrations failed");
    pool
}

async fn configure_scheduler(
    cron_expression: &str,
    links: Arc<LinkLifecycleManager>,
    grace: Duration,
) {
    let scheduler = JobScheduler::new()
        .await
        .expect("Creating scheduler failed");
    scheduler
        .add(create_orphan_sweep_job(cron_expression, links, grace))
        .await
        .expect("Adding orphan sweep job to scheduler failed");
    scheduler.start().await.expect("Starting scheduler failed");
}

fn create_orphan_sweep_job(
    cron_expression: &str,
    links: Arc<LinkLifecycleManager>,
    grace: Duration,
) -> Job {
    Job::new_async(cron_expression, move |_, _| {
        let links = links.clone();
        Box::pin(async move {
            match links.sweep_orphaned_images(grace).await {
                Ok(removed) => tracing::info!("Orphan sweep removed {} image(s)", removed),
                Err(err) => tracing::error!("Orphan sweep failed: {}", err),
            }
        })
    })
    .expect("Creating orphan sweep job failed")
}

async fn create_listener(server_address: &str) -> TcpListener {
    let listener = TcpListener::bind(&server_address)
        .await
        .expect("Creating tcp listener failed");
    tracing::info!("Listening on address: {}", server_address);
    listener
}

fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(
            "/links",
            get(list_links).route_layer(from_fn_with_state(state.clone(), auth)),
        )
        .route(
            "/links/",
            get(list_links).route_layer(from_fn_with_state(state.clone(), auth)),
        )
        .route(
            "/links/add",
            post(create_link)
                .route_layer(from_fn_with_state(state.clone(), auth))
                .get(add_form),
        )
        .route("/links/delete/:id", get(delete_link))
        .route("/links/edit/:id", get(edit_form).post(update_link))
        .route("/health", get(health))
        .nest_service("/img", ServeDir::new(state.images.directory()))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
