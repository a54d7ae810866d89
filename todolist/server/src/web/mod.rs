use axum::Router;
use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::Config;
use crate::task::TaskState;
use crate::task::api::v1::create_task_router;

pub mod api;

/// Builds the application router around an established store connection.
pub fn create_app_router(db: DatabaseConnection) -> Router {
    let task_state = Arc::new(TaskState { db: Arc::new(db) });

    Router::new()
        .route("/health", axum::routing::get(health_check_handler))
        .merge(create_task_router(task_state))
        .merge(api::create_api_docs_router())
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            ),
        )
}

/// Connects to the store and verifies it answers.
#[tracing::instrument(skip(database_url))]
pub async fn connect_store(database_url: &str) -> anyhow::Result<DatabaseConnection> {
    let db = Database::connect(database_url).await?;
    db.ping().await?;
    tracing::info!("Connected to the database");
    Ok(db)
}

/// Connects to the store and serves HTTP until the listener fails.
///
/// Fails fast when the store cannot be reached.
#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let db = connect_store(&config.database_url).await?;

    let server_address = config.server_address();
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    axum::serve(listener, create_app_router(db)).await?;
    Ok(())
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}
