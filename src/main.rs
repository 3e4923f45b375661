//! Bookshelf Topics Backend
//!
//! REST backend for the book catalog's topic taxonomy: nested subject trees and
//! flat tags, persisted in SQLite.

mod api;
mod config;
mod db;
mod errors;
mod hierarchy;
mod models;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::{Repository, TopicStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Bookshelf Topics Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let topics = repo.list_topics().await?;
    tracing::info!("Taxonomy loaded with {} topics", topics.len());

    let state = AppState { repo };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        .route("/revision", get(api::get_revision))
        // Topics
        .route("/topics", get(api::list_topics))
        .route("/topics", post(api::create_topic))
        .route("/topics/import", post(api::import_topics))
        .route("/topics/{id}", get(api::get_topic))
        .route("/topics/{id}", put(api::update_topic))
        .route("/topics/{id}", delete(api::delete_topic))
        .route("/topics/{id}/ancestors", get(api::get_ancestors))
        // Books
        .route("/books/{book_id}/topics", get(api::list_book_topics))
        .route("/books/{book_id}/topics", post(api::assign_book_topic))
        .route("/books/{book_id}/topics/tree", get(api::get_book_topic_tree))
        .route("/books/{book_id}/topics/paths", get(api::get_book_topic_paths))
        .route(
            "/books/{book_id}/topics/{topic_id}",
            delete(api::unassign_book_topic),
        )
        .route("/books/{book_id}/tags", get(api::list_book_tags));

    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
