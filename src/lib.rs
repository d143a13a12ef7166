// Library exports for Recess
// This allows integration tests and external code to use Recess modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod media;
pub mod modlog;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::state::AppState;

/// Assemble the full application router over the given state.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::posts::router())
        .merge(routes::parents::router())
        .merge(routes::users::router())
        .merge(routes::admin::router())
        .merge(routes::moderation::router())
        .nest_service("/uploads", ServeDir::new(state.config.uploads_path()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
