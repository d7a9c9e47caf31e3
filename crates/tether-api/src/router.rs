//! Route definitions for the Tether HTTP surface.

use axum::routing::{get, post};
use axum::{Router, middleware as axum_middleware};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = middleware::cors::build_cors_layer(&state.config.server.cors);

    let api_routes = Router::new().route("/health", get(handlers::health::health));

    Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/ws", get(handlers::ws::ws_upgrade))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}
