//! Axum Router Configuration
//!
//! Three surfaces: the static client page at `/`, its assets under
//! `/static`, and the WebSocket endpoint at `/ws/{user_id}`.

use crate::{state::AppState, ws::ws_handler};
use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let static_dir = app_state.config.static_dir.clone();

    Router::new()
        .route("/ws/{user_id}", get(ws_handler))
        .with_state(app_state)
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir))
}
