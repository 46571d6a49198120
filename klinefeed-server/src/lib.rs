//! klinefeed HTTP server: inference and training endpoints over the kline
//! pipeline and the active model.

pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;

/// Assemble the full application router.
pub fn app_router(state: Arc<AppState>) -> Router {
    routes::api_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
