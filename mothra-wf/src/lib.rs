//! mothra-wf - workflow component service
//!
//! Exposes every database and ILP component over HTTP so an external workflow
//! engine can chain them: `POST /api/components/<name>` with the component's
//! input dict returns its output dict.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod components;
pub mod state;

pub use components::{dispatch, ComponentCall, COMPONENT_NAMES};
pub use state::{AppContext, SharedContext};

/// Build application router
pub fn build_router(ctx: SharedContext) -> Router {
    Router::new()
        .route("/api/components", get(api::list_components))
        .route("/api/components/:name", post(api::run_component))
        .merge(api::health_routes())
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
