//! HTTP API handlers for mothra-wf

pub mod components;
pub mod error;
pub mod health;

pub use components::{list_components, run_component};
pub use error::{ApiError, ApiResult};
pub use health::health_routes;
