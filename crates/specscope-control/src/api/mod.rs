//! REST API route tree.

pub mod error;
pub mod predict;
pub mod spectrum;

use axum::Router;

use crate::state::AppState;

pub use error::ApiError;

/// Build the full service router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(predict::router())
        .merge(spectrum::router())
}
