//! Route table and the axum router that serves it.

pub mod pattern;
pub mod table;

pub use pattern::{PathPattern, Segment};
pub use table::{normalize_base_path, CrudTarget, CustomRoute, RouteDescriptor, RouteTable};

use crate::dispatch::dispatch;
use crate::middleware::guard;
use crate::state::AppState;
use axum::{middleware::from_fn_with_state, Router};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

/// Request bodies above this size are rejected with 413.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Reading the body and producing the response must finish within this, else 408.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Every request goes through the guard and then the dispatcher; the
/// route table decides what a path means.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(state.clone(), guard))
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT)),
        )
        .with_state(state)
}
