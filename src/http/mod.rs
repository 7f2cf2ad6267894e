//! HTTP surface: shared state, router construction and the listener loop.

pub mod error;
pub mod handlers;
pub mod server;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::GlobalConfig;
use crate::storage::SurveyLog;

/// Shared application state handed to every handler.
pub struct AppState {
    /// Validated global configuration.
    pub config: Arc<GlobalConfig>,
    /// Destination for accepted survey records.
    pub log: Arc<dyn SurveyLog>,
    /// Trusted forwarded-for header, resolved once at startup.
    pub forwarded_header: Option<HeaderName>,
}

impl AppState {
    /// Build state from configuration and an already-opened survey log.
    #[must_use]
    pub fn new(config: Arc<GlobalConfig>, log: Arc<dyn SurveyLog>) -> Self {
        let forwarded_header = config.forwarded_header_name();
        Self {
            config,
            log,
            forwarded_header,
        }
    }
}

/// Build the application router.
///
/// `/v1/*` routes accept cross-origin requests from any origin without
/// credentials; `/ping` is same-origin only.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let v1 = Router::new()
        .route("/survey", post(handlers::submit_survey))
        .layer(cors);

    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/v1", v1)
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
