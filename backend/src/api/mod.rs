pub mod error;
pub mod prices;

use axum::{Router, http::HeaderValue, routing::get};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::metrics::counters::Counters;
use crate::prices::store::SnapshotStore;

/// Shared state of the read endpoints. Read-only view of the store.
#[derive(Clone)]
pub struct AppState {
    pub store: SnapshotStore,
    pub counters: Counters,
}

pub fn app_router(state: AppState, config: &AppConfig) -> Router {
    let cors = if config.cors_allow.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = config
            .cors_allow
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = %o, "ignoring unparsable CORS origin");
                    None
                }
            })
            .collect::<Vec<HeaderValue>>();
        CorsLayer::new().allow_origin(origins)
    };

    let api = Router::new()
        .route("/prices", get(prices::list_prices))
        .route("/status", get(prices::poller_status));

    Router::new()
        .nest("/api", api)
        .route("/healthz", get(prices::healthz))
        .with_state(state)
        .layer(cors)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
}
