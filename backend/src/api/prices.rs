use axum::{Json, extract::State};

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::metrics::counters::CountersView;
use crate::prices::model::AssetSnapshot;

/// Full current snapshot set, sorted by asset name.
pub async fn list_prices(State(state): State<AppState>) -> ApiResult<Json<Vec<AssetSnapshot>>> {
    let mut prices = state.store.list_all().await?;
    prices.sort_by(|a, b| a.crypto.cmp(&b.crypto));
    Ok(Json(prices))
}

pub async fn poller_status(State(state): State<AppState>) -> Json<CountersView> {
    Json(state.counters.snapshot())
}

pub async fn healthz() -> &'static str {
    "ok"
}
