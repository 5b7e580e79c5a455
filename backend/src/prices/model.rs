use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Percentage price change over the fixed look-back windows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeltaSet {
    pub hour: f64,
    pub day: f64,
    pub week: f64,
    pub month: f64,
    pub quarter: f64,
    pub year: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceData {
    /// Unit price in the configured reference currency.
    pub rate: f64,
    pub volume: f64,
    pub cap: f64,
    pub delta: DeltaSet,
}

/// Latest known market snapshot of one asset.
///
/// `crypto` is the asset's display name and the store key; the wire shape
/// matches what the display client reads from `/api/prices`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSnapshot {
    pub crypto: String,
    pub data: PriceData,
    pub last_updated: DateTime<Utc>,
}

impl AssetSnapshot {
    pub fn identity(&self) -> &str {
        &self.crypto
    }
}
