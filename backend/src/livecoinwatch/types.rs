use serde::{Deserialize, Deserializer, Serialize};

/// Body of the `coins/list` call.
#[derive(Debug, Clone, Serialize)]
pub struct CoinsListRequest {
    pub currency: String,
    pub sort: &'static str,
    pub order: &'static str,
    pub offset: u32,
    pub limit: usize,
    pub meta: bool,
}

impl CoinsListRequest {
    /// Top `limit` coins by rank, quoted in `currency`.
    pub fn top(limit: usize, currency: &str) -> Self {
        Self {
            currency: currency.to_string(),
            sort: "rank",
            order: "ascending",
            offset: 0,
            limit,
            meta: true,
        }
    }
}

/// One ranked coin as returned upstream.
///
/// Upstream reports `null` for figures it does not track (young coins have
/// no yearly delta, some have no cap); those decode as `0.0`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawAssetQuote {
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub rate: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub volume: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub cap: f64,
    #[serde(default)]
    pub delta: RawDelta,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct RawDelta {
    #[serde(default, deserialize_with = "null_as_zero")]
    pub hour: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub day: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub week: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub month: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub quarter: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub year: f64,
}

fn null_as_zero<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(d)?.unwrap_or(0.0))
}
