use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::livecoinwatch::QuoteSource;
use crate::livecoinwatch::errors::FetchError;
use crate::livecoinwatch::types::{CoinsListRequest, RawAssetQuote};

#[derive(Clone)]
pub struct LiveCoinWatchClient {
    http: Client,
    url: String,
    api_key: String,
}

impl LiveCoinWatchClient {
    pub fn new(url: String, api_key: String, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self { http, url, api_key })
    }

    /// One `coins/list` call. No retry; any failure means no batch.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_top(
        &self,
        limit: usize,
        currency: &str,
    ) -> Result<Vec<RawAssetQuote>, FetchError> {
        let resp = self
            .http
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .json(&CoinsListRequest::top(limit, currency))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = resp.bytes().await?;
        let quotes: Vec<RawAssetQuote> =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        let quotes = validate_batch(quotes)?;

        debug!(count = quotes.len(), "live coin watch batch fetched");

        Ok(quotes)
    }
}

#[async_trait]
impl QuoteSource for LiveCoinWatchClient {
    async fn fetch_top(
        &self,
        limit: usize,
        currency: &str,
    ) -> Result<Vec<RawAssetQuote>, FetchError> {
        LiveCoinWatchClient::fetch_top(self, limit, currency).await
    }
}

/// Rejects batches that must not replace the stored set.
pub fn validate_batch(quotes: Vec<RawAssetQuote>) -> Result<Vec<RawAssetQuote>, FetchError> {
    if quotes.is_empty() {
        return Err(FetchError::EmptyBatch);
    }

    for q in &quotes {
        if q.name.trim().is_empty() {
            return Err(FetchError::InvalidResponse(format!(
                "quote {} has no name",
                q.code
            )));
        }
        if !q.rate.is_finite() {
            return Err(FetchError::InvalidResponse(format!(
                "quote {} has non-finite rate",
                q.name
            )));
        }
    }

    Ok(quotes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::livecoinwatch::types::RawDelta;

    fn quote(code: &str, name: &str, rate: f64) -> RawAssetQuote {
        RawAssetQuote {
            code: code.into(),
            name: name.into(),
            rate,
            volume: 0.0,
            cap: 0.0,
            delta: RawDelta::default(),
        }
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(matches!(validate_batch(vec![]), Err(FetchError::EmptyBatch)));
    }

    #[test]
    fn nameless_or_nan_quotes_are_rejected() {
        let r = validate_batch(vec![quote("BTC", "Bitcoin", 1.0), quote("X", " ", 1.0)]);
        assert!(matches!(r, Err(FetchError::InvalidResponse(_))));

        let r = validate_batch(vec![quote("BTC", "Bitcoin", f64::NAN)]);
        assert!(matches!(r, Err(FetchError::InvalidResponse(_))));
    }

    #[test]
    fn valid_batch_passes_through_in_order() {
        let out = validate_batch(vec![quote("BTC", "Bitcoin", 1.0), quote("ETH", "Ethereum", 2.0)])
            .unwrap();
        assert_eq!(out[0].code, "BTC");
        assert_eq!(out[1].code, "ETH");
    }
}
