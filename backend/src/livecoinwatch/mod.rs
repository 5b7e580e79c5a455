pub mod client;
pub mod errors;
pub mod types;

use async_trait::async_trait;

pub use client::LiveCoinWatchClient;
pub use errors::FetchError;
pub use types::*;

/// Source of ranked market quotes.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_top(
        &self,
        limit: usize,
        currency: &str,
    ) -> Result<Vec<RawAssetQuote>, FetchError>;
}
