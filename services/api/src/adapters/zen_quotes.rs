//! services/api/src/adapters/zen_quotes.rs
//!
//! A `QuoteService` backed by the ZenQuotes random-quote endpoint.

use async_trait::async_trait;
use daily_reading_core::ports::{PortError, PortResult, QuoteService};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
struct ZenQuote {
    q: String,
    a: String,
}

pub struct ZenQuotesAdapter {
    client: reqwest::Client,
    url: String,
}

impl ZenQuotesAdapter {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

/// Formats the first quote of a ZenQuotes response body.
fn format_quote(quotes: &[ZenQuote]) -> PortResult<String> {
    let quote = quotes
        .first()
        .ok_or_else(|| PortError::Parse("Quote response was empty".to_string()))?;
    Ok(format!("_*{}*_\n - _{}_", quote.q.trim(), quote.a.trim()))
}

#[async_trait]
impl QuoteService for ZenQuotesAdapter {
    async fn random_quote(&self) -> PortResult<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PortError::Fetch(e.to_string()))?;

        let quotes: Vec<ZenQuote> = response
            .json()
            .await
            .map_err(|e| PortError::Parse(e.to_string()))?;
        info!(count = quotes.len(), "Received quote");

        format_quote(&quotes)
    }
}
