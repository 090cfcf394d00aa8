//! crates/daily_reading_core/src/responses.rs
//!
//! Builds the reply to an inbound message: today's readings the sender has not
//! received yet, in `dr`, `jft`, `spad` order, or a single quote when there are none.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::delivery::DeliveryTracker;
use crate::domain::{today, ReadingKey, ReadingType};
use crate::ports::QuoteService;
use crate::quotes::fallback_quote;
use crate::scrape::Scraper;

pub struct ResponseGenerator {
    scraper: Arc<Scraper>,
    tracker: DeliveryTracker,
    quotes: Arc<dyn QuoteService>,
}

impl ResponseGenerator {
    pub fn new(scraper: Arc<Scraper>, quotes: Arc<dyn QuoteService>) -> Self {
        let tracker = DeliveryTracker::new(scraper.store().clone());
        Self {
            scraper,
            tracker,
            quotes,
        }
    }

    /// Readings due to `wa_id` today. The message body is not inspected: any
    /// message triggers delivery.
    pub async fn generate_responses(&self, message_body: &str, wa_id: &str) -> Vec<String> {
        self.generate_responses_on(&today(), message_body, wa_id).await
    }

    pub async fn generate_responses_on(
        &self,
        date: &str,
        message_body: &str,
        wa_id: &str,
    ) -> Vec<String> {
        info!(wa_id, date, message_body, "Generating daily reading responses");
        let replies = join_all(
            ReadingType::ALL
                .into_iter()
                .map(|reading_type| self.process_reading(reading_type, date, wa_id)),
        )
        .await;
        replies.into_iter().flatten().collect()
    }

    /// Like `generate_responses`, but never empty: falls back to a quote from
    /// the quote service, or a built-in one if that fails.
    pub async fn reply_for(&self, message_body: &str, wa_id: &str) -> Vec<String> {
        self.reply_for_on(&today(), message_body, wa_id).await
    }

    pub async fn reply_for_on(&self, date: &str, message_body: &str, wa_id: &str) -> Vec<String> {
        let replies = self.generate_responses_on(date, message_body, wa_id).await;
        if !replies.is_empty() {
            return replies;
        }

        let quote = match self.quotes.random_quote().await {
            Ok(quote) => quote,
            Err(e) => {
                warn!(wa_id, error = %e, "Quote service failed, using built-in quote");
                fallback_quote().to_string()
            }
        };
        vec![quote]
    }

    async fn process_reading(&self, reading_type: ReadingType, date: &str, wa_id: &str) -> Option<String> {
        let key = ReadingKey::new(reading_type, date);
        let record = match self.scraper.ensure(&key).await {
            Ok(record) => record,
            Err(e) => {
                error!(key = %key, wa_id, error = %e, "No reading available");
                return None;
            }
        };

        match self.tracker.deliver(&record, wa_id).await {
            Ok(delivery) => delivery.into_text(),
            Err(e) => {
                error!(key = %key, wa_id, error = %e, "Failed to record delivery");
                None
            }
        }
    }
}
