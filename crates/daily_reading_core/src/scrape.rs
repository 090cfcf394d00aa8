//! crates/daily_reading_core/src/scrape.rs
//!
//! Fetches, parses and stores readings. Used lazily by the response generator and
//! proactively by the periodic scrape.

use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::domain::{ReadingKey, ReadingRecord, ReadingType};
use crate::parser;
use crate::ports::{PortError, PortResult, ReadingSource};
use crate::store::ReadingStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ScrapeStatus {
    Scraped,
    AlreadyStored,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeOutcome {
    pub reading_type: ReadingType,
    #[serde(flatten)]
    pub status: ScrapeStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeSummary {
    pub date: String,
    pub outcomes: Vec<ScrapeOutcome>,
    pub duration_ms: u64,
}

impl ScrapeSummary {
    pub fn success_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !matches!(o.status, ScrapeStatus::Failed(_)))
            .count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }
}

pub struct Scraper {
    store: ReadingStore,
    sources: BTreeMap<ReadingType, Arc<dyn ReadingSource>>,
}

impl Scraper {
    pub fn new(store: ReadingStore, sources: Vec<Arc<dyn ReadingSource>>) -> Self {
        let sources = sources
            .into_iter()
            .map(|source| (source.reading_type(), source))
            .collect();
        Self { store, sources }
    }

    pub fn store(&self) -> &ReadingStore {
        &self.store
    }

    /// Fetches and parses `reading_type` for `date`, then stores it. If another
    /// scrape stored the same key first, that record is returned.
    pub async fn scrape(&self, reading_type: ReadingType, date: &str) -> PortResult<ReadingRecord> {
        let source = self
            .sources
            .get(&reading_type)
            .ok_or_else(|| PortError::NotFound(format!("No source configured for {reading_type}")))?;

        let text = source.fetch(date).await?;
        if !text.contains(date) {
            return Err(PortError::Parse(format!(
                "{reading_type} text does not mention {date}, page is probably stale"
            )));
        }

        let mut reading = parser::parse(reading_type, &text)
            .ok_or_else(|| PortError::Parse(format!("Could not parse {reading_type} for {date}")))?;
        if reading.date != date {
            warn!(
                reading_type = %reading_type,
                date,
                parsed_date = %reading.date,
                "Parsed date differs from requested date, keying on requested date"
            );
            reading.date = date.to_string();
        }

        let record = self.store.insert_record_if_absent(&reading, &text).await?;
        Ok(record.into_inner())
    }

    /// Returns the stored record for `key`, scraping it first when the store has
    /// nothing for that day.
    pub async fn ensure(&self, key: &ReadingKey) -> PortResult<ReadingRecord> {
        if self.store.get_cached_text(key).await?.is_some() {
            if let Some(record) = self.store.find_record(key).await? {
                return Ok(record);
            }
        }
        info!(key = %key, "No reading stored yet, scraping");
        self.scrape(key.reading_type, &key.date).await
    }

    /// Scrapes every configured source that has nothing stored for `date`. Sources
    /// run concurrently and fail independently.
    pub async fn scrape_all(&self, date: &str) -> ScrapeSummary {
        let started = Instant::now();
        info!(date, "Starting daily readings scrape");

        let outcomes = join_all(self.sources.keys().map(|reading_type| async move {
            let status = self.scrape_if_missing(*reading_type, date).await;
            ScrapeOutcome {
                reading_type: *reading_type,
                status,
            }
        }))
        .await;

        let summary = ScrapeSummary {
            date: date.to_string(),
            outcomes,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            date,
            duration_ms = summary.duration_ms,
            success = summary.success_count(),
            failures = summary.failure_count(),
            "Daily readings scrape completed"
        );
        summary
    }

    async fn scrape_if_missing(&self, reading_type: ReadingType, date: &str) -> ScrapeStatus {
        let key = ReadingKey::new(reading_type, date);
        match self.store.get_cached_text(&key).await {
            Ok(Some(_)) => {
                info!(key = %key, "Reading already exists");
                return ScrapeStatus::AlreadyStored;
            }
            Ok(None) => {}
            Err(e) => {
                error!(key = %key, error = %e, "Failed to check store before scraping");
                return ScrapeStatus::Failed(e.to_string());
            }
        }
        match self.scrape(reading_type, date).await {
            Ok(record) => {
                info!(key = %key, id = %record.id, "Successfully scraped");
                ScrapeStatus::Scraped
            }
            Err(e) => {
                error!(key = %key, error = %e, "Error scraping");
                ScrapeStatus::Failed(e.to_string())
            }
        }
    }
}
