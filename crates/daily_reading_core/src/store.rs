//! crates/daily_reading_core/src/store.rs
//!
//! The two-tier reading store: a fast cache written through in front of the
//! durable repository.
//!
//! Consistency contract: every write lands in the repository first and the cache
//! is then overwritten with what the repository holds for that key, followed by
//! a second recipient read so that sends recorded mid-refresh survive. A cache miss
//! is refilled from the repository. The cache therefore never holds text or
//! recipients for a key that disagree with the durable record. Cache failures are
//! logged and otherwise ignored, since the repository is authoritative.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{
    Insertion, RawReadingEntry, Reading, ReadingFilter, ReadingKey, ReadingRecord, Recipient,
    SentTo,
};
use crate::ports::{PortResult, ReadingCache, ReadingRepository};

#[derive(Clone)]
pub struct ReadingStore {
    cache: Arc<dyn ReadingCache>,
    repository: Arc<dyn ReadingRepository>,
}

impl ReadingStore {
    pub fn new(cache: Arc<dyn ReadingCache>, repository: Arc<dyn ReadingRepository>) -> Self {
        Self { cache, repository }
    }

    /// Returns the text for `key`, refilling the cache from the durable record
    /// on a miss.
    pub async fn get_cached_text(&self, key: &ReadingKey) -> PortResult<Option<String>> {
        match self.cache.get(key).await {
            Ok(Some(entry)) => return Ok(Some(entry.text)),
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "Cache read failed, using durable store"),
        }

        match self.repository.find_record(key).await? {
            Some(record) => {
                debug!(key = %key, "Refilling cache from durable store");
                self.refresh_cache(&record).await;
                Ok(Some(record.text))
            }
            None => Ok(None),
        }
    }

    /// Writes raw text for `key` into the cache, keeping any recipients already
    /// listed there. If a durable record exists its text is written instead.
    pub async fn put_cached_text(&self, key: &ReadingKey, text: &str) -> PortResult<()> {
        if let Some(record) = self.repository.find_record(key).await? {
            self.refresh_cache(&record).await;
            return Ok(());
        }
        let recipients = self
            .cache
            .get(key)
            .await?
            .map(|entry| entry.recipients)
            .unwrap_or_default();
        let entry = RawReadingEntry {
            text: text.to_string(),
            extract_date: Utc::now(),
            recipients,
        };
        self.cache.put(key, entry).await
    }

    pub async fn find_record(&self, key: &ReadingKey) -> PortResult<Option<ReadingRecord>> {
        self.repository.find_record(key).await
    }

    /// Stores a parsed reading. When a record for the same key already exists
    /// (an earlier scrape, or a concurrent one that won the race) that record
    /// is returned and the new one discarded.
    pub async fn insert_record_if_absent(
        &self,
        reading: &Reading,
        text: &str,
    ) -> PortResult<Insertion<ReadingRecord>> {
        let insertion = self.repository.insert_record_if_absent(reading, text).await?;
        match &insertion {
            Insertion::Created(record) => {
                info!(key = %record.key(), id = %record.id, "Stored reading");
            }
            Insertion::Existing(record) => {
                info!(key = %record.key(), id = %record.id, "Reading already exists");
            }
        }
        self.refresh_cache(insertion.get()).await;
        Ok(insertion)
    }

    pub async fn list_records(&self, filter: &ReadingFilter) -> PortResult<Vec<ReadingRecord>> {
        self.repository.list_records(filter).await
    }

    pub async fn has_recipient(&self, reading_id: Uuid, wa_id: &str) -> PortResult<bool> {
        self.repository.has_recipient(reading_id, wa_id).await
    }

    /// Records that `wa_id` was sent `record`. Returns `Existing` with the
    /// original send when the recipient was already recorded.
    pub async fn add_recipient(
        &self,
        record: &ReadingRecord,
        wa_id: &str,
        sent_at: DateTime<Utc>,
    ) -> PortResult<Insertion<Recipient>> {
        let insertion = self.repository.add_recipient(record.id, wa_id, sent_at).await?;
        let sent = insertion.get().sent;
        if let Err(e) = self.cache.add_recipient(&record.key(), wa_id, sent).await {
            warn!(key = %record.key(), wa_id, error = %e, "Failed to mirror recipient into cache");
        }
        Ok(insertion)
    }

    pub async fn recipients_for(&self, reading_id: Uuid) -> PortResult<Vec<Recipient>> {
        self.repository.recipients_for(reading_id).await
    }

    /// Every entry currently held by the fast tier.
    pub async fn cached_entries(&self) -> PortResult<Vec<(ReadingKey, RawReadingEntry)>> {
        self.cache.entries().await
    }

    async fn refresh_cache(&self, record: &ReadingRecord) {
        let key = record.key();
        let recipients = match self.repository.recipients_for(record.id).await {
            Ok(recipients) => recipients,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to load recipients for cache refresh");
                return;
            }
        };
        let entry = RawReadingEntry {
            text: record.text.clone(),
            extract_date: record.created_at,
            recipients: recipients
                .into_iter()
                .map(|r| SentTo {
                    wa_id: r.wa_id,
                    sent: r.sent,
                })
                .collect(),
        };
        if let Err(e) = self.cache.put(&key, entry).await {
            warn!(key = %key, error = %e, "Failed to write cache entry");
            return;
        }

        // A recipient recorded after the read above had its cache mirror land on
        // a missing or replaced entry. Re-read and add whatever the put dropped.
        let recipients = match self.repository.recipients_for(record.id).await {
            Ok(recipients) => recipients,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to reconcile cached recipients");
                return;
            }
        };
        for recipient in recipients {
            if let Err(e) = self
                .cache
                .add_recipient(&key, &recipient.wa_id, recipient.sent)
                .await
            {
                warn!(key = %key, wa_id = %recipient.wa_id, error = %e, "Failed to reconcile cached recipient");
            }
        }
    }
}
