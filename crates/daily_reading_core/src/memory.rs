//! crates/daily_reading_core/src/memory.rs
//!
//! In-process implementations of the storage ports. `MemoryCache` is the fast
//! tier used in production; `MemoryRepository` stands in for the durable tier in
//! tests and when the service runs without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    Insertion, RawReadingEntry, Reading, ReadingFilter, ReadingKey, ReadingRecord, Recipient,
    SentTo,
};
use crate::ports::{PortResult, ReadingCache, ReadingRepository};

//=========================================================================================
// Fast Tier
//=========================================================================================

#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<BTreeMap<ReadingKey, RawReadingEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReadingCache for MemoryCache {
    async fn get(&self, key: &ReadingKey) -> PortResult<Option<RawReadingEntry>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &ReadingKey, entry: RawReadingEntry) -> PortResult<()> {
        self.entries.write().await.insert(key.clone(), entry);
        Ok(())
    }

    async fn add_recipient(
        &self,
        key: &ReadingKey,
        wa_id: &str,
        sent: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(key) {
            if entry.sent_to(wa_id).is_none() {
                entry.recipients.push(SentTo {
                    wa_id: wa_id.to_string(),
                    sent,
                });
            }
        }
        Ok(())
    }

    async fn entries(&self) -> PortResult<Vec<(ReadingKey, RawReadingEntry)>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

//=========================================================================================
// Durable Tier Stand-in
//=========================================================================================

#[derive(Default)]
struct Tables {
    readings: Vec<ReadingRecord>,
    recipients: Vec<Recipient>,
}

/// A `ReadingRepository` backed by a lock-guarded pair of vectors. Each write
/// holds the lock across its existence check, so uniqueness holds under
/// concurrent callers.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReadingRepository for MemoryRepository {
    async fn find_record(&self, key: &ReadingKey) -> PortResult<Option<ReadingRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .readings
            .iter()
            .find(|r| r.reading.reading_type == key.reading_type && r.reading.date == key.date)
            .cloned())
    }

    async fn insert_record_if_absent(
        &self,
        reading: &Reading,
        text: &str,
    ) -> PortResult<Insertion<ReadingRecord>> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .readings
            .iter()
            .find(|r| r.reading.reading_type == reading.reading_type && r.reading.date == reading.date)
        {
            return Ok(Insertion::Existing(existing.clone()));
        }

        let now = Utc::now();
        let record = ReadingRecord {
            id: Uuid::new_v4(),
            reading: reading.clone(),
            text: text.to_string(),
            created_at: now,
            modified_at: now,
        };
        tables.readings.push(record.clone());
        Ok(Insertion::Created(record))
    }

    async fn list_records(&self, filter: &ReadingFilter) -> PortResult<Vec<ReadingRecord>> {
        let tables = self.tables.read().await;
        let mut records: Vec<ReadingRecord> = tables
            .readings
            .iter()
            .filter(|r| filter.reading_type.map_or(true, |t| r.reading.reading_type == t))
            .filter(|r| filter.date.as_ref().map_or(true, |d| &r.reading.date == d))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            records.truncate(limit as usize);
        }
        Ok(records)
    }

    async fn has_recipient(&self, reading_id: Uuid, wa_id: &str) -> PortResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .recipients
            .iter()
            .any(|r| r.reading_id == reading_id && r.wa_id == wa_id))
    }

    async fn add_recipient(
        &self,
        reading_id: Uuid,
        wa_id: &str,
        sent_at: DateTime<Utc>,
    ) -> PortResult<Insertion<Recipient>> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .recipients
            .iter()
            .find(|r| r.reading_id == reading_id && r.wa_id == wa_id)
        {
            return Ok(Insertion::Existing(existing.clone()));
        }

        let recipient = Recipient {
            id: Uuid::new_v4(),
            reading_id,
            wa_id: wa_id.to_string(),
            sent: sent_at,
        };
        tables.recipients.push(recipient.clone());
        Ok(Insertion::Created(recipient))
    }

    async fn recipients_for(&self, reading_id: Uuid) -> PortResult<Vec<Recipient>> {
        let tables = self.tables.read().await;
        Ok(tables
            .recipients
            .iter()
            .filter(|r| r.reading_id == reading_id)
            .cloned()
            .collect())
    }
}
