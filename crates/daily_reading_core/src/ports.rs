//! crates/daily_reading_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases, web
//! pages or the messaging API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Insertion, RawReadingEntry, Reading, ReadingFilter, ReadingKey, ReadingRecord, ReadingType,
    Recipient,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// Network failure, timeout or non-2xx response, after retries.
    #[error("Fetch failed: {0}")]
    Fetch(String),
    /// The source did not have the expected structure.
    #[error("Parse failed: {0}")]
    Parse(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage Ports
//=========================================================================================

/// The fast tier: raw reading text and its recipients, keyed by `(reading_type, date)`.
#[async_trait]
pub trait ReadingCache: Send + Sync {
    async fn get(&self, key: &ReadingKey) -> PortResult<Option<RawReadingEntry>>;

    /// Writes the entry for `key`, replacing any previous one.
    async fn put(&self, key: &ReadingKey, entry: RawReadingEntry) -> PortResult<()>;

    /// Appends a recipient to an existing entry. Does nothing if the entry is
    /// missing or already lists `wa_id`.
    async fn add_recipient(&self, key: &ReadingKey, wa_id: &str, sent: DateTime<Utc>)
        -> PortResult<()>;

    /// Every cached entry, ordered by key.
    async fn entries(&self) -> PortResult<Vec<(ReadingKey, RawReadingEntry)>>;
}

/// The durable tier. Implementations must enforce uniqueness on
/// `(reading_type, date)` and on `(reading_id, wa_id)`.
#[async_trait]
pub trait ReadingRepository: Send + Sync {
    async fn find_record(&self, key: &ReadingKey) -> PortResult<Option<ReadingRecord>>;

    /// Stores the reading unless one already exists for its key, in which case
    /// the stored one is returned untouched.
    async fn insert_record_if_absent(
        &self,
        reading: &Reading,
        text: &str,
    ) -> PortResult<Insertion<ReadingRecord>>;

    async fn list_records(&self, filter: &ReadingFilter) -> PortResult<Vec<ReadingRecord>>;

    async fn has_recipient(&self, reading_id: Uuid, wa_id: &str) -> PortResult<bool>;

    /// Records a send unless `wa_id` already has one for this reading.
    async fn add_recipient(
        &self,
        reading_id: Uuid,
        wa_id: &str,
        sent_at: DateTime<Utc>,
    ) -> PortResult<Insertion<Recipient>>;

    async fn recipients_for(&self, reading_id: Uuid) -> PortResult<Vec<Recipient>>;
}

//=========================================================================================
// External Service Ports
//=========================================================================================

/// Produces the marked-up text of one reading type for a given date.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    fn reading_type(&self) -> ReadingType;

    /// Fetches the formatted text for `date` (a `"Month Day"` string).
    async fn fetch(&self, date: &str) -> PortResult<String>;
}

#[async_trait]
pub trait QuoteService: Send + Sync {
    /// Returns a formatted quote to send when no reading is due.
    async fn random_quote(&self) -> PortResult<String>;
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_text(&self, wa_id: &str, body: &str) -> PortResult<()>;

    async fn mark_read(&self, message_id: &str) -> PortResult<()>;
}
