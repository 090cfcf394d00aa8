//! crates/daily_reading_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The three recurring reading sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingType {
    /// Daily reflection, taken from the local reflections file.
    Dr,
    /// Just For Today.
    Jft,
    /// Spiritual Principle A Day.
    Spad,
}

impl ReadingType {
    /// Every reading type, in reply order.
    pub const ALL: [ReadingType; 3] = [ReadingType::Dr, ReadingType::Jft, ReadingType::Spad];

    pub fn key(self) -> &'static str {
        match self {
            ReadingType::Dr => "dr",
            ReadingType::Jft => "jft",
            ReadingType::Spad => "spad",
        }
    }
}

impl fmt::Display for ReadingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown reading type: {0}")]
pub struct UnknownReadingType(pub String);

impl FromStr for ReadingType {
    type Err = UnknownReadingType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dr" => Ok(ReadingType::Dr),
            "jft" => Ok(ReadingType::Jft),
            "spad" => Ok(ReadingType::Spad),
            other => Err(UnknownReadingType(other.to_string())),
        }
    }
}

/// Formats a calendar day the way readings are keyed, e.g. `"May 1"`.
pub fn reading_date(day: NaiveDate) -> String {
    day.format("%B %-d").to_string()
}

/// Today's reading date in local time.
pub fn today() -> String {
    reading_date(Local::now().date_naive())
}

/// Identifies one day's reading of one type. Both cache tiers key on this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReadingKey {
    pub reading_type: ReadingType,
    pub date: String,
}

impl ReadingKey {
    pub fn new(reading_type: ReadingType, date: impl Into<String>) -> Self {
        Self {
            reading_type,
            date: date.into(),
        }
    }
}

impl fmt::Display for ReadingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.reading_type, self.date)
    }
}

/// The typed fields extracted from one reading's marked-up text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub reading_type: ReadingType,
    pub date: String,
    pub heading: String,
    pub quote: String,
    pub source: String,
    pub narrative: String,
    pub affirmation: String,
}

/// A reading as stored in the durable tier. At most one exists per
/// `(reading_type, date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingRecord {
    pub id: Uuid,
    pub reading: Reading,
    /// The formatted message text the reading was parsed from.
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl ReadingRecord {
    pub fn key(&self) -> ReadingKey {
        ReadingKey::new(self.reading.reading_type, self.reading.date.clone())
    }
}

/// Records that `wa_id` was sent the reading `reading_id`.
/// At most one exists per `(reading_id, wa_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: Uuid,
    pub reading_id: Uuid,
    pub wa_id: String,
    pub sent: DateTime<Utc>,
}

/// A recipient as mirrored in the fast cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentTo {
    pub wa_id: String,
    pub sent: DateTime<Utc>,
}

/// The fast-cache entry for one `(reading_type, date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReadingEntry {
    pub text: String,
    pub extract_date: DateTime<Utc>,
    pub recipients: Vec<SentTo>,
}

impl RawReadingEntry {
    pub fn new(text: impl Into<String>, extract_date: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            extract_date,
            recipients: Vec::new(),
        }
    }

    pub fn sent_to(&self, wa_id: &str) -> Option<&SentTo> {
        self.recipients.iter().find(|r| r.wa_id == wa_id)
    }
}

/// Outcome of a write guarded by a uniqueness constraint. A lost race is
/// not an error: the row that won is returned as `Existing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion<T> {
    Created(T),
    Existing(T),
}

impl<T> Insertion<T> {
    pub fn is_created(&self) -> bool {
        matches!(self, Insertion::Created(_))
    }

    pub fn get(&self) -> &T {
        match self {
            Insertion::Created(v) | Insertion::Existing(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Insertion::Created(v) | Insertion::Existing(v) => v,
        }
    }
}

/// Filter for listing stored readings.
#[derive(Debug, Clone, Default)]
pub struct ReadingFilter {
    pub reading_type: Option<ReadingType>,
    pub date: Option<String>,
    pub limit: Option<u32>,
}
