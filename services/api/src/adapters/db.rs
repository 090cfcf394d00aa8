//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `ReadingRepository` port from the `core` crate. It handles all interactions
//! with the SQLite database using `sqlx`.
//!
//! Both tables carry a uniqueness constraint, and every write goes through
//! `INSERT ... ON CONFLICT DO NOTHING` so that two racing writers end up sharing
//! the row that won.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use daily_reading_core::domain::{
    Insertion, Reading, ReadingFilter, ReadingKey, ReadingRecord, ReadingType, Recipient,
};
use daily_reading_core::ports::{PortError, PortResult, ReadingRepository};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ReadingRepository` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn storage_error(e: sqlx::Error) -> PortError {
    PortError::Storage(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const READING_COLUMNS: &str = "id, reading_type, date, heading, quote, source, narrative, \
                               affirmation, text, created_at, modified_at";

#[derive(FromRow)]
struct ReadingRow {
    id: Uuid,
    reading_type: String,
    date: String,
    heading: String,
    quote: String,
    source: String,
    narrative: String,
    affirmation: String,
    text: String,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

impl ReadingRow {
    fn to_domain(self) -> PortResult<ReadingRecord> {
        let reading_type: ReadingType = self
            .reading_type
            .parse()
            .map_err(|e| PortError::Storage(format!("Reading {}: {}", self.id, e)))?;
        Ok(ReadingRecord {
            id: self.id,
            reading: Reading {
                reading_type,
                date: self.date,
                heading: self.heading,
                quote: self.quote,
                source: self.source,
                narrative: self.narrative,
                affirmation: self.affirmation,
            },
            text: self.text,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

#[derive(FromRow)]
struct RecipientRow {
    id: Uuid,
    reading_id: Uuid,
    wa_id: String,
    sent: DateTime<Utc>,
}

impl RecipientRow {
    fn to_domain(self) -> Recipient {
        Recipient {
            id: self.id,
            reading_id: self.reading_id,
            wa_id: self.wa_id,
            sent: self.sent,
        }
    }
}

//=========================================================================================
// `ReadingRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl ReadingRepository for DbAdapter {
    async fn find_record(&self, key: &ReadingKey) -> PortResult<Option<ReadingRecord>> {
        let row = sqlx::query_as::<_, ReadingRow>(&format!(
            "SELECT {READING_COLUMNS} FROM readings WHERE reading_type = ? AND date = ?"
        ))
        .bind(key.reading_type.key())
        .bind(&key.date)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(ReadingRow::to_domain).transpose()
    }

    async fn insert_record_if_absent(
        &self,
        reading: &Reading,
        text: &str,
    ) -> PortResult<Insertion<ReadingRecord>> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO readings (id, reading_type, date, heading, quote, source, narrative, \
             affirmation, text, created_at, modified_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (reading_type, date) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(reading.reading_type.key())
        .bind(&reading.date)
        .bind(&reading.heading)
        .bind(&reading.quote)
        .bind(&reading.source)
        .bind(&reading.narrative)
        .bind(&reading.affirmation)
        .bind(text)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        let key = ReadingKey::new(reading.reading_type, reading.date.clone());
        let record = self
            .find_record(&key)
            .await?
            .ok_or_else(|| PortError::Storage(format!("Reading {} vanished after insert", key)))?;

        if result.rows_affected() == 1 {
            Ok(Insertion::Created(record))
        } else {
            Ok(Insertion::Existing(record))
        }
    }

    async fn list_records(&self, filter: &ReadingFilter) -> PortResult<Vec<ReadingRecord>> {
        // SQLite treats a negative LIMIT as no limit.
        let limit = filter.limit.map_or(-1, i64::from);
        let rows = sqlx::query_as::<_, ReadingRow>(&format!(
            "SELECT {READING_COLUMNS} FROM readings \
             WHERE (?1 IS NULL OR reading_type = ?1) AND (?2 IS NULL OR date = ?2) \
             ORDER BY created_at DESC, rowid DESC LIMIT ?3"
        ))
        .bind(filter.reading_type.map(ReadingType::key))
        .bind(filter.date.as_deref())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(ReadingRow::to_domain).collect()
    }

    async fn has_recipient(&self, reading_id: Uuid, wa_id: &str) -> PortResult<bool> {
        let found: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM recipients WHERE reading_id = ? AND wa_id = ?")
                .bind(reading_id)
                .bind(wa_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_error)?;
        Ok(found.is_some())
    }

    async fn add_recipient(
        &self,
        reading_id: Uuid,
        wa_id: &str,
        sent_at: DateTime<Utc>,
    ) -> PortResult<Insertion<Recipient>> {
        let result = sqlx::query(
            "INSERT INTO recipients (id, reading_id, wa_id, sent) VALUES (?, ?, ?, ?) \
             ON CONFLICT (reading_id, wa_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(reading_id)
        .bind(wa_id)
        .bind(sent_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        let row = sqlx::query_as::<_, RecipientRow>(
            "SELECT id, reading_id, wa_id, sent FROM recipients WHERE reading_id = ? AND wa_id = ?",
        )
        .bind(reading_id)
        .bind(wa_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Recipient {} for reading {}", wa_id, reading_id))
            }
            _ => storage_error(e),
        })?;

        if result.rows_affected() == 1 {
            Ok(Insertion::Created(row.to_domain()))
        } else {
            Ok(Insertion::Existing(row.to_domain()))
        }
    }

    async fn recipients_for(&self, reading_id: Uuid) -> PortResult<Vec<Recipient>> {
        let rows = sqlx::query_as::<_, RecipientRow>(
            "SELECT id, reading_id, wa_id, sent FROM recipients WHERE reading_id = ? \
             ORDER BY sent ASC",
        )
        .bind(reading_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(rows.into_iter().map(RecipientRow::to_domain).collect())
    }
}
