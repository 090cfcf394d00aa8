//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the read-only REST endpoints and the manual
//! scrape trigger, plus the master definition for the OpenAPI specification.

use crate::web::{shelf, state::AppState, webhook};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use daily_reading_core::domain::{today, ReadingFilter, ReadingKey, ReadingRecord, ReadingType, Recipient};
use daily_reading_core::ports::PortResult;
use daily_reading_core::scrape::{ScrapeStatus, ScrapeSummary};
use daily_reading_core::ReadingStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        webhook::verify_webhook,
        webhook::receive_webhook,
        run_scrape_handler,
        list_readings_handler,
        todays_readings_handler,
        shelf::shelf_handler,
        shelf::shelf_reading_handler,
        shelf::shelf_date_handler,
        health_handler,
    ),
    components(
        schemas(
            webhook::StatusResponse,
            ReadingResponse,
            RecipientResponse,
            TodayResponse,
            ScrapeSummaryResponse,
            ScrapeOutcomeResponse,
            shelf::ShelfEntryResponse,
        )
    ),
    tags(
        (name = "Daily Reading API", description = "WhatsApp webhook and stored daily readings.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct RecipientResponse {
    pub wa_id: String,
    pub sent: DateTime<Utc>,
}

impl From<Recipient> for RecipientResponse {
    fn from(recipient: Recipient) -> Self {
        Self {
            wa_id: recipient.wa_id,
            sent: recipient.sent,
        }
    }
}

/// A stored reading with the recipients it has been sent to.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReadingResponse {
    pub id: Uuid,
    pub reading_type: String,
    pub date: String,
    pub heading: String,
    pub quote: String,
    pub source: String,
    pub narrative: String,
    pub affirmation: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub recipients: Vec<RecipientResponse>,
}

impl ReadingResponse {
    fn new(record: ReadingRecord, recipients: Vec<Recipient>) -> Self {
        let reading = record.reading;
        Self {
            id: record.id,
            reading_type: reading.reading_type.key().to_string(),
            date: reading.date,
            heading: reading.heading,
            quote: reading.quote,
            source: reading.source,
            narrative: reading.narrative,
            affirmation: reading.affirmation,
            text: record.text,
            created_at: record.created_at,
            modified_at: record.modified_at,
            recipients: recipients.into_iter().map(RecipientResponse::from).collect(),
        }
    }

    async fn load(store: &ReadingStore, record: ReadingRecord) -> PortResult<Self> {
        let recipients = store.recipients_for(record.id).await?;
        Ok(Self::new(record, recipients))
    }
}

/// Today's reading of each type; a type not stored yet is `null`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TodayResponse {
    pub date: String,
    pub dr: Option<ReadingResponse>,
    pub jft: Option<ReadingResponse>,
    pub spad: Option<ReadingResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ScrapeOutcomeResponse {
    pub reading_type: String,
    /// One of `scraped`, `already_stored` or `failed`.
    pub status: String,
    pub detail: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScrapeSummaryResponse {
    pub date: String,
    pub success_count: usize,
    pub failure_count: usize,
    pub duration_ms: u64,
    pub outcomes: Vec<ScrapeOutcomeResponse>,
}

impl From<ScrapeSummary> for ScrapeSummaryResponse {
    fn from(summary: ScrapeSummary) -> Self {
        let success_count = summary.success_count();
        let failure_count = summary.failure_count();
        let outcomes = summary
            .outcomes
            .into_iter()
            .map(|outcome| {
                let (status, detail) = match outcome.status {
                    ScrapeStatus::Scraped => ("scraped", None),
                    ScrapeStatus::AlreadyStored => ("already_stored", None),
                    ScrapeStatus::Failed(reason) => ("failed", Some(reason)),
                };
                ScrapeOutcomeResponse {
                    reading_type: outcome.reading_type.key().to_string(),
                    status: status.to_string(),
                    detail,
                }
            })
            .collect();
        Self {
            date: summary.date,
            success_count,
            failure_count,
            duration_ms: summary.duration_ms,
            outcomes,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReadingsQuery {
    /// `dr`, `jft` or `spad`.
    pub reading_type: Option<String>,
    /// A `"Month Day"` date, e.g. `May 1`.
    pub date: Option<String>,
    pub limit: Option<u32>,
}

fn internal_error(context: &str, e: impl std::fmt::Display) -> (StatusCode, String) {
    error!(error = %e, "{}", context);
    (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Run the scrape for today's readings now.
///
/// Readings already stored are skipped. Each source succeeds or fails on its own.
#[utoipa::path(
    post,
    path = "/tasks/scrape",
    responses(
        (status = 200, description = "Scrape finished", body = ScrapeSummaryResponse)
    )
)]
pub async fn run_scrape_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let summary = app_state.scraper.scrape_all(&today()).await;
    Json(ScrapeSummaryResponse::from(summary))
}

/// List stored readings, newest first.
#[utoipa::path(
    get,
    path = "/readings",
    params(ReadingsQuery),
    responses(
        (status = 200, description = "Stored readings", body = [ReadingResponse]),
        (status = 400, description = "Unknown reading type"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_readings_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ReadingsQuery>,
) -> Result<Json<Vec<ReadingResponse>>, (StatusCode, String)> {
    let reading_type = query
        .reading_type
        .as_deref()
        .map(str::parse::<ReadingType>)
        .transpose()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let filter = ReadingFilter {
        reading_type,
        date: query.date,
        limit: query.limit,
    };
    let store = &app_state.store;
    let records = store
        .list_records(&filter)
        .await
        .map_err(|e| internal_error("Failed to list readings", e))?;

    let mut readings = Vec::with_capacity(records.len());
    for record in records {
        readings.push(
            ReadingResponse::load(store, record)
                .await
                .map_err(|e| internal_error("Failed to load recipients", e))?,
        );
    }
    Ok(Json(readings))
}

/// Today's stored readings.
#[utoipa::path(
    get,
    path = "/readings/today",
    responses(
        (status = 200, description = "Today's readings", body = TodayResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn todays_readings_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<TodayResponse>, (StatusCode, String)> {
    let date = today();
    let store = &app_state.store;

    let mut found = Vec::with_capacity(ReadingType::ALL.len());
    for reading_type in ReadingType::ALL {
        let key = ReadingKey::new(reading_type, date.clone());
        let reading = match store
            .find_record(&key)
            .await
            .map_err(|e| internal_error("Failed to load today's readings", e))?
        {
            Some(record) => Some(
                ReadingResponse::load(store, record)
                    .await
                    .map_err(|e| internal_error("Failed to load recipients", e))?,
            ),
            None => None,
        };
        found.push(reading);
    }

    let mut found = found.into_iter();
    Ok(Json(TodayResponse {
        date,
        dr: found.next().flatten(),
        jft: found.next().flatten(),
        spad: found.next().flatten(),
    }))
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = webhook::StatusResponse)
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    Json(webhook::StatusResponse {
        status: "success".to_string(),
        message: "ok".to_string(),
    })
}
