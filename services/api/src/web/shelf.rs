//! services/api/src/web/shelf.rs
//!
//! Read-only views of the fast cache ("shelf"), for checking what the bot
//! would send without touching the durable store.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use daily_reading_core::domain::{RawReadingEntry, ReadingKey, ReadingType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::web::rest::RecipientResponse;
use crate::web::state::AppState;
use crate::web::webhook::StatusResponse;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShelfEntryResponse {
    pub reading_type: String,
    pub date: String,
    pub text: String,
    pub extract_date: DateTime<Utc>,
    pub recipients: Vec<RecipientResponse>,
}

impl ShelfEntryResponse {
    fn new(key: ReadingKey, entry: RawReadingEntry) -> Self {
        Self {
            reading_type: key.reading_type.key().to_string(),
            date: key.date,
            text: entry.text,
            extract_date: entry.extract_date,
            recipients: entry
                .recipients
                .into_iter()
                .map(|r| RecipientResponse {
                    wa_id: r.wa_id,
                    sent: r.sent,
                })
                .collect(),
        }
    }
}

fn status(code: StatusCode, message: &str) -> Response {
    (
        code,
        Json(StatusResponse {
            status: "error".to_string(),
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// Loads the shelf, keeps the entries `keep` accepts, and answers 404 when
/// nothing is left.
async fn shelf_response<F>(app_state: &AppState, keep: F) -> Response
where
    F: Fn(&ReadingKey) -> bool,
{
    let entries = match app_state.store.cached_entries().await {
        Ok(entries) => entries,
        Err(e) => {
            error!(error = %e, "Failed to read the shelf");
            return status(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read the shelf");
        }
    };

    let entries: Vec<ShelfEntryResponse> = entries
        .into_iter()
        .filter(|(key, _)| keep(key))
        .map(|(key, entry)| ShelfEntryResponse::new(key, entry))
        .collect();

    if entries.is_empty() {
        status(StatusCode::NOT_FOUND, "No content found")
    } else {
        Json(entries).into_response()
    }
}

/// Everything on the shelf.
#[utoipa::path(
    get,
    path = "/shelf",
    responses(
        (status = 200, description = "Cached readings", body = [ShelfEntryResponse]),
        (status = 404, description = "Shelf is empty", body = StatusResponse)
    )
)]
pub async fn shelf_handler(State(app_state): State<Arc<AppState>>) -> Response {
    shelf_response(&app_state, |_| true).await
}

/// Every cached day of one reading type.
#[utoipa::path(
    get,
    path = "/shelf/reading/{reading_type}",
    params(("reading_type" = String, Path, description = "`dr`, `jft` or `spad`")),
    responses(
        (status = 200, description = "Cached readings", body = [ShelfEntryResponse]),
        (status = 400, description = "Unknown reading type", body = StatusResponse),
        (status = 404, description = "Nothing cached for this type", body = StatusResponse)
    )
)]
pub async fn shelf_reading_handler(
    State(app_state): State<Arc<AppState>>,
    Path(reading_type): Path<String>,
) -> Response {
    let Ok(reading_type) = reading_type.parse::<ReadingType>() else {
        return status(StatusCode::BAD_REQUEST, "Unknown reading type");
    };
    shelf_response(&app_state, |key| key.reading_type == reading_type).await
}

/// Every cached reading for one day.
#[utoipa::path(
    get,
    path = "/shelf/date/{date}",
    params(("date" = String, Path, description = "A `Month Day` date, e.g. `May 1`")),
    responses(
        (status = 200, description = "Cached readings", body = [ShelfEntryResponse]),
        (status = 404, description = "Nothing cached for this day", body = StatusResponse)
    )
)]
pub async fn shelf_date_handler(
    State(app_state): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> Response {
    shelf_response(&app_state, |key| key.date == date).await
}
