//! services/api/src/web/webhook.rs
//!
//! The WhatsApp webhook: subscription verification and inbound message handling.
//!
//! Every message sent through the channel produces several deliveries to this
//! endpoint (the message itself, then sent/delivered/read statuses). Only the
//! message triggers a reply; status updates are acknowledged and dropped.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The `hub.*` query parameters Meta sends when subscribing the webhook.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

impl StatusResponse {
    fn success(message: &str) -> Json<Self> {
        Json(Self {
            status: "success".to_string(),
            message: message.to_string(),
        })
    }

    fn error(message: &str) -> Json<Self> {
        Json(Self {
            status: "error".to_string(),
            message: message.to_string(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub statuses: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct Contact {
    pub wa_id: String,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub from: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub text: Option<TextBody>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

impl WebhookPayload {
    fn first_value(&self) -> Option<&ChangeValue> {
        Some(&self.entry.first()?.changes.first()?.value)
    }

    fn is_status_update(&self) -> bool {
        self.first_value().is_some_and(|v| !v.statuses.is_empty())
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Verify the webhook subscription.
///
/// Echoes `hub.challenge` back when the mode is `subscribe` and the token matches.
#[utoipa::path(
    get,
    path = "/webhook",
    params(VerifyParams),
    responses(
        (status = 200, description = "Verification successful, body is the challenge", body = String),
        (status = 400, description = "Missing verification parameters", body = StatusResponse),
        (status = 403, description = "Verification failed", body = StatusResponse)
    )
)]
pub async fn verify_webhook(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let (Some(mode), Some(token)) = (params.mode.as_deref(), params.verify_token.as_deref()) else {
        warn!("Webhook verification request is missing parameters");
        return (
            StatusCode::BAD_REQUEST,
            StatusResponse::error("Missing verification parameters"),
        )
            .into_response();
    };

    if mode == "subscribe" && token == state.config.verify_token {
        info!("Webhook verified successfully");
        (StatusCode::OK, params.challenge.unwrap_or_default()).into_response()
    } else {
        warn!(mode, "Webhook verification failed, invalid token or mode");
        (StatusCode::FORBIDDEN, StatusResponse::error("Verification failed")).into_response()
    }
}

/// Receive a webhook event.
///
/// A text message gets a read receipt and then one outbound message per reply:
/// the day's readings the sender has not had yet, or a quote.
#[utoipa::path(
    post,
    path = "/webhook",
    request_body(content = Object, description = "WhatsApp Cloud API webhook event"),
    responses(
        (status = 200, description = "Event processed", body = StatusResponse),
        (status = 400, description = "Not a valid WhatsApp API event", body = StatusResponse),
        (status = 403, description = "Invalid signature", body = StatusResponse)
    )
)]
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<StatusResponse>) {
    info!(body = %body, "Received webhook request");

    let payload: WebhookPayload = match serde_json::from_value(body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Webhook payload has an unexpected shape");
            return invalid_event();
        }
    };

    if payload.is_status_update() {
        info!("Received a WhatsApp status update");
        return (StatusCode::OK, StatusResponse::success("Status update received"));
    }

    let Some(value) = payload.first_value().filter(|_| payload.object.is_some()) else {
        return invalid_event();
    };
    let Some(message) = value.messages.first() else {
        return invalid_event();
    };
    let Some(wa_id) = value
        .contacts
        .first()
        .map(|c| c.wa_id.as_str())
        .or(message.from.as_deref())
    else {
        return invalid_event();
    };
    let Some(text) = message.text.as_ref() else {
        info!(wa_id, kind = ?message.kind, "Ignoring non-text message");
        return (StatusCode::OK, StatusResponse::success("Message type ignored"));
    };

    if let Err(e) = state.sender.mark_read(&message.id).await {
        warn!(wa_id, message_id = %message.id, error = %e, "Failed to send read receipt");
    }

    let replies = state.responses.reply_for(&text.body, wa_id).await;
    let mut failed = 0;
    for reply in &replies {
        if let Err(e) = state.sender.send_text(wa_id, reply).await {
            error!(wa_id, error = %e, "Failed to send reply");
            failed += 1;
        }
    }
    info!(wa_id, replies = replies.len(), failed, "Message processed");

    (StatusCode::OK, StatusResponse::success("Message processed successfully"))
}

fn invalid_event() -> (StatusCode, Json<StatusResponse>) {
    warn!("Not a valid WhatsApp API event");
    (
        StatusCode::BAD_REQUEST,
        StatusResponse::error("Not a valid WhatsApp API event"),
    )
}
