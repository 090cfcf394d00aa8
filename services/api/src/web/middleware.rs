//! services/api/src/web/middleware.rs
//!
//! Signature middleware for the webhook. Meta signs every delivery with the
//! app secret; requests whose `X-Hub-Signature-256` does not match are refused.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use std::sync::Arc;
use tracing::warn;

use crate::web::state::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Webhook bodies are small JSON documents.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Checks `header` (`sha256=<hex>`) against the HMAC-SHA256 of `body`.
pub fn signature_is_valid(secret: &str, header: &str, body: &[u8]) -> bool {
    let Some(hex_digest) = header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Computes the header value Meta would send for `body`.
pub fn sign(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

fn forbidden(message: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "status": "error", "message": message })),
    )
        .into_response()
}

/// Middleware that validates the webhook signature over the raw request body.
///
/// Only `POST` deliveries are signed, so other methods pass through, as does
/// every request when no app secret is configured.
pub async fn require_signature(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(secret) = state.config.app_secret.as_deref() else {
        return next.run(req).await;
    };
    if req.method() != Method::POST {
        return next.run(req).await;
    }

    let (parts, body) = req.into_parts();
    let Some(signature) = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
    else {
        warn!("Webhook request without a signature");
        return forbidden("Invalid signature");
    };

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Could not read webhook body");
            return (StatusCode::BAD_REQUEST, "Unreadable body").into_response();
        }
    };

    if !signature_is_valid(secret, &signature, &bytes) {
        warn!("Webhook signature verification failed");
        return forbidden("Invalid signature");
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
