//! services/api/src/adapters/whatsapp.rs
//!
//! A `MessageSender` that talks to the WhatsApp Cloud API (Graph API).

use async_trait::async_trait;
use daily_reading_core::ports::{MessageSender, PortError, PortResult};
use serde_json::{json, Value};
use tracing::{error, info};

#[derive(Clone)]
pub struct WhatsAppAdapter {
    client: reqwest::Client,
    messages_url: String,
    access_token: String,
}

impl WhatsAppAdapter {
    /// `client` is expected to carry the request timeout.
    pub fn new(
        client: reqwest::Client,
        graph_api_version: &str,
        phone_number_id: &str,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            messages_url: format!(
                "https://graph.facebook.com/{}/{}/messages",
                graph_api_version, phone_number_id
            ),
            access_token: access_token.into(),
        }
    }

    async fn post(&self, payload: Value) -> PortResult<()> {
        let response = self
            .client
            .post(&self.messages_url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PortError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %body, "WhatsApp API rejected the request");
            return Err(PortError::Fetch(format!("WhatsApp API returned {}", status)));
        }
        info!(%status, "WhatsApp API accepted the request");
        Ok(())
    }
}

pub fn text_message(wa_id: &str, body: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": wa_id,
        "type": "text",
        "text": { "preview_url": false, "body": body },
    })
}

pub fn read_receipt(message_id: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "status": "read",
        "message_id": message_id,
    })
}

#[async_trait]
impl MessageSender for WhatsAppAdapter {
    async fn send_text(&self, wa_id: &str, body: &str) -> PortResult<()> {
        self.post(text_message(wa_id, body)).await
    }

    async fn mark_read(&self, message_id: &str) -> PortResult<()> {
        self.post(read_receipt(message_id)).await
    }
}
