use api_lib::config::Config;
use api_lib::web::rest::{
    list_readings_handler, run_scrape_handler, todays_readings_handler, ReadingsQuery,
};
use api_lib::web::shelf::{shelf_date_handler, shelf_handler, shelf_reading_handler};
use api_lib::web::webhook::{receive_webhook, verify_webhook, VerifyParams};
use api_lib::web::AppState;
use async_trait::async_trait;
use axum::body::to_bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use daily_reading_core::ports::{MessageSender, PortResult, QuoteService, ReadingSource};
use daily_reading_core::{
    today, MemoryCache, MemoryRepository, ReadingStore, ReadingType, ResponseGenerator, Scraper,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

//=========================================================================================
// Fakes
//=========================================================================================

struct DatedSource {
    reading_type: ReadingType,
    text: String,
}

#[async_trait]
impl ReadingSource for DatedSource {
    fn reading_type(&self) -> ReadingType {
        self.reading_type
    }

    async fn fetch(&self, _date: &str) -> PortResult<String> {
        Ok(self.text.clone())
    }
}

struct StaticQuote;

#[async_trait]
impl QuoteService for StaticQuote {
    async fn random_quote(&self) -> PortResult<String> {
        Ok("_*Be here now.*_\n - _Ram Dass_".to_string())
    }
}

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
    read: Mutex<Vec<String>>,
}

impl RecordingSender {
    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    fn read(&self) -> Vec<String> {
        self.read.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_text(&self, wa_id: &str, body: &str) -> PortResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((wa_id.to_string(), body.to_string()));
        Ok(())
    }

    async fn mark_read(&self, message_id: &str) -> PortResult<()> {
        self.read.lock().unwrap().push(message_id.to_string());
        Ok(())
    }
}

//=========================================================================================
// Fixtures
//=========================================================================================

fn config() -> Config {
    Config::from_lookup(|name| match name {
        "VERIFY_TOKEN" => Some("verify-me".to_string()),
        "ACCESS_TOKEN" => Some("token".to_string()),
        "PHONE_NUMBER_ID" => Some("12345".to_string()),
        _ => None,
    })
    .unwrap()
}

fn sources(date: &str) -> Vec<Arc<dyn ReadingSource>> {
    vec![
        Arc::new(DatedSource {
            reading_type: ReadingType::Dr,
            text: format!(
                "_*{date}*_\n\n*Letting Go*\n_Quote here_\n*– Book, Page 1*\nNarrative.\n*Affirmation*"
            ),
        }),
        Arc::new(DatedSource {
            reading_type: ReadingType::Jft,
            text: format!(
                "❇️ *Just For Today* ❇️\n\n_*{date}*_\n\n*Heading*\n\n_Quote._\n\n*Basic Text, p. 5*\n\nNarrative.\n\n*Just for Today:* I will."
            ),
        }),
        Arc::new(DatedSource {
            reading_type: ReadingType::Spad,
            text: format!(
                "🔷 *Spiritual Principle A Day* 🔷\n\n_*{date}*_\n\n*Surrender*\n\n_Quote._\n\n*SPAD, page 1*\n\nBody.\n\n_Today I will._"
            ),
        }),
    ]
}

fn app() -> (Arc<AppState>, Arc<RecordingSender>) {
    let store = ReadingStore::new(Arc::new(MemoryCache::new()), Arc::new(MemoryRepository::new()));
    let scraper = Arc::new(Scraper::new(store, sources(&today())));
    let responses = Arc::new(ResponseGenerator::new(scraper.clone(), Arc::new(StaticQuote)));
    let sender = Arc::new(RecordingSender::default());
    let state = AppState::new(Arc::new(config()), scraper, responses, sender.clone());
    (Arc::new(state), sender)
}

fn text_message(wa_id: &str, message_id: &str, body: &str) -> Value {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "WHATSAPP_BUSINESS_ACCOUNT_ID",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "contacts": [{ "profile": { "name": "Sam" }, "wa_id": wa_id }],
                    "messages": [{
                        "from": wa_id,
                        "id": message_id,
                        "timestamp": "1714550400",
                        "type": "text",
                        "text": { "body": body }
                    }]
                }
            }]
        }]
    })
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

//=========================================================================================
// Webhook
//=========================================================================================

#[tokio::test]
async fn verification_echoes_the_challenge() {
    let (state, _) = app();
    let params = VerifyParams {
        mode: Some("subscribe".to_string()),
        verify_token: Some("verify-me".to_string()),
        challenge: Some("1158201444".to_string()),
    };

    let response = verify_webhook(State(state), Query(params)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "1158201444");
}

#[tokio::test]
async fn verification_with_wrong_token_is_forbidden() {
    let (state, _) = app();
    let params = VerifyParams {
        mode: Some("subscribe".to_string()),
        verify_token: Some("guess".to_string()),
        challenge: Some("1".to_string()),
    };

    let response = verify_webhook(State(state), Query(params)).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn verification_without_parameters_is_a_bad_request() {
    let (state, _) = app();
    let params = VerifyParams {
        mode: None,
        verify_token: None,
        challenge: None,
    };

    let response = verify_webhook(State(state), Query(params)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn text_message_gets_read_receipt_and_readings_in_order() {
    let (state, sender) = app();

    let (status, Json(reply)) =
        receive_webhook(State(state), Json(text_message("15550001", "wamid.1", "hi"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply.status, "success");
    assert_eq!(sender.read(), vec!["wamid.1".to_string()]);
    let sent = sender.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|(wa_id, _)| wa_id == "15550001"));
    assert!(sent[0].1.starts_with("_*"));
    assert!(sent[1].1.starts_with("❇️"));
    assert!(sent[2].1.starts_with("🔷"));
}

#[tokio::test]
async fn second_message_the_same_day_gets_a_quote() {
    let (state, sender) = app();

    receive_webhook(State(state.clone()), Json(text_message("15550001", "wamid.1", "hi"))).await;
    receive_webhook(State(state), Json(text_message("15550001", "wamid.2", "again"))).await;

    let sent = sender.sent();
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[3].1, "_*Be here now.*_\n - _Ram Dass_");
}

#[tokio::test]
async fn status_updates_are_acknowledged_without_replies() {
    let (state, sender) = app();
    let payload = json!({
        "object": "whatsapp_business_account",
        "entry": [{ "changes": [{ "value": {
            "statuses": [{ "id": "wamid.1", "status": "delivered", "recipient_id": "15550001" }]
        }}]}]
    });

    let (status, Json(reply)) = receive_webhook(State(state), Json(payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply.message, "Status update received");
    assert!(sender.sent().is_empty());
    assert!(sender.read().is_empty());
}

#[tokio::test]
async fn payload_without_a_message_is_rejected() {
    let (state, sender) = app();

    let (status, Json(reply)) =
        receive_webhook(State(state), Json(json!({ "object": "page", "entry": [] }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.status, "error");
    assert!(sender.sent().is_empty());
}

//=========================================================================================
// REST
//=========================================================================================

#[tokio::test]
async fn scrape_task_then_readings_listing() {
    let (state, _) = app();

    let summary = run_scrape_handler(State(state.clone())).await.into_response();
    assert_eq!(summary.status(), StatusCode::OK);
    let summary: Value = serde_json::from_str(&body_text(summary).await).unwrap();
    assert_eq!(summary["success_count"], 3);
    assert_eq!(summary["failure_count"], 0);

    let Json(readings) = list_readings_handler(
        State(state.clone()),
        Query(ReadingsQuery {
            reading_type: Some("jft".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap();
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].heading, "Heading");
    assert!(readings[0].recipients.is_empty());

    let Json(today_readings) = todays_readings_handler(State(state)).await.unwrap();
    assert!(today_readings.dr.is_some());
    assert!(today_readings.jft.is_some());
    assert!(today_readings.spad.is_some());
}

#[tokio::test]
async fn readings_listing_rejects_unknown_types() {
    let (state, _) = app();

    let result = list_readings_handler(
        State(state),
        Query(ReadingsQuery {
            reading_type: Some("weekly".to_string()),
            ..Default::default()
        }),
    )
    .await;

    assert!(matches!(result, Err((StatusCode::BAD_REQUEST, _))));
}

#[tokio::test]
async fn delivered_readings_list_their_recipients() {
    let (state, _) = app();
    receive_webhook(State(state.clone()), Json(text_message("15550001", "wamid.1", "hi"))).await;

    let Json(today_readings) = todays_readings_handler(State(state)).await.unwrap();

    let dr = today_readings.dr.unwrap();
    assert_eq!(dr.recipients.len(), 1);
    assert_eq!(dr.recipients[0].wa_id, "15550001");
}

#[tokio::test]
async fn shelf_is_not_found_until_something_is_cached() {
    let (state, _) = app();

    let empty = shelf_handler(State(state.clone())).await;
    assert_eq!(empty.status(), StatusCode::NOT_FOUND);

    run_scrape_handler(State(state.clone())).await;

    let full = shelf_handler(State(state.clone())).await;
    assert_eq!(full.status(), StatusCode::OK);
    let entries: Value = serde_json::from_str(&body_text(full).await).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 3);

    let by_type = shelf_reading_handler(State(state.clone()), Path("spad".to_string())).await;
    assert_eq!(by_type.status(), StatusCode::OK);

    let by_date = shelf_date_handler(State(state.clone()), Path("February 30".to_string())).await;
    assert_eq!(by_date.status(), StatusCode::NOT_FOUND);

    let unknown = shelf_reading_handler(State(state), Path("weekly".to_string())).await;
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
}
