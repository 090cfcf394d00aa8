pub mod middleware;
pub mod rest;
pub mod shelf;
pub mod state;
pub mod webhook;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use middleware::require_signature;
pub use rest::ApiDoc;
pub use state::AppState;

/// Builds the complete application router: webhook, REST endpoints and Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Only the webhook is signed by Meta.
    let webhook_routes = Router::new()
        .route(
            "/webhook",
            get(webhook::verify_webhook).post(webhook::receive_webhook),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_signature,
        ));

    let api_routes = Router::new()
        .route("/tasks/scrape", post(rest::run_scrape_handler))
        .route("/readings", get(rest::list_readings_handler))
        .route("/readings/today", get(rest::todays_readings_handler))
        .route("/shelf", get(shelf::shelf_handler))
        .route("/shelf/reading/{reading_type}", get(shelf::shelf_reading_handler))
        .route("/shelf/date/{date}", get(shelf::shelf_date_handler))
        .route("/health", get(rest::health_handler));

    let api_router = Router::new()
        .merge(webhook_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
