//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use daily_reading_core::ports::MessageSender;
use daily_reading_core::{ReadingStore, ResponseGenerator, Scraper};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: ReadingStore,
    pub scraper: Arc<Scraper>,
    pub responses: Arc<ResponseGenerator>,
    pub sender: Arc<dyn MessageSender>,
}

impl AppState {
    /// Wires the reply pipeline on top of an already-built scraper. The store is
    /// taken from the scraper so that every handler sees the same two tiers.
    pub fn new(
        config: Arc<Config>,
        scraper: Arc<Scraper>,
        responses: Arc<ResponseGenerator>,
        sender: Arc<dyn MessageSender>,
    ) -> Self {
        Self {
            config,
            store: scraper.store().clone(),
            scraper,
            responses,
            sender,
        }
    }
}
