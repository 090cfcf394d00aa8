//! services/api/src/scheduler.rs
//!
//! The periodic scrape. Runs `Scraper::scrape_all` for the current day on a
//! fixed interval, so readings are usually stored before anyone asks for them.

use daily_reading_core::{today, Scraper};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Scrapes every `period` until `cancel` fires. The first scrape happens one
/// period after start; lazy scraping covers the gap.
pub async fn run_periodic_scrape(scraper: Arc<Scraper>, period: Duration, cancel: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(period_secs = period.as_secs(), "Periodic scrape scheduled");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Periodic scrape stopped");
                break;
            }
            _ = ticker.tick() => {
                let summary = scraper.scrape_all(&today()).await;
                info!(
                    date = %summary.date,
                    success = summary.success_count(),
                    failures = summary.failure_count(),
                    "Periodic scrape finished"
                );
            }
        }
    }
}
