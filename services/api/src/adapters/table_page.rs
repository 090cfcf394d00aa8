//! services/api/src/adapters/table_page.rs
//!
//! A `ReadingSource` for the two readings published as single-table web pages
//! (Just For Today and Spiritual Principle A Day). The page is fetched with a
//! timeout and a fixed-delay retry, then its rows are laid out in the
//! asterisk/underscore markup the messaging channel renders.

use async_trait::async_trait;
use daily_reading_core::domain::ReadingType;
use daily_reading_core::ports::{PortError, PortResult, ReadingSource};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

use super::html::table_rows;

static TRAILING_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\d{4}$").expect("valid year pattern"));

/// How often and how patiently a page fetch is retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Which page is being read. The two pages share their first six rows and
/// differ in the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLayout {
    Jft,
    Spad,
}

impl TableLayout {
    pub fn reading_type(self) -> ReadingType {
        match self {
            TableLayout::Jft => ReadingType::Jft,
            TableLayout::Spad => ReadingType::Spad,
        }
    }

    fn header(self) -> &'static str {
        match self {
            TableLayout::Jft => "❇️ *Just For Today* ❇️",
            TableLayout::Spad => "🔷 *Spiritual Principle A Day* 🔷",
        }
    }

    fn min_rows(self) -> usize {
        match self {
            TableLayout::Jft => 7,
            TableLayout::Spad => 8,
        }
    }
}

/// Lays the table rows out as a formatted reading.
///
/// Rows are: date, heading, (unused), quote, source, narrative, then the
/// affirmation for jft or a closing paragraph and affirmation for spad.
pub fn format_rows(layout: TableLayout, rows: &[String]) -> PortResult<String> {
    if rows.len() < layout.min_rows() {
        return Err(PortError::Parse(format!(
            "{} page has {} rows, expected at least {}",
            layout.reading_type(),
            rows.len(),
            layout.min_rows()
        )));
    }

    let date = TRAILING_YEAR.replace(rows[0].trim(), "");
    let mut parts = vec![
        layout.header().to_string(),
        format!("_*{}*_", date.trim()),
        format!("*{}*", rows[1].trim()),
        format!("_{}_", rows[3].trim()),
        format!("*{}*", rows[4].trim()),
        rows[5].trim().to_string(),
    ];
    match layout {
        TableLayout::Jft => {
            parts.push(rows[6].trim().replace("Just for Today:", "*Just for Today:*"));
        }
        TableLayout::Spad => {
            parts.push(rows[6].trim().to_string());
            parts.push(format!("_{}_", rows[7].trim()));
        }
    }

    Ok(parts.join("\n\n").trim().to_string())
}

//=========================================================================================
// The Adapter
//=========================================================================================

pub struct TablePageSource {
    layout: TableLayout,
    url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl TablePageSource {
    pub fn new(layout: TableLayout, url: impl Into<String>, client: reqwest::Client, retry: RetryPolicy) -> Self {
        Self {
            layout,
            url: url.into(),
            client,
            retry,
        }
    }

    async fn fetch_once(&self) -> Result<String, reqwest::Error> {
        self.client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }

    async fn fetch_page(&self) -> PortResult<String> {
        let attempts = self.retry.attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.fetch_once().await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    warn!(url = %self.url, attempt, error = %e, "Page fetch failed");
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
            }
        }

        Err(PortError::Fetch(format!(
            "{} failed after {} attempts: {}",
            self.url, attempts, last_error
        )))
    }
}

#[async_trait]
impl ReadingSource for TablePageSource {
    fn reading_type(&self) -> ReadingType {
        self.layout.reading_type()
    }

    async fn fetch(&self, date: &str) -> PortResult<String> {
        debug!(url = %self.url, date, "Fetching reading page");
        let page = self.fetch_page().await?;
        format_rows(self.layout, &table_rows(&page)?)
    }
}
