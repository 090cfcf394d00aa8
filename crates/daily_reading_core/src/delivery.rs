//! crates/daily_reading_core/src/delivery.rs
//!
//! The at-most-once gate between a stored reading and a recipient.

use chrono::Utc;
use tracing::info;

use crate::domain::{Insertion, ReadingRecord};
use crate::ports::PortResult;
use crate::store::ReadingStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// First request today: the text to send.
    Send(String),
    /// The recipient already got this reading.
    AlreadyNotified,
}

impl Delivery {
    pub fn into_text(self) -> Option<String> {
        match self {
            Delivery::Send(text) => Some(text),
            Delivery::AlreadyNotified => None,
        }
    }
}

#[derive(Clone)]
pub struct DeliveryTracker {
    store: ReadingStore,
}

impl DeliveryTracker {
    pub fn new(store: ReadingStore) -> Self {
        Self { store }
    }

    /// Records a send of `record` to `wa_id` and returns its text, unless the
    /// recipient was already recorded for it.
    pub async fn deliver(&self, record: &ReadingRecord, wa_id: &str) -> PortResult<Delivery> {
        if self.store.has_recipient(record.id, wa_id).await? {
            info!(key = %record.key(), wa_id, "Reading already sent to recipient");
            return Ok(Delivery::AlreadyNotified);
        }

        // The insert is the arbiter when two requests pass the check together.
        match self.store.add_recipient(record, wa_id, Utc::now()).await? {
            Insertion::Created(_) => Ok(Delivery::Send(record.text.clone())),
            Insertion::Existing(recipient) => {
                info!(
                    key = %record.key(),
                    wa_id,
                    sent = %recipient.sent,
                    "Reading was sent to recipient by a concurrent request"
                );
                Ok(Delivery::AlreadyNotified)
            }
        }
    }
}
