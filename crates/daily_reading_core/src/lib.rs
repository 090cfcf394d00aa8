pub mod delivery;
pub mod domain;
pub mod memory;
pub mod parser;
pub mod ports;
pub mod quotes;
pub mod responses;
pub mod scrape;
pub mod store;

pub use delivery::{Delivery, DeliveryTracker};
pub use domain::{
    reading_date, today, Insertion, RawReadingEntry, Reading, ReadingFilter, ReadingKey,
    ReadingRecord, ReadingType, Recipient, SentTo,
};
pub use memory::{MemoryCache, MemoryRepository};
pub use ports::{
    MessageSender, PortError, PortResult, QuoteService, ReadingCache, ReadingRepository,
    ReadingSource,
};
pub use responses::ResponseGenerator;
pub use scrape::{ScrapeOutcome, ScrapeStatus, ScrapeSummary, Scraper};
pub use store::ReadingStore;
