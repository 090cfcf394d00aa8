use async_trait::async_trait;
use daily_reading_core::quotes::FALLBACK_QUOTES;
use daily_reading_core::{
    MemoryCache, MemoryRepository, PortError, PortResult, QuoteService, ReadingFilter, ReadingKey,
    ReadingSource, ReadingStore, ReadingType, ResponseGenerator, ScrapeStatus, Scraper,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const DATE: &str = "May 1";

const DR_TEXT: &str = "_*May 1*_\n\n*Letting Go*\n_Quote here_\n*– Book, Page 1*\nSome narrative. \n*Affirmation here*";
const JFT_TEXT: &str = "❇️ *Just For Today* ❇️\n\n_*May 1*_\n\n*Heading*\n\n_Quote text._\n\n*Basic Text, p. 5*\n\nNarrative.\n\n*Just for Today:* I will practise.";
const SPAD_TEXT: &str = "🔷 *Spiritual Principle A Day* 🔷\n\n_*May 1*_\n\n*Surrender*\n\n_Quote line._\n\n*SPAD, page 125*\n\nBody.\n\n_Today I will surrender._";

//=========================================================================================
// Fakes
//=========================================================================================

struct FixedSource {
    reading_type: ReadingType,
    text: &'static str,
    fetches: AtomicUsize,
}

impl FixedSource {
    fn new(reading_type: ReadingType, text: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reading_type,
            text,
            fetches: AtomicUsize::new(0),
        })
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadingSource for FixedSource {
    fn reading_type(&self) -> ReadingType {
        self.reading_type
    }

    async fn fetch(&self, _date: &str) -> PortResult<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.to_string())
    }
}

struct FailingSource(ReadingType);

#[async_trait]
impl ReadingSource for FailingSource {
    fn reading_type(&self) -> ReadingType {
        self.0
    }

    async fn fetch(&self, _date: &str) -> PortResult<String> {
        Err(PortError::Fetch("gave up after 3 attempts".to_string()))
    }
}

struct StaticQuote;

#[async_trait]
impl QuoteService for StaticQuote {
    async fn random_quote(&self) -> PortResult<String> {
        Ok("_*Be here now.*_\n - _Ram Dass_".to_string())
    }
}

struct BrokenQuotes;

#[async_trait]
impl QuoteService for BrokenQuotes {
    async fn random_quote(&self) -> PortResult<String> {
        Err(PortError::Fetch("503".to_string()))
    }
}

fn store() -> ReadingStore {
    ReadingStore::new(Arc::new(MemoryCache::new()), Arc::new(MemoryRepository::new()))
}

fn generator(
    sources: Vec<Arc<dyn ReadingSource>>,
    quotes: Arc<dyn QuoteService>,
) -> (ResponseGenerator, Arc<Scraper>) {
    let scraper = Arc::new(Scraper::new(store(), sources));
    (ResponseGenerator::new(scraper.clone(), quotes), scraper)
}

fn healthy_sources() -> Vec<Arc<dyn ReadingSource>> {
    vec![
        FixedSource::new(ReadingType::Spad, SPAD_TEXT),
        FixedSource::new(ReadingType::Dr, DR_TEXT),
        FixedSource::new(ReadingType::Jft, JFT_TEXT),
    ]
}

//=========================================================================================
// Tests
//=========================================================================================

#[tokio::test]
async fn first_message_gets_all_readings_in_fixed_order() {
    let (generator, _) = generator(healthy_sources(), Arc::new(StaticQuote));

    let replies = generator.generate_responses_on(DATE, "hi", "15550001").await;

    assert_eq!(replies, vec![DR_TEXT, JFT_TEXT, SPAD_TEXT]);
}

#[tokio::test]
async fn readings_are_delivered_at_most_once_per_recipient() {
    let (generator, _) = generator(healthy_sources(), Arc::new(StaticQuote));

    let first = generator.generate_responses_on(DATE, "hi", "15550001").await;
    let second = generator.generate_responses_on(DATE, "hi again", "15550001").await;
    let other = generator.generate_responses_on(DATE, "hello", "15550002").await;

    assert_eq!(first.len(), 3);
    assert!(second.is_empty());
    assert_eq!(other.len(), 3);
}

#[tokio::test]
async fn delivered_recipient_gets_the_quote_instead() {
    let (generator, _) = generator(healthy_sources(), Arc::new(StaticQuote));

    generator.reply_for_on(DATE, "hi", "15550001").await;
    let replies = generator.reply_for_on(DATE, "hi", "15550001").await;

    assert_eq!(replies, vec!["_*Be here now.*_\n - _Ram Dass_".to_string()]);
}

#[tokio::test]
async fn concurrent_messages_from_one_recipient_share_one_delivery() {
    let (generator, _) = generator(healthy_sources(), Arc::new(StaticQuote));
    let generator = Arc::new(generator);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let generator = generator.clone();
            tokio::spawn(async move { generator.generate_responses_on(DATE, "hi", "15550001").await })
        })
        .collect();

    let mut delivered = Vec::new();
    for handle in handles {
        delivered.extend(handle.await.unwrap());
    }
    delivered.sort();
    let mut expected = vec![DR_TEXT.to_string(), JFT_TEXT.to_string(), SPAD_TEXT.to_string()];
    expected.sort();
    assert_eq!(delivered, expected);
}

#[tokio::test]
async fn failing_source_does_not_block_the_others() {
    let sources: Vec<Arc<dyn ReadingSource>> = vec![
        FixedSource::new(ReadingType::Dr, DR_TEXT),
        Arc::new(FailingSource(ReadingType::Jft)),
        FixedSource::new(ReadingType::Spad, SPAD_TEXT),
    ];
    let (generator, _) = generator(sources, Arc::new(StaticQuote));

    let replies = generator.generate_responses_on(DATE, "hi", "15550001").await;

    assert_eq!(replies, vec![DR_TEXT, SPAD_TEXT]);
}

#[tokio::test]
async fn everything_failing_falls_back_to_a_built_in_quote() {
    let sources: Vec<Arc<dyn ReadingSource>> = ReadingType::ALL
        .into_iter()
        .map(|t| Arc::new(FailingSource(t)) as Arc<dyn ReadingSource>)
        .collect();
    let (generator, _) = generator(sources, Arc::new(BrokenQuotes));

    let replies = generator.reply_for_on(DATE, "hi", "15550001").await;

    assert_eq!(replies.len(), 1);
    assert!(FALLBACK_QUOTES.contains(&replies[0].as_str()));
}

#[tokio::test]
async fn sources_are_scraped_once_per_day() {
    let dr = FixedSource::new(ReadingType::Dr, DR_TEXT);
    let jft = FixedSource::new(ReadingType::Jft, JFT_TEXT);
    let sources: Vec<Arc<dyn ReadingSource>> = vec![dr.clone(), jft.clone()];
    let (generator, _) = generator(sources, Arc::new(StaticQuote));

    generator.generate_responses_on(DATE, "hi", "15550001").await;
    generator.generate_responses_on(DATE, "hi", "15550002").await;
    generator.generate_responses_on(DATE, "hi", "15550003").await;

    assert_eq!(dr.fetches(), 1);
    assert_eq!(jft.fetches(), 1);
}

#[tokio::test]
async fn scrape_all_skips_stored_readings() {
    let (_, scraper) = generator(healthy_sources(), Arc::new(StaticQuote));

    let first = scraper.scrape_all(DATE).await;
    assert_eq!(first.success_count(), 3);
    assert_eq!(first.failure_count(), 0);
    assert!(first.outcomes.iter().all(|o| o.status == ScrapeStatus::Scraped));

    let second = scraper.scrape_all(DATE).await;
    assert!(second.outcomes.iter().all(|o| o.status == ScrapeStatus::AlreadyStored));

    let stored = scraper
        .store()
        .list_records(&ReadingFilter::default())
        .await
        .unwrap();
    assert_eq!(stored.len(), 3);
}

#[tokio::test]
async fn scrape_all_reports_failures_per_source() {
    let sources: Vec<Arc<dyn ReadingSource>> = vec![
        FixedSource::new(ReadingType::Dr, DR_TEXT),
        Arc::new(FailingSource(ReadingType::Jft)),
    ];
    let (_, scraper) = generator(sources, Arc::new(StaticQuote));

    let summary = scraper.scrape_all(DATE).await;

    assert_eq!(summary.success_count(), 1);
    assert_eq!(summary.failure_count(), 1);
    let jft = summary
        .outcomes
        .iter()
        .find(|o| o.reading_type == ReadingType::Jft)
        .unwrap();
    assert!(matches!(jft.status, ScrapeStatus::Failed(_)));
}

#[tokio::test]
async fn stale_page_is_rejected() {
    let (_, scraper) = generator(
        vec![FixedSource::new(ReadingType::Jft, JFT_TEXT)],
        Arc::new(StaticQuote),
    );

    let result = scraper.scrape(ReadingType::Jft, "June 2").await;

    assert!(matches!(result, Err(PortError::Parse(_))));
    let key = ReadingKey::new(ReadingType::Jft, "June 2");
    assert!(scraper.store().find_record(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn scraped_record_carries_parsed_fields() {
    let (_, scraper) = generator(healthy_sources(), Arc::new(StaticQuote));

    let record = scraper.scrape(ReadingType::Dr, DATE).await.unwrap();

    assert_eq!(record.reading.heading, "Letting Go");
    assert_eq!(record.reading.source, "Book, Page 1");
    assert_eq!(record.text, DR_TEXT);
}
