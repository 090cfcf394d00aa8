//! services/api/src/adapters/reflections.rs
//!
//! A `ReadingSource` for the daily reflections, which live in a local text file
//! holding the whole year. Each day starts with a `_*Month Day*_` line.

use async_trait::async_trait;
use daily_reading_core::domain::ReadingType;
use daily_reading_core::ports::{PortError, PortResult, ReadingSource};
use std::path::PathBuf;
use tracing::debug;

pub struct ReflectionsFileSource {
    path: PathBuf,
}

impl ReflectionsFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Slices out the entry for `date`: from its `_*date*_` anchor up to the next
/// `_*` anchor, or the end of the file.
pub fn extract_entry<'a>(contents: &'a str, date: &str) -> Option<&'a str> {
    let anchor = format!("_*{}*_", date);
    let start = contents.find(&anchor)?;
    let body_from = start + anchor.len();
    let end = contents[body_from..]
        .find("_*")
        .map_or(contents.len(), |offset| body_from + offset);
    Some(contents[start..end].trim())
}

#[async_trait]
impl ReadingSource for ReflectionsFileSource {
    fn reading_type(&self) -> ReadingType {
        ReadingType::Dr
    }

    async fn fetch(&self, date: &str) -> PortResult<String> {
        debug!(path = %self.path.display(), date, "Reading the reflections file");
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            PortError::Fetch(format!("Could not read {}: {}", self.path.display(), e))
        })?;

        extract_entry(&contents, date)
            .map(str::to_string)
            .ok_or_else(|| PortError::NotFound(format!("No reflection for {}", date)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const FILE: &str = "_*April 30*_\n\n*Yesterday*\nbody\n\n\
                        _*May 1*_\n\n*Letting Go*\n_Quote here_\n*– Book, Page 1*\nNarrative.\n*Affirmation*\n\n\
                        _*May 2*_\n\n*Tomorrow*\n";

    #[test]
    fn extracts_up_to_the_next_anchor() {
        let entry = extract_entry(FILE, "May 1").unwrap();

        assert!(entry.starts_with("_*May 1*_"));
        assert!(entry.ends_with("*Affirmation*"));
        assert!(!entry.contains("May 2"));
    }

    #[test]
    fn last_entry_runs_to_the_end_of_the_file() {
        assert_eq!(extract_entry(FILE, "May 2").unwrap(), "_*May 2*_\n\n*Tomorrow*");
    }

    #[test]
    fn day_prefix_does_not_match_a_longer_day() {
        let contents = "_*May 11*_\nEleven\n";

        assert!(extract_entry(contents, "May 1").is_none());
    }

    #[tokio::test]
    async fn fetch_reads_from_disk() {
        let path = std::env::temp_dir().join(format!("reflections-{}.txt", Uuid::new_v4()));
        tokio::fs::write(&path, FILE).await.unwrap();
        let source = ReflectionsFileSource::new(&path);

        let text = source.fetch("April 30").await.unwrap();
        let missing = source.fetch("June 9").await;
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(text, "_*April 30*_\n\n*Yesterday*\nbody");
        assert!(matches!(missing, Err(PortError::NotFound(_))));
    }

    #[tokio::test]
    async fn missing_file_is_a_fetch_failure() {
        let source = ReflectionsFileSource::new("/nonexistent/reflections.txt");

        assert!(matches!(source.fetch("May 1").await, Err(PortError::Fetch(_))));
    }
}
