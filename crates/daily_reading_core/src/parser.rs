//! crates/daily_reading_core/src/parser.rs
//!
//! Turns the marked-up text of a reading into a [`Reading`].
//!
//! The text follows WhatsApp formatting: `_*X*_` brackets the date, `*X*`
//! brackets bold fields (headings, references, some affirmations) and `_X_`
//! brackets italic fields (quotes, some affirmations). The three variants only
//! differ in which occurrence maps to which field. A missing delimiter leaves
//! the dependent fields empty; it never fails the parse.

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

use crate::domain::{Reading, ReadingType};

static DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_\*([^*]+)\*_").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*]+)\*").unwrap());
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_([^_]+)_").unwrap());
static DASHED_BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*[–—-]\s*([^*]+)\*").unwrap());
static LEADING_DASH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*[–—-]\s*").unwrap());
static INLINE_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

#[derive(Debug, thiserror::Error)]
enum ParseError {
    #[error("{field} boundary {start}..{end} is not a valid slice")]
    Boundary {
        field: &'static str,
        start: usize,
        end: usize,
    },
}

/// Parses `text` with the variant for `reading_type`.
///
/// Missing markup never fails a parse. `None` is reserved for a slice that
/// does not fall on a char boundary; the anchors are all found by search, so
/// current inputs always produce `Some`. The failure is logged, never propagated.
pub fn parse(reading_type: ReadingType, text: &str) -> Option<Reading> {
    let result = match reading_type {
        ReadingType::Dr => daily_reflection(text),
        ReadingType::Jft => just_for_today(text),
        ReadingType::Spad => spiritual_principle(text),
    };
    settle(reading_type, result)
}

fn settle(reading_type: ReadingType, result: Result<Reading, ParseError>) -> Option<Reading> {
    match result {
        Ok(reading) => Some(reading),
        Err(e) => {
            warn!(reading_type = %reading_type, error = %e, "Failed to parse reading");
            None
        }
    }
}

pub fn parse_daily_reflection(text: &str) -> Option<Reading> {
    parse(ReadingType::Dr, text)
}

pub fn parse_just_for_today(text: &str) -> Option<Reading> {
    parse(ReadingType::Jft, text)
}

pub fn parse_spiritual_principle(text: &str) -> Option<Reading> {
    parse(ReadingType::Spad, text)
}

//=========================================================================================
// Variants
//=========================================================================================

fn daily_reflection(content: &str) -> Result<Reading, ParseError> {
    let date = first_capture(&DATE, content);
    let bold = captures(&BOLD, content);
    let heading = bold.get(1).copied().unwrap_or_default();
    let quote = quote_after(content, heading);
    let source = first_capture(&DASHED_BOLD, content);
    let affirmation = bold.last().copied().unwrap_or_default();

    let mut narrative = String::new();
    if !source.is_empty() && !affirmation.is_empty() {
        if let (Some(source_pos), Some(affirmation_pos)) =
            (content.find(source), content.find(affirmation))
        {
            if affirmation_pos > source_pos {
                let start = skip_char(content, source_pos + source.len());
                let end = back_char(content, affirmation_pos);
                narrative = clean(between(content, start, end, "narrative")?);
            }
        }
    }

    Ok(build(ReadingType::Dr, date, heading, quote, source, narrative, affirmation.to_string()))
}

fn just_for_today(content: &str) -> Result<Reading, ParseError> {
    let date = first_capture(&DATE, content);
    let bold = captures(&BOLD, content);
    // First two bold spans are the banner and the date.
    let heading = bold.get(2).copied().unwrap_or_default();
    let quote = quote_after(content, heading);
    let source = bold_after(content, quote);

    let last_bold = bold.last().copied();
    let last_bold_pos = last_bold.and_then(|b| content.rfind(b).map(|pos| (pos, b.len())));

    let affirmation = match last_bold_pos {
        Some((pos, len)) => {
            let start = skip_char(content, pos + len);
            clean(between(content, start, content.len(), "affirmation")?)
        }
        None => String::new(),
    };

    let mut narrative = String::new();
    if !source.is_empty() && !affirmation.is_empty() {
        if let (Some(source_pos), Some((bold_pos, _))) = (content.find(source), last_bold_pos) {
            let start = skip_char(content, source_pos + source.len());
            let end = back_char(content, bold_pos);
            if end > start {
                narrative = clean(between(content, start, end, "narrative")?);
            }
        }
    }

    Ok(build(ReadingType::Jft, date, heading, quote, source, narrative, affirmation))
}

fn spiritual_principle(content: &str) -> Result<Reading, ParseError> {
    let date = first_capture(&DATE, content);
    let bold = captures(&BOLD, content);
    let heading = bold.get(2).copied().unwrap_or_default();
    let quote = quote_after(content, heading);
    let source = bold_after(content, quote);

    // The date span counts as the first italic span, so an affirmation needs a second one.
    let italic = captures(&ITALIC, content);
    let affirmation = if italic.len() > 1 {
        italic.last().copied().unwrap_or_default()
    } else {
        ""
    };

    let mut narrative = String::new();
    if !source.is_empty() && !affirmation.is_empty() {
        if let (Some(source_pos), Some(affirmation_pos)) =
            (content.find(source), content.rfind(affirmation))
        {
            let start = skip_char(content, source_pos + source.len());
            let end = back_char(content, affirmation_pos);
            if end > start {
                narrative = clean(between(content, start, end, "narrative")?);
            }
        }
    }

    Ok(build(ReadingType::Spad, date, heading, quote, source, narrative, affirmation.to_string()))
}

//=========================================================================================
// Helpers
//=========================================================================================

fn build(
    reading_type: ReadingType,
    date: &str,
    heading: &str,
    quote: &str,
    source: &str,
    narrative: String,
    affirmation: String,
) -> Reading {
    Reading {
        reading_type,
        date: date.to_string(),
        heading: heading.to_string(),
        quote: quote.to_string(),
        source: source.to_string(),
        narrative,
        affirmation,
    }
}

fn captures<'a>(re: &Regex, text: &'a str) -> Vec<&'a str> {
    re.captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .collect()
}

fn first_capture<'a>(re: &Regex, text: &'a str) -> &'a str {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or_default()
}

/// First italic span after the heading, or anywhere when there is no heading.
fn quote_after<'a>(content: &'a str, heading: &str) -> &'a str {
    if heading.is_empty() {
        return first_capture(&ITALIC, content);
    }
    content
        .find(heading)
        .and_then(|pos| content.get(pos + heading.len()..))
        .map(|rest| first_capture(&ITALIC, rest))
        .unwrap_or_default()
}

/// First bold span after the quote.
fn bold_after<'a>(content: &'a str, quote: &str) -> &'a str {
    if quote.is_empty() {
        return "";
    }
    content
        .find(quote)
        .and_then(|pos| content.get(pos + quote.len()..))
        .map(|rest| first_capture(&BOLD, rest))
        .unwrap_or_default()
}

/// Index just past the character starting at `idx` (the closing delimiter).
fn skip_char(s: &str, idx: usize) -> usize {
    s.get(idx..)
        .and_then(|rest| rest.chars().next())
        .map_or(idx, |c| idx + c.len_utf8())
}

/// Index of the character just before `idx` (the opening delimiter).
fn back_char(s: &str, idx: usize) -> usize {
    s.get(..idx)
        .and_then(|head| head.chars().next_back())
        .map_or(idx, |c| idx - c.len_utf8())
}

fn between<'a>(s: &'a str, start: usize, end: usize, field: &'static str) -> Result<&'a str, ParseError> {
    if start >= end {
        return Ok("");
    }
    s.get(start..end)
        .ok_or(ParseError::Boundary { field, start, end })
}

/// Trims, drops one leading dash, and collapses runs of spaces and tabs.
/// Newlines are kept.
fn clean(text: &str) -> String {
    let text = LEADING_DASH.replace(text.trim(), "");
    INLINE_WS.replace_all(&text, " ").into_owned()
}
