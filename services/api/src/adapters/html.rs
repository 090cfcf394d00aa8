//! services/api/src/adapters/html.rs
//!
//! Just enough HTML handling to read the reading pages, which publish each
//! reading as a single table.

use daily_reading_core::ports::{PortError, PortResult};
use regex::Regex;
use std::sync::LazyLock;

static ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").expect("valid row pattern"));
static FIRST_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<td\b[^>]*>(.*?)(?:</td>|$)").expect("valid cell pattern"));
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid break pattern"));
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid entity pattern"));

/// The text of the first `<td>` of every `<tr>`, in document order.
///
/// Line breaks become `\n`, other tags are dropped and entities decoded.
/// Fields are read by row position, so a row without a cell fails the page.
pub fn table_rows(page: &str) -> PortResult<Vec<String>> {
    ROW.captures_iter(page)
        .enumerate()
        .map(|(index, row)| {
            let cell = FIRST_CELL
                .captures(&row[1])
                .and_then(|c| c.get(1))
                .ok_or_else(|| PortError::Parse(format!("table row {} has no cell", index)))?;
            let with_breaks = LINE_BREAK.replace_all(cell.as_str(), "\n");
            Ok(decode_entities(&strip_tags(&with_breaks)))
        })
        .collect()
}

/// Removes every `<...>` tag, keeping the text between them.
pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;

    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Decodes the named entities these pages use plus any numeric entity.
pub fn decode_entities(s: &str) -> String {
    let named = s
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&rsquo;", "\u{2019}")
        .replace("&lsquo;", "\u{2018}")
        .replace("&rdquo;", "\u{201D}")
        .replace("&ldquo;", "\u{201C}")
        .replace("&mdash;", "\u{2014}")
        .replace("&ndash;", "\u{2013}")
        .replace("&hellip;", "\u{2026}");

    let numeric = NUMERIC_ENTITY.replace_all(&named, |caps: &regex::Captures| {
        let code = &caps[1];
        let parsed = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        parsed
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    // Last, so that "&amp;lt;" stays as the literal "&lt;".
    numeric.replace("&amp;", "&")
}
