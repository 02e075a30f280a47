//! Transcript parsing.
//!
//! Beeline renders result sets as box-drawn tables:
//!
//! ```text
//! 0: jdbc:hive2://edge01:10000> select id, name from users limit 2;
//! +-----+--------+
//! | id  |  name  |
//! +-----+--------+
//! | 1   | alice  |
//! | 2   | bob    |
//! +-----+--------+
//! 2 rows selected (0.41 seconds)
//! ```
//!
//! [`parse_table`] is the canonical parser: the body is everything from the
//! first border line to the last one, and the status line is the first line
//! after the table that matches the row-count grammar. Failed statements have
//! no table, so [`parse_transcript`] routes them to [`parse_after_echo`],
//! which keeps whatever follows the echoed statement.

use super::ERROR_MARKER;
use regex::Regex;
use std::sync::OnceLock;

/// Status line grammar, matched against a trimmed line:
///
/// - `<count> row selected` / `<count> rows selected`, where `<count>` is
///   digits, optionally comma-grouped in threes (`1,234,567`)
/// - `No rows selected`
///
/// Anything after the match (Beeline appends the elapsed time) stays part of
/// the status line.
fn status_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(\d{1,3}(?:,\d{3})+|\d+)\s+rows?\s+selected|No rows selected)")
            .expect("status regex is valid")
    })
}

/// A transcript cut into its result body and row-count line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResult {
    /// Table block or free text produced by the statement.
    pub body: String,
    /// Row-count summary such as `12 rows selected`, or empty.
    pub status_line: String,
}

impl ParsedResult {
    pub fn new(body: impl Into<String>, status_line: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            status_line: status_line.into(),
        }
    }

    /// Row count stated by the status line, for display.
    ///
    /// `No rows selected` is zero; an empty or unrecognized status line is
    /// `None`.
    pub fn row_count(&self) -> Option<u64> {
        let caps = status_regex().captures(self.status_line.trim())?;
        match caps.get(1) {
            Some(count) => count.as_str().replace(',', "").parse().ok(),
            None => Some(0),
        }
    }
}

/// Converts CRLF (and the `\r\r\n` some ptys emit) to LF.
pub fn normalize_line_endings(raw: &str) -> String {
    raw.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_border(line: &str) -> bool {
    line.starts_with('+') && line.contains('-')
}

fn is_status(line: &str) -> bool {
    status_regex().is_match(line.trim())
}

/// Parses a transcript with the table-boundary strategy.
///
/// Without any border line the whole trimmed transcript is the body and the
/// status line is empty.
pub fn parse_table(raw: &str) -> ParsedResult {
    let text = normalize_line_endings(raw);
    let lines: Vec<&str> = text.lines().collect();

    let Some(start) = lines.iter().position(|l| is_border(l)) else {
        return ParsedResult::new(text.trim(), "");
    };
    // A first border guarantees a last one.
    let end = lines.iter().rposition(|l| is_border(l)).unwrap_or(start);

    let body = lines[start..=end].join("\n").trim().to_string();
    let status_line = lines[end + 1..]
        .iter()
        .find(|l| is_status(l))
        .map(|l| l.trim().to_string())
        .unwrap_or_default();

    ParsedResult { body, status_line }
}

/// Parses a transcript by keeping whatever follows the echoed statement.
///
/// Used for failed statements. The status line is always empty; if the echo
/// cannot be found the whole trimmed transcript is the body.
pub fn parse_after_echo(raw: &str, query: &str) -> ParsedResult {
    let text = normalize_line_endings(raw);
    let echo = query.trim();

    let body = match text.find(echo) {
        Some(idx) if !echo.is_empty() => text[idx + echo.len()..].trim(),
        _ => text.trim(),
    };
    ParsedResult::new(body, "")
}

/// Returns true if the transcript reports a failed statement.
pub fn is_tool_error(raw: &str) -> bool {
    raw.contains(ERROR_MARKER)
}

/// Parses a full query transcript, choosing the strategy by content.
pub fn parse_transcript(raw: &str, query: &str) -> ParsedResult {
    if is_tool_error(raw) {
        parse_after_echo(raw, query)
    } else {
        parse_table(raw)
    }
}
