//! Date-string parsing for `$toDate`.
//!
//! Timestamps with an explicit offset (RFC 3339, RFC 2822) are honoured;
//! everything else is read as UTC wall-clock time.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use latiao_core::DateParser;

/// Date-time layouts tried in order, before the date-only ones.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Default [`DateParser`], backed by chrono.
#[derive(Debug, Clone, Default)]
pub struct ChronoDateParser {
    extra: Vec<String>,
}

impl ChronoDateParser {
    /// Creates a parser with the built-in layouts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a strftime-style date-time layout, tried after the built-in ones.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.extra.push(format.into());
        self
    }

    fn parse_naive(&self, text: &str) -> Option<NaiveDateTime> {
        let datetime = DATETIME_FORMATS
            .iter()
            .copied()
            .chain(self.extra.iter().map(String::as_str))
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok());
        if datetime.is_some() {
            return datetime;
        }

        let date = DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
            .or_else(|| year_month(text))?;
        Some(date.and_time(NaiveTime::MIN))
    }
}

/// `YYYY-MM` and `YYYY`, which chrono will not parse without a day.
fn year_month(text: &str) -> Option<NaiveDate> {
    let (year, month) = match text.split_once(['-', '/']) {
        Some((y, m)) => (y, m.parse::<u32>().ok()?),
        None => (text, 1),
    };
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, 1)
}

impl DateParser for ChronoDateParser {
    fn parse(&self, text: &str) -> Option<f64> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.timestamp_millis() as f64);
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
            return Some(dt.timestamp_millis() as f64);
        }
        self.parse_naive(text)
            .map(|naive| naive.and_utc().timestamp_millis() as f64)
    }
}
