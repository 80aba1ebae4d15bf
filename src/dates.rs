use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("Invalid date {0:?}. Try 2023-01-31, 31-01-2023, 31 January 2023, January 2023 or 2023.")]
    Unparseable(String),
    #[error(
        "Invalid filters: start date {} must be before end date {}.",
        .start.format("%d-%m-%Y"),
        .end.format("%d-%m-%Y")
    )]
    EndBeforeStart { start: DateTime<Utc>, end: DateTime<Utc> },
}

/// The calendar days a user-typed date covers.
///
/// "2023" covers the whole year, "March 2023" the whole month, a full date
/// a single day. A date with a time of day is a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub first: NaiveDate,
    pub last: NaiveDate,
    /// Set when the input named a time of day; both bounds use it.
    pub time: Option<NaiveTime>,
}

impl DateSpan {
    fn day(date: NaiveDate) -> Self {
        Self {
            first: date,
            last: date,
            time: None,
        }
    }

    fn instant(at: NaiveDateTime) -> Self {
        Self {
            first: at.date(),
            last: at.date(),
            time: Some(at.time()),
        }
    }

    /// Midnight UTC at the start of the span.
    pub fn start(&self) -> DateTime<Utc> {
        self.first.and_time(self.time.unwrap_or_default()).and_utc()
    }

    /// Last second of the final day of the span.
    pub fn end(&self) -> DateTime<Utc> {
        let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default();
        self.last.and_time(self.time.unwrap_or(last_second)).and_utc()
    }
}

static ORDINAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?P<day>\d{1,2})(?:st|nd|rd|th)\b").unwrap());

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?P<year>\d{4})$").unwrap());

static YEAR_MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<year>\d{4})[-/](?P<month>\d{1,2})$").unwrap());

static MONTH_NAME_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<month>[a-z]{3,9}) (?P<year>\d{4})$").unwrap());

/// Day-precision formats, tried in order. Numeric dates are day-first, and
/// the day-first forms go before ISO so "01/03/23" is not read as year 1.
const DAY_FORMATS: &[&str] = &[
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %B %Y",
    "%B %d %Y",
];

/// Date-and-time formats. The time becomes the bound itself.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dt%H:%M:%S", "%Y-%m-%dt%H:%M"];

/// Two-digit years mean 20xx. Other years below 1000 are rejected.
fn full_year(date: NaiveDate) -> Option<NaiveDate> {
    match date.year() {
        0..=99 => date.with_year(date.year() + 2000),
        100..=999 => None,
        _ => Some(date),
    }
}

/// Parse a user-typed date.
pub fn parse_date(input: &str) -> Result<DateSpan, DateError> {
    let cleaned = ORDINAL_RE
        .replace_all(&input.trim().to_lowercase().replace(',', " "), "$day")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let err = || DateError::Unparseable(input.trim().to_string());

    if cleaned.is_empty() {
        return Err(err());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&cleaned.to_uppercase()) {
        return Ok(DateSpan::day(dt.with_timezone(&Utc).date_naive()));
    }

    if let Some(caps) = YEAR_RE.captures(&cleaned) {
        let year: i32 = caps["year"].parse().map_err(|_| err())?;
        let first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(err)?;
        let last = NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(err)?;
        return Ok(DateSpan { first, last, time: None });
    }

    if let Some(caps) = YEAR_MONTH_RE.captures(&cleaned) {
        let year: i32 = caps["year"].parse().map_err(|_| err())?;
        let month: u32 = caps["month"].parse().map_err(|_| err())?;
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(err)?;
        return month_span(first).ok_or_else(err);
    }

    if MONTH_NAME_YEAR_RE.is_match(&cleaned) {
        let first = NaiveDate::parse_from_str(&format!("1 {cleaned}"), "%d %B %Y").map_err(|_| err())?;
        return month_span(first).ok_or_else(err);
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(at) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            let date = full_year(at.date()).ok_or_else(err)?;
            return Ok(DateSpan::instant(date.and_time(at.time())));
        }
    }

    // Month and year forms go first: chrono lets a format space match
    // nothing, so "%B %d %Y" would read "february 2024" as Feb 20, 0024.
    for fmt in DAY_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
            return full_year(date).map(DateSpan::day).ok_or_else(err);
        }
    }

    Err(err())
}

fn month_span(first: NaiveDate) -> Option<DateSpan> {
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)?
    };
    Some(DateSpan {
        first,
        last: next.pred_opt()?,
        time: None,
    })
}

/// Parse `START [to END]`.
pub fn parse_window(input: &str) -> Result<(DateSpan, Option<DateSpan>), DateError> {
    let lowered = input.to_lowercase();
    let mut parts = lowered.splitn(2, " to ");
    let start = parse_date(parts.next().unwrap_or_default())?;
    let end = parts.next().map(parse_date).transpose()?;
    Ok((start, end))
}
