//! Time-key parsing.
//!
//! Turns free-text date fields into calendar dates under a declared
//! [`TimePattern`]. Failure is always `None`; callers drop those rows.

use crate::models::TimePattern;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// Formats that carry a full calendar date.
const FULL_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y. %m. %d",
    "%d-%b-%y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%Y년 %m월 %d일",
];

/// Formats that stop at the month; parsed with a synthetic first day.
const MONTH_FORMATS: &[&str] = &[
    "%Y-%m",
    "%Y/%m",
    "%Y.%m",
    "%Y. %m",
    "%b-%y",
    "%b-%Y",
    "%b %Y",
    "%B %Y",
    "%B-%Y",
    "%Y년 %m월",
];

fn abbreviated_month_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z]{3}-\d{2}$").expect("valid regex"))
}

fn compact_digits_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})?$").expect("valid regex"))
}

fn year_label_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})\s*(?:년)?$").expect("valid regex"))
}

fn time_noise() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w-]").expect("valid regex"))
}

/// Parse `text` under `pattern`. Month-level patterns resolve to the first of the month.
pub fn parse_date(text: &str, pattern: TimePattern) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    match pattern {
        TimePattern::AbbreviatedMonth => parse_abbreviated_month(text),
        TimePattern::FreeForm => parse_free_form(text),
        TimePattern::YearLabel => parse_year_label(text),
    }
}

/// Remove every character that is not a word character or `-`.
///
/// Spreadsheet exports sometimes wrap `Jan-19` in quotes, stray spaces or
/// invisible marks; this strips them before strict parsing.
pub fn strip_time_noise(text: &str) -> String {
    time_noise().replace_all(text, "").into_owned()
}

/// `Mon-YY` exactly, e.g. `Jan-19`.
fn parse_abbreviated_month(text: &str) -> Option<NaiveDate> {
    if !abbreviated_month_shape().is_match(text) {
        return None;
    }
    // %b also accepts full month names, so the shape check above is what keeps this strict.
    NaiveDate::parse_from_str(&format!("01-{}", text), "%d-%b-%y").ok()
}

fn parse_free_form(text: &str) -> Option<NaiveDate> {
    if let Some(caps) = compact_digits_shape().captures(text) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = match caps.get(3) {
            Some(day) => day.as_str().parse().ok()?,
            None => 1,
        };
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(date) = FULL_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
    {
        return Some(date);
    }

    MONTH_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(&format!("{} 01", text), &format!("{} %d", fmt)).ok()
    })
}

fn parse_year_label(text: &str) -> Option<NaiveDate> {
    let caps = year_label_shape().captures(text)?;
    let year = caps[1].parse().ok()?;
    NaiveDate::from_ymd_opt(year, 1, 1)
}
