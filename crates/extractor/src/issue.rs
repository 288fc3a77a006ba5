//! Gazette issue header: number and publication date

use crate::dates::find_dates;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Characters of the document searched for the masthead
const HEADER_CHARS: usize = 3000;

/// Gap allowed between a weekday name and the date it introduces
const WEEKDAY_GAP: usize = 4;

static GAZETTE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bGAZETTE\b.{0,200}?\bNo\s*\.?\s*(\d+)\b").expect("gazette number regex")
});

static WEEKDAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b,?")
        .expect("weekday regex")
});

/// Identification of one gazette issue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazetteIssue {
    pub number: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Read the issue number and date from the top of the document
pub fn parse_issue(text: &str) -> GazetteIssue {
    let header = match text.char_indices().nth(HEADER_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    };

    let number = GAZETTE_NUMBER
        .captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_start_matches('0').to_string())
        .map(|n| if n.is_empty() { "0".to_string() } else { n });

    GazetteIssue {
        number,
        date: weekday_date(header).or_else(|| find_dates(header).first().map(|d| d.date)),
    }
}

/// First date printed directly after a weekday name
fn weekday_date(header: &str) -> Option<NaiveDate> {
    WEEKDAY.find_iter(header).find_map(|weekday| {
        let rest = &header[weekday.end()..];
        find_dates(rest)
            .into_iter()
            .next()
            .filter(|d| d.start <= WEEKDAY_GAP)
            .map(|d| d.date)
    })
}
