//! Date recognition for gazette prose
//!
//! Handles the printed forms seen in notices (`1st January, 2020`,
//! `1 st day of Jan. 2020`, `January 1st, 2020`) and numeric day-first
//! or ISO dates. Invalid calendar dates are skipped.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};
use serde::Serialize;

const MONTH: &str = r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";

static DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})\s*(?:st|nd|rd|th)?\s*(?:day\s+of\s+)?({MONTH})\.?,?\s*(\d{{4}})\b"
    ))
    .expect("day-month-year regex")
});

static MONTH_DAY_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b({MONTH})\.?\s+(\d{{1,2}})\s*(?:st|nd|rd|th)?,?\s*(\d{{4}})\b"
    ))
    .expect("month-day-year regex")
});

static NUMERIC_DAY_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})[/.-](\d{1,2})[/.-](\d{4})\b").expect("numeric date regex")
});

static ISO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("iso date regex")
});

static MONTH_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)^(?:{MONTH})\.?$")).expect("month word regex")
});

/// A date found in text, with its byte span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FoundDate {
    pub date: NaiveDate,
    pub start: usize,
    pub end: usize,
}

/// All dates in `s`, ordered by position, without overlaps
pub fn find_dates(s: &str) -> Vec<FoundDate> {
    let mut found = Vec::new();

    collect(&mut found, &DAY_MONTH_YEAR, s, |c| {
        ymd(c.get(3)?.as_str(), month_number(c.get(2)?.as_str())?, c.get(1)?.as_str())
    });
    collect(&mut found, &MONTH_DAY_YEAR, s, |c| {
        ymd(c.get(3)?.as_str(), month_number(c.get(1)?.as_str())?, c.get(2)?.as_str())
    });
    collect(&mut found, &NUMERIC_DAY_FIRST, s, |c| {
        ymd(c.get(3)?.as_str(), c.get(2)?.as_str().parse().ok()?, c.get(1)?.as_str())
    });
    collect(&mut found, &ISO, s, |c| {
        ymd(c.get(1)?.as_str(), c.get(2)?.as_str().parse().ok()?, c.get(3)?.as_str())
    });

    // Earliest first; on a tie the longer match wins
    found.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut result: Vec<FoundDate> = Vec::with_capacity(found.len());
    for date in found {
        if result.last().map_or(true, |prev| date.start >= prev.end) {
            result.push(date);
        }
    }
    result
}

/// First date in `s`
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    find_dates(s).first().map(|d| d.date)
}

/// Whether `word` is a month name or abbreviation (`Sept.`, `March`)
pub fn is_month_name(word: &str) -> bool {
    MONTH_WORD.is_match(word)
}

fn collect<F>(found: &mut Vec<FoundDate>, re: &Regex, s: &str, to_date: F)
where
    F: Fn(&Captures<'_>) -> Option<NaiveDate>,
{
    for caps in re.captures_iter(s) {
        let Some(whole) = caps.get(0) else { continue };
        if let Some(date) = to_date(&caps) {
            found.push(FoundDate {
                date,
                start: whole.start(),
                end: whole.end(),
            });
        }
    }
}

fn ymd(year: &str, month: u32, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_printed_forms() {
        assert_eq!(parse_date("with effect from 1st January, 2020."), Some(d(2020, 1, 1)));
        assert_eq!(parse_date("on the 1 st day of Jan. 2020"), Some(d(2020, 1, 1)));
        assert_eq!(parse_date("born on 23rd Sept, 1985"), Some(d(1985, 9, 23)));
        assert_eq!(parse_date("January 1st, 2020"), Some(d(2020, 1, 1)));
        assert_eq!(parse_date("Friday, 12th March, 2021"), Some(d(2021, 3, 12)));
    }

    #[test]
    fn test_numeric_forms_are_day_first() {
        assert_eq!(parse_date("05/04/1990"), Some(d(1990, 4, 5)));
        assert_eq!(parse_date("05-04-1990"), Some(d(1990, 4, 5)));
        assert_eq!(parse_date("05.04.1990"), Some(d(1990, 4, 5)));
        assert_eq!(parse_date("1990-04-05"), Some(d(1990, 4, 5)));
    }

    #[test]
    fn test_date_wrapped_across_lines() {
        assert_eq!(parse_date("1st January,\n2020. All documents"), Some(d(2020, 1, 1)));
    }

    #[test]
    fn test_invalid_dates_skipped() {
        assert_eq!(parse_date("31st February, 2020"), None);
        assert_eq!(parse_date("31/02/2020 and 1st March, 2020"), Some(d(2020, 3, 1)));
        assert_eq!(parse_date("Marriage officer for 2020"), None);
    }

    #[test]
    fn test_month_words() {
        assert!(is_month_name("January"));
        assert!(is_month_name("Sept."));
        assert!(is_month_name("dec"));
        assert!(!is_month_name("Marriage"));
        assert!(!is_month_name("Accra"));
    }

    #[test]
    fn test_find_dates_in_order() {
        let found = find_dates("from 12th May, 1980 to 21/05/1981");
        let dates: Vec<NaiveDate> = found.iter().map(|f| f.date).collect();
        assert_eq!(dates, vec![d(1980, 5, 12), d(1981, 5, 21)]);
        assert!(found[0].end <= found[1].start);
    }
}
