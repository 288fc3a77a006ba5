//! Splitting a section body into numbered gazette items

use crate::dates::is_month_name;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Serialize;

static ITEM_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,5})[.)][ \t]*").expect("item number regex"));

/// One numbered notice, whitespace-collapsed onto a single line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawItem {
    pub number: Option<u32>,
    pub text: String,
}

/// Split a section body at item numbers (`1024. Mr. ...`, `7) Mrs. ...`)
pub fn split_items(body: &str) -> Vec<RawItem> {
    let mut starts: Vec<(usize, usize, u32)> = Vec::new();

    for caps in ITEM_NUMBER.captures_iter(body) {
        let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let preceding = &body[..whole.start()];

        if !preceding.is_empty() && !preceding.ends_with(char::is_whitespace) {
            continue;
        }
        if !body[whole.end()..].starts_with(|c: char| c.is_uppercase() || c == '"' || c == '\'') {
            continue;
        }
        if !starts_item(preceding) {
            continue;
        }
        let Ok(number) = digits.as_str().parse::<u32>() else {
            continue;
        };
        starts.push((whole.start(), whole.end(), number));
    }

    if starts.is_empty() {
        let text = collapse(body);
        return if text.is_empty() {
            Vec::new()
        } else {
            vec![RawItem { number: None, text }]
        };
    }

    starts
        .iter()
        .enumerate()
        .filter_map(|(i, &(_, text_start, number))| {
            let text_end = starts.get(i + 1).map_or(body.len(), |next| next.0);
            let text = collapse(&body[text_start..text_end]);
            (!text.is_empty()).then_some(RawItem { number: Some(number), text })
        })
        .collect()
}

/// Whether a number following `preceding` opens a new item rather than
/// continuing a sentence (wrapped dates such as `1st January,\n2020.`)
fn starts_item(preceding: &str) -> bool {
    let before = preceding.trim_end();
    if before.is_empty() {
        return true;
    }

    let last_word = before
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or_default();
    if last_word.eq_ignore_ascii_case("no.") || last_word.eq_ignore_ascii_case("no") {
        return false;
    }

    if before.ends_with(['.', ':', ';']) {
        return true;
    }

    let at_line_start = preceding[before.len()..].contains('\n');
    if !at_line_start {
        return false;
    }

    let ends_with_digit = before.ends_with(|c: char| c.is_ascii_digit());
    !before.ends_with(',') && !ends_with_digit && !is_month_name(last_word)
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_items() {
        let body = "1024. Mr. Kwame Mensah, a Teacher of Accra\nwishes to be known as Kwame Asante.\n\
                    1025. Mrs. Ama Owusu wishes to be known as Ama Boateng.";
        let items = split_items(body);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].number, Some(1024));
        assert_eq!(
            items[0].text,
            "Mr. Kwame Mensah, a Teacher of Accra wishes to be known as Kwame Asante."
        );
        assert_eq!(items[1].number, Some(1025));
    }

    #[test]
    fn test_wrapped_date_does_not_split_item() {
        let body = "1. Mr. Kofi Ato wishes to be known as Kofi Mensah with effect from 1st January,\n\
                    2020. All documents bearing his former name remain valid.\n\
                    2. Miss Akua Dede wishes to be known as Akua Asante with effect from 3rd March\n\
                    2021. All documents are valid.";
        let items = split_items(body);

        assert_eq!(items.len(), 2);
        assert!(items[0].text.ends_with("1st January, 2020. All documents bearing his former name remain valid."));
        assert_eq!(items[1].number, Some(2));
        assert!(items[1].text.contains("3rd March 2021. All"));
    }

    #[test]
    fn test_number_after_unterminated_line() {
        let body = "1. Mr. Kofi Ato of Kumasi\n2. Mrs. Esi Ato of Kumasi";
        let numbers: Vec<_> = split_items(body).iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_numbers_inside_sentences_ignored() {
        let body = "7) Mr. Yaw Boakye of House No. 5. Adum, born on 05.04.1990 at\nP. O. Box 45. Kumasi";
        let items = split_items(body);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].number, Some(7));
    }

    #[test]
    fn test_leading_text_discarded() {
        let items = split_items("CONTENTS continued\n\n12. Mr. A. Osei wishes.");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].number, Some(12));
        assert_eq!(items[0].text, "Mr. A. Osei wishes.");
    }

    #[test]
    fn test_unnumbered_body() {
        let items = split_items("Mr. Kofi Ato wishes to be known as\nKofi Mensah.");
        assert_eq!(
            items,
            vec![RawItem { number: None, text: "Mr. Kofi Ato wishes to be known as Kofi Mensah.".into() }]
        );
        assert!(split_items("  \n ").is_empty());
    }
}
