//! Personal names as printed in gazette notices
//!
//! Honorific titles, aliases, cleaning and the order-insensitive name key
//! used for person lookup and deduplication.

use gazette_common::db::models::Gender;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static LEADING_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(very\s+rev(?:erend|d)?|(?:rt|right)\.?\s*rev(?:erend|d)?|mrs|mr|miss|ms|master|madam|dr|doctor|rev(?:erend|d)?|prof(?:essor)?|nana|hon(?:ourable)?|alhaji|hajia|pastor|bishop|apostle|evangelist|sister|brother)(?:\.\s*|\s+|$)",
    )
    .expect("title regex")
});

static ALIAS_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s*,?\s*(?:\ba\.k\.a\.?|\baka\b|\balso\s+known\s+as\b|\botherwise\s+known\s+as\b|\botherwise\s+called\b|\bformerly\s+known\s+as\b|\balias\b)\s*,?\s*",
    )
    .expect("alias regex")
});

const TRIM_CHARS: &[char] = &[',', '.', ';', ':', '-', '\'', '"', '(', ')', ' '];

/// Honorific printed before a name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Title {
    Mr,
    Mrs,
    Miss,
    Ms,
    Master,
    Madam,
    Dr,
    Rev,
    VeryRev,
    RtRev,
    Prof,
    Nana,
    Hon,
    Alhaji,
    Hajia,
    Pastor,
    Bishop,
    Apostle,
    Evangelist,
    Sister,
    Brother,
}

impl Title {
    /// Canonical printed form
    pub fn as_str(&self) -> &'static str {
        match self {
            Title::Mr => "Mr.",
            Title::Mrs => "Mrs.",
            Title::Miss => "Miss",
            Title::Ms => "Ms.",
            Title::Master => "Master",
            Title::Madam => "Madam",
            Title::Dr => "Dr.",
            Title::Rev => "Rev.",
            Title::VeryRev => "Very Rev.",
            Title::RtRev => "Rt. Rev.",
            Title::Prof => "Prof.",
            Title::Nana => "Nana",
            Title::Hon => "Hon.",
            Title::Alhaji => "Alhaji",
            Title::Hajia => "Hajia",
            Title::Pastor => "Pastor",
            Title::Bishop => "Bishop",
            Title::Apostle => "Apostle",
            Title::Evangelist => "Evangelist",
            Title::Sister => "Sister",
            Title::Brother => "Brother",
        }
    }

    /// Gender implied by the title, if any
    pub fn gender(&self) -> Option<Gender> {
        match self {
            Title::Mr | Title::Master | Title::Alhaji | Title::Brother => Some(Gender::Male),
            Title::Mrs | Title::Miss | Title::Ms | Title::Madam | Title::Hajia | Title::Sister => {
                Some(Gender::Female)
            }
            _ => None,
        }
    }

    fn from_matched(word: &str) -> Option<Title> {
        let lower = word.to_lowercase();
        let squashed: String = lower.chars().filter(|c| c.is_ascii_alphabetic()).collect();

        let title = match squashed.as_str() {
            "mr" => Title::Mr,
            "mrs" => Title::Mrs,
            "miss" => Title::Miss,
            "ms" => Title::Ms,
            "master" => Title::Master,
            "madam" => Title::Madam,
            "dr" | "doctor" => Title::Dr,
            "rev" | "revd" | "reverend" => Title::Rev,
            "prof" | "professor" => Title::Prof,
            "nana" => Title::Nana,
            "hon" | "honourable" => Title::Hon,
            "alhaji" => Title::Alhaji,
            "hajia" => Title::Hajia,
            "pastor" => Title::Pastor,
            "bishop" => Title::Bishop,
            "apostle" => Title::Apostle,
            "evangelist" => Title::Evangelist,
            "sister" => Title::Sister,
            "brother" => Title::Brother,
            "veryrev" | "veryrevd" | "veryreverend" => Title::VeryRev,
            "rtrev" | "rtrevd" | "rtreverend" | "rightrev" | "rightrevd" | "rightreverend" => {
                Title::RtRev
            }
            _ => return None,
        };
        Some(title)
    }
}

impl From<Title> for String {
    fn from(title: Title) -> Self {
        title.as_str().to_string()
    }
}

impl TryFrom<String> for Title {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Title::from_matched(&s).ok_or_else(|| format!("unknown title: {}", s))
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `s` is nothing but an honorific (`Mr.`, `Rev`)
pub fn is_title_only(s: &str) -> bool {
    Title::from_matched(s.trim()).is_some()
}

/// Strip leading honorifics. The first one found is returned; any that
/// follow it (`Rev. Dr.`) are dropped.
pub fn split_title(s: &str) -> (Option<Title>, String) {
    let mut rest = s.trim();
    let mut first = None;

    while let Some(caps) = LEADING_TITLE.captures(rest) {
        let (Some(whole), Some(word)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let Some(title) = Title::from_matched(word.as_str()) else {
            break;
        };
        // A bare title with nothing after it is more likely a name
        if whole.end() >= rest.len() && first.is_none() {
            break;
        }
        first.get_or_insert(title);
        rest = rest[whole.end()..].trim_start();
    }

    (first, rest.to_string())
}

/// Split a name segment into the primary name and its aliases
pub fn split_aliases(s: &str) -> (String, Vec<String>) {
    let mut parts = ALIAS_SEPARATOR
        .split(s)
        .map(clean_name)
        .filter(|p| !p.is_empty());

    let primary = parts.next().unwrap_or_default();
    let mut aliases: Vec<String> = Vec::new();
    for alias in parts {
        let alias = split_title(&alias).1;
        if !alias.is_empty() && !aliases.contains(&alias) && alias != primary {
            aliases.push(alias);
        }
    }

    (primary, aliases)
}

/// Collapse whitespace and strip surrounding punctuation
pub fn clean_name(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(TRIM_CHARS)
        .to_string()
}

/// Order-insensitive lookup key: lower-case tokens without titles, sorted
pub fn name_key(s: &str) -> String {
    let (_, rest) = split_title(&clean_name(s));
    let without_apostrophes: String = rest.chars().filter(|c| *c != '\'').collect();

    let mut tokens: Vec<String> = without_apostrophes
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect();

    tokens.sort();
    tokens.join(" ")
}

/// Gender from the title, falling back to a pronoun vote over the notice body
pub fn gender_for(title: Option<Title>, body: &str) -> Gender {
    if let Some(gender) = title.and_then(|t| t.gender()) {
        return gender;
    }

    let (mut male, mut female) = (0usize, 0usize);
    for word in body.split(|c: char| !c.is_alphabetic()) {
        match word.to_lowercase().as_str() {
            "he" | "his" | "him" | "himself" => male += 1,
            "she" | "her" | "hers" | "herself" => female += 1,
            _ => {}
        }
    }

    match male.cmp(&female) {
        std::cmp::Ordering::Greater => Gender::Male,
        std::cmp::Ordering::Less => Gender::Female,
        std::cmp::Ordering::Equal => Gender::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_title() {
        assert_eq!(split_title("Mr. Kwame Mensah"), (Some(Title::Mr), "Kwame Mensah".to_string()));
        assert_eq!(split_title("MRS Ama Owusu"), (Some(Title::Mrs), "Ama Owusu".to_string()));
        assert_eq!(split_title("Rev. Dr. Kofi Boateng"), (Some(Title::Rev), "Kofi Boateng".to_string()));
        assert_eq!(split_title("Very Rev. Kofi Ampofo"), (Some(Title::VeryRev), "Kofi Ampofo".to_string()));
        assert_eq!(split_title("Rt. Rev. John Bonsu"), (Some(Title::RtRev), "John Bonsu".to_string()));
        assert_eq!(split_title("Mr.Kofi Ato"), (Some(Title::Mr), "Kofi Ato".to_string()));
    }

    #[test]
    fn test_split_title_leaves_names_alone() {
        assert_eq!(split_title("Drew Mensah"), (None, "Drew Mensah".to_string()));
        assert_eq!(split_title("Honesty Adjei"), (None, "Honesty Adjei".to_string()));
        assert_eq!(split_title("Nana"), (None, "Nana".to_string()));
    }

    #[test]
    fn test_split_aliases() {
        let (primary, aliases) =
            split_aliases("Kwame Mensah a.k.a. Kwame Asante, also known as Mr. Kojo Mensah");
        assert_eq!(primary, "Kwame Mensah");
        assert_eq!(aliases, vec!["Kwame Asante", "Kojo Mensah"]);

        let (primary, aliases) = split_aliases("Ama Serwaa alias Ama Boatemaa");
        assert_eq!(primary, "Ama Serwaa");
        assert_eq!(aliases, vec!["Ama Boatemaa"]);

        let (primary, aliases) = split_aliases("Ama Serwaa");
        assert_eq!(primary, "Ama Serwaa");
        assert!(aliases.is_empty());
    }

    #[test]
    fn test_title_serializes_as_printed() {
        assert_eq!(serde_json::to_string(&Title::RtRev).unwrap(), "\"Rt. Rev.\"");
        let parsed: Title = serde_json::from_str("\"Very Rev.\"").unwrap();
        assert_eq!(parsed, Title::VeryRev);
        assert!(serde_json::from_str::<Title>("\"Chief\"").is_err());
    }

    #[test]
    fn test_is_title_only() {
        assert!(is_title_only("Mr."));
        assert!(is_title_only(" Rt. Rev "));
        assert!(!is_title_only("Mr Kofi"));
        assert!(!is_title_only("Rightson"));
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("  Kwame   Mensah, "), "Kwame Mensah");
        assert_eq!(clean_name("(Kofi Ato)."), "Kofi Ato");
    }

    #[test]
    fn test_name_key_is_order_and_title_insensitive() {
        assert_eq!(name_key("Mr. Kwame Asante-Mensah"), "asante kwame mensah");
        assert_eq!(name_key("MENSAH Kwame ASANTE"), "asante kwame mensah");
        assert_eq!(name_key("Kwabena O'Neil"), "kwabena oneil");
        assert_eq!(name_key(""), "");
    }

    #[test]
    fn test_gender_for() {
        assert_eq!(gender_for(Some(Title::Mr), "she"), Gender::Male);
        assert_eq!(gender_for(Some(Title::Hajia), ""), Gender::Female);
        assert_eq!(
            gender_for(Some(Title::Dr), "wishes to be known as ... her name"),
            Gender::Female
        );
        assert_eq!(gender_for(None, "He confirms his date of birth"), Gender::Male);
        assert_eq!(gender_for(None, "All documents bearing the former name"), Gender::Unknown);
    }
}
