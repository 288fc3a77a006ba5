//! Query Parser - Understands what a chat message is asking about
//!
//! Provides:
//! - Intent classification onto gazette notice kinds
//! - Search term extraction (names, churches, places)
//! - Year detection for gazette date filtering

use crate::db::models::NoticeKind;
use crate::db::search_terms;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What the user is asking about
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatIntent {
    NameChange,
    DateOfBirth,
    PlaceOfBirth,
    MarriageOfficer,
    General,
}

impl ChatIntent {
    /// Notice kind to filter on, if the intent maps to one
    pub fn kind(&self) -> Option<NoticeKind> {
        match self {
            ChatIntent::NameChange => Some(NoticeKind::ChangeOfName),
            ChatIntent::DateOfBirth => Some(NoticeKind::ChangeOfDateOfBirth),
            ChatIntent::PlaceOfBirth => Some(NoticeKind::ChangeOfPlaceOfBirth),
            ChatIntent::MarriageOfficer => Some(NoticeKind::MarriageOfficer),
            ChatIntent::General => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatIntent::NameChange => "name_change",
            ChatIntent::DateOfBirth => "date_of_birth",
            ChatIntent::PlaceOfBirth => "place_of_birth",
            ChatIntent::MarriageOfficer => "marriage_officer",
            ChatIntent::General => "general",
        }
    }
}

/// Parsed chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatQuery {
    /// Original message text
    pub original: String,

    /// Detected intent
    pub intent: ChatIntent,

    /// Terms to match against gazette records
    pub terms: Vec<String>,

    /// Year mentioned in the message, if any
    pub year: Option<i32>,
}

impl ChatQuery {
    /// Terms joined for use as a search `q`
    pub fn search_text(&self) -> Option<String> {
        if self.terms.is_empty() {
            None
        } else {
            Some(self.terms.join(" "))
        }
    }
}

/// Query parser for chat messages
pub struct QueryParser {
    /// Words that never identify a record
    stop_words: HashSet<&'static str>,
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryParser {
    pub fn new() -> Self {
        Self {
            stop_words: Self::load_stop_words(),
        }
    }

    /// Parse a message into intent and search terms
    pub fn parse(&self, message: &str) -> ChatQuery {
        let original = message.trim().to_string();
        let intent = self.detect_intent(&original);

        let mut year = None;
        let mut terms = Vec::new();

        for term in search_terms(&original) {
            if let Some(y) = as_year(&term) {
                year.get_or_insert(y);
                continue;
            }
            if self.stop_words.contains(term.as_str()) || term.len() < 2 {
                continue;
            }
            if !terms.contains(&term) {
                terms.push(term);
            }
        }

        ChatQuery {
            original,
            intent,
            terms,
            year,
        }
    }

    /// Detect intent from whole-word phrases
    fn detect_intent(&self, message: &str) -> ChatIntent {
        let tokens = search_terms(message);
        let has = |phrases: &[&str]| phrases.iter().any(|p| contains_phrase(&tokens, p));

        // "place of birth" must be checked before the broader birth cues
        if has(&["place of birth", "birthplace", "born in", "born at"]) {
            return ChatIntent::PlaceOfBirth;
        }

        if has(&["date of birth", "birthday", "birth date", "dob", "d o b", "born on"]) {
            return ChatIntent::DateOfBirth;
        }

        if has(&["marriage officer", "marriage officers", "marriage", "officiate", "wedding", "wed"]) {
            return ChatIntent::MarriageOfficer;
        }

        if has(&[
            "change of name",
            "name change",
            "changed name",
            "changed his name",
            "changed her name",
            "changed their name",
            "change his name",
            "change her name",
            "former name",
            "formerly",
            "previous name",
            "known as",
            "called",
            "alias",
            "rename",
            "renamed",
            "new name",
        ]) {
            return ChatIntent::NameChange;
        }

        ChatIntent::General
    }

    fn load_stop_words() -> HashSet<&'static str> {
        [
            // grammar
            "a", "an", "the", "is", "are", "was", "were", "be", "been",
            "in", "on", "at", "to", "for", "of", "with", "by", "from",
            "and", "or", "but", "not", "this", "that", "these", "those",
            "it", "its", "as", "do", "does", "did", "has", "have", "had",
            "can", "could", "will", "would", "should", "may", "might",
            "his", "her", "their", "he", "she", "they", "him", "them",
            "i", "me", "my", "you", "your", "we", "our", "any", "all",
            // questions and requests
            "who", "whom", "whose", "what", "when", "where", "which", "why", "how",
            "tell", "show", "find", "list", "give", "search", "look", "please",
            "know", "want", "about", "there", "some", "recent", "latest",
            "hi", "hello",
            // notice vocabulary
            "gazette", "gazettes", "notice", "notices", "record", "records",
            "person", "people", "change", "changed", "changes", "name", "names",
            "new", "former", "formerly", "previous", "known", "called", "alias",
            "rename", "renamed", "date", "birth", "birthday", "dob", "born",
            "place", "birthplace", "age", "correct", "corrected", "correction",
            "confirm", "confirmed", "marriage", "officer", "officers",
            "officiate", "wedding", "wed", "appointed", "appointment",
            // honorifics
            "mr", "mrs", "miss", "ms", "dr", "rev", "madam", "master",
        ]
        .into_iter()
        .collect()
    }
}

fn as_year(term: &str) -> Option<i32> {
    if term.len() != 4 {
        return None;
    }
    term.parse::<i32>()
        .ok()
        .filter(|y| (1900..=2100).contains(y))
}

/// Whether the words of `phrase` appear consecutively in `tokens`
fn contains_phrase(tokens: &[String], phrase: &str) -> bool {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    !words.is_empty()
        && tokens
            .windows(words.len())
            .any(|window| window.iter().zip(&words).all(|(t, w)| t == w))
}
