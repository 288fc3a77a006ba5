//! Duplicate suppression for extracted notices
//!
//! The key ignores the gazette and item numbers so a notice republished
//! in a later issue collapses onto the first copy.

use crate::names::name_key;
use crate::notices::ExtractedNotice;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Hex SHA-256 over the identifying fields of a notice
pub fn dedup_key(notice: &ExtractedNotice) -> String {
    let lower = |value: &Option<String>| {
        value
            .as_deref()
            .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
            .unwrap_or_default()
    };

    let parts = [
        notice.kind.as_str().to_string(),
        name_key(&notice.name),
        notice.new_name.as_deref().map(name_key).unwrap_or_default(),
        lower(&notice.old_value),
        lower(&notice.new_value),
        notice.effective_date.map(|d| d.to_string()).unwrap_or_default(),
        lower(&notice.church),
    ];

    let mut hasher = Sha256::new();
    hasher.update(parts.join("|").as_bytes());
    hex::encode(hasher.finalize())
}

/// Tracks keys seen within one batch
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key`; returns false if it was already seen in this batch
    pub fn insert(&mut self, key: &str) -> bool {
        self.seen.insert(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::RawItem;
    use crate::notices::parse_notice;
    use gazette_common::db::models::NoticeKind;

    fn notice(number: u32, text: &str) -> ExtractedNotice {
        let item = RawItem { number: Some(number), text: text.to_string() };
        parse_notice(NoticeKind::ChangeOfName, &item).unwrap()
    }

    #[test]
    fn test_key_ignores_issue_and_item_number() {
        let mut a = notice(1, "Mr. Kofi Ato wishes to be known as Kofi Mensah.");
        let mut b = notice(987, "Mr.  KOFI ATO wishes to be known as Mensah Kofi.");
        a.gazette_number = Some("12".to_string());
        b.gazette_number = Some("13".to_string());

        let key = dedup_key(&a);
        assert_eq!(key.len(), 64);
        assert_eq!(key, dedup_key(&b));
    }

    #[test]
    fn test_key_distinguishes_content() {
        let a = notice(1, "Mr. Kofi Ato wishes to be known as Kofi Mensah.");
        let b = notice(1, "Mr. Kofi Ato wishes to be known as Kofi Boateng.");
        let c = notice(1, "Mr. Kofi Ato wishes to be known as Kofi Mensah with effect from 1st May, 2020.");

        assert_ne!(dedup_key(&a), dedup_key(&b));
        assert_ne!(dedup_key(&a), dedup_key(&c));
    }

    #[test]
    fn test_deduplicator() {
        let mut dedup = Deduplicator::new();
        assert!(dedup.insert("k1"));
        assert!(!dedup.insert("k1"));
        assert!(dedup.insert("k2"));
        assert!(!dedup.insert("k2"));
    }
}
