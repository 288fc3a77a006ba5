//! Splitting a gazette issue into notice sections by their headings

use gazette_common::db::models::NoticeKind;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Serialize;

/// Optional "(contd.)" marker printed when a section runs onto a new page
const CONTINUED: &str = r"(?:\s*[-(]?\s*cont(?:inued|d)?\.?\s*\)?)?\s*[.:]?";

static HEADINGS: Lazy<Vec<(NoticeKind, Regex)>> = Lazy::new(|| {
    let heading = |body: &str| {
        Regex::new(&format!(r"(?i)^{body}{CONTINUED}$")).expect("heading regex")
    };
    vec![
        (NoticeKind::ChangeOfName, heading(r"change\s+of\s+names?")),
        (
            NoticeKind::ChangeOfDateOfBirth,
            heading(r"(?:change|correction)\s+of\s+dates?\s+of\s+birth"),
        ),
        (
            NoticeKind::ChangeOfPlaceOfBirth,
            heading(r"(?:change|correction)\s+of\s+places?\s+of\s+birth"),
        ),
        (
            NoticeKind::MarriageOfficer,
            heading(r"(?:appointment\s+of\s+)?marriage\s+officers?"),
        ),
    ]
});

/// A run of text under one heading
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// `None` for text before the first recognised heading
    pub kind: Option<NoticeKind>,
    pub body: String,
}

/// Notice kind announced by a heading line, if it is one
pub fn heading_kind(line: &str) -> Option<NoticeKind> {
    let line = line.trim();
    HEADINGS
        .iter()
        .find(|(_, re)| re.is_match(line))
        .map(|(kind, _)| *kind)
}

/// Split text into sections at heading lines
pub fn split_sections(text: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut kind: Option<NoticeKind> = None;
    let mut body: Vec<&str> = Vec::new();

    for line in text.lines() {
        match heading_kind(line) {
            Some(next) => {
                push_section(&mut sections, kind, &body);
                kind = Some(next);
                body.clear();
            }
            None => body.push(line),
        }
    }
    push_section(&mut sections, kind, &body);

    sections
}

fn push_section(sections: &mut Vec<Section>, kind: Option<NoticeKind>, lines: &[&str]) {
    let body = lines.join("\n").trim().to_string();
    if body.is_empty() {
        return;
    }

    // A "(contd.)" heading on the next page extends the previous section
    if let Some(last) = sections.last_mut() {
        if last.kind.is_some() && last.kind == kind {
            last.body.push('\n');
            last.body.push_str(&body);
            return;
        }
    }

    sections.push(Section { kind, body });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_kinds() {
        assert_eq!(heading_kind("CHANGE OF NAMES"), Some(NoticeKind::ChangeOfName));
        assert_eq!(heading_kind("Change of Name"), Some(NoticeKind::ChangeOfName));
        assert_eq!(
            heading_kind("CORRECTION OF DATE OF BIRTH"),
            Some(NoticeKind::ChangeOfDateOfBirth)
        );
        assert_eq!(
            heading_kind("CHANGE OF PLACE OF BIRTH"),
            Some(NoticeKind::ChangeOfPlaceOfBirth)
        );
        assert_eq!(
            heading_kind("APPOINTMENT OF MARRIAGE OFFICERS"),
            Some(NoticeKind::MarriageOfficer)
        );
        assert_eq!(heading_kind("MARRIAGE OFFICER"), Some(NoticeKind::MarriageOfficer));
        assert_eq!(heading_kind("CHANGE OF NAMES-contd."), Some(NoticeKind::ChangeOfName));
        assert_eq!(heading_kind("CHANGE OF NAME (Continued)"), Some(NoticeKind::ChangeOfName));
    }

    #[test]
    fn test_heading_must_be_whole_line() {
        assert_eq!(heading_kind("applied for a change of name in 2019"), None);
        assert_eq!(heading_kind("MARRIAGE OFFICERS APPOINTED BY"), None);
    }

    #[test]
    fn test_split_sections() {
        let text = "GHANA GAZETTE\nNo. 45\n\nCHANGE OF NAME\n1. Mr. A\n2. Mrs. B\n\
                    CORRECTION OF DATE OF BIRTH\n3. Mr. C\n\
                    CHANGE OF NAME-contd.\n4. Mr. D\n";
        let sections = split_sections(text);

        assert_eq!(sections.len(), 4);
        assert_eq!(sections[0].kind, None);
        assert_eq!(sections[0].body, "GHANA GAZETTE\nNo. 45");
        assert_eq!(sections[1].kind, Some(NoticeKind::ChangeOfName));
        assert_eq!(sections[1].body, "1. Mr. A\n2. Mrs. B");
        assert_eq!(sections[2].kind, Some(NoticeKind::ChangeOfDateOfBirth));
        assert_eq!(sections[3].kind, Some(NoticeKind::ChangeOfName));
    }

    #[test]
    fn test_continued_heading_merges_adjacent_section() {
        let text = "CHANGE OF NAME\n1. Mr. A\nCHANGE OF NAME (contd)\n2. Mr. B";
        let sections = split_sections(text);

        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].body, "1. Mr. A\n2. Mr. B");
    }

    #[test]
    fn test_no_headings() {
        let sections = split_sections("1. Mr. Kofi Ato wishes to be known as Kofi Mensah.");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].kind, None);
        assert!(split_sections("\n\n").is_empty());
    }
}
