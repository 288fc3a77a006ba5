//! Field extraction for each kind of gazette notice

use crate::dates::find_dates;
use crate::errors::NoticeError;
use crate::items::RawItem;
use crate::names::{clean_name, gender_for, is_title_only, split_aliases, split_title, Title};
use chrono::NaiveDate;
use gazette_common::db::models::{Gender, NoticeKind};
use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};
use serde::{Deserialize, Serialize};

static WISHES_TO_BE_KNOWN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?P<old>.+?)\s*,?\s*(?:now\s+)?(?:wish(?:es)?|desires?)\s+to\s+be\s+(?:known\s+and\s+called|known\s+as|called|known)\s+(?P<new>.+)$",
    )
    .expect("change of name regex")
});

/// End of the new name: the effect clause or the closing sentence
static NEW_NAME_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s*(?:,?\s*with\s+effect\b|,?\s*effective\b|,?\s*w\.e\.f\b|\.\s+all\b|\.\s+the\s+|\.\s+any\s+|\.?\s*$)",
    )
    .expect("new name end regex")
});

static EFFECT_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:with\s+effect|effective|w\.e\.f)\b").expect("effect clause regex")
});

/// End of the subject name: profession, address or the start of the notice verb
static NAME_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:,\s*an?\s+\S|,?\s+of\s+|,?\s+residing\b|,?\s+at\s+|,\s*(?:p\.?\s*o\.?\s*box|house|h/no)\b|,?\s+(?:now\s+)?(?:wish|desire|confirm|hereby)|,?\s+who\b)",
    )
    .expect("name end regex")
});

static PROFESSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^,?\s*an?\s+(?P<prof>[a-z][a-z/&' -]*?)\s*(?:,|\bof\b|\bat\b|\bresiding\b|$)")
        .expect("profession regex")
});

static ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bof|\bresiding\s+at|\bat)\s+(?P<addr>.+?)\s*,?\s*$").expect("address regex")
});

static SUBJECT_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:now\s+)?(?:wish|desire|confirm|hereby)").expect("subject end regex")
});

static FROM_KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bfrom\s*$").expect("from regex"));

static PLACE_IS_NOT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)place\s+of\s+birth\s+(?:is|as|to\s+be|should\s+read)\s+(?P<new>.+?)\s*,?\s*(?:and\s+not|not|instead\s+of)\s+(?P<old>.+?)\s*(?:\.\s|\.?$|,)",
    )
    .expect("place of birth regex")
});

static PLACE_FROM_TO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)place\s+of\s+birth\s+from\s+(?P<old>.+?)\s+to\s+(?P<new>.+?)\s*(?:\.\s|\.?$|,)",
    )
    .expect("place of birth change regex")
});

static PLACE_IS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)place\s+of\s+birth\s+(?:is|as|to\s+be|should\s+read)\s+(?P<new>.+?)\s*(?:\.\s|\.?$|,)")
        .expect("place of birth confirmation regex")
});

/// Structured content of one gazette notice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedNotice {
    pub kind: NoticeKind,
    pub item_number: Option<u32>,
    pub gazette_number: Option<String>,
    pub gazette_date: Option<NaiveDate>,
    pub title: Option<Title>,
    /// Subject name as printed; the former name for a change of name
    pub name: String,
    pub aliases: Vec<String>,
    pub gender: Gender,
    pub profession: Option<String>,
    pub new_title: Option<Title>,
    pub new_name: Option<String>,
    pub effective_date: Option<NaiveDate>,
    /// Superseded value of a corrected field (ISO-8601 for dates)
    pub old_value: Option<String>,
    /// Confirmed value of a corrected field (ISO-8601 for dates)
    pub new_value: Option<String>,
    pub church: Option<String>,
    pub location: Option<String>,
    pub raw_text: String,
}

impl ExtractedNotice {
    fn new(kind: NoticeKind, item: &RawItem) -> Self {
        Self {
            kind,
            item_number: item.number,
            gazette_number: None,
            gazette_date: None,
            title: None,
            name: String::new(),
            aliases: Vec::new(),
            gender: Gender::Unknown,
            profession: None,
            new_title: None,
            new_name: None,
            effective_date: None,
            old_value: None,
            new_value: None,
            church: None,
            location: None,
            raw_text: item.text.clone(),
        }
    }

    /// Every name the notice attributes to its subject
    pub fn all_names(&self) -> Vec<&str> {
        let mut names = vec![self.name.as_str()];
        names.extend(self.aliases.iter().map(String::as_str));
        if let Some(new_name) = &self.new_name {
            names.push(new_name);
        }
        names
    }
}

/// Infer the kind of an item found outside a recognised heading
pub fn classify(body: &str) -> Option<NoticeKind> {
    let lower = body.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["place of birth"]) {
        Some(NoticeKind::ChangeOfPlaceOfBirth)
    } else if has(&["date of birth", "born on"]) {
        Some(NoticeKind::ChangeOfDateOfBirth)
    } else if has(&["to be known and called", "to be known as", "to be called", "change of name"]) {
        Some(NoticeKind::ChangeOfName)
    } else if has(&["marriage officer"]) {
        Some(NoticeKind::MarriageOfficer)
    } else {
        None
    }
}

/// Parse an item as a notice of the given kind
pub fn parse_notice(kind: NoticeKind, item: &RawItem) -> Result<ExtractedNotice, NoticeError> {
    let mut notice = ExtractedNotice::new(kind, item);
    match kind {
        NoticeKind::ChangeOfName => parse_change_of_name(&mut notice)?,
        NoticeKind::ChangeOfDateOfBirth => parse_date_of_birth(&mut notice)?,
        NoticeKind::ChangeOfPlaceOfBirth => parse_place_of_birth(&mut notice)?,
        NoticeKind::MarriageOfficer => parse_marriage_officer(&mut notice)?,
    }
    Ok(notice)
}

fn parse_change_of_name(notice: &mut ExtractedNotice) -> Result<(), NoticeError> {
    let text = notice.raw_text.clone();
    let caps = WISHES_TO_BE_KNOWN.captures(&text).ok_or_else(|| {
        NoticeError::UnrecognisedLayout("no 'wishes to be known as' clause".to_string())
    })?;
    let old = caps.name("old").map_or("", |m| m.as_str());
    let new = caps.name("new").map_or("", |m| m.as_str());

    apply_subject(notice, old)?;

    let new_end = NEW_NAME_END.find(new).map_or(new.len(), |m| m.start());
    let (new_title, new_name) = split_title(&clean_name(&new[..new_end]));
    let new_name = clean_name(&new_name);
    if new_name.is_empty() {
        return Err(NoticeError::UnrecognisedLayout("new name is empty".to_string()));
    }
    notice.new_title = new_title;
    notice.new_name = Some(new_name);

    notice.effective_date = EFFECT_CLAUSE
        .find(new)
        .and_then(|m| find_dates(&new[m.end()..]).first().map(|d| d.date));

    if notice.gender == Gender::Unknown {
        if let Some(gender) = new_title.and_then(|t| t.gender()) {
            notice.gender = gender;
        }
    }
    Ok(())
}

fn parse_date_of_birth(notice: &mut ExtractedNotice) -> Result<(), NoticeError> {
    let text = notice.raw_text.clone();
    let subject_end = SUBJECT_END.find(&text).map_or(text.len(), |m| m.start());
    apply_subject(notice, &text[..subject_end])?;

    let body = &text[subject_end..];
    let dates = find_dates(body);
    let Some(first) = dates.first() else {
        return Err(NoticeError::UnrecognisedLayout("no date of birth found".to_string()));
    };

    let from_to = dates.get(1).filter(|second| {
        FROM_KEYWORD.is_match(&body[..first.start])
            && body[first.end..second.start].trim().eq_ignore_ascii_case("to")
    });

    match from_to {
        Some(second) => {
            notice.old_value = Some(first.date.to_string());
            notice.new_value = Some(second.date.to_string());
        }
        None => {
            notice.new_value = Some(first.date.to_string());
            notice.old_value = dates.get(1).map(|d| d.date.to_string());
        }
    }
    Ok(())
}

fn parse_place_of_birth(notice: &mut ExtractedNotice) -> Result<(), NoticeError> {
    let text = notice.raw_text.clone();
    let subject_end = SUBJECT_END.find(&text).map_or(text.len(), |m| m.start());
    apply_subject(notice, &text[..subject_end])?;

    let body = &text[subject_end..];

    if let Some(caps) = PLACE_FROM_TO.captures(body) {
        notice.old_value = place(&caps, "old");
        notice.new_value = place(&caps, "new");
    } else if let Some(caps) = PLACE_IS_NOT.captures(body) {
        notice.new_value = place(&caps, "new");
        notice.old_value = place(&caps, "old");
    } else if let Some(caps) = PLACE_IS.captures(body) {
        notice.new_value = place(&caps, "new");
    }

    if notice.new_value.is_none() {
        return Err(NoticeError::UnrecognisedLayout("no place of birth found".to_string()));
    }
    Ok(())
}

fn place(caps: &Captures<'_>, group: &str) -> Option<String> {
    caps.name(group)
        .map(|m| clean_name(m.as_str()))
        .filter(|s| !s.is_empty())
}

fn parse_marriage_officer(notice: &mut ExtractedNotice) -> Result<(), NoticeError> {
    let text = notice.raw_text.trim_end_matches(['.', ';', ' ']).to_string();
    let mut parts = text.split(',').map(str::trim).filter(|p| !p.is_empty());

    let name = parts.next().unwrap_or_default();
    let (title, name) = split_title(name);
    let name = clean_name(&name);
    if name.is_empty() || is_title_only(&name) {
        return Err(NoticeError::MissingName);
    }

    notice.title = title;
    notice.name = name;
    notice.gender = gender_for(title, &notice.raw_text);
    notice.church = parts.next().map(clean_name).filter(|c| !c.is_empty());

    let location = parts.collect::<Vec<_>>().join(", ");
    notice.location = Some(clean_name(&location)).filter(|l| !l.is_empty());
    Ok(())
}

/// Fill title, name, aliases, profession, location and gender from the
/// subject segment (`Mr. Kofi Ato a.k.a. Kojo Ato, a Driver of Kumasi`)
fn apply_subject(notice: &mut ExtractedNotice, subject: &str) -> Result<(), NoticeError> {
    let subject = subject.trim();
    let name_end = NAME_END.find(subject).map_or(subject.len(), |m| m.start());
    let (name_part, rest) = subject.split_at(name_end);

    let (title, name_part) = split_title(name_part);
    let (name, aliases) = split_aliases(&name_part);
    if name.is_empty() || is_title_only(&name) {
        return Err(NoticeError::MissingName);
    }

    notice.title = title;
    notice.name = name;
    notice.aliases = aliases;
    notice.gender = gender_for(title, &notice.raw_text);

    notice.profession = PROFESSION
        .captures(rest)
        .and_then(|c| c.name("prof"))
        .map(|m| clean_name(m.as_str()))
        .filter(|p| !p.is_empty());

    notice.location = ADDRESS
        .captures(rest)
        .and_then(|c| c.name("addr"))
        .map(|m| clean_name(m.as_str()))
        .filter(|l| !l.is_empty());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(number: u32, text: &str) -> RawItem {
        RawItem { number: Some(number), text: text.to_string() }
    }

    fn d(y: i32, m: u32, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, day)
    }

    #[test]
    fn test_change_of_name() {
        let notice = parse_notice(
            NoticeKind::ChangeOfName,
            &item(
                1024,
                "Mr. Kwame Mensah a.k.a. Kwame Asante, a Teacher of P. O. Box 45, Accra \
                 wishes to be known and called Kwame Asante-Mensah with effect from \
                 1st January, 2020. All documents bearing his former name are still valid.",
            ),
        )
        .unwrap();

        assert_eq!(notice.item_number, Some(1024));
        assert_eq!(notice.title, Some(Title::Mr));
        assert_eq!(notice.name, "Kwame Mensah");
        assert_eq!(notice.aliases, vec!["Kwame Asante"]);
        assert_eq!(notice.profession.as_deref(), Some("Teacher"));
        assert_eq!(notice.location.as_deref(), Some("P. O. Box 45, Accra"));
        assert_eq!(notice.new_name.as_deref(), Some("Kwame Asante-Mensah"));
        assert_eq!(notice.new_title, None);
        assert_eq!(notice.effective_date, d(2020, 1, 1));
        assert_eq!(notice.gender, Gender::Male);
    }

    #[test]
    fn test_change_of_name_title_change() {
        let notice = parse_notice(
            NoticeKind::ChangeOfName,
            &item(7, "Ama Serwaa, now wishes to be known as Mrs. Ama Serwaa Boateng. All documents bearing her former name remain valid."),
        )
        .unwrap();

        assert_eq!(notice.title, None);
        assert_eq!(notice.name, "Ama Serwaa");
        assert_eq!(notice.new_title, Some(Title::Mrs));
        assert_eq!(notice.new_name.as_deref(), Some("Ama Serwaa Boateng"));
        assert_eq!(notice.effective_date, None);
        assert_eq!(notice.gender, Gender::Female);
    }

    #[test]
    fn test_change_of_name_without_clause() {
        let err = parse_notice(NoticeKind::ChangeOfName, &item(1, "Mr. Kofi Ato of Accra.")).unwrap_err();
        assert!(matches!(err, NoticeError::UnrecognisedLayout(_)));

        let err = parse_notice(NoticeKind::ChangeOfName, &item(2, "Mr. wishes to be known as Kofi.")).unwrap_err();
        assert_eq!(err, NoticeError::MissingName);
    }

    #[test]
    fn test_date_of_birth_is_and_not() {
        let notice = parse_notice(
            NoticeKind::ChangeOfDateOfBirth,
            &item(
                3,
                "Mr. Kofi Boateng, a Driver of Kumasi wishes to confirm that his date of birth \
                 is 12th May, 1980 and not 12th May, 1982. All documents are valid.",
            ),
        )
        .unwrap();

        assert_eq!(notice.name, "Kofi Boateng");
        assert_eq!(notice.profession.as_deref(), Some("Driver"));
        assert_eq!(notice.location.as_deref(), Some("Kumasi"));
        assert_eq!(notice.new_value.as_deref(), Some("1980-05-12"));
        assert_eq!(notice.old_value.as_deref(), Some("1982-05-12"));
    }

    #[test]
    fn test_date_of_birth_from_to() {
        let notice = parse_notice(
            NoticeKind::ChangeOfDateOfBirth,
            &item(4, "Miss Akua Dede wishes to change her date of birth from 05/04/1990 to 05/04/1991."),
        )
        .unwrap();

        assert_eq!(notice.old_value.as_deref(), Some("1990-04-05"));
        assert_eq!(notice.new_value.as_deref(), Some("1991-04-05"));
        assert_eq!(notice.gender, Gender::Female);
    }

    #[test]
    fn test_date_of_birth_requires_a_date() {
        let err = parse_notice(
            NoticeKind::ChangeOfDateOfBirth,
            &item(5, "Mr. Kofi Boateng wishes to confirm his date of birth."),
        )
        .unwrap_err();
        assert!(matches!(err, NoticeError::UnrecognisedLayout(_)));
    }

    #[test]
    fn test_place_of_birth() {
        let notice = parse_notice(
            NoticeKind::ChangeOfPlaceOfBirth,
            &item(6, "Mrs. Esi Ato wishes to confirm that her place of birth is Kumasi and not Accra. All documents remain valid."),
        )
        .unwrap();
        assert_eq!(notice.name, "Esi Ato");
        assert_eq!(notice.new_value.as_deref(), Some("Kumasi"));
        assert_eq!(notice.old_value.as_deref(), Some("Accra"));

        let notice = parse_notice(
            NoticeKind::ChangeOfPlaceOfBirth,
            &item(7, "Mr. Yaw Boakye wishes to change his place of birth from Tema to Cape Coast."),
        )
        .unwrap();
        assert_eq!(notice.old_value.as_deref(), Some("Tema"));
        assert_eq!(notice.new_value.as_deref(), Some("Cape Coast"));
    }

    #[test]
    fn test_marriage_officer() {
        let notice = parse_notice(
            NoticeKind::MarriageOfficer,
            &item(8, "Rev. Samuel Kwaku Osei, Methodist Church Ghana, Wesley Chapel, Adum, Kumasi."),
        )
        .unwrap();

        assert_eq!(notice.title, Some(Title::Rev));
        assert_eq!(notice.name, "Samuel Kwaku Osei");
        assert_eq!(notice.church.as_deref(), Some("Methodist Church Ghana"));
        assert_eq!(notice.location.as_deref(), Some("Wesley Chapel, Adum, Kumasi"));
        assert_eq!(notice.gender, Gender::Unknown);

        let err = parse_notice(NoticeKind::MarriageOfficer, &item(9, "Rev., Methodist Church, Accra"))
            .unwrap_err();
        assert_eq!(err, NoticeError::MissingName);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("wishes to be known as Kofi"), Some(NoticeKind::ChangeOfName));
        assert_eq!(classify("confirm his date of birth"), Some(NoticeKind::ChangeOfDateOfBirth));
        assert_eq!(classify("her place of birth is Ho"), Some(NoticeKind::ChangeOfPlaceOfBirth));
        assert_eq!(classify("appointed a marriage officer"), Some(NoticeKind::MarriageOfficer));
        assert_eq!(classify("Published by Authority"), None);
    }

    #[test]
    fn test_all_names() {
        let notice = parse_notice(
            NoticeKind::ChangeOfName,
            &item(1, "Mr. Kofi Ato alias Kojo Ato wishes to be known as Kofi Mensah."),
        )
        .unwrap();
        assert_eq!(notice.all_names(), vec!["Kofi Ato", "Kojo Ato", "Kofi Mensah"]);
    }
}
