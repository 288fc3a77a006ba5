//! Text normalisation for PDF and OCR output
//!
//! Produces stable, line-oriented text for the section and item parsers.
//! `normalize_text` is idempotent.

use once_cell::sync::Lazy;
use regex_lite::Regex;

static SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("space regex"));

static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("blank line regex"));

static SPLIT_HONORIFIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(Mr|Mrs|Ms|Dr|Rev|Revd|Prof|Hon|Rt)\s+\.")
        .expect("honorific regex")
});

static SPLIT_AKA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\ba\s*\.\s*k\s*\.\s*a\b(?:\s*\.)?").expect("aka regex")
});

/// Character substitutions applied before any structural clean-up
const REPLACEMENTS: &[(char, &str)] = &[
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201A}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{201E}', "\""),
    ('\u{2013}', "-"),
    ('\u{2014}', "-"),
    ('\u{2212}', "-"),
    ('\u{00A0}', " "),
    ('\u{FEFF}', ""),
    ('\u{00AD}', ""),
];

/// Normalise raw gazette text
pub fn normalize_text(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");

    let mut replaced = String::with_capacity(unified.len());
    for ch in unified.chars() {
        match REPLACEMENTS.iter().find(|(from, _)| *from == ch) {
            Some((_, to)) => replaced.push_str(to),
            None => replaced.push(ch),
        }
    }

    let lines: Vec<String> = replaced
        .split('\n')
        .map(|line| SPACE_RUN.replace_all(line, " ").trim().to_string())
        .collect();

    let joined = join_hyphenated(lines).join("\n");
    let collapsed = BLANK_RUN.replace_all(&joined, "\n\n");
    let honorifics = SPLIT_HONORIFIC.replace_all(&collapsed, "$1.");
    let aliases = SPLIT_AKA.replace_all(&honorifics, "a.k.a.");

    aliases.trim_matches('\n').to_string()
}

/// Re-join words hyphenated across a line break (`exam-` / `ple`)
fn join_hyphenated(lines: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());

    for line in lines {
        if let Some(prev) = out.last_mut() {
            if ends_with_word_hyphen(prev) && starts_lowercase(&line) {
                prev.pop();
                prev.push_str(&line);
                continue;
            }
        }
        out.push(line);
    }

    out
}

fn ends_with_word_hyphen(line: &str) -> bool {
    let mut chars = line.chars().rev();
    chars.next() == Some('-') && chars.next().is_some_and(|c| c.is_lowercase())
}

fn starts_lowercase(line: &str) -> bool {
    line.chars().next().is_some_and(|c| c.is_lowercase())
}
