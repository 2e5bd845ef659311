//! Display-name heuristic for a candidate document.
//!
//! Best effort only: looks for a line in the first five that is nothing but two or three
//! capitalized words ("Jane Doe", "Mary Ann Smith"). Otherwise derives a name from the
//! identifier's file stem. Never fails; a wrong guess is expected for unusual layouts.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

const HEADER_LINES: usize = 5;
const UNKNOWN_NAME: &str = "Unknown Candidate";

static NAME_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z][a-z]+\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)\s*$")
        .expect("name pattern is a valid regex")
});

pub fn display_name(text: &str, identifier: &str) -> String {
    text.lines()
        .take(HEADER_LINES)
        .map(str::trim)
        .find_map(|line| NAME_LINE.captures(line).map(|c| c[1].to_string()))
        .unwrap_or_else(|| name_from_identifier(identifier))
}

/// `jane_doe-resume.pdf` → `Jane Doe Resume`.
fn name_from_identifier(identifier: &str) -> String {
    let stem = Path::new(identifier)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(identifier);

    let words: Vec<String> = stem
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(title_case)
        .collect();

    if words.is_empty() {
        UNKNOWN_NAME.to_string()
    } else {
        words.join(" ")
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
