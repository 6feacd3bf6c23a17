//! Cleanup of study-note text before it is voiced

use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(.*?\)").expect("valid regex"));

static QUOTES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"['"]"#).expect("valid regex"));

static QUOTED_HAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'(\p{Han}+)'").expect("valid regex"));

/// Spell out structure notation: `+` becomes "followed by", brackets go,
/// whitespace runs collapse to one space
#[must_use]
pub fn replace_special_chars(text: &str) -> String {
    let text = text.replace('+', "followed by").replace(['[', ']'], "");
    WHITESPACE_RUN.replace_all(&text, " ").into_owned()
}

/// Remove parenthesized asides together with the whitespace before them
#[must_use]
pub fn remove_parenthesized(text: &str) -> String {
    PARENTHESIZED.replace_all(text, "").into_owned()
}

/// Remove every single and double quote
#[must_use]
pub fn remove_all_quotes(text: &str) -> String {
    QUOTES.replace_all(text, "").into_owned()
}

/// Remove ellipsis characters
#[must_use]
pub fn remove_ellipses(text: &str) -> String {
    text.replace('…', "")
}

/// Unwrap Han text quoted with single quotes: `'你好'` becomes `你好`
#[must_use]
pub fn unquote_han(text: &str) -> String {
    QUOTED_HAN.replace_all(text, "$1").into_owned()
}

/// Cleanup applied to pattern and word notes
#[must_use]
pub fn clean_note(note: &str) -> String {
    remove_ellipses(&remove_parenthesized(note))
}

/// Cleanup applied to grammar structure strings
#[must_use]
pub fn clean_structure(structure: &str) -> String {
    remove_all_quotes(&remove_parenthesized(&replace_special_chars(structure)))
}
