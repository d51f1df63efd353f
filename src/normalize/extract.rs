//! Display-oriented person-name extraction.
//!
//! A coarser pass than the canonical tokenizer: it keeps original spellings
//! and only removes annotations, titles, service words, branch codes and
//! numeric junk, producing a human-presentable name prior to matching.

use lazy_static::lazy_static;
use regex::Regex;

use super::tokens::title_case;
use super::vocab::{BRANCH_SET, EXTRACT_TITLE_SET, SERVICE_SET};

lazy_static! {
    static ref PAREN: Regex = Regex::new(r"\([^)]*\)").unwrap();
    static ref SQUARE: Regex = Regex::new(r"\[[^\]]*\]").unwrap();
    static ref CURLY: Regex = Regex::new(r"\{[^}]*\}").unwrap();
    static ref PUNCT: Regex = Regex::new(r"[^\w\s]").unwrap();
}

/// Extract the person name buried in a raw BI string.
pub fn extract_person_name_smart(raw: &str) -> String {
    let text = raw.trim();
    if text.is_empty() {
        return String::new();
    }

    let text = PAREN.replace_all(text, "");
    let text = SQUARE.replace_all(&text, "");
    let text = CURLY.replace_all(&text, "");
    let text = PUNCT.replace_all(&text, " ");

    let mut kept: Vec<String> = Vec::new();
    for word in text.split_whitespace() {
        let lower = word.to_lowercase();
        if EXTRACT_TITLE_SET.contains(lower.as_str())
            || SERVICE_SET.contains(lower.as_str())
            || BRANCH_SET.contains(lower.as_str())
        {
            continue;
        }
        if lower.chars().count() < 2 || lower.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        kept.push(title_case(word));
    }

    kept.join(" ")
}
