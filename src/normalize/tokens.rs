//! Canonical tokenization of raw name strings.
//!
//! The transform order is fixed and load-bearing: downstream keys
//! (`Alias_Clean`, blocking keys) are all derived from these tokens, so the
//! steps must stay byte-for-byte deterministic for a given input.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::vocab::{
    apply_spelling_variants, ABD_RE, BRACKETED, BRANCH_CODE_RE, DEGREE_SET, HYPHEN_SPLIT,
    LEADING_ARTICLE_RE, MULTISPACE, NON_WORD, TITLE_RE, TOKEN_ALIASES,
};

/// NFKD-decompose and drop combining marks so accented spellings compare
/// equal to their plain-ASCII forms.
fn fold_diacritics(raw: &str) -> String {
    raw.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Turn a raw name into its canonical lowercase token sequence.
///
/// Person names never collapse repeated tokens (a repeated given/family name
/// is meaningful); facility names collapse immediately-adjacent duplicates.
pub(super) fn tokenize(raw: &str, is_person: bool) -> Vec<String> {
    let folded = fold_diacritics(raw).to_lowercase();
    let trimmed = folded.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let s = BRACKETED.replace_all(trimmed, " ");
    let s = BRANCH_CODE_RE.replace_all(&s, " ");
    let s = TITLE_RE.replace_all(&s, " ");
    let s = NON_WORD.replace_all(&s, " ");
    let s = s.replace('_', " ").replace('.', " ");
    let s = MULTISPACE.replace_all(&s, " ");
    let s = s.trim().to_string();

    let s = apply_spelling_variants(&s);
    let s = ABD_RE.replace_all(&s, "abdel");
    let s = LEADING_ARTICLE_RE.replace_all(&s, "al $1");

    let parts: Vec<&str> = HYPHEN_SPLIT.split(&s).collect();
    let mut out: Vec<String> = Vec::new();
    let mut i = 0;
    while i < parts.len() {
        let t = parts[i];
        if t.is_empty() || DEGREE_SET.contains(t) {
            i += 1;
            continue;
        }
        // Merge the article "al"/"el" with the following token.
        if (t == "al" || t == "el") && i + 1 < parts.len() && !parts[i + 1].is_empty() {
            out.push(format!("el{}", parts[i + 1]));
            i += 2;
            continue;
        }
        let t = TOKEN_ALIASES.get(t).copied().unwrap_or(t);
        let adjacent_dup = !is_person && out.last().map(|p| p == t).unwrap_or(false);
        if !adjacent_dup {
            out.push(t.to_string());
        }
        i += 1;
    }

    out.retain(|w| w.chars().count() > 1);
    out
}

/// Title-case `s` the way display names are rendered: the first alphabetic
/// character of every alphabetic run is uppercased, the rest lowercased.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
