use std::collections::HashSet;

use crate::lookup::BookLookupResult;

/// How many of a candidate's title+author words were found in the OCR text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coverage {
    pub matched: usize,
    pub total: usize,
}

impl Coverage {
    pub fn score(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.matched as f64 / self.total as f64
    }
}

/// Lowercases and strips surrounding punctuation. `None` when nothing is left.
pub fn normalize_word(raw: &str) -> Option<String> {
    let trimmed = raw.trim_matches(|ch: char| !ch.is_alphanumeric());
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

pub fn normalize_words<'a>(words: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
    words.into_iter().filter_map(normalize_word).collect()
}

pub fn candidate_words(book: &BookLookupResult) -> HashSet<String> {
    normalize_words(
        book.title
            .split_whitespace()
            .chain(book.author.split_whitespace()),
    )
}

/// Order-insensitive identity of a book by its normalized title and author words.
pub fn book_key(book: &BookLookupResult) -> (Vec<String>, Vec<String>) {
    let sorted = |value: &str| {
        let mut words = normalize_words(value.split_whitespace())
            .into_iter()
            .collect::<Vec<_>>();
        words.sort();
        words
    };
    (sorted(&book.title), sorted(&book.author))
}

/// Coverage over word sets that are already normalized.
pub fn coverage(extracted: &HashSet<String>, candidate: &HashSet<String>) -> Coverage {
    Coverage {
        matched: candidate.intersection(extracted).count(),
        total: candidate.len(),
    }
}

/// Fraction of `candidate` words present in `extracted`, compared case-insensitively.
pub fn score(extracted: &HashSet<String>, candidate: &HashSet<String>) -> f64 {
    let extracted = normalize_words(extracted.iter().map(String::as_str));
    let candidate = normalize_words(candidate.iter().map(String::as_str));
    coverage(&extracted, &candidate).score()
}

pub fn is_exact_match(score: f64) -> bool {
    score >= 1.0
}
