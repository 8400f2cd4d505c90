//! Text tokenization for index entries and query terms
//!
//! A token is a maximal run of alphanumeric characters, lowercased. Runs
//! shorter than `MIN_TOKEN_CHARS` characters are dropped, so single letters
//! and digits never match anything.
//!
//! Indexing goes through `tokenize_value`; query terms go through
//! `term_tokens`. Both are built on the same `Tokens` scanner, so a stored
//! value and a query term spelled the same way always agree.

use sift_core::Value;
use std::collections::HashSet;

/// Shortest token kept, in characters
pub const MIN_TOKEN_CHARS: usize = 2;

/// Iterator over the tokens of a string
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    rest: &'a str,
}

impl Iterator for Tokens<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let start = self.rest.find(char::is_alphanumeric)?;
            let run = &self.rest[start..];
            let end = run.find(|c: char| !c.is_alphanumeric()).unwrap_or(run.len());
            self.rest = &run[end..];

            let word = &run[..end];
            if word.chars().count() >= MIN_TOKEN_CHARS {
                return Some(word.to_lowercase());
            }
        }
    }
}

/// Scan `text` into tokens lazily
pub fn tokens(text: &str) -> Tokens<'_> {
    Tokens { rest: text }
}

/// All tokens of `text`, duplicates included
///
/// # Example
///
/// ```
/// use sift_search::tokenizer::tokenize;
///
/// let tokens = tokenize("JavaScript: The Definitive Guide");
/// assert_eq!(tokens, vec!["javascript", "the", "definitive", "guide"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    tokens(text).collect()
}

/// Tokens of a field value; `Null` yields none
pub fn tokenize_value(value: &Value) -> Vec<String> {
    match value.to_text() {
        Some(text) => tokenize(&text),
        None => Vec::new(),
    }
}

/// Tokens a query term must all match, first occurrence order
///
/// ```
/// use sift_search::tokenizer::term_tokens;
///
/// assert_eq!(term_tokens("Baggins baggins BAGGINS"), vec!["baggins"]);
/// assert!(term_tokens("a-b").is_empty());
/// ```
pub fn term_tokens(term: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens(term).filter(|t| seen.insert(t.clone())).collect()
}
