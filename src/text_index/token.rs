//! Token and sentence records
//!
//! A token carries two coordinates: `(sentence_index, token_index)` local to
//! its sentence, and `global_index` across the whole document. Both are
//! assigned once at import time and never change.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::ids::DocumentId;

/// One token as produced by the import pipeline, before indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInput {
    /// Token text
    pub text: String,
    /// Character offset of the first character in the raw text
    pub start_offset: u32,
    /// Character offset one past the last character in the raw text
    pub end_offset: u32,
}

impl TokenInput {
    pub fn new(text: impl Into<String>, start_offset: u32, end_offset: u32) -> Self {
        Self {
            text: text.into(),
            start_offset,
            end_offset,
        }
    }
}

/// An indexed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Owning document
    pub document_id: DocumentId,
    /// Sentence this token belongs to (0-based)
    pub sentence_index: u32,
    /// Position within the sentence (0-based)
    pub token_index: u32,
    /// Position within the whole document (0-based)
    pub global_index: u32,
    /// Token text
    pub text: String,
    /// Character offset of the first character
    pub start_offset: u32,
    /// Character offset one past the last character
    pub end_offset: u32,
}

/// A sentence: the ordered run of tokens sharing one `sentence_index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub document_id: DocumentId,
    pub sentence_index: u32,
    pub tokens: Vec<Token>,
}

impl Sentence {
    /// Global index range covered by this sentence, `None` if it has no tokens.
    pub fn global_range(&self) -> Option<RangeInclusive<u32>> {
        let first = self.tokens.first()?;
        let last = self.tokens.last()?;
        Some(first.global_index..=last.global_index)
    }

    /// Token texts joined by single spaces
    pub fn text(&self) -> String {
        join_tokens(&self.tokens)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Join token texts with single spaces.
pub fn join_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
