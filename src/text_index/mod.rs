//! Text Index
//!
//! Stores each document as an ordered sequence of sentences, each an ordered
//! sequence of tokens. Every token is addressable both by
//! `(sentence_index, token_index)` and by a document-wide `global_index`;
//! mention spans are expressed in global indices.

mod index;
mod layout;
mod token;

pub use index::{IndexedDocument, TextIndex};
pub use layout::assign_indices;
pub use token::{join_tokens, Sentence, Token, TokenInput};
