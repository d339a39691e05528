//! Index assignment for an imported document
//!
//! Sentence indices follow input order from 0, token indices restart at 0
//! in every sentence, and the global index is a running count over the
//! whole document in sentence-then-token order. The result depends only
//! on the input.

use crate::errors::{CoreError, CoreResult};
use crate::ids::DocumentId;

use super::token::{Token, TokenInput};

/// Validate `sentences` and assign every token its three indices.
pub fn assign_indices(
    document_id: DocumentId,
    sentences: &[Vec<TokenInput>],
    max_tokens: usize,
) -> CoreResult<Vec<Token>> {
    if sentences.is_empty() {
        return Err(CoreError::validation("document has no sentences"));
    }

    let total: usize = sentences.iter().map(Vec::len).sum();
    if total > max_tokens {
        return Err(CoreError::validation(format!(
            "document has {} tokens, limit is {}",
            total, max_tokens
        )));
    }
    // Fits: max_tokens never exceeds u32::MAX
    let mut global_index: u32 = 0;
    let mut tokens = Vec::with_capacity(total);

    for (sentence_index, sentence) in (0u32..).zip(sentences) {
        if sentence.is_empty() {
            return Err(CoreError::validation(format!(
                "sentence {} is empty",
                sentence_index
            )));
        }

        for (token_index, input) in (0u32..).zip(sentence) {
            if input.start_offset > input.end_offset {
                return Err(CoreError::validation(format!(
                    "token {} of sentence {} has start_offset {} after end_offset {}",
                    token_index, sentence_index, input.start_offset, input.end_offset
                )));
            }

            tokens.push(Token {
                document_id,
                sentence_index,
                token_index,
                global_index,
                text: input.text.clone(),
                start_offset: input.start_offset,
                end_offset: input.end_offset,
            });
            global_index += 1;
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(words: &[&str]) -> Vec<TokenInput> {
        let mut offset = 0;
        words
            .iter()
            .map(|w| {
                let start = offset;
                offset += w.len() as u32 + 1;
                TokenInput::new(*w, start, start + w.len() as u32)
            })
            .collect()
    }

    #[test]
    fn test_two_sentences() {
        let doc = DocumentId::new();
        let tokens = assign_indices(
            doc,
            &[sentence(&["The", "cat", "sat", "."]), sentence(&["It", "slept", "."])],
            100,
        )
        .unwrap();

        assert_eq!(tokens.len(), 7);
        let it = &tokens[4];
        assert_eq!(it.text, "It");
        assert_eq!((it.sentence_index, it.token_index, it.global_index), (1, 0, 4));
        assert_eq!(tokens[6].global_index, 6);
    }

    #[test]
    fn test_global_order_matches_local_order() {
        let tokens = assign_indices(
            DocumentId::new(),
            &[sentence(&["a", "b"]), sentence(&["c"]), sentence(&["d", "e", "f"])],
            100,
        )
        .unwrap();

        for pair in tokens.windows(2) {
            let a = (pair[0].sentence_index, pair[0].token_index);
            let b = (pair[1].sentence_index, pair[1].token_index);
            assert!(a < b);
            assert_eq!(pair[1].global_index, pair[0].global_index + 1);
        }
    }

    #[test]
    fn test_deterministic() {
        let doc = DocumentId::new();
        let input = vec![sentence(&["x", "y"]), sentence(&["z"])];
        assert_eq!(
            assign_indices(doc, &input, 10).unwrap(),
            assign_indices(doc, &input, 10).unwrap()
        );
    }

    #[test]
    fn test_rejects_empty_input() {
        let err = assign_indices(DocumentId::new(), &[], 10).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_rejects_empty_sentence() {
        let err = assign_indices(DocumentId::new(), &[sentence(&["a"]), vec![]], 10).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("sentence 1"));
    }

    #[test]
    fn test_rejects_inverted_offsets() {
        let bad = vec![TokenInput::new("a", 5, 4)];
        assert!(assign_indices(DocumentId::new(), &[bad], 10).unwrap_err().is_validation());
    }

    #[test]
    fn test_zero_width_token_allowed() {
        let tokens = assign_indices(DocumentId::new(), &[vec![TokenInput::new("", 3, 3)]], 10).unwrap();
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn test_rejects_oversized_document() {
        let err = assign_indices(DocumentId::new(), &[sentence(&["a", "b", "c"])], 2).unwrap_err();
        assert!(err.is_validation());
    }
}
