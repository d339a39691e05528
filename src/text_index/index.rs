//! Text Index service
//!
//! Document import and token lookups. Every import or delete is a single
//! transaction: a document is either fully indexed or absent.

use std::sync::Arc;

use serde::Serialize;

use crate::errors::{CoreError, CoreResult};
use crate::events::{AnnotationEvent, EventSink};
use crate::ids::DocumentId;
use crate::observability::{log_event_with_fields, Event, HealthCheck, ObservationScope};
use crate::storage::{Database, Mutation};

use super::layout::assign_indices;
use super::token::{join_tokens, Sentence, Token, TokenInput};

/// Summary of a completed import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexedDocument {
    pub document_id: DocumentId,
    pub sentences: usize,
    pub tokens: usize,
    pub max_global_index: u32,
}

pub struct TextIndex {
    db: Arc<Database>,
    events: Arc<dyn EventSink>,
    max_document_tokens: usize,
}

impl TextIndex {
    pub fn new(db: Arc<Database>, events: Arc<dyn EventSink>, max_document_tokens: usize) -> Self {
        Self {
            db,
            events,
            max_document_tokens,
        }
    }

    /// Import a tokenized document.
    ///
    /// Fails with `Validation` on empty input, an empty sentence, inverted
    /// offsets, more than `max_document_tokens` tokens, or a document that
    /// already has tokens (delete it first to re-index).
    pub fn index_document(
        &self,
        document_id: DocumentId,
        sentences: &[Vec<TokenInput>],
    ) -> CoreResult<IndexedDocument> {
        let doc = document_id.to_string();

        let tokens = match assign_indices(document_id, sentences, self.max_document_tokens) {
            Ok(tokens) => tokens,
            Err(e) => {
                log_event_with_fields(
                    Event::IndexDocumentRejected,
                    &[("document_id", &doc), ("reason", &e.to_string())],
                );
                return Err(e);
            }
        };

        let summary = IndexedDocument {
            document_id,
            sentences: sentences.len(),
            tokens: tokens.len(),
            max_global_index: tokens.last().map(|t| t.global_index).unwrap_or(0),
        };

        let scope = ObservationScope::with_fields(Event::IndexDocument, &[("document_id", &doc)]);

        let result = self.db.transaction_then(
            |txn| {
                if txn.tables().has_document(document_id) {
                    return Err(CoreError::validation(format!(
                        "document {} is already indexed",
                        document_id
                    )));
                }
                txn.apply(Mutation::InsertTokens {
                    document_id,
                    tokens,
                })?;
                Ok(())
            },
            |_| {
                self.events
                    .publish(AnnotationEvent::document_indexed(document_id))
            },
        );

        if let Err(e) = result {
            scope.fail(&e.to_string());
            return Err(e);
        }

        scope.complete_with_fields(&[
            ("sentences", &summary.sentences.to_string()),
            ("tokens", &summary.tokens.to_string()),
        ]);
        self.db.metrics().record_document_indexed(summary.tokens as u64);

        Ok(summary)
    }

    /// Tokens with `start <= global_index <= end`, in global order.
    ///
    /// `NotFound` if `start > end`. A range that hits no tokens returns an
    /// empty vector.
    pub fn get_tokens_in_range(
        &self,
        document_id: DocumentId,
        start: u32,
        end: u32,
    ) -> CoreResult<Vec<Token>> {
        if start > end {
            return Err(CoreError::not_found(format!(
                "empty range [{}, {}] in document {}",
                start, end, document_id
            )));
        }

        let tokens = self.db.read(|tables| {
            tables
                .tokens_in_range(document_id, start, end)
                .cloned()
                .collect::<Vec<_>>()
        })?;
        Ok(tokens)
    }

    /// Highest global index of the document, `None` if it has no tokens.
    pub fn get_max_global_index(&self, document_id: DocumentId) -> CoreResult<Option<u32>> {
        Ok(self.db.read(|tables| tables.max_global_index(document_id))?)
    }

    /// Remove every token of the document. Idempotent; returns the number
    /// of tokens removed.
    ///
    /// Mentions that pointed into the document are left in place and
    /// resolve as dangling from now on.
    pub fn delete_document(&self, document_id: DocumentId) -> CoreResult<usize> {
        let removed = self.db.transaction_then(
            |txn| {
                let count = txn.tables().token_count(document_id);
                if count > 0 {
                    txn.apply(Mutation::DeleteDocument { document_id })?;
                }
                Ok::<_, CoreError>(count)
            },
            |&removed: &usize| {
                if removed > 0 {
                    self.events
                        .publish(AnnotationEvent::document_deleted(document_id));
                }
            },
        )?;

        if removed > 0 {
            log_event_with_fields(
                Event::DocumentDeleted,
                &[
                    ("document_id", &document_id.to_string()),
                    ("tokens", &removed.to_string()),
                ],
            );
            self.db.metrics().increment_documents_deleted();
        }

        Ok(removed)
    }

    /// All sentences of the document in order. Empty if not indexed.
    pub fn get_sentences(&self, document_id: DocumentId) -> CoreResult<Vec<Sentence>> {
        let tokens: Vec<Token> = self.db.read(|tables| {
            tables.document_tokens(document_id).cloned().collect()
        })?;

        let mut sentences: Vec<Sentence> = Vec::new();
        for token in tokens {
            match sentences.last_mut() {
                Some(sentence) if sentence.sentence_index == token.sentence_index => {
                    sentence.tokens.push(token);
                }
                _ => sentences.push(Sentence {
                    document_id,
                    sentence_index: token.sentence_index,
                    tokens: vec![token],
                }),
            }
        }
        Ok(sentences)
    }

    pub fn get_sentence(&self, document_id: DocumentId, sentence_index: u32) -> CoreResult<Sentence> {
        let tokens: Vec<Token> = self.db.read(|tables| {
            tables
                .document_tokens(document_id)
                .filter(|t| t.sentence_index == sentence_index)
                .cloned()
                .collect()
        })?;

        if tokens.is_empty() {
            return Err(CoreError::not_found(format!(
                "sentence {} of document {}",
                sentence_index, document_id
            )));
        }

        Ok(Sentence {
            document_id,
            sentence_index,
            tokens,
        })
    }

    /// Look up a token by its sentence-local position.
    pub fn get_token(
        &self,
        document_id: DocumentId,
        sentence_index: u32,
        token_index: u32,
    ) -> CoreResult<Token> {
        self.db
            .read(|tables| tables.token_at(document_id, sentence_index, token_index).cloned())?
            .ok_or_else(|| {
                CoreError::not_found(format!(
                    "token ({}, {}) of document {}",
                    sentence_index, token_index, document_id
                ))
            })
    }

    pub fn token_count(&self, document_id: DocumentId) -> CoreResult<usize> {
        Ok(self.db.read(|tables| tables.token_count(document_id))?)
    }

    /// Token texts of `[start, end]` joined by single spaces.
    pub fn span_text(&self, document_id: DocumentId, start: u32, end: u32) -> CoreResult<String> {
        let tokens = self.get_tokens_in_range(document_id, start, end)?;
        Ok(join_tokens(&tokens))
    }
}

impl HealthCheck for TextIndex {
    fn name(&self) -> &str {
        "text_index"
    }

    fn is_healthy(&self) -> bool {
        self.db.read(|_| ()).is_ok()
    }
}
