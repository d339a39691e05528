//! Mention span validation and resolution

use serde::Serialize;

use crate::errors::{CoreError, CoreResult};
use crate::ids::DocumentId;
use crate::text_index::Token;

/// A validated inclusive span of global token indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Validate caller-supplied bounds: both non-negative, `start <= end`.
    pub fn checked(start: i64, end: i64) -> CoreResult<Self> {
        if start < 0 || end < 0 {
            return Err(CoreError::validation(format!(
                "span [{}, {}] has a negative index",
                start, end
            )));
        }
        if start > end {
            return Err(CoreError::validation(format!(
                "span start {} is after end {}",
                start, end
            )));
        }
        let start = u32::try_from(start)
            .map_err(|_| CoreError::validation(format!("span start {} is out of range", start)))?;
        let end = u32::try_from(end)
            .map_err(|_| CoreError::validation(format!("span end {} is out of range", end)))?;
        Ok(Self { start, end })
    }

    /// Check the span against a document's highest global index.
    ///
    /// `max_global_index` is `None` when the document has no tokens.
    pub fn check_within(&self, document_id: DocumentId, max_global_index: Option<u32>) -> CoreResult<()> {
        let max = max_global_index.ok_or_else(|| {
            CoreError::validation(format!("document {} has no indexed tokens", document_id))
        })?;
        if self.end > max {
            return Err(CoreError::validation(format!(
                "span [{}, {}] exceeds document {} (max global index {})",
                self.start, self.end, document_id, max
            )));
        }
        Ok(())
    }

    /// Number of tokens covered; always at least one
    pub fn token_count(&self) -> usize {
        (self.end - self.start) as usize + 1
    }
}

/// A mention's span looked up against the current text index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SpanResolution {
    Resolved { tokens: Vec<Token>, text: String },
    /// Some or all referenced tokens no longer exist
    Dangling,
}

impl SpanResolution {
    pub fn is_dangling(&self) -> bool {
        matches!(self, SpanResolution::Dangling)
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            SpanResolution::Resolved { text, .. } => Some(text),
            SpanResolution::Dangling => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_span() {
        let span = Span::checked(4, 5).unwrap();
        assert_eq!(span, Span { start: 4, end: 5 });
        assert_eq!(span.token_count(), 2);
        assert_eq!(Span::checked(3, 3).unwrap().token_count(), 1);
    }

    #[test]
    fn test_negative_rejected() {
        assert!(Span::checked(-1, 2).unwrap_err().is_validation());
        assert!(Span::checked(0, -2).unwrap_err().is_validation());
    }

    #[test]
    fn test_inverted_rejected() {
        assert!(Span::checked(5, 4).unwrap_err().is_validation());
    }

    #[test]
    fn test_too_large_rejected() {
        let big = i64::from(u32::MAX) + 1;
        assert!(Span::checked(0, big).unwrap_err().is_validation());
    }

    #[test]
    fn test_within_document() {
        let doc = DocumentId::new();
        let span = Span::checked(0, 6).unwrap();
        assert!(span.check_within(doc, Some(6)).is_ok());
        assert!(span.check_within(doc, Some(5)).unwrap_err().is_validation());
        assert!(span.check_within(doc, None).unwrap_err().is_validation());
    }

    #[test]
    fn test_resolution_serializes_with_status() {
        let json = serde_json::to_value(SpanResolution::Dangling).unwrap();
        assert_eq!(json["status"], "dangling");
    }
}
