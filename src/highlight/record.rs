use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::resolve::{Span, slice_chars};
use crate::error::HighlightError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightRecord {
    pub id: String,
    pub article_id: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

pub fn compute_record_id(article_id: &str, start: usize, end: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}:{}", article_id, start, end).as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}

impl HighlightRecord {
    pub fn new(
        article_id: &str,
        start_offset: usize,
        end_offset: usize,
        text: &str,
        tag: Option<String>,
    ) -> Self {
        Self {
            id: compute_record_id(article_id, start_offset, end_offset),
            article_id: article_id.to_string(),
            start_offset,
            end_offset,
            text: text.to_string(),
            created_at: Utc::now(),
            tag,
        }
    }

    /// Builds a record for `span`, taking the text from the canonical text
    /// itself so the stored text always matches what is on the page.
    pub fn from_span(
        article_id: &str,
        canonical: &str,
        span: Span,
        tag: Option<String>,
    ) -> Result<Self, HighlightError> {
        let invalid = HighlightError::InvalidSpan {
            start: span.start,
            end: span.end(),
        };
        if span.len == 0 {
            return Err(invalid);
        }
        let text = slice_chars(canonical, span.start, span.end()).ok_or(invalid)?;
        Ok(Self::new(article_id, span.start, span.end(), text, tag))
    }

    pub fn span(&self) -> Span {
        Span {
            start: self.start_offset,
            len: self.end_offset.saturating_sub(self.start_offset),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.start_offset < self.end_offset
    }

    /// Half-open ranges: touching records do not overlap.
    pub fn overlaps(&self, other: &HighlightRecord) -> bool {
        self.start_offset < other.end_offset && other.start_offset < self.end_offset
    }

    /// True when the record still points at its own text in `canonical`.
    pub fn matches(&self, canonical: &str) -> bool {
        slice_chars(canonical, self.start_offset, self.end_offset)
            .is_some_and(|s| s.to_lowercase() == self.text.to_lowercase())
    }
}
