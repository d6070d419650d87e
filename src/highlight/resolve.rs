use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use super::normalize::Normalizer;
use crate::error::HighlightError;

/// A run of canonical text, in chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Returns `text[start..end]` where both bounds count chars, or `None` if the
/// range falls outside the text.
pub fn slice_chars(text: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }
    let byte_at = |idx: usize| {
        text.char_indices()
            .map(|(b, _)| b)
            .chain(std::iter::once(text.len()))
            .nth(idx)
    };
    let from = byte_at(start)?;
    let to = byte_at(end)?;
    Some(&text[from..to])
}

/// Locates a user selection inside canonical text.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    normalizer: Normalizer,
}

impl Resolver {
    pub fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    /// Finds the first case-insensitive literal occurrence of `fragment` in
    /// `canonical`. Markers inside the fragment are stripped first, so a
    /// selection copied from rendered bold text still lines up.
    pub fn resolve(&self, fragment: &str, canonical: &str) -> Result<Span, HighlightError> {
        self.resolve_all(fragment, canonical)?
            .into_iter()
            .next()
            .ok_or(HighlightError::NotFound)
    }

    /// Every non-overlapping occurrence of `fragment`, in text order. Fails
    /// with `NotFound` when there is none.
    pub fn resolve_all(&self, fragment: &str, canonical: &str) -> Result<Vec<Span>, HighlightError> {
        let stripped = self.normalizer.normalize(fragment);
        let clean = stripped.trim();
        if clean.is_empty() {
            return Err(HighlightError::NotFound);
        }

        let pattern = RegexBuilder::new(&regex::escape(clean))
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                tracing::warn!(error = %e, "failed to build selection pattern");
                HighlightError::NotFound
            })?;

        let wanted = clean.to_lowercase();
        let mut spans = Vec::new();
        let mut chars_before = 0;
        let mut scanned = 0;
        for found in pattern.find_iter(canonical) {
            // length comes from the match, not from `clean`
            let matched = found.as_str();
            if matched.to_lowercase() != wanted {
                tracing::debug!(matched, clean, "selection failed verification");
                continue;
            }
            chars_before += canonical[scanned..found.start()].chars().count();
            scanned = found.start();
            spans.push(Span {
                start: chars_before,
                len: matched.chars().count(),
            });
        }

        if spans.is_empty() {
            return Err(HighlightError::NotFound);
        }
        Ok(spans)
    }
}

pub fn resolve(fragment: &str, canonical: &str) -> Result<Span, HighlightError> {
    Resolver::default().resolve(fragment, canonical)
}
