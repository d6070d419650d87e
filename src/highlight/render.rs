use serde::Serialize;

use super::record::{HighlightRecord, compute_record_id};
use super::resolve::Resolver;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub text: String,
    pub highlighted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
}

impl Segment {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            highlighted: false,
            record_id: None,
        }
    }

    fn highlight(text: &str, record_id: &str) -> Self {
        Self {
            text: text.to_string(),
            highlighted: true,
            record_id: Some(record_id.to_string()),
        }
    }
}

/// Splits `canonical` at highlight boundaries in one left-to-right pass.
///
/// `records` are expected in start order without overlaps. Anything that
/// would break that (a record starting before the previous one ended, or
/// running past the text) is skipped, so the segments always concatenate
/// back to `canonical`.
pub fn render(canonical: &str, records: &[HighlightRecord]) -> Vec<Segment> {
    let bounds: Vec<usize> = canonical
        .char_indices()
        .map(|(b, _)| b)
        .chain(std::iter::once(canonical.len()))
        .collect();
    let total = bounds.len() - 1;

    let mut segments = Vec::with_capacity(records.len() * 2 + 1);
    let mut cursor = 0;

    for record in records {
        if !record.is_valid() || record.start_offset < cursor || record.end_offset > total {
            tracing::debug!(
                record_id = %record.id,
                start = record.start_offset,
                end = record.end_offset,
                cursor,
                "skipping highlight that does not fit the text"
            );
            continue;
        }

        if record.start_offset > cursor {
            segments.push(Segment::plain(
                &canonical[bounds[cursor]..bounds[record.start_offset]],
            ));
        }
        segments.push(Segment::highlight(
            &canonical[bounds[record.start_offset]..bounds[record.end_offset]],
            &record.id,
        ));
        cursor = record.end_offset;
    }

    if cursor < total {
        segments.push(Segment::plain(&canonical[bounds[cursor]..]));
    }

    segments
}

/// Re-anchors stored highlights after the article text has changed.
///
/// Records still sitting on their own text are kept untouched. The rest are
/// moved to the free occurrence of their text nearest to where they used to
/// start. A moved record keeps its creation time and tag and takes the id of
/// its new span. Records with no free occurrence left are dropped.
pub fn reconcile(
    resolver: &Resolver,
    canonical: &str,
    records: &[HighlightRecord],
) -> Vec<HighlightRecord> {
    let (mut kept, mut stale): (Vec<_>, Vec<_>) = records
        .iter()
        .cloned()
        .partition(|r| r.is_valid() && r.matches(canonical));
    stale.sort_by_key(|r| r.start_offset);

    for record in stale {
        let Ok(mut candidates) = resolver.resolve_all(&record.text, canonical) else {
            tracing::info!(record_id = %record.id, "dropping highlight whose text is gone");
            continue;
        };
        candidates.sort_by_key(|span| (span.start.abs_diff(record.start_offset), span.start));

        let placed = candidates.into_iter().find_map(|span| {
            let moved = HighlightRecord {
                id: compute_record_id(&record.article_id, span.start, span.end()),
                start_offset: span.start,
                end_offset: span.end(),
                ..record.clone()
            };
            (!kept.iter().any(|k| k.overlaps(&moved))).then_some(moved)
        });

        match placed {
            Some(moved) => {
                tracing::debug!(
                    old_id = %record.id,
                    new_id = %moved.id,
                    start = moved.start_offset,
                    "re-anchored highlight"
                );
                kept.push(moved);
            }
            None => {
                tracing::info!(record_id = %record.id, "dropping highlight with no free occurrence left");
            }
        }
    }

    kept.sort_by_key(|r| r.start_offset);
    kept
}

pub fn to_html(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match (&segment.record_id, segment.highlighted) {
            (Some(id), true) => {
                out.push_str(&format!(
                    r#"<mark data-highlight-id="{}">{}</mark>"#,
                    escape_html(id),
                    escape_html(&segment.text)
                ));
            }
            _ => out.push_str(&escape_html(&segment.text)),
        }
    }
    out
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
