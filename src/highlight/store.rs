use std::collections::{HashMap, HashSet};

use super::record::HighlightRecord;
use crate::error::{HighlightError, StorageError};
use crate::kv::KeyValueStore;

pub fn storage_key(article_id: &str) -> String {
    format!("highlights:{}", article_id)
}

/// Per-article highlight collections backed by a key-value store.
///
/// Each collection is read once on first use and cached; every mutation
/// writes the full collection back before returning. Collections are kept
/// sorted by start offset with no two records overlapping.
pub struct HighlightStore<S> {
    kv: S,
    cache: HashMap<String, Vec<HighlightRecord>>,
}

impl<S: KeyValueStore> HighlightStore<S> {
    pub fn new(kv: S) -> Self {
        Self {
            kv,
            cache: HashMap::new(),
        }
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    pub fn kv_mut(&mut self) -> &mut S {
        &mut self.kv
    }

    pub fn list(&mut self, article_id: &str) -> Result<&[HighlightRecord], HighlightError> {
        Ok(self.collection(article_id)?.as_slice())
    }

    pub fn get(
        &mut self,
        article_id: &str,
        record_id: &str,
    ) -> Result<Option<HighlightRecord>, HighlightError> {
        Ok(self
            .collection(article_id)?
            .iter()
            .find(|r| r.id == record_id)
            .cloned())
    }

    /// Inserts `record`, rejecting it if it overlaps anything already stored.
    /// On any failure the collection is left exactly as it was.
    pub fn add(&mut self, article_id: &str, record: HighlightRecord) -> Result<(), HighlightError> {
        if record.article_id != article_id {
            return Err(HighlightError::ArticleMismatch {
                expected: article_id.to_string(),
                found: record.article_id,
            });
        }
        if !record.is_valid() {
            return Err(HighlightError::InvalidSpan {
                start: record.start_offset,
                end: record.end_offset,
            });
        }

        let records = self.collection(article_id)?;
        if records.iter().any(|r| r.id == record.id) {
            tracing::info!(article_id, record_id = %record.id, "rejected duplicate highlight id");
            return Err(HighlightError::DuplicateId { id: record.id });
        }
        if let Some(existing) = records.iter().find(|r| r.overlaps(&record)) {
            tracing::info!(
                article_id,
                existing = %existing.id,
                start = record.start_offset,
                end = record.end_offset,
                "rejected overlapping highlight"
            );
            return Err(HighlightError::Overlap {
                existing: existing.id.clone(),
            });
        }

        let idx = records.partition_point(|r| r.start_offset < record.start_offset);
        let record_id = record.id.clone();
        records.insert(idx, record);

        if let Err(e) = self.persist(article_id) {
            self.forget(article_id, &record_id);
            return Err(e.into());
        }

        tracing::info!(article_id, record_id = %record_id, "added highlight");
        Ok(())
    }

    /// Returns whether a record was removed. Unknown ids are not an error.
    pub fn remove(&mut self, article_id: &str, record_id: &str) -> Result<bool, HighlightError> {
        let records = self.collection(article_id)?;
        let Some(idx) = records.iter().position(|r| r.id == record_id) else {
            tracing::debug!(article_id, record_id, "no highlight to remove");
            return Ok(false);
        };
        let removed = records.remove(idx);

        if let Err(e) = self.persist(article_id) {
            if let Some(records) = self.cache.get_mut(article_id) {
                records.insert(idx, removed);
            }
            return Err(e.into());
        }

        tracing::info!(article_id, record_id, "removed highlight");
        Ok(true)
    }

    pub fn clear(&mut self, article_id: &str) -> Result<(), HighlightError> {
        self.kv.remove(&storage_key(article_id))?;
        self.cache.insert(article_id.to_string(), Vec::new());
        tracing::info!(article_id, "cleared highlights");
        Ok(())
    }

    /// Swaps in a whole collection, e.g. after re-anchoring against edited
    /// text. Records are sorted and overlapping ones dropped before saving.
    pub fn replace(
        &mut self,
        article_id: &str,
        records: Vec<HighlightRecord>,
    ) -> Result<(), HighlightError> {
        let previous = self
            .cache
            .insert(article_id.to_string(), sanitize(article_id, records));

        if let Err(e) = self.persist(article_id) {
            match previous {
                Some(previous) => self.cache.insert(article_id.to_string(), previous),
                None => self.cache.remove(article_id),
            };
            return Err(e.into());
        }
        Ok(())
    }

    fn collection(&mut self, article_id: &str) -> Result<&mut Vec<HighlightRecord>, HighlightError> {
        if !self.cache.contains_key(article_id) {
            let records = self.read(article_id)?;
            self.cache.insert(article_id.to_string(), records);
        }
        Ok(self.cache.entry(article_id.to_string()).or_default())
    }

    fn read(&self, article_id: &str) -> Result<Vec<HighlightRecord>, HighlightError> {
        let Some(raw) = self.kv.get(&storage_key(article_id))? else {
            return Ok(Vec::new());
        };

        match decode_collection(&raw) {
            Ok(records) => Ok(sanitize(article_id, records)),
            Err(e) => {
                tracing::warn!(
                    article_id,
                    error = %crate::unpack_error(&e),
                    "ignoring malformed highlight collection"
                );
                Ok(Vec::new())
            }
        }
    }

    fn persist(&mut self, article_id: &str) -> Result<(), StorageError> {
        let records = self.cache.get(article_id).map(Vec::as_slice).unwrap_or(&[]);
        let raw = serde_json::to_string(records)?;
        self.kv.set(&storage_key(article_id), &raw)
    }

    fn forget(&mut self, article_id: &str, record_id: &str) {
        if let Some(records) = self.cache.get_mut(article_id) {
            records.retain(|r| r.id != record_id);
        }
    }
}

fn decode_collection(raw: &str) -> Result<Vec<HighlightRecord>, StorageError> {
    serde_json::from_str(raw).map_err(|e| StorageError::Malformed(e.to_string()))
}

/// Sorts by start offset and drops records that are empty, belong to another
/// article, overlap an earlier one or repeat an earlier id.
fn sanitize(article_id: &str, mut records: Vec<HighlightRecord>) -> Vec<HighlightRecord> {
    records.sort_by_key(|r| (r.start_offset, r.end_offset));

    let total = records.len();
    let mut ids = HashSet::with_capacity(total);
    let mut kept: Vec<HighlightRecord> = Vec::with_capacity(total);
    for record in records {
        if !record.is_valid() || record.article_id != article_id {
            continue;
        }
        if kept.last().is_some_and(|prev| prev.overlaps(&record)) {
            continue;
        }
        if !ids.insert(record.id.clone()) {
            continue;
        }
        kept.push(record);
    }

    if kept.len() != total {
        tracing::warn!(
            article_id,
            dropped = total - kept.len(),
            "dropped invalid or overlapping highlights"
        );
    }
    kept
}
