//! Document table: id allocation, the external id mapping and tombstones.
//!
//! Internal ids are allocated monotonically starting at 1 and are never
//! reused, so an id can never alias two documents. Dropping a document sets
//! its bit in the deletion bitmap and releases its metadata at once; the
//! postings that still mention it are reclaimed by compaction.

use ahash::AHashMap;
use bit_vec::BitVec;

use crate::document::FieldValue;
use crate::index::posting::DocId;

/// Metadata kept for every live document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocMeta {
    /// Caller supplied identifier.
    pub external_id: Vec<u8>,
    /// Default score.
    pub score: f64,
    /// Opaque payload.
    pub payload: Option<Vec<u8>>,
    /// Values of sortable fields, keyed by field ordinal.
    pub sort_values: Vec<(usize, FieldValue)>,
}

impl DocMeta {
    /// Value of a sortable field.
    pub fn sort_value(&self, ordinal: usize) -> Option<&FieldValue> {
        self.sort_values
            .iter()
            .find(|(o, _)| *o == ordinal)
            .map(|(_, value)| value)
    }
}

/// Table of all documents ever committed to an index.
#[derive(Debug, Clone)]
pub struct DocTable {
    /// Metadata indexed by document id; `None` once deleted.
    docs: Vec<Option<DocMeta>>,
    /// Bitmap of deleted documents (bit set = deleted).
    deleted: BitVec,
    by_external: AHashMap<Vec<u8>, DocId>,
    live: usize,
    /// Deletions whose postings have not been reclaimed yet.
    tombstones: usize,
}

impl Default for DocTable {
    fn default() -> Self {
        DocTable::new()
    }
}

impl DocTable {
    /// Create an empty table. Id 0 is reserved and permanently deleted.
    pub fn new() -> Self {
        DocTable {
            docs: vec![None],
            deleted: BitVec::from_elem(1, true),
            by_external: AHashMap::new(),
            live: 0,
            tombstones: 0,
        }
    }

    /// The id the next committed document receives.
    pub fn next_id(&self) -> DocId {
        self.docs.len() as DocId
    }

    /// The largest id handed out so far (0 if none).
    pub fn max_doc_id(&self) -> DocId {
        self.next_id() - 1
    }

    /// Allocate an id for a new document.
    pub fn allocate(&mut self, meta: DocMeta) -> DocId {
        let doc_id = self.next_id();
        self.by_external.insert(meta.external_id.clone(), doc_id);
        self.docs.push(Some(meta));
        self.deleted.push(false);
        self.live += 1;
        doc_id
    }

    /// Id of a live document by external id.
    pub fn lookup(&self, external_id: &[u8]) -> Option<DocId> {
        self.by_external.get(external_id).copied()
    }

    /// Tombstone a document by external id, returning its internal id.
    pub fn delete(&mut self, external_id: &[u8]) -> Option<DocId> {
        let doc_id = self.by_external.remove(external_id)?;
        self.deleted.set(doc_id as usize, true);
        self.docs[doc_id as usize] = None;
        self.live -= 1;
        self.tombstones += 1;
        Some(doc_id)
    }

    /// Check if a document id is deleted or was never allocated.
    pub fn is_deleted(&self, doc_id: DocId) -> bool {
        self.deleted.get(doc_id as usize).unwrap_or(true)
    }

    /// Metadata of a live document.
    pub fn meta(&self, doc_id: DocId) -> Option<&DocMeta> {
        self.docs.get(doc_id as usize)?.as_ref()
    }

    /// External id of a live document.
    pub fn external_id(&self, doc_id: DocId) -> Option<&[u8]> {
        self.meta(doc_id).map(|meta| meta.external_id.as_slice())
    }

    /// Up to `limit` live ids at or after `from`, ascending.
    pub fn live_ids_from(&self, from: DocId, limit: usize) -> Vec<DocId> {
        let start = (from as usize).max(1);
        (start..self.docs.len())
            .filter(|&i| !self.deleted.get(i).unwrap_or(true))
            .take(limit)
            .map(|i| i as DocId)
            .collect()
    }

    /// Number of live documents.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Deletions not yet reclaimed by compaction.
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// Get deletion ratio (0.0 to 1.0) of unreclaimed tombstones.
    pub fn deletion_ratio(&self) -> f64 {
        let total = self.live + self.tombstones;
        if total == 0 {
            0.0
        } else {
            self.tombstones as f64 / total as f64
        }
    }

    /// Record that every tombstone has been reclaimed.
    pub fn mark_compacted(&mut self) {
        self.tombstones = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: &str) -> DocMeta {
        DocMeta {
            external_id: id.as_bytes().to_vec(),
            score: 1.0,
            payload: None,
            sort_values: vec![(2, FieldValue::from(5.0))],
        }
    }

    #[test]
    fn test_allocation_is_monotonic() {
        let mut table = DocTable::new();
        assert_eq!(table.allocate(meta("a")), 1);
        assert_eq!(table.allocate(meta("b")), 2);
        assert_eq!(table.delete(b"a"), Some(1));
        assert_eq!(table.allocate(meta("a")), 3);

        assert_eq!(table.lookup(b"a"), Some(3));
        assert_eq!(table.external_id(3), Some(&b"a"[..]));
        assert_eq!(table.external_id(1), None);
        assert_eq!(table.len(), 2);
        assert_eq!(table.max_doc_id(), 3);
    }

    #[test]
    fn test_deletion_bitmap() {
        let mut table = DocTable::new();
        for id in ["a", "b", "c", "d"] {
            table.allocate(meta(id));
        }
        assert_eq!(table.delete(b"b"), Some(2));
        assert_eq!(table.delete(b"b"), None);

        assert!(table.is_deleted(0));
        assert!(!table.is_deleted(1));
        assert!(table.is_deleted(2));
        assert!(table.is_deleted(99));
        assert_eq!(table.live_ids_from(0, 10), vec![1, 3, 4]);
        assert_eq!(table.live_ids_from(2, 1), vec![3]);
        assert!((table.deletion_ratio() - 0.25).abs() < 1e-9);

        table.mark_compacted();
        assert_eq!(table.tombstones(), 0);
        assert_eq!(table.deletion_ratio(), 0.0);
    }

    #[test]
    fn test_sort_values() {
        let mut table = DocTable::new();
        let id = table.allocate(meta("a"));
        let meta = table.meta(id).unwrap();
        assert_eq!(meta.sort_value(2), Some(&FieldValue::Numeric(5.0)));
        assert_eq!(meta.sort_value(0), None);
    }
}
