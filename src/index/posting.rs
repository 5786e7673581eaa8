//! Posting lists.
//!
//! A posting list holds one [`Posting`] per document containing a term,
//! strictly ordered by ascending document id. Readers never hold references
//! into a list across yield points; they copy a page of postings starting at
//! a document id cursor instead.

/// Internal document identifier. Allocation starts at 1.
pub type DocId = u64;

/// Bit set of the full-text fields a term occurred in.
pub type FieldMask = u128;

/// Mask matching every field.
pub const ALL_FIELDS: FieldMask = FieldMask::MAX;

/// A token position tagged with the field bit it occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TermPosition {
    pub position: u32,
    pub field: FieldMask,
}

impl TermPosition {
    pub fn new(position: u32, field: FieldMask) -> Self {
        TermPosition { position, field }
    }
}

/// A single posting in a posting list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    /// Document ID.
    pub doc_id: DocId,
    /// Fields of the document the term occurred in.
    pub field_mask: FieldMask,
    /// Term frequency in the document.
    pub frequency: u32,
    /// Token positions of the term in the document, ascending.
    pub positions: Vec<TermPosition>,
}

impl Posting {
    /// Create a posting without position information.
    pub fn new(doc_id: DocId, field_mask: FieldMask) -> Self {
        Posting {
            doc_id,
            field_mask,
            frequency: 1,
            positions: Vec::new(),
        }
    }

    /// Create a posting whose positions all lie in the fields of
    /// `field_mask`.
    pub fn with_positions(doc_id: DocId, field_mask: FieldMask, positions: Vec<u32>) -> Self {
        let positions = positions
            .into_iter()
            .map(|position| TermPosition::new(position, field_mask))
            .collect();
        Posting::from_positions(doc_id, positions)
    }

    /// Create a posting from field tagged positions. The field mask is the
    /// union of their fields.
    pub fn from_positions(doc_id: DocId, mut positions: Vec<TermPosition>) -> Self {
        positions.sort_unstable();
        positions.dedup();
        Posting {
            doc_id,
            field_mask: positions.iter().fold(0, |mask, p| mask | p.field),
            frequency: positions.len().max(1) as u32,
            positions,
        }
    }

    /// Positions that occurred in a field of `mask`, ascending.
    pub fn positions_in(&self, mask: FieldMask) -> Vec<u32> {
        self.positions
            .iter()
            .filter(|p| p.field & mask != 0)
            .map(|p| p.position)
            .collect()
    }

    /// Fold another posting of the same document into this one.
    pub fn merge(&mut self, other: &Posting) {
        self.field_mask |= other.field_mask;
        self.frequency += other.frequency;
        if !other.positions.is_empty() {
            self.positions.extend_from_slice(&other.positions);
            self.positions.sort_unstable();
            self.positions.dedup();
        }
    }
}

/// Postings of one term, ordered by document id.
#[derive(Debug, Clone, Default)]
pub struct PostingList {
    postings: Vec<Posting>,
}

impl PostingList {
    /// Create an empty posting list.
    pub fn new() -> Self {
        PostingList::default()
    }

    /// Add a posting. A posting for a document already present is merged
    /// into the existing entry.
    pub fn add(&mut self, posting: Posting) {
        match self.postings.last().map(|p| p.doc_id) {
            None => self.postings.push(posting),
            Some(last) if last < posting.doc_id => self.postings.push(posting),
            Some(_) => {
                let pos = self.seek(posting.doc_id);
                match self.postings.get_mut(pos) {
                    Some(existing) if existing.doc_id == posting.doc_id => existing.merge(&posting),
                    _ => self.postings.insert(pos, posting),
                }
            }
        }
    }

    /// Index of the first posting with a document id at or after `target`.
    pub fn seek(&self, target: DocId) -> usize {
        self.postings.partition_point(|p| p.doc_id < target)
    }

    /// Copy up to `limit` postings at or after `from` whose field mask
    /// intersects `mask`.
    pub fn page(&self, from: DocId, mask: FieldMask, limit: usize) -> Vec<Posting> {
        self.postings[self.seek(from)..]
            .iter()
            .filter(|p| p.field_mask & mask != 0)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Check whether any posting intersects `mask`.
    pub fn has_field(&self, mask: FieldMask) -> bool {
        self.postings.iter().any(|p| p.field_mask & mask != 0)
    }

    /// Physically remove postings of documents for which `is_deleted` holds.
    /// Returns the number of postings removed.
    pub fn retain_live<F: Fn(DocId) -> bool>(&mut self, is_deleted: F) -> usize {
        let before = self.postings.len();
        self.postings.retain(|p| !is_deleted(p.doc_id));
        before - self.postings.len()
    }

    pub fn get(&self, i: usize) -> Option<&Posting> {
        self.postings.get(i)
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Posting> {
        self.postings.iter()
    }
}
