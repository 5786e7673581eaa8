//! Term dictionary mapping terms to posting lists.
//!
//! Terms live in a [`Trie`] whose values are [`TermId`]s into an arena of
//! posting lists. Iterators hold on to term ids rather than references, and
//! re-resolve them by term bytes after compaction has rebuilt the arena.

use std::ops::Bound;

use crate::index::posting::{DocId, Posting, PostingList};
use crate::index::trie::Trie;

/// Handle of a term inside one dictionary generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(u32);

/// What a compaction pass reclaimed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionStats {
    /// Postings of deleted documents removed.
    pub postings_removed: usize,
    /// Terms left without postings and removed.
    pub terms_removed: usize,
}

impl CompactionStats {
    pub fn merge(&mut self, other: CompactionStats) {
        self.postings_removed += other.postings_removed;
        self.terms_removed += other.terms_removed;
    }
}

/// A dictionary of byte-string terms and their posting lists.
#[derive(Debug, Clone, Default)]
pub struct TermDictionary {
    trie: Trie<TermId>,
    /// Posting lists indexed by term id.
    postings: Vec<PostingList>,
    /// Term bytes indexed by term id.
    terms: Vec<Vec<u8>>,
}

impl TermDictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        TermDictionary::default()
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.trie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    /// Total number of postings across all terms.
    pub fn posting_count(&self) -> usize {
        self.postings.iter().map(PostingList::len).sum()
    }

    /// Add a posting to a term, creating the term if absent.
    pub fn add(&mut self, term: &[u8], posting: Posting) -> TermId {
        let next = TermId(self.postings.len() as u32);
        let id = *self.trie.get_or_insert_with(term, || next);
        if id == next {
            self.postings.push(PostingList::new());
            self.terms.push(term.to_vec());
        }
        self.postings[id.0 as usize].add(posting);
        id
    }

    /// Exact lookup.
    pub fn lookup(&self, term: &[u8]) -> Option<TermId> {
        self.trie.get(term).copied()
    }

    /// Posting list of a term.
    pub fn postings(&self, id: TermId) -> Option<&PostingList> {
        self.postings.get(id.0 as usize)
    }

    /// Bytes of a term.
    pub fn term(&self, id: TermId) -> Option<&[u8]> {
        self.terms.get(id.0 as usize).map(Vec::as_slice)
    }

    /// Terms starting with `prefix`, ascending.
    pub fn prefix<'a>(&'a self, prefix: &[u8]) -> impl Iterator<Item = TermId> + use<'a> {
        self.trie.prefix(prefix).map(|(_, id)| *id)
    }

    /// Terms within `max_distance` edits of `term`.
    pub fn fuzzy<'a>(
        &'a self,
        term: &[u8],
        max_distance: usize,
    ) -> impl Iterator<Item = TermId> + use<'a> {
        self.trie.fuzzy(term, max_distance).map(|(_, id)| *id)
    }

    /// Terms between two bounds, ascending.
    pub fn range(
        &self,
        lower: Bound<Vec<u8>>,
        upper: Bound<Vec<u8>>,
    ) -> impl Iterator<Item = TermId> + '_ {
        self.trie.range(lower, upper).map(|(_, id)| *id)
    }

    /// Remove postings of deleted documents and drop terms left empty.
    ///
    /// Term ids are reassigned when any term is dropped.
    pub fn compact<F: Fn(DocId) -> bool>(&mut self, is_deleted: F) -> CompactionStats {
        let mut stats = CompactionStats::default();
        for list in &mut self.postings {
            stats.postings_removed += list.retain_live(&is_deleted);
        }

        if self.postings.iter().all(|list| !list.is_empty()) {
            return stats;
        }

        let terms = std::mem::take(&mut self.terms);
        let postings = std::mem::take(&mut self.postings);
        self.trie = Trie::new();
        for (term, list) in terms.into_iter().zip(postings) {
            if list.is_empty() {
                stats.terms_removed += 1;
                continue;
            }
            let id = TermId(self.postings.len() as u32);
            self.trie.insert(&term, id);
            self.postings.push(list);
            self.terms.push(term);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::posting::ALL_FIELDS;

    fn doc_ids(dict: &TermDictionary, id: TermId) -> Vec<DocId> {
        dict.postings(id)
            .unwrap()
            .iter()
            .map(|p| p.doc_id)
            .collect()
    }

    #[test]
    fn test_add_and_lookup() {
        let mut dict = TermDictionary::new();
        let hello = dict.add(b"hello", Posting::new(1, 1));
        assert_eq!(dict.add(b"hello", Posting::new(2, 1)), hello);
        let help = dict.add(b"help", Posting::new(2, 1));
        assert_ne!(hello, help);

        assert_eq!(dict.len(), 2);
        assert_eq!(dict.posting_count(), 3);
        assert_eq!(dict.lookup(b"hello"), Some(hello));
        assert_eq!(dict.lookup(b"hel"), None);
        assert_eq!(dict.term(help), Some(&b"help"[..]));
        assert_eq!(doc_ids(&dict, hello), vec![1, 2]);
    }

    #[test]
    fn test_expansions() {
        let mut dict = TermDictionary::new();
        for (doc_id, term) in ["apple", "apply", "ape", "banana"].iter().enumerate() {
            dict.add(term.as_bytes(), Posting::new(doc_id as DocId + 1, 1));
        }

        let terms: Vec<&[u8]> = dict.prefix(b"app").filter_map(|id| dict.term(id)).collect();
        assert_eq!(terms, vec![&b"apple"[..], &b"apply"[..]]);

        assert_eq!(dict.fuzzy(b"appla", 1).count(), 2);
        let range: Vec<&[u8]> = dict
            .range(Bound::Included(b"apq".to_vec()), Bound::Unbounded)
            .filter_map(|id| dict.term(id))
            .collect();
        assert_eq!(range, vec![&b"banana"[..]]);
    }

    #[test]
    fn test_compact_reassigns_ids() {
        let mut dict = TermDictionary::new();
        dict.add(b"gone", Posting::new(1, 1));
        dict.add(b"kept", Posting::new(1, 1));
        dict.add(b"kept", Posting::new(2, 1));

        let stats = dict.compact(|doc_id| doc_id == 1);
        assert_eq!(
            stats,
            CompactionStats {
                postings_removed: 2,
                terms_removed: 1
            }
        );
        assert_eq!(dict.lookup(b"gone"), None);
        let kept = dict.lookup(b"kept").unwrap();
        assert_eq!(doc_ids(&dict, kept), vec![2]);
        assert_eq!(dict.postings(kept).unwrap().page(0, ALL_FIELDS, 10).len(), 1);
    }
}
