//! Read access to index state for one yield step of an iterator.

use crate::index::dictionary::TermDictionary;
use crate::index::index::IndexState;
use crate::index::numeric::NumericRangeTree;
use crate::index::posting::DocId;

/// The dictionary a term handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TermSource {
    Text,
    Phonetic,
    /// The tag dictionary of the field with this ordinal.
    Tag(usize),
}

/// A borrowed view of the index, valid while the read lock is held.
pub(crate) struct ReadContext<'a> {
    state: &'a IndexState,
    /// Postings or ids copied per page.
    pub(crate) page_size: usize,
}

impl<'a> ReadContext<'a> {
    pub(crate) fn new(state: &'a IndexState) -> Self {
        ReadContext {
            state,
            page_size: state.config.page_size.max(1),
        }
    }

    pub(crate) fn dictionary(&self, source: TermSource) -> Option<&'a TermDictionary> {
        match source {
            TermSource::Text => Some(&self.state.text),
            TermSource::Phonetic => Some(&self.state.phonetic),
            TermSource::Tag(ordinal) => self.state.tags.get(&ordinal).map(|tags| tags.values()),
        }
    }

    pub(crate) fn numeric(&self, ordinal: usize) -> Option<&'a NumericRangeTree> {
        self.state.numeric.get(&ordinal)
    }

    pub(crate) fn is_deleted(&self, doc_id: DocId) -> bool {
        self.state.docs.is_deleted(doc_id)
    }

    /// Up to one page of live ids at or after `from`.
    pub(crate) fn live_ids_from(&self, from: DocId) -> Vec<DocId> {
        self.state.docs.live_ids_from(from, self.page_size)
    }
}
