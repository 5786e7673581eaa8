//! Results iterators.
//!
//! A [`ResultsIterator`] owns a compiled matcher tree and a handle to its
//! index. Each step is a yield point: it takes the read lock, revalidates the
//! matchers if the index generation moved, pulls one document and releases
//! the lock again. Ids come out strictly ascending; a violation aborts this
//! iterator only.

use std::fmt;
use std::iter::FusedIterator;

use log::{debug, trace, warn};

use crate::document::FieldValue;
use crate::error::{QuarryError, Result};
use crate::index::Index;
use crate::index::posting::DocId;
use crate::query::context::ReadContext;
use crate::query::matcher::Matcher;

/// One matching document.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// Internal document id.
    pub doc_id: DocId,
    /// Caller supplied document id.
    pub external_id: Vec<u8>,
    /// Default score the document was added with.
    pub score: f64,
}

/// A lazy, forward-only sequence of matching documents.
pub struct ResultsIterator {
    index: Index,
    root: Box<dyn Matcher>,
    /// Generation the matchers were last validated against.
    generation: u64,
    last: Option<DocId>,
    current: Option<DocId>,
    exhausted: bool,
}

impl fmt::Debug for ResultsIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultsIterator")
            .field("index", &self.index.name())
            .field("generation", &self.generation)
            .field("current", &self.current)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

impl ResultsIterator {
    pub(crate) fn new(index: Index, root: Box<dyn Matcher>, generation: u64) -> Self {
        ResultsIterator {
            index,
            root,
            generation,
            last: None,
            current: None,
            exhausted: false,
        }
    }

    /// Pull the next matching document. Once `Ok(None)` is returned every
    /// further call returns it too.
    pub fn next_hit(&mut self) -> Result<Option<Hit>> {
        if self.exhausted {
            return Ok(None);
        }
        if self.index.is_dropped() {
            debug!("Iterator over dropped index '{}' ends", self.index.name());
            self.finish();
            return Ok(None);
        }

        let index = self.index.clone();
        let state = index.read_state();
        let ctx = ReadContext::new(&state);
        let generation = index.generation();
        if generation != self.generation {
            trace!(
                "Revalidating iterator over '{}': generation {} -> {generation}",
                self.index.name(),
                self.generation
            );
            if let Err(e) = self.root.revalidate(&ctx) {
                warn!("Aborting iterator over '{}': {e}", self.index.name());
                self.finish();
                return Err(e);
            }
            self.generation = generation;
        }

        loop {
            let next = match self.root.next(&ctx) {
                Ok(next) => next,
                Err(e) => {
                    warn!("Aborting iterator over '{}': {e}", self.index.name());
                    self.finish();
                    return Err(e);
                }
            };
            let Some(doc_id) = next else {
                self.finish();
                return Ok(None);
            };
            if let Some(last) = self.last.filter(|&last| doc_id <= last) {
                warn!(
                    "Aborting iterator over '{}': document {doc_id} after {last}",
                    self.index.name()
                );
                self.finish();
                return Err(QuarryError::internal(format!(
                    "Results out of order: {doc_id} after {last}"
                )));
            }
            self.last = Some(doc_id);

            // Dropped since the matchers looked at it.
            let Some(meta) = state.docs.meta(doc_id) else {
                continue;
            };
            self.current = Some(doc_id);
            return Ok(Some(Hit {
                doc_id,
                external_id: meta.external_id.clone(),
                score: meta.score,
            }));
        }
    }

    fn finish(&mut self) {
        self.exhausted = true;
        self.current = None;
    }

    /// Internal id of the last document returned.
    pub fn doc_id(&self) -> Option<DocId> {
        self.current
    }

    /// Value of `field` for the last document returned, from its sorting
    /// vector or the index's value resolver.
    pub fn current_value(&self, field: &str) -> Result<Option<FieldValue>> {
        match self.current {
            Some(doc_id) => self.index.field_value(doc_id, field),
            None => Ok(None),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// The index this iterator reads.
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Estimated number of matches, computed at compile time.
    pub fn cost(&self) -> u64 {
        self.root.cost()
    }

    /// Drain the remaining external ids.
    pub fn external_ids(self) -> Result<Vec<Vec<u8>>> {
        self.map(|hit| hit.map(|hit| hit.external_id)).collect()
    }
}

impl Iterator for ResultsIterator {
    type Item = Result<Hit>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_hit().transpose()
    }
}

impl FusedIterator for ResultsIterator {}
