//! Matchers: the executable form of a query tree.
//!
//! A matcher walks a virtual sequence of ascending document ids. Leaf
//! matchers keep a cursor and a page of entries copied out of the index, never
//! a reference into it, so they survive the lock being released between
//! steps. After a generation change the owning iterator calls
//! [`Matcher::revalidate`] so cached handles are looked up again.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::fmt::Debug;

use crate::error::{QuarryError, Result};
use crate::index::dictionary::TermId;
use crate::index::numeric::{LeafId, NumericFilter};
use crate::index::posting::{DocId, FieldMask, Posting};
use crate::query::context::{ReadContext, TermSource};

/// Trait for matchers that iterate over matching documents.
pub(crate) trait Matcher: Send + Debug {
    /// The current document, `None` before the first step and once
    /// exhausted.
    fn doc_id(&self) -> Option<DocId>;

    /// Advance to the next matching document.
    fn next(&mut self, ctx: &ReadContext<'_>) -> Result<Option<DocId>>;

    /// Advance to the first matching document at or after `target`. Stays
    /// put if already there.
    fn skip_to(&mut self, ctx: &ReadContext<'_>, target: DocId) -> Result<Option<DocId>>;

    /// Estimated number of documents this matcher yields.
    fn cost(&self) -> u64;

    fn is_exhausted(&self) -> bool;

    /// Look up cached index handles again after the index changed.
    fn revalidate(&mut self, ctx: &ReadContext<'_>) -> Result<()>;

    /// Token positions of the current document, ascending.
    fn positions(&self) -> Vec<u32> {
        Vec::new()
    }
}

/// A cursor over pages of entries copied from the index.
#[derive(Debug)]
struct PageCursor<T> {
    page: VecDeque<T>,
    /// Next document id to fetch from.
    cursor: DocId,
    exhausted: bool,
}

impl<T> PageCursor<T> {
    fn new() -> Self {
        PageCursor {
            page: VecDeque::new(),
            cursor: 0,
            exhausted: false,
        }
    }

    /// Pop the first live entry at or after `target`, fetching further pages
    /// from the cursor as needed.
    fn advance<D, F>(&mut self, ctx: &ReadContext<'_>, target: DocId, doc_of: D, mut fetch: F) -> Option<T>
    where
        D: Fn(&T) -> DocId,
        F: FnMut(DocId) -> Vec<T>,
    {
        if self.exhausted {
            return None;
        }
        loop {
            while let Some(entry) = self.page.pop_front() {
                let doc_id = doc_of(&entry);
                self.cursor = doc_id + 1;
                if doc_id >= target && !ctx.is_deleted(doc_id) {
                    return Some(entry);
                }
            }
            self.cursor = self.cursor.max(target);
            let page = fetch(self.cursor);
            if page.is_empty() {
                self.exhausted = true;
                return None;
            }
            self.page.extend(page);
        }
    }
}

/// Matches the postings of one term of one dictionary.
#[derive(Debug)]
pub(crate) struct TermMatcher {
    source: TermSource,
    term: Vec<u8>,
    /// Handle valid for the generation the matcher last saw.
    term_id: Option<TermId>,
    mask: FieldMask,
    pages: PageCursor<Posting>,
    current: Option<Posting>,
    cost: u64,
}

impl TermMatcher {
    pub(crate) fn new(source: TermSource, term: Vec<u8>, term_id: TermId, mask: FieldMask, cost: u64) -> Self {
        TermMatcher {
            source,
            term,
            term_id: Some(term_id),
            mask,
            pages: PageCursor::new(),
            current: None,
            cost,
        }
    }

    fn advance(&mut self, ctx: &ReadContext<'_>, target: DocId) -> Option<DocId> {
        let (source, term_id, mask, limit) = (self.source, self.term_id, self.mask, ctx.page_size);
        self.current = self.pages.advance(
            ctx,
            target,
            |posting| posting.doc_id,
            |from| {
                term_id
                    .and_then(|id| ctx.dictionary(source)?.postings(id))
                    .map(|list| list.page(from, mask, limit))
                    .unwrap_or_default()
            },
        );
        self.doc_id()
    }
}

impl Matcher for TermMatcher {
    fn doc_id(&self) -> Option<DocId> {
        self.current.as_ref().map(|posting| posting.doc_id)
    }

    fn next(&mut self, ctx: &ReadContext<'_>) -> Result<Option<DocId>> {
        let target = self.pages.cursor;
        Ok(self.advance(ctx, target))
    }

    fn skip_to(&mut self, ctx: &ReadContext<'_>, target: DocId) -> Result<Option<DocId>> {
        match self.doc_id() {
            Some(doc_id) if doc_id >= target => Ok(Some(doc_id)),
            _ if self.pages.exhausted => Ok(None),
            _ => Ok(self.advance(ctx, target)),
        }
    }

    fn cost(&self) -> u64 {
        self.cost
    }

    fn is_exhausted(&self) -> bool {
        self.pages.exhausted
    }

    fn revalidate(&mut self, ctx: &ReadContext<'_>) -> Result<()> {
        self.term_id = ctx
            .dictionary(self.source)
            .and_then(|dict| dict.lookup(&self.term));
        Ok(())
    }

    fn positions(&self) -> Vec<u32> {
        self.current
            .as_ref()
            .map(|posting| posting.positions_in(self.mask))
            .unwrap_or_default()
    }
}

/// Matches documents with a value of one numeric field inside a filter.
#[derive(Debug)]
pub(crate) struct NumericRangeMatcher {
    ordinal: usize,
    filter: NumericFilter,
    /// Candidate leaves for the generation the matcher last saw.
    leaves: Vec<LeafId>,
    pages: PageCursor<DocId>,
    current: Option<DocId>,
    cost: u64,
}

impl NumericRangeMatcher {
    pub(crate) fn new(ordinal: usize, filter: NumericFilter, leaves: Vec<LeafId>, cost: u64) -> Self {
        NumericRangeMatcher {
            ordinal,
            filter,
            leaves,
            pages: PageCursor::new(),
            current: None,
            cost,
        }
    }

    fn advance(&mut self, ctx: &ReadContext<'_>, target: DocId) -> Option<DocId> {
        let (ordinal, limit) = (self.ordinal, ctx.page_size);
        let (leaves, filter) = (&self.leaves, &self.filter);
        self.current = self.pages.advance(
            ctx,
            target,
            |doc_id| *doc_id,
            |from| {
                ctx.numeric(ordinal)
                    .map(|tree| tree.collect_page(leaves, filter, from, limit))
                    .unwrap_or_default()
            },
        );
        self.current
    }
}

impl Matcher for NumericRangeMatcher {
    fn doc_id(&self) -> Option<DocId> {
        self.current
    }

    fn next(&mut self, ctx: &ReadContext<'_>) -> Result<Option<DocId>> {
        let target = self.pages.cursor;
        Ok(self.advance(ctx, target))
    }

    fn skip_to(&mut self, ctx: &ReadContext<'_>, target: DocId) -> Result<Option<DocId>> {
        match self.current {
            Some(doc_id) if doc_id >= target => Ok(Some(doc_id)),
            _ if self.pages.exhausted => Ok(None),
            _ => Ok(self.advance(ctx, target)),
        }
    }

    fn cost(&self) -> u64 {
        self.cost
    }

    fn is_exhausted(&self) -> bool {
        self.pages.exhausted
    }

    fn revalidate(&mut self, ctx: &ReadContext<'_>) -> Result<()> {
        self.leaves = ctx
            .numeric(self.ordinal)
            .map(|tree| tree.find(&self.filter))
            .unwrap_or_default();
        Ok(())
    }
}

/// Matches every live document, in id order.
#[derive(Debug)]
pub(crate) struct AllMatcher {
    pages: PageCursor<DocId>,
    current: Option<DocId>,
    cost: u64,
}

impl AllMatcher {
    pub(crate) fn new(cost: u64) -> Self {
        AllMatcher {
            pages: PageCursor::new(),
            current: None,
            cost,
        }
    }

    fn advance(&mut self, ctx: &ReadContext<'_>, target: DocId) -> Option<DocId> {
        self.current = self
            .pages
            .advance(ctx, target, |doc_id| *doc_id, |from| ctx.live_ids_from(from));
        self.current
    }
}

impl Matcher for AllMatcher {
    fn doc_id(&self) -> Option<DocId> {
        self.current
    }

    fn next(&mut self, ctx: &ReadContext<'_>) -> Result<Option<DocId>> {
        let target = self.pages.cursor;
        Ok(self.advance(ctx, target))
    }

    fn skip_to(&mut self, ctx: &ReadContext<'_>, target: DocId) -> Result<Option<DocId>> {
        match self.current {
            Some(doc_id) if doc_id >= target => Ok(Some(doc_id)),
            _ if self.pages.exhausted => Ok(None),
            _ => Ok(self.advance(ctx, target)),
        }
    }

    fn cost(&self) -> u64 {
        self.cost
    }

    fn is_exhausted(&self) -> bool {
        self.pages.exhausted
    }

    fn revalidate(&mut self, _ctx: &ReadContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// A helper struct for tracking matchers in the disjunction heap.
#[derive(Debug)]
struct MatcherEntry {
    matcher: Box<dyn Matcher>,
}

impl MatcherEntry {
    fn key(&self) -> DocId {
        self.matcher.doc_id().unwrap_or(DocId::MAX)
    }
}

impl PartialEq for MatcherEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for MatcherEntry {}

impl PartialOrd for MatcherEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MatcherEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: lower doc IDs come first
        other.key().cmp(&self.key())
    }
}

/// A matcher that implements disjunction (OR) of multiple matchers.
///
/// Every id is yielded once, however many children sit on it.
#[derive(Debug)]
pub(crate) struct DisjunctionMatcher {
    /// Children not yet positioned.
    pending: Vec<Box<dyn Matcher>>,
    /// Min-heap of positioned, non-exhausted children.
    heap: BinaryHeap<MatcherEntry>,
    current: Option<DocId>,
    exhausted: bool,
    cost: u64,
}

impl DisjunctionMatcher {
    pub(crate) fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        let cost = matchers.iter().map(|m| m.cost()).sum();
        DisjunctionMatcher {
            pending: matchers,
            heap: BinaryHeap::new(),
            current: None,
            exhausted: false,
            cost,
        }
    }

    fn start(&mut self, ctx: &ReadContext<'_>, target: DocId) -> Result<()> {
        for mut matcher in self.pending.drain(..) {
            if matcher.skip_to(ctx, target)?.is_some() {
                self.heap.push(MatcherEntry { matcher });
            }
        }
        Ok(())
    }

    fn settle(&mut self) -> Option<DocId> {
        self.current = self.heap.peek().and_then(|entry| entry.matcher.doc_id());
        if self.current.is_none() {
            self.exhausted = true;
        }
        self.current
    }

    fn started(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Matcher for DisjunctionMatcher {
    fn doc_id(&self) -> Option<DocId> {
        self.current
    }

    fn next(&mut self, ctx: &ReadContext<'_>) -> Result<Option<DocId>> {
        if self.exhausted {
            return Ok(None);
        }
        let Some(current) = self.current.filter(|_| self.started()) else {
            self.start(ctx, 0)?;
            return Ok(self.settle());
        };

        // Advance all matchers that are at the current document
        let mut reinsert = Vec::new();
        while self.heap.peek().is_some_and(|entry| entry.key() == current) {
            let Some(mut entry) = self.heap.pop() else {
                break;
            };
            match entry.matcher.next(ctx)? {
                Some(doc_id) if doc_id <= current => {
                    return Err(QuarryError::internal(format!(
                        "Matcher moved from {current} back to {doc_id}"
                    )));
                }
                Some(_) => reinsert.push(entry),
                None => {}
            }
        }
        self.heap.extend(reinsert);
        Ok(self.settle())
    }

    fn skip_to(&mut self, ctx: &ReadContext<'_>, target: DocId) -> Result<Option<DocId>> {
        if self.exhausted {
            return Ok(None);
        }
        if let Some(current) = self.current.filter(|&doc_id| doc_id >= target) {
            return Ok(Some(current));
        }
        if !self.started() {
            self.start(ctx, target)?;
            return Ok(self.settle());
        }

        let mut reinsert = Vec::new();
        while self.heap.peek().is_some_and(|entry| entry.key() < target) {
            let Some(mut entry) = self.heap.pop() else {
                break;
            };
            if entry.matcher.skip_to(ctx, target)?.is_some() {
                reinsert.push(entry);
            }
        }
        self.heap.extend(reinsert);
        Ok(self.settle())
    }

    fn cost(&self) -> u64 {
        self.cost
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn revalidate(&mut self, ctx: &ReadContext<'_>) -> Result<()> {
        for matcher in &mut self.pending {
            matcher.revalidate(ctx)?;
        }
        let mut entries = std::mem::take(&mut self.heap).into_vec();
        for entry in &mut entries {
            entry.matcher.revalidate(ctx)?;
        }
        self.heap = BinaryHeap::from(entries);
        Ok(())
    }

    fn positions(&self) -> Vec<u32> {
        let mut positions: Vec<u32> = self
            .heap
            .iter()
            .filter(|entry| entry.matcher.doc_id().is_some() && entry.matcher.doc_id() == self.current)
            .flat_map(|entry| entry.matcher.positions())
            .collect();
        positions.sort_unstable();
        positions.dedup();
        positions
    }
}

/// A matcher that implements conjunction (AND) of multiple matchers with a
/// leapfrog search. In exact mode the children are phrase tokens in order and
/// must occur at consecutive positions.
#[derive(Debug)]
pub(crate) struct ConjunctionMatcher {
    matchers: Vec<Box<dyn Matcher>>,
    exact: bool,
    current: Option<DocId>,
    exhausted: bool,
    cost: u64,
}

impl ConjunctionMatcher {
    pub(crate) fn new(mut matchers: Vec<Box<dyn Matcher>>, exact: bool) -> Self {
        let cost = matchers.iter().map(|m| m.cost()).min().unwrap_or(0);
        if !exact {
            // Cheapest child leads the search.
            matchers.sort_by_key(|m| m.cost());
        }
        ConjunctionMatcher {
            exhausted: matchers.is_empty(),
            matchers,
            exact,
            current: None,
            cost,
        }
    }

    /// Find the first document at or after `target` every child agrees on.
    fn align(&mut self, ctx: &ReadContext<'_>, mut target: DocId) -> Result<Option<DocId>> {
        'search: loop {
            for matcher in &mut self.matchers {
                match matcher.skip_to(ctx, target)? {
                    None => {
                        self.exhausted = true;
                        self.current = None;
                        return Ok(None);
                    }
                    Some(doc_id) if doc_id < target => {
                        return Err(QuarryError::internal(format!(
                            "Matcher skipped to {doc_id} before target {target}"
                        )));
                    }
                    Some(doc_id) if doc_id > target => {
                        target = doc_id;
                        continue 'search;
                    }
                    Some(_) => {}
                }
            }
            if self.exact && !self.phrase_matches() {
                target += 1;
                continue;
            }
            self.current = Some(target);
            return Ok(self.current);
        }
    }

    fn phrase_matches(&self) -> bool {
        let positions: Vec<Vec<u32>> = self.matchers.iter().map(|m| m.positions()).collect();
        let Some((first, rest)) = positions.split_first() else {
            return false;
        };
        first.iter().any(|&start| {
            rest.iter().enumerate().all(|(i, later)| {
                start
                    .checked_add(i as u32 + 1)
                    .is_some_and(|pos| later.binary_search(&pos).is_ok())
            })
        })
    }
}

impl Matcher for ConjunctionMatcher {
    fn doc_id(&self) -> Option<DocId> {
        self.current
    }

    fn next(&mut self, ctx: &ReadContext<'_>) -> Result<Option<DocId>> {
        if self.exhausted {
            return Ok(None);
        }
        let target = self.current.map_or(0, |doc_id| doc_id + 1);
        self.align(ctx, target)
    }

    fn skip_to(&mut self, ctx: &ReadContext<'_>, target: DocId) -> Result<Option<DocId>> {
        if self.exhausted {
            return Ok(None);
        }
        match self.current {
            Some(doc_id) if doc_id >= target => Ok(Some(doc_id)),
            _ => self.align(ctx, target),
        }
    }

    fn cost(&self) -> u64 {
        self.cost
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn revalidate(&mut self, ctx: &ReadContext<'_>) -> Result<()> {
        for matcher in &mut self.matchers {
            matcher.revalidate(ctx)?;
        }
        Ok(())
    }

    fn positions(&self) -> Vec<u32> {
        let mut positions: Vec<u32> = self.matchers.iter().flat_map(|m| m.positions()).collect();
        positions.sort_unstable();
        positions.dedup();
        positions
    }
}

/// Yields live documents the child does not match.
#[derive(Debug)]
pub(crate) struct NotMatcher {
    universe: AllMatcher,
    child: Box<dyn Matcher>,
    current: Option<DocId>,
}

impl NotMatcher {
    pub(crate) fn new(universe: AllMatcher, child: Box<dyn Matcher>) -> Self {
        NotMatcher {
            universe,
            child,
            current: None,
        }
    }

    fn find(&mut self, ctx: &ReadContext<'_>, target: DocId) -> Result<Option<DocId>> {
        let mut candidate = self.universe.skip_to(ctx, target)?;
        while let Some(doc_id) = candidate {
            if self.child.skip_to(ctx, doc_id)? != Some(doc_id) {
                break;
            }
            candidate = self.universe.next(ctx)?;
        }
        self.current = candidate;
        Ok(candidate)
    }
}

impl Matcher for NotMatcher {
    fn doc_id(&self) -> Option<DocId> {
        self.current
    }

    fn next(&mut self, ctx: &ReadContext<'_>) -> Result<Option<DocId>> {
        if self.universe.is_exhausted() {
            return Ok(None);
        }
        let target = self.current.map_or(0, |doc_id| doc_id + 1);
        self.find(ctx, target)
    }

    fn skip_to(&mut self, ctx: &ReadContext<'_>, target: DocId) -> Result<Option<DocId>> {
        match self.current {
            Some(doc_id) if doc_id >= target => Ok(Some(doc_id)),
            _ if self.universe.is_exhausted() => Ok(None),
            _ => self.find(ctx, target),
        }
    }

    fn cost(&self) -> u64 {
        self.universe.cost()
    }

    fn is_exhausted(&self) -> bool {
        self.universe.is_exhausted()
    }

    fn revalidate(&mut self, ctx: &ReadContext<'_>) -> Result<()> {
        self.child.revalidate(ctx)
    }
}
