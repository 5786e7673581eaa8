//! NumericRangeTree - range-partitioned index over numeric field values.
//!
//! Values are bucketed into leaf ranges. Each leaf owns its entries sorted by
//! document id and splits at its median once it holds more distinct values
//! than the configured cardinality. Inner nodes route by split value (left
//! holds values below it) and are kept height-balanced with AVL rotations.
//!
//! Nodes live in an arena so that readers can cache [`LeafId`]s for one index
//! generation and look them up again on every page.

use log::trace;

use crate::index::posting::DocId;

/// Bounds of a numeric range query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericFilter {
    pub min: f64,
    pub max: f64,
    pub min_exclusive: bool,
    pub max_exclusive: bool,
}

impl NumericFilter {
    /// Create a filter; infinite bounds are allowed.
    pub fn new(min: f64, max: f64, min_exclusive: bool, max_exclusive: bool) -> Self {
        NumericFilter {
            min,
            max,
            min_exclusive,
            max_exclusive,
        }
    }

    /// A filter with both bounds inclusive.
    pub fn inclusive(min: f64, max: f64) -> Self {
        NumericFilter::new(min, max, false, false)
    }

    /// Check if a value satisfies both bounds.
    pub fn matches(&self, value: f64) -> bool {
        let above = if self.min_exclusive {
            value > self.min
        } else {
            value >= self.min
        };
        let below = if self.max_exclusive {
            value < self.max
        } else {
            value <= self.max
        };
        above && below
    }

    /// Whether no value can ever satisfy the filter.
    pub fn is_empty(&self) -> bool {
        self.min.is_nan()
            || self.max.is_nan()
            || self.min > self.max
            || (self.min == self.max && (self.min_exclusive || self.max_exclusive))
    }

    /// Whether some value in `[lo, hi]` can satisfy the filter.
    pub fn overlaps(&self, lo: f64, hi: f64) -> bool {
        let reaches_min = if self.min_exclusive {
            hi > self.min
        } else {
            hi >= self.min
        };
        let reaches_max = if self.max_exclusive {
            lo < self.max
        } else {
            lo <= self.max
        };
        reaches_min && reaches_max
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct NumericEntry {
    doc_id: DocId,
    value: f64,
}

/// A leaf bucket of numeric entries.
#[derive(Debug, Clone, Default)]
pub struct NumericRange {
    /// Entries sorted by document id.
    entries: Vec<NumericEntry>,
    /// Sorted distinct values.
    distinct: Vec<f64>,
}

impl NumericRange {
    fn add(&mut self, doc_id: DocId, value: f64) {
        let entry = NumericEntry { doc_id, value };
        match self.entries.last() {
            Some(last) if last.doc_id > doc_id => {
                let pos = self.entries.partition_point(|e| e.doc_id <= doc_id);
                self.entries.insert(pos, entry);
            }
            _ => self.entries.push(entry),
        }
        if let Err(pos) = self.distinct.binary_search_by(|v| v.total_cmp(&value)) {
            self.distinct.insert(pos, value);
        }
    }

    /// Number of distinct values.
    pub fn cardinality(&self) -> usize {
        self.distinct.len()
    }

    /// Smallest value, if any.
    pub fn min(&self) -> Option<f64> {
        self.distinct.first().copied()
    }

    /// Largest value, if any.
    pub fn max(&self) -> Option<f64> {
        self.distinct.last().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn overlaps(&self, filter: &NumericFilter) -> bool {
        match (self.min(), self.max()) {
            (Some(lo), Some(hi)) => filter.overlaps(lo, hi),
            _ => false,
        }
    }

    /// Whether every value of the range satisfies the filter.
    fn is_contained(&self, filter: &NumericFilter) -> bool {
        match (self.min(), self.max()) {
            (Some(lo), Some(hi)) => filter.matches(lo) && filter.matches(hi),
            _ => false,
        }
    }

    /// Append up to `limit` distinct matching document ids at or after `from`.
    fn collect_from(&self, filter: &NumericFilter, from: DocId, limit: usize, out: &mut Vec<DocId>) {
        let contained = self.is_contained(filter);
        let start = self.entries.partition_point(|e| e.doc_id < from);
        let mut last = None;
        let mut taken = 0;
        for entry in &self.entries[start..] {
            if taken == limit {
                break;
            }
            if last == Some(entry.doc_id) || !(contained || filter.matches(entry.value)) {
                continue;
            }
            last = Some(entry.doc_id);
            out.push(entry.doc_id);
            taken += 1;
        }
    }

    fn retain_live<F: Fn(DocId) -> bool>(&mut self, is_deleted: F) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !is_deleted(e.doc_id));
        let removed = before - self.entries.len();
        if removed > 0 {
            let mut distinct: Vec<f64> = self.entries.iter().map(|e| e.value).collect();
            distinct.sort_by(f64::total_cmp);
            distinct.dedup();
            self.distinct = distinct;
        }
        removed
    }

    /// Split at the median distinct value; values below it go left.
    fn split(self) -> Result<(f64, NumericRange, NumericRange), NumericRange> {
        if self.distinct.len() < 2 {
            return Err(self);
        }
        let median = self.distinct[self.distinct.len() / 2];
        let mut left = NumericRange::default();
        let mut right = NumericRange::default();
        for entry in self.entries {
            if entry.value < median {
                left.add(entry.doc_id, entry.value);
            } else {
                right.add(entry.doc_id, entry.value);
            }
        }
        Ok((median, left, right))
    }
}

/// Handle of a leaf inside one tree generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeafId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Leaf(NumericRange),
    Inner {
        split: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct TreeNode {
    kind: NodeKind,
    height: u32,
}

/// A self-balancing binary tree of numeric ranges.
#[derive(Debug, Clone)]
pub struct NumericRangeTree {
    nodes: Vec<TreeNode>,
    root: usize,
    split_cardinality: usize,
    num_leaves: usize,
    num_entries: usize,
}

impl NumericRangeTree {
    /// Create an empty tree whose leaves split above `split_cardinality`
    /// distinct values.
    pub fn new(split_cardinality: usize) -> Self {
        NumericRangeTree {
            nodes: vec![TreeNode {
                kind: NodeKind::Leaf(NumericRange::default()),
                height: 1,
            }],
            root: 0,
            split_cardinality: split_cardinality.max(2),
            num_leaves: 1,
            num_entries: 0,
        }
    }

    /// Returns the number of leaf ranges.
    pub fn num_leaves(&self) -> usize {
        self.num_leaves
    }

    /// Returns the total number of entries, including tombstoned ones.
    pub fn num_entries(&self) -> usize {
        self.num_entries
    }

    /// Height of the tree; a single leaf has height 1.
    pub fn depth(&self) -> u32 {
        self.nodes[self.root].height
    }

    /// Adds a value for a document.
    pub fn add(&mut self, doc_id: DocId, value: f64) {
        self.root = self.insert(self.root, doc_id, value);
        self.num_entries += 1;
    }

    fn insert(&mut self, id: usize, doc_id: DocId, value: f64) -> usize {
        let (child, go_left) = match &mut self.nodes[id].kind {
            NodeKind::Leaf(range) => {
                range.add(doc_id, value);
                if range.cardinality() > self.split_cardinality {
                    return self.split_leaf(id);
                }
                return id;
            }
            NodeKind::Inner { split, left, right } => {
                if value < *split {
                    (*left, true)
                } else {
                    (*right, false)
                }
            }
        };

        let new_child = self.insert(child, doc_id, value);
        if let Some((left, right)) = self.children(id) {
            if go_left {
                self.set_children(id, new_child, right);
            } else {
                self.set_children(id, left, new_child);
            }
        }
        self.update_height(id);
        self.rebalance(id)
    }

    fn split_leaf(&mut self, id: usize) -> usize {
        let range = match &mut self.nodes[id].kind {
            NodeKind::Leaf(range) => std::mem::take(range),
            NodeKind::Inner { .. } => return id,
        };
        match range.split() {
            Ok((split, left, right)) => {
                trace!(
                    "Splitting numeric range at {split} ({} | {} entries)",
                    left.len(),
                    right.len()
                );
                let left = self.push_leaf(left);
                let right = self.push_leaf(right);
                self.nodes[id] = TreeNode {
                    kind: NodeKind::Inner { split, left, right },
                    height: 2,
                };
                self.num_leaves += 1;
            }
            Err(range) => self.nodes[id].kind = NodeKind::Leaf(range),
        }
        id
    }

    fn push_leaf(&mut self, range: NumericRange) -> usize {
        self.nodes.push(TreeNode {
            kind: NodeKind::Leaf(range),
            height: 1,
        });
        self.nodes.len() - 1
    }

    fn children(&self, id: usize) -> Option<(usize, usize)> {
        match self.nodes[id].kind {
            NodeKind::Inner { left, right, .. } => Some((left, right)),
            NodeKind::Leaf(_) => None,
        }
    }

    fn set_children(&mut self, id: usize, new_left: usize, new_right: usize) {
        if let NodeKind::Inner { left, right, .. } = &mut self.nodes[id].kind {
            *left = new_left;
            *right = new_right;
        }
    }

    fn height(&self, id: usize) -> u32 {
        self.nodes[id].height
    }

    fn update_height(&mut self, id: usize) {
        if let Some((left, right)) = self.children(id) {
            self.nodes[id].height = 1 + self.height(left).max(self.height(right));
        }
    }

    fn rotate_right(&mut self, id: usize) -> usize {
        let Some((pivot, right)) = self.children(id) else {
            return id;
        };
        let Some((pivot_left, pivot_right)) = self.children(pivot) else {
            return id;
        };
        self.set_children(id, pivot_right, right);
        self.update_height(id);
        self.set_children(pivot, pivot_left, id);
        self.update_height(pivot);
        pivot
    }

    fn rotate_left(&mut self, id: usize) -> usize {
        let Some((left, pivot)) = self.children(id) else {
            return id;
        };
        let Some((pivot_left, pivot_right)) = self.children(pivot) else {
            return id;
        };
        self.set_children(id, left, pivot_left);
        self.update_height(id);
        self.set_children(pivot, id, pivot_right);
        self.update_height(pivot);
        pivot
    }

    fn rebalance(&mut self, id: usize) -> usize {
        let Some((left, right)) = self.children(id) else {
            return id;
        };
        let balance = i64::from(self.height(left)) - i64::from(self.height(right));
        if balance > 1 {
            if let Some((ll, lr)) = self.children(left)
                && self.height(lr) > self.height(ll)
            {
                let new_left = self.rotate_left(left);
                self.set_children(id, new_left, right);
            }
            return self.rotate_right(id);
        }
        if balance < -1 {
            if let Some((rl, rr)) = self.children(right)
                && self.height(rl) > self.height(rr)
            {
                let new_right = self.rotate_right(right);
                self.set_children(id, left, new_right);
            }
            return self.rotate_left(id);
        }
        id
    }

    /// Finds the leaves that may hold values matching the filter, in
    /// ascending value order.
    pub fn find(&self, filter: &NumericFilter) -> Vec<LeafId> {
        let mut result = Vec::new();
        if filter.is_empty() {
            return result;
        }
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            match &self.nodes[id].kind {
                NodeKind::Leaf(range) => {
                    if range.overlaps(filter) {
                        result.push(LeafId(id));
                    }
                }
                NodeKind::Inner { split, left, right } => {
                    if filter.max >= *split {
                        stack.push(*right);
                    }
                    if filter.min < *split {
                        stack.push(*left);
                    }
                }
            }
        }
        result
    }

    /// Get a leaf range by handle.
    pub fn leaf(&self, id: LeafId) -> Option<&NumericRange> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Leaf(range) => Some(range),
            NodeKind::Inner { .. } => None,
        }
    }

    /// The smallest `limit` distinct document ids at or after `from` whose
    /// value in one of `leaves` matches the filter, ascending.
    pub fn collect_page(
        &self,
        leaves: &[LeafId],
        filter: &NumericFilter,
        from: DocId,
        limit: usize,
    ) -> Vec<DocId> {
        let mut ids = Vec::new();
        for &leaf in leaves {
            if let Some(range) = self.leaf(leaf) {
                range.collect_from(filter, from, limit, &mut ids);
            }
        }
        ids.sort_unstable();
        ids.dedup();
        ids.truncate(limit);
        ids
    }

    /// Remove entries of deleted documents. The tree is rebuilt when more
    /// than half of its leaves end up empty. Returns the number of entries
    /// removed.
    pub fn compact<F: Fn(DocId) -> bool>(&mut self, is_deleted: F) -> usize {
        let mut removed = 0;
        let mut empty_leaves = 0;
        for node in &mut self.nodes {
            if let NodeKind::Leaf(range) = &mut node.kind {
                removed += range.retain_live(&is_deleted);
                if range.is_empty() {
                    empty_leaves += 1;
                }
            }
        }
        self.num_entries -= removed;

        if removed > 0 && empty_leaves * 2 > self.num_leaves {
            self.rebuild();
        }
        removed
    }

    fn rebuild(&mut self) {
        let mut entries: Vec<NumericEntry> = Vec::with_capacity(self.num_entries);
        for node in self.nodes.drain(..) {
            if let NodeKind::Leaf(range) = node.kind {
                entries.extend(range.entries);
            }
        }
        entries.sort_by_key(|e| e.doc_id);

        trace!("Rebuilding numeric tree with {} entries", entries.len());
        *self = NumericRangeTree::new(self.split_cardinality);
        for entry in entries {
            self.add(entry.doc_id, entry.value);
        }
    }
}
