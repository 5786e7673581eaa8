//! Compressed prefix tree over byte-string keys.
//!
//! Every edge carries a non-empty label and the children of a node are kept
//! sorted by the first byte of their label, so a pre-order walk visits keys in
//! ascending lexicographic order. The prefix, fuzzy and range iterators are
//! lazy: they keep an explicit stack of pending subtrees and only descend when
//! asked for the next key.

use std::ops::Bound;

use crate::util::levenshtein::LevenshteinRows;

#[derive(Debug, Clone)]
struct Node<V> {
    label: Vec<u8>,
    value: Option<V>,
    children: Vec<Node<V>>,
}

impl<V> Node<V> {
    fn root() -> Self {
        Node {
            label: Vec::new(),
            value: None,
            children: Vec::new(),
        }
    }

    fn leaf(label: Vec<u8>, value: V) -> Self {
        Node {
            label,
            value: Some(value),
            children: Vec::new(),
        }
    }

    fn child_index(&self, byte: u8) -> Result<usize, usize> {
        self.children.binary_search_by(|c| c.label[0].cmp(&byte))
    }

    fn child(&self, byte: u8) -> Option<&Node<V>> {
        self.child_index(byte).ok().map(|i| &self.children[i])
    }
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// A compressed trie mapping byte strings to values.
#[derive(Debug, Clone)]
pub struct Trie<V> {
    root: Node<V>,
    len: usize,
}

impl<V> Default for Trie<V> {
    fn default() -> Self {
        Trie::new()
    }
}

impl<V> Trie<V> {
    /// Create an empty trie.
    pub fn new() -> Self {
        Trie {
            root: Node::root(),
            len: 0,
        }
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a value, returning the previous value of the key.
    pub fn insert(&mut self, key: &[u8], value: V) -> Option<V> {
        let previous = Self::insert_at(&mut self.root, key, value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    fn insert_at(node: &mut Node<V>, key: &[u8], value: V) -> Option<V> {
        if key.is_empty() {
            return node.value.replace(value);
        }
        match node.child_index(key[0]) {
            Err(pos) => {
                node.children.insert(pos, Node::leaf(key.to_vec(), value));
                None
            }
            Ok(pos) => {
                let child = &mut node.children[pos];
                Self::split_edge(child, key);
                let common = child.label.len();
                Self::insert_at(child, &key[common..], value)
            }
        }
    }

    /// Get the value of a key.
    pub fn get(&self, key: &[u8]) -> Option<&V> {
        let mut node = &self.root;
        let mut rest = key;
        while !rest.is_empty() {
            let child = node.child(rest[0])?;
            rest = rest.strip_prefix(child.label.as_slice())?;
            node = child;
        }
        node.value.as_ref()
    }

    /// Get the value of a key, inserting one built by `f` if absent.
    pub fn get_or_insert_with<F: FnOnce() -> V>(&mut self, key: &[u8], f: F) -> &mut V {
        let mut inserted = false;
        let value = Self::entry_at(&mut self.root, key, f, &mut inserted);
        if inserted {
            self.len += 1;
        }
        value
    }

    fn entry_at<'a, F: FnOnce() -> V>(
        node: &'a mut Node<V>,
        key: &[u8],
        f: F,
        inserted: &mut bool,
    ) -> &'a mut V {
        if key.is_empty() {
            if node.value.is_none() {
                *inserted = true;
            }
            return node.value.get_or_insert_with(f);
        }
        match node.child_index(key[0]) {
            Err(pos) => {
                node.children.insert(
                    pos,
                    Node {
                        label: key.to_vec(),
                        value: None,
                        children: Vec::new(),
                    },
                );
                Self::entry_at(&mut node.children[pos], &[], f, inserted)
            }
            Ok(pos) => {
                let child = &mut node.children[pos];
                Self::split_edge(child, key);
                let common = child.label.len();
                Self::entry_at(child, &key[common..], f, inserted)
            }
        }
    }

    /// Shorten `child`'s edge to its common prefix with `key`, pushing the
    /// rest of the edge one level down.
    fn split_edge(child: &mut Node<V>, key: &[u8]) {
        let common = common_prefix_len(&child.label, key);
        if common < child.label.len() {
            let tail = Node {
                label: child.label.split_off(common),
                value: child.value.take(),
                children: std::mem::take(&mut child.children),
            };
            child.children.push(tail);
        }
    }

    /// Get a mutable reference to the value of a key.
    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut V> {
        Self::find_mut(&mut self.root, key).and_then(|node| node.value.as_mut())
    }

    fn find_mut<'a>(node: &'a mut Node<V>, key: &[u8]) -> Option<&'a mut Node<V>> {
        if key.is_empty() {
            return Some(node);
        }
        let pos = node.child_index(key[0]).ok()?;
        let child = &mut node.children[pos];
        let rest = key.strip_prefix(child.label.as_slice())?;
        Self::find_mut(child, rest)
    }

    /// Remove a key, merging nodes left with a single child.
    pub fn remove(&mut self, key: &[u8]) -> Option<V> {
        let removed = Self::remove_at(&mut self.root, key);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    fn remove_at(node: &mut Node<V>, key: &[u8]) -> Option<V> {
        if key.is_empty() {
            return node.value.take();
        }
        let pos = node.child_index(key[0]).ok()?;
        let child = &mut node.children[pos];
        let rest = key.strip_prefix(child.label.as_slice())?;
        let removed = Self::remove_at(child, rest)?;

        if child.value.is_none() {
            match child.children.len() {
                0 => {
                    node.children.remove(pos);
                }
                1 => {
                    if let Some(only) = child.children.pop() {
                        child.label.extend_from_slice(&only.label);
                        child.value = only.value;
                        child.children = only.children;
                    }
                }
                _ => {}
            }
        }
        Some(removed)
    }

    /// Remove every key whose value fails `keep`. Returns the number removed.
    pub fn retain<F: FnMut(&[u8], &mut V) -> bool>(&mut self, mut keep: F) -> usize {
        let doomed: Vec<Vec<u8>> = {
            let mut doomed = Vec::new();
            let mut stack: Vec<(&mut Node<V>, Vec<u8>)> = vec![(&mut self.root, Vec::new())];
            while let Some((node, key)) = stack.pop() {
                if let Some(value) = node.value.as_mut()
                    && !keep(&key, value)
                {
                    doomed.push(key.clone());
                }
                for child in node.children.iter_mut() {
                    let mut child_key = key.clone();
                    child_key.extend_from_slice(&child.label);
                    stack.push((child, child_key));
                }
            }
            doomed
        };
        for key in &doomed {
            self.remove(key);
        }
        doomed.len()
    }

    /// Iterate over every key in ascending order.
    pub fn iter(&self) -> PrefixIter<'_, V> {
        self.prefix(b"")
    }

    /// Iterate over the keys starting with `prefix`, in ascending order.
    pub fn prefix(&self, prefix: &[u8]) -> PrefixIter<'_, V> {
        let mut stack = Vec::new();
        let mut node = &self.root;
        let mut path = Vec::new();
        let mut rest = prefix;
        loop {
            if rest.is_empty() {
                stack.push((node, path));
                break;
            }
            let Some(child) = node.child(rest[0]) else {
                break;
            };
            if child.label.starts_with(rest) {
                // The prefix ends inside this edge.
                path.extend_from_slice(&child.label);
                stack.push((child, path));
                break;
            }
            match rest.strip_prefix(child.label.as_slice()) {
                Some(tail) => {
                    path.extend_from_slice(&child.label);
                    rest = tail;
                    node = child;
                }
                None => break,
            }
        }
        PrefixIter { stack }
    }

    /// Iterate over the keys within `max_distance` edits of `term`.
    pub fn fuzzy(&self, term: &[u8], max_distance: usize) -> FuzzyIter<'_, V> {
        let rows = LevenshteinRows::new(term);
        let start = rows.start();
        FuzzyIter {
            stack: vec![(&self.root, Vec::new(), start)],
            rows,
            max_distance,
        }
    }

    /// Iterate over the keys between two bounds, in ascending order.
    pub fn range(&self, lower: Bound<Vec<u8>>, upper: Bound<Vec<u8>>) -> RangeIter<'_, V> {
        RangeIter {
            stack: vec![(&self.root, Vec::new())],
            lower,
            upper,
            done: false,
        }
    }
}

/// Lazy ascending iterator over the keys below a prefix.
pub struct PrefixIter<'a, V> {
    stack: Vec<(&'a Node<V>, Vec<u8>)>,
}

impl<'a, V> Iterator for PrefixIter<'a, V> {
    type Item = (Vec<u8>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, key)) = self.stack.pop() {
            for child in node.children.iter().rev() {
                let mut child_key = key.clone();
                child_key.extend_from_slice(&child.label);
                self.stack.push((child, child_key));
            }
            if let Some(value) = &node.value {
                return Some((key, value));
            }
        }
        None
    }
}

/// Lazy iterator over the keys within an edit distance of a term.
///
/// Each pending subtree carries the Levenshtein row of its path, and a
/// subtree is dropped as soon as no extension of its path can match.
pub struct FuzzyIter<'a, V> {
    stack: Vec<(&'a Node<V>, Vec<u8>, Vec<usize>)>,
    rows: LevenshteinRows,
    max_distance: usize,
}

impl<'a, V> Iterator for FuzzyIter<'a, V> {
    type Item = (Vec<u8>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, key, row)) = self.stack.pop() {
            'children: for child in node.children.iter().rev() {
                let mut child_row = row.clone();
                for &byte in &child.label {
                    child_row = self.rows.step(&child_row, byte);
                    if !self.rows.can_match(&child_row, self.max_distance) {
                        continue 'children;
                    }
                }
                let mut child_key = key.clone();
                child_key.extend_from_slice(&child.label);
                self.stack.push((child, child_key, child_row));
            }
            if let Some(value) = &node.value
                && self.rows.is_match(&row, self.max_distance)
            {
                return Some((key, value));
            }
        }
        None
    }
}

/// Lazy ascending iterator over the keys between two bounds.
pub struct RangeIter<'a, V> {
    stack: Vec<(&'a Node<V>, Vec<u8>)>,
    lower: Bound<Vec<u8>>,
    upper: Bound<Vec<u8>>,
    done: bool,
}

impl<V> RangeIter<'_, V> {
    /// Whether a subtree whose keys all start with `path` can hold keys at
    /// or above the lower bound.
    fn reaches_lower(&self, path: &[u8]) -> bool {
        match &self.lower {
            Bound::Unbounded => true,
            Bound::Included(lo) | Bound::Excluded(lo) => {
                path >= lo.as_slice() || lo.starts_with(path)
            }
        }
    }

    fn above_lower(&self, key: &[u8]) -> bool {
        match &self.lower {
            Bound::Unbounded => true,
            Bound::Included(lo) => key >= lo.as_slice(),
            Bound::Excluded(lo) => key > lo.as_slice(),
        }
    }

    fn below_upper(&self, key: &[u8]) -> bool {
        match &self.upper {
            Bound::Unbounded => true,
            Bound::Included(hi) => key <= hi.as_slice(),
            Bound::Excluded(hi) => key < hi.as_slice(),
        }
    }

    /// Whether a subtree rooted at `path` is entirely past the upper bound.
    fn past_upper(&self, path: &[u8]) -> bool {
        match &self.upper {
            Bound::Unbounded => false,
            Bound::Included(hi) => path > hi.as_slice(),
            Bound::Excluded(hi) => path >= hi.as_slice(),
        }
    }
}

impl<'a, V> Iterator for RangeIter<'a, V> {
    type Item = (Vec<u8>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let Some((node, key)) = self.stack.pop() else {
                self.done = true;
                break;
            };
            if self.past_upper(&key) {
                // Pre-order is ascending, nothing after this can qualify.
                self.done = true;
                self.stack.clear();
                break;
            }
            for child in node.children.iter().rev() {
                let mut child_key = key.clone();
                child_key.extend_from_slice(&child.label);
                if self.reaches_lower(&child_key) {
                    self.stack.push((child, child_key));
                }
            }
            if let Some(value) = &node.value
                && self.above_lower(&key)
                && self.below_upper(&key)
            {
                return Some((key, value));
            }
        }
        None
    }
}
