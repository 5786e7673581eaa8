//! Tag indexes.
//!
//! A tag field stores whole values, not tokens. A document value is split on
//! the field's separator, each part is trimmed and (unless the field is case
//! sensitive) lowercased, and the document is posted under every resulting
//! tag in a dictionary private to the field.

use crate::index::dictionary::{CompactionStats, TermDictionary};
use crate::index::posting::{ALL_FIELDS, DocId, Posting};

/// The tag dictionary of one field.
#[derive(Debug, Clone)]
pub struct TagIndex {
    separator: char,
    case_sensitive: bool,
    values: TermDictionary,
}

impl TagIndex {
    /// Create an empty tag index.
    pub fn new(separator: char, case_sensitive: bool) -> Self {
        TagIndex {
            separator,
            case_sensitive,
            values: TermDictionary::new(),
        }
    }

    /// Split a raw value into normalized tags. Empty parts are dropped.
    pub fn split_values(&self, raw: &str) -> Vec<String> {
        let mut tags: Vec<String> = raw
            .split(self.separator)
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(|tag| self.normalize(tag))
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }

    /// Normalize a single tag or tag query term.
    pub fn normalize(&self, tag: &str) -> String {
        let tag = tag.trim();
        if self.case_sensitive {
            tag.to_string()
        } else {
            tag.to_lowercase()
        }
    }

    /// Post a document under the tags of a raw value. Returns the number of
    /// tags indexed.
    pub fn add(&mut self, doc_id: DocId, raw: &str) -> usize {
        let tags = self.split_values(raw);
        for tag in &tags {
            self.values.add(tag.as_bytes(), Posting::new(doc_id, ALL_FIELDS));
        }
        tags.len()
    }

    /// The dictionary of tag values.
    pub fn values(&self) -> &TermDictionary {
        &self.values
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Change how values indexed from now on are split and normalized.
    pub fn configure(&mut self, separator: char, case_sensitive: bool) {
        self.separator = separator;
        self.case_sensitive = case_sensitive;
    }

    /// Drop postings of deleted documents and tags left empty.
    pub fn compact<F: Fn(DocId) -> bool>(&mut self, is_deleted: F) -> CompactionStats {
        self.values.compact(is_deleted)
    }
}
