//! The index: schema, per-field structures and the document table behind
//! one shared handle.
//!
//! An [`Index`] is a cheap cloneable handle. Every clone, and every live
//! [`ResultsIterator`], holds a strong reference to the same state; the
//! state is released when the last of them is dropped. Mutations take the
//! write lock and bump the generation counter so that iterators know to
//! revalidate their cached handles at their next yield point.
//!
//! ```
//! use quarry::document::Document;
//! use quarry::index::Index;
//! use quarry::query::node::QueryNode;
//! use quarry::schema::{FieldOptions, TypeFlags};
//!
//! let index = Index::create("books", None);
//! index.create_field("title", TypeFlags::FULLTEXT, FieldOptions::NONE).unwrap();
//!
//! let mut doc = Document::simple("book1");
//! doc.add_text("title", "The Rust Book", TypeFlags::FULLTEXT);
//! index.add_document(doc).unwrap();
//!
//! let hits: Vec<_> = index
//!     .get_results_iterator(&QueryNode::token(Some("title"), "rust"))
//!     .unwrap()
//!     .unwrap()
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(hits[0].external_id, b"book1");
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use ahash::{AHashMap, AHashSet};
use log::{debug, info, warn};
use parking_lot::{RwLock, RwLockReadGuard};

use crate::analysis::analyzer::{Analyzer, PipelineAnalyzer};
use crate::analysis::phonetic::DoubleMetaphone;
use crate::document::{Document, FieldValue};
use crate::error::{QuarryError, Result};
use crate::index::config::IndexConfig;
use crate::index::dictionary::{CompactionStats, TermDictionary};
use crate::index::doc_table::{DocMeta, DocTable};
use crate::index::numeric::NumericRangeTree;
use crate::index::posting::{DocId, Posting, TermPosition};
use crate::index::resolver::ValueResolver;
use crate::index::tag::TagIndex;
use crate::query::QueryOptions;
use crate::query::compiler::QueryCompiler;
use crate::query::matcher::Matcher;
use crate::query::node::QueryNode;
use crate::query::parser::QueryParser;
use crate::query::results::ResultsIterator;
use crate::schema::schema::Declaration;
use crate::schema::{FieldOptions, FieldSpec, Schema, TypeFlags};

/// Everything guarded by the index lock.
#[derive(Debug)]
pub(crate) struct IndexState {
    pub(crate) schema: Schema,
    pub(crate) docs: DocTable,
    /// Full-text terms of every text field; postings carry field masks.
    pub(crate) text: TermDictionary,
    /// Phonetic keys of text fields declared with the phonetic option.
    pub(crate) phonetic: TermDictionary,
    /// Tag dictionaries keyed by field ordinal.
    pub(crate) tags: AHashMap<usize, TagIndex>,
    /// Numeric trees keyed by field ordinal.
    pub(crate) numeric: AHashMap<usize, NumericRangeTree>,
    pub(crate) config: IndexConfig,
}

impl IndexState {
    pub(crate) fn new(config: IndexConfig) -> Self {
        IndexState {
            schema: Schema::new(),
            docs: DocTable::new(),
            text: TermDictionary::new(),
            phonetic: TermDictionary::new(),
            tags: AHashMap::new(),
            numeric: AHashMap::new(),
            config,
        }
    }

    /// Commit a validated document. Cannot fail.
    fn apply(&mut self, prepared: PreparedDocument) -> (DocId, Option<DocId>) {
        let PreparedDocument {
            external_id,
            score,
            payload,
            terms,
            phonetic,
            tags,
            numbers,
            sort_values,
        } = prepared;

        let replaced = self.docs.delete(&external_id);
        let doc_id = self.docs.allocate(DocMeta {
            external_id,
            score,
            payload,
            sort_values,
        });

        for (term, positions) in terms {
            self.text
                .add(term.as_bytes(), Posting::from_positions(doc_id, positions));
        }
        for (key, positions) in phonetic {
            self.phonetic
                .add(key.as_bytes(), Posting::from_positions(doc_id, positions));
        }
        for (ordinal, raw) in tags {
            if let Some(index) = self.tags.get_mut(&ordinal) {
                index.add(doc_id, &raw);
            }
        }
        for (ordinal, value) in numbers {
            if let Some(tree) = self.numeric.get_mut(&ordinal) {
                tree.add(doc_id, value);
            }
        }
        (doc_id, replaced)
    }

    fn compact(&mut self) -> CompactionReport {
        let docs = &self.docs;
        let is_deleted = |doc_id: DocId| docs.is_deleted(doc_id);

        let mut terms = self.text.compact(is_deleted);
        terms.merge(self.phonetic.compact(is_deleted));
        let mut tags = CompactionStats::default();
        for index in self.tags.values_mut() {
            tags.merge(index.compact(is_deleted));
        }
        let numeric_entries_removed = self
            .numeric
            .values_mut()
            .map(|tree| tree.compact(is_deleted))
            .sum();

        let report = CompactionReport {
            documents_reclaimed: self.docs.tombstones(),
            postings_removed: terms.postings_removed + tags.postings_removed,
            terms_removed: terms.terms_removed + tags.terms_removed,
            numeric_entries_removed,
        };
        self.docs.mark_compacted();
        report
    }

    fn needs_compaction(&self) -> bool {
        self.config.auto_compaction
            && self.docs.tombstones() > 0
            && self.docs.deletion_ratio() >= self.config.compaction_threshold
    }
}


/// A validated, analyzed document ready to be applied.
#[derive(Debug)]
struct PreparedDocument {
    external_id: Vec<u8>,
    score: f64,
    payload: Option<Vec<u8>>,
    terms: AHashMap<String, Vec<TermPosition>>,
    phonetic: AHashMap<String, Vec<TermPosition>>,
    tags: Vec<(usize, String)>,
    numbers: Vec<(usize, f64)>,
    sort_values: Vec<(usize, FieldValue)>,
}

/// What a compaction pass reclaimed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionReport {
    /// Dropped documents whose entries were physically removed.
    pub documents_reclaimed: usize,
    /// Postings removed from text, phonetic and tag dictionaries.
    pub postings_removed: usize,
    /// Terms and tag values left without postings.
    pub terms_removed: usize,
    /// Entries removed from numeric trees.
    pub numeric_entries_removed: usize,
}

/// Index statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStats {
    pub name: String,
    /// Live documents.
    pub num_docs: usize,
    /// Largest internal id handed out.
    pub max_doc_id: DocId,
    /// Dropped documents not yet compacted.
    pub tombstones: usize,
    pub num_fields: usize,
    /// Distinct full-text terms.
    pub num_terms: usize,
    /// Distinct phonetic keys.
    pub num_phonetic_keys: usize,
    /// Distinct tag values across all tag fields.
    pub num_tag_values: usize,
    pub numeric_leaves: usize,
    pub numeric_entries: usize,
    pub generation: u64,
    /// Strong references to the index: handles plus live iterators.
    pub handle_count: usize,
}

struct IndexInner {
    name: String,
    state: RwLock<IndexState>,
    /// Bumped on every structural mutation.
    generation: AtomicU64,
    dropped: AtomicBool,
    resolver: Option<Arc<dyn ValueResolver>>,
    analyzer: PipelineAnalyzer,
    encoder: DoubleMetaphone,
}

/// A shared handle to an index.
#[derive(Clone)]
pub struct Index {
    inner: Arc<IndexInner>,
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("name", &self.inner.name)
            .field("generation", &self.generation())
            .field("dropped", &self.is_dropped())
            .finish()
    }
}

impl Index {
    /// Create an index with the default configuration.
    pub fn create<S: Into<String>>(name: S, resolver: Option<Arc<dyn ValueResolver>>) -> Self {
        Index::build(name.into(), resolver, IndexConfig::default())
    }

    /// Create an index with a validated configuration.
    pub fn with_config<S: Into<String>>(
        name: S,
        resolver: Option<Arc<dyn ValueResolver>>,
        config: IndexConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Index::build(name.into(), resolver, config))
    }

    fn build(name: String, resolver: Option<Arc<dyn ValueResolver>>, config: IndexConfig) -> Self {
        info!("Creating index '{name}'");
        Index {
            inner: Arc::new(IndexInner {
                name,
                state: RwLock::new(IndexState::new(config)),
                generation: AtomicU64::new(0),
                dropped: AtomicBool::new(false),
                resolver,
                analyzer: PipelineAnalyzer::standard(),
                encoder: DoubleMetaphone::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current generation. Only changes under the write lock.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    pub fn is_dropped(&self) -> bool {
        self.inner.dropped.load(Ordering::Acquire)
    }

    /// The configuration the index was created with.
    pub fn config(&self) -> IndexConfig {
        self.inner.state.read().config.clone()
    }

    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, IndexState> {
        self.inner.state.read()
    }

    fn bump_generation(&self) {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_dropped() {
            return Err(QuarryError::index_not_found(self.inner.name.clone()));
        }
        Ok(())
    }

    /// Declare a field, or widen an existing one.
    ///
    /// Re-declaring a field with a subset of its types and options returns it
    /// unchanged; a superset widens it. Values indexed before a widening are
    /// not re-indexed.
    pub fn create_field(
        &self,
        name: &str,
        types: TypeFlags,
        options: FieldOptions,
    ) -> Result<FieldSpec> {
        self.ensure_live()?;
        let mut guard = self.inner.state.write();
        let state = &mut *guard;
        let (ordinal, declaration) = state.schema.declare(name, types, options)?;
        let spec = state
            .schema
            .field(ordinal)
            .cloned()
            .ok_or_else(|| QuarryError::internal(format!("Field '{name}' vanished")))?;

        if declaration != Declaration::Unchanged {
            if spec.is_tag() {
                state
                    .tags
                    .entry(ordinal)
                    .and_modify(|tags| {
                        tags.configure(spec.tag_separator(), spec.is_case_sensitive())
                    })
                    .or_insert_with(|| {
                        TagIndex::new(spec.tag_separator(), spec.is_case_sensitive())
                    });
            }
            if spec.is_numeric() {
                let cardinality = state.config.numeric_split_cardinality;
                state
                    .numeric
                    .entry(ordinal)
                    .or_insert_with(|| NumericRangeTree::new(cardinality));
            }
            self.bump_generation();
            debug!(
                "Index '{}': field '{name}' {declaration:?} as {:?}",
                self.inner.name,
                spec.types()
            );
        }
        Ok(spec)
    }

    /// Change the separator a tag field splits values on.
    pub fn set_tag_separator(&self, name: &str, separator: char) -> Result<()> {
        self.ensure_live()?;
        let mut guard = self.inner.state.write();
        let state = &mut *guard;
        let spec = state.schema.require(name)?;
        if !spec.is_tag() {
            return Err(QuarryError::type_mismatch(format!(
                "Field '{name}' is not a tag field"
            )));
        }
        let (ordinal, case_sensitive) = (spec.ordinal(), spec.is_case_sensitive());
        state.schema.set_tag_separator(name, separator)?;
        if let Some(tags) = state.tags.get_mut(&ordinal) {
            tags.configure(separator, case_sensitive);
        }
        self.bump_generation();
        Ok(())
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<FieldSpec> {
        self.inner.state.read().schema.get(name).cloned()
    }

    /// Commit a document and return its internal id.
    ///
    /// The document is validated and analyzed before anything is written, so
    /// a failing call leaves the index untouched. A live document with the
    /// same external id is replaced.
    pub fn add_document(&self, doc: Document) -> Result<DocId> {
        self.ensure_live()?;
        let mut state = self.inner.state.write();
        let prepared = self.prepare(&state, doc)?;
        let (doc_id, replaced) = state.apply(prepared);
        self.bump_generation();

        match replaced {
            Some(old) => debug!(
                "Index '{}': replaced document {old} with {doc_id}",
                self.inner.name
            ),
            None => debug!("Index '{}': added document {doc_id}", self.inner.name),
        }
        if replaced.is_some() {
            self.maybe_compact(&mut state);
        }
        Ok(doc_id)
    }

    /// Commit a batch of documents atomically.
    ///
    /// Fails with [`QuarryError::InvalidDocument`] if two documents share an
    /// external id; any failure leaves the index untouched.
    pub fn add_documents(&self, docs: Vec<Document>) -> Result<Vec<DocId>> {
        self.ensure_live()?;
        let mut seen = AHashSet::with_capacity(docs.len());
        for doc in &docs {
            if !seen.insert(doc.external_id().to_vec()) {
                return Err(QuarryError::invalid_document(format!(
                    "Duplicate external id '{}' in batch",
                    String::from_utf8_lossy(doc.external_id())
                )));
            }
        }

        let mut state = self.inner.state.write();
        let prepared = docs
            .into_iter()
            .map(|doc| self.prepare(&state, doc))
            .collect::<Result<Vec<_>>>()?;

        let mut ids = Vec::with_capacity(prepared.len());
        let mut replaced_any = false;
        for doc in prepared {
            let (doc_id, replaced) = state.apply(doc);
            replaced_any |= replaced.is_some();
            ids.push(doc_id);
        }
        self.bump_generation();
        debug!("Index '{}': added {} documents", self.inner.name, ids.len());
        if replaced_any {
            self.maybe_compact(&mut state);
        }
        Ok(ids)
    }

    fn prepare(&self, state: &IndexState, doc: Document) -> Result<PreparedDocument> {
        let (external_id, score, payload, fields) = doc.into_parts();
        if external_id.is_empty() {
            return Err(QuarryError::invalid_document(
                "Document external id cannot be empty",
            ));
        }

        let mut prepared = PreparedDocument {
            external_id,
            score,
            payload,
            terms: AHashMap::new(),
            phonetic: AHashMap::new(),
            tags: Vec::new(),
            numbers: Vec::new(),
            sort_values: Vec::new(),
        };
        let mut position = 0u32;

        for field in fields {
            let Some(spec) = state.schema.get(&field.name) else {
                warn!(
                    "Index '{}': skipping undeclared field '{}'",
                    self.inner.name, field.name
                );
                continue;
            };

            let explicit = field.types.indexing();
            if !spec.types().contains(explicit) {
                return Err(QuarryError::type_mismatch(format!(
                    "Field '{}' is declared as {:?} but the value was submitted as {:?}",
                    spec.name(),
                    spec.types(),
                    explicit
                )));
            }
            let types = if explicit.is_empty() {
                spec.types().indexing()
            } else {
                explicit
            };

            if types.contains(TypeFlags::FULLTEXT) {
                position = self.prepare_text(spec, &field.value, position, &mut prepared)?;
            }
            if types.contains(TypeFlags::TAG) {
                prepared.tags.push((spec.ordinal(), field.value.to_string()));
            }
            let number = field.value.as_numeric().filter(|n| !n.is_nan());
            if types.contains(TypeFlags::NUMERIC) {
                match number {
                    Some(n) => prepared.numbers.push((spec.ordinal(), n)),
                    None if !explicit.is_empty() || !field.value.is_text() => {
                        return Err(QuarryError::type_mismatch(format!(
                            "Value '{}' of field '{}' is not a number",
                            field.value,
                            spec.name()
                        )));
                    }
                    None => {}
                }
            }
            if spec.is_sortable() {
                let value = match number {
                    Some(n) if spec.is_numeric() => FieldValue::Numeric(n),
                    _ => field.value.clone(),
                };
                prepared.sort_values.retain(|(o, _)| *o != spec.ordinal());
                prepared.sort_values.push((spec.ordinal(), value));
            }
        }
        Ok(prepared)
    }

    /// Analyze one text value starting at token position `base`. Returns the
    /// base for the next field, leaving a gap so phrases never span fields.
    fn prepare_text(
        &self,
        spec: &FieldSpec,
        value: &FieldValue,
        base: u32,
        prepared: &mut PreparedDocument,
    ) -> Result<u32> {
        let text = value.to_string();
        let mask = spec.text_mask();
        let mut next = base;
        for token in self.inner.analyzer.analyze(&text)? {
            let position = TermPosition::new(base + token.position, mask);
            next = position.position + 2;
            if spec.is_phonetic() {
                for key in self.inner.encoder.encode(&token.text).distinct() {
                    prepared
                        .phonetic
                        .entry(key.to_string())
                        .or_default()
                        .push(position);
                }
            }
            prepared.terms.entry(token.text).or_default().push(position);
        }
        Ok(next)
    }

    /// Drop a document by external id. Returns whether it existed.
    pub fn drop_document(&self, external_id: &[u8]) -> Result<bool> {
        self.ensure_live()?;
        let mut state = self.inner.state.write();
        let Some(doc_id) = state.docs.delete(external_id) else {
            return Ok(false);
        };
        self.bump_generation();
        debug!("Index '{}': dropped document {doc_id}", self.inner.name);
        self.maybe_compact(&mut state);
        Ok(true)
    }

    fn maybe_compact(&self, state: &mut IndexState) {
        if state.needs_compaction() {
            let report = state.compact();
            self.bump_generation();
            info!("Index '{}': auto compaction {report:?}", self.inner.name);
        }
    }

    /// Physically remove the entries of dropped documents.
    pub fn compact(&self) -> Result<CompactionReport> {
        self.ensure_live()?;
        let mut state = self.inner.state.write();
        let report = state.compact();
        self.bump_generation();
        info!("Index '{}': compaction {report:?}", self.inner.name);
        Ok(report)
    }

    /// Release the index structures.
    ///
    /// Every handle observes the drop: further operations fail with
    /// [`QuarryError::IndexNotFound`] and live iterators report exhaustion.
    /// The shared allocation itself goes away with the last handle.
    pub fn drop_index(&self) {
        if self.inner.dropped.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut state = self.inner.state.write();
        let config = state.config.clone();
        *state = IndexState::new(config);
        self.bump_generation();
        info!("Dropped index '{}'", self.inner.name);
    }

    /// Value of `field` for a live document: the sorting vector first, then
    /// the value resolver. The resolver is called without holding the lock.
    pub fn field_value(&self, doc_id: DocId, field: &str) -> Result<Option<FieldValue>> {
        self.ensure_live()?;
        let external_id = {
            let state = self.inner.state.read();
            let spec = state.schema.require(field)?;
            let Some(meta) = state.docs.meta(doc_id) else {
                return Ok(None);
            };
            if let Some(value) = meta.sort_value(spec.ordinal()) {
                return Ok(Some(value.clone()));
            }
            meta.external_id.clone()
        };
        Ok(self
            .inner
            .resolver
            .as_ref()
            .and_then(|resolver| resolver.resolve(field, doc_id, &external_id)))
    }

    /// Internal id of a live document.
    pub fn doc_id(&self, external_id: &[u8]) -> Option<DocId> {
        self.inner.state.read().docs.lookup(external_id)
    }

    /// External id of a live document.
    pub fn external_id(&self, doc_id: DocId) -> Option<Vec<u8>> {
        self.inner
            .state
            .read()
            .docs
            .external_id(doc_id)
            .map(<[u8]>::to_vec)
    }

    /// Compile a query tree into an iterator.
    ///
    /// Returns `Ok(None)` when the tree cannot match anything against the
    /// current index contents.
    pub fn get_results_iterator(&self, node: &QueryNode) -> Result<Option<ResultsIterator>> {
        self.get_results_iterator_with(node, &QueryOptions::default())
    }

    /// Compile a query tree with options.
    pub fn get_results_iterator_with(
        &self,
        node: &QueryNode,
        options: &QueryOptions,
    ) -> Result<Option<ResultsIterator>> {
        self.ensure_live()?;
        let state = self.inner.state.read();
        let generation = self.generation();
        let compiler = QueryCompiler::new(&state, &self.inner.analyzer, &self.inner.encoder, options)?;
        match compiler.compile(node)? {
            Some(root) => {
                debug!(
                    "Index '{}': compiled {:?} query, cost {}",
                    self.inner.name,
                    node.kind(),
                    root.cost()
                );
                Ok(Some(ResultsIterator::new(self.clone(), root, generation)))
            }
            None => {
                debug!(
                    "Index '{}': {:?} query cannot match",
                    self.inner.name,
                    node.kind()
                );
                Ok(None)
            }
        }
    }

    /// Parse a query string and compile it.
    ///
    /// An empty query yields `Ok(None)`, as does a query that cannot match.
    pub fn iterate_query(
        &self,
        query: &str,
        options: Option<&QueryOptions>,
    ) -> Result<Option<ResultsIterator>> {
        self.ensure_live()?;
        let Some(node) = QueryParser::new().parse(query)? else {
            return Ok(None);
        };
        let defaults = QueryOptions::default();
        self.get_results_iterator_with(&node, options.unwrap_or(&defaults))
    }

    pub fn stats(&self) -> IndexStats {
        let state = self.inner.state.read();
        IndexStats {
            name: self.inner.name.clone(),
            num_docs: state.docs.len(),
            max_doc_id: state.docs.max_doc_id(),
            tombstones: state.docs.tombstones(),
            num_fields: state.schema.len(),
            num_terms: state.text.len(),
            num_phonetic_keys: state.phonetic.len(),
            num_tag_values: state.tags.values().map(|t| t.values().len()).sum(),
            numeric_leaves: state.numeric.values().map(NumericRangeTree::num_leaves).sum(),
            numeric_entries: state.numeric.values().map(NumericRangeTree::num_entries).sum(),
            generation: self.generation(),
            handle_count: Arc::strong_count(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn index() -> Index {
        let index = Index::create("test", None);
        index
            .create_field("title", TypeFlags::FULLTEXT, FieldOptions::NONE)
            .unwrap();
        index
            .create_field("tags", TypeFlags::TAG, FieldOptions::NONE)
            .unwrap();
        index
            .create_field("price", TypeFlags::NUMERIC | TypeFlags::SORTABLE, FieldOptions::NONE)
            .unwrap();
        index
    }

    fn doc(id: &str, title: &str, price: f64) -> Document {
        Document::builder(id)
            .add_text("title", title)
            .add_field("tags", FieldValue::from("a,b"), TypeFlags::TAG)
            .add_number("price", price)
            .build()
    }

    #[test]
    fn test_add_and_stats() {
        let index = index();
        assert_eq!(index.add_document(doc("d1", "hello world", 10.0)).unwrap(), 1);
        assert_eq!(index.add_document(doc("d2", "hello there", 20.0)).unwrap(), 2);

        let stats = index.stats();
        assert_eq!(stats.num_docs, 2);
        assert_eq!(stats.num_terms, 3);
        assert_eq!(stats.num_tag_values, 2);
        assert_eq!(stats.numeric_entries, 2);
        assert_eq!(stats.handle_count, 1);
        assert_eq!(index.doc_id(b"d2"), Some(2));
        assert_eq!(index.external_id(1), Some(b"d1".to_vec()));
    }

    #[test]
    fn test_type_mismatch_is_atomic() {
        let index = index();
        let bad = Document::builder("bad")
            .add_text("title", "partial")
            .add_field("title", FieldValue::from("x"), TypeFlags::NUMERIC)
            .build();
        let err = index.add_document(bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FieldTypeMismatch);

        let stats = index.stats();
        assert_eq!(stats.num_docs, 0);
        assert_eq!(stats.num_terms, 0);
        assert_eq!(stats.generation, 3);
    }

    #[test]
    fn test_non_numeric_value_rejected() {
        let index = index();
        let bad = Document::builder("bad")
            .add_field("price", FieldValue::from("cheap"), TypeFlags::NUMERIC)
            .build();
        assert_eq!(
            index.add_document(bad).unwrap_err().kind(),
            ErrorKind::FieldTypeMismatch
        );
        let nan = Document::builder("nan").add_number("price", f64::NAN).build();
        assert!(index.add_document(nan).is_err());
    }

    #[test]
    fn test_empty_and_duplicate_ids() {
        let index = index();
        let err = index.add_document(Document::simple("")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDocument);

        let err = index
            .add_documents(vec![doc("x", "a", 1.0), doc("x", "b", 2.0)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDocument);

        let err = index
            .add_documents(vec![doc("y", "a", 1.0), Document::simple("")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDocument);
        assert_eq!(index.stats().num_docs, 0);
    }

    #[test]
    fn test_replace_tombstones_old_id() {
        let index = Index::with_config(
            "replace",
            None,
            IndexConfig::builder().auto_compaction(false).build(),
        )
        .unwrap();
        index
            .create_field("title", TypeFlags::FULLTEXT, FieldOptions::NONE)
            .unwrap();
        index.add_document(doc("d1", "first", 1.0)).unwrap();
        assert_eq!(index.add_document(doc("d1", "second", 2.0)).unwrap(), 2);

        let stats = index.stats();
        assert_eq!(stats.num_docs, 1);
        assert_eq!(stats.tombstones, 1);
        assert_eq!(index.doc_id(b"d1"), Some(2));

        let report = index.compact().unwrap();
        assert_eq!(report.documents_reclaimed, 1);
        assert_eq!(report.terms_removed, 1);
        assert_eq!(index.stats().num_terms, 1);
    }

    #[test]
    fn test_field_value_lookup() {
        let resolver: Arc<dyn ValueResolver> =
            Arc::new(|field: &str, _doc_id: DocId, external_id: &[u8]| {
                Some(FieldValue::Text(format!(
                    "{field}:{}",
                    String::from_utf8_lossy(external_id)
                )))
            });
        let index = Index::create("values", Some(resolver));
        index
            .create_field("title", TypeFlags::FULLTEXT, FieldOptions::NONE)
            .unwrap();
        index
            .create_field("price", TypeFlags::NUMERIC | TypeFlags::SORTABLE, FieldOptions::NONE)
            .unwrap();
        let id = index
            .add_document(
                Document::builder("d1")
                    .add_text("title", "hi")
                    .add_text("price", "12.5")
                    .build(),
            )
            .unwrap();

        assert_eq!(
            index.field_value(id, "price").unwrap(),
            Some(FieldValue::Numeric(12.5))
        );
        assert_eq!(
            index.field_value(id, "title").unwrap(),
            Some(FieldValue::from("title:d1"))
        );
        assert_eq!(index.field_value(99, "title").unwrap(), None);
        assert_eq!(
            index.field_value(id, "nope").unwrap_err().kind(),
            ErrorKind::UnknownField
        );
    }

    #[test]
    fn test_redeclaration_policy() {
        let index = index();
        let before = index.generation();
        let spec = index
            .create_field("price", TypeFlags::NUMERIC, FieldOptions::NONE)
            .unwrap();
        assert!(spec.is_sortable());
        assert_eq!(index.generation(), before);

        let spec = index
            .create_field("tags", TypeFlags::TAG | TypeFlags::FULLTEXT, FieldOptions::NONE)
            .unwrap();
        assert!(spec.is_fulltext());
        assert!(index.generation() > before);

        let err = index
            .create_field("title", TypeFlags::NUMERIC, FieldOptions::NONE)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateField);
    }

    #[test]
    fn test_drop_index() {
        let index = index();
        let other = index.clone();
        index.add_document(doc("d1", "hello", 1.0)).unwrap();
        assert_eq!(index.stats().handle_count, 2);

        other.drop_index();
        assert!(index.is_dropped());
        let err = index.add_document(doc("d2", "x", 1.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexNotFound);
        assert_eq!(index.stats().num_docs, 0);
    }
}
