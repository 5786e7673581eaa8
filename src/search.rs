//! Collected searches on top of results iterators.
//!
//! [`Index::search`] drains a results iterator into a page of hits. Without a
//! sort field hits keep their internal id order; with one they are ordered by
//! the value lookup of [`Index::field_value`], documents without a value last.
//!
//! ```
//! use quarry::document::Document;
//! use quarry::index::Index;
//! use quarry::schema::{FieldOptions, TypeFlags};
//! use quarry::search::SearchRequest;
//!
//! let index = Index::create("items", None);
//! index.create_field("body", TypeFlags::FULLTEXT, FieldOptions::NONE).unwrap();
//! index
//!     .create_field("price", TypeFlags::NUMERIC | TypeFlags::SORTABLE, FieldOptions::NONE)
//!     .unwrap();
//! for (id, price) in [("a", 30.0), ("b", 10.0), ("c", 20.0)] {
//!     let doc = Document::builder(id)
//!         .add_text("body", "red shoe")
//!         .add_number("price", price)
//!         .build();
//!     index.add_document(doc).unwrap();
//! }
//!
//! let request = SearchRequest::new("shoe").sort_by_field_asc("price").limit(2);
//! let results = index.search(&request).unwrap();
//! assert_eq!(results.total, 3);
//! let ids: Vec<_> = results.hits.iter().map(|h| h.external_id.clone()).collect();
//! assert_eq!(ids, vec![b"b".to_vec(), b"c".to_vec()]);
//! ```

use std::cmp::Ordering;

use log::debug;

use crate::document::FieldValue;
use crate::error::Result;
use crate::index::Index;
use crate::query::{Hit, QueryNode, QueryOptions};

/// Sort order for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending order (lowest to highest).
    Asc,
    /// Descending order (highest to lowest).
    Desc,
}

/// What search results are ordered by.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SortField {
    /// Ascending internal id, the order iterators produce.
    #[default]
    DocId,
    /// Default document score, highest first.
    Score,
    /// A document field value.
    Field {
        /// Field name to sort by.
        name: String,
        /// Sort order.
        order: SortOrder,
    },
}

/// The query of a search request.
#[derive(Debug, Clone, PartialEq)]
pub enum QuerySource {
    /// A query string, parsed at search time.
    Text(String),
    /// A prebuilt query tree.
    Node(QueryNode),
}

impl From<&str> for QuerySource {
    fn from(query: &str) -> Self {
        QuerySource::Text(query.to_string())
    }
}

impl From<String> for QuerySource {
    fn from(query: String) -> Self {
        QuerySource::Text(query)
    }
}

impl From<QueryNode> for QuerySource {
    fn from(node: QueryNode) -> Self {
        QuerySource::Node(node)
    }
}

/// Search request containing a query and paging parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// The query to execute.
    pub query: QuerySource,
    /// Options applied while compiling the query.
    pub options: QueryOptions,
    /// Result ordering.
    pub sort_by: SortField,
    /// Number of leading hits to skip.
    pub offset: usize,
    /// Maximum number of hits to return.
    pub limit: usize,
}

impl SearchRequest {
    /// Create a request returning the first ten hits in id order.
    pub fn new<Q: Into<QuerySource>>(query: Q) -> Self {
        SearchRequest {
            query: query.into(),
            options: QueryOptions::default(),
            sort_by: SortField::default(),
            offset: 0,
            limit: 10,
        }
    }

    /// Set the compile options.
    pub fn options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sort results by a field in ascending order.
    pub fn sort_by_field_asc(mut self, field: &str) -> Self {
        self.sort_by = SortField::Field {
            name: field.to_string(),
            order: SortOrder::Asc,
        };
        self
    }

    /// Sort results by a field in descending order.
    pub fn sort_by_field_desc(mut self, field: &str) -> Self {
        self.sort_by = SortField::Field {
            name: field.to_string(),
            order: SortOrder::Desc,
        };
        self
    }

    /// Sort results by default score.
    pub fn sort_by_score(mut self) -> Self {
        self.sort_by = SortField::Score;
        self
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    /// Number of matching documents before paging.
    pub total: usize,
    /// The requested page.
    pub hits: Vec<Hit>,
}

impl Index {
    /// Run a request and collect one page of hits.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResults> {
        let iterator = match &request.query {
            QuerySource::Text(query) => self.iterate_query(query, Some(&request.options))?,
            QuerySource::Node(node) => self.get_results_iterator_with(node, &request.options)?,
        };
        let Some(iterator) = iterator else {
            return Ok(SearchResults::default());
        };

        let mut hits = iterator.collect::<Result<Vec<Hit>>>()?;
        let total = hits.len();
        match &request.sort_by {
            SortField::DocId => {}
            SortField::Score => {
                hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.doc_id.cmp(&b.doc_id)));
            }
            SortField::Field { name, order } => {
                let mut keyed = Vec::with_capacity(hits.len());
                for hit in hits {
                    keyed.push((self.field_value(hit.doc_id, name)?, hit));
                }
                keyed.sort_by(|(a, hit_a), (b, hit_b)| {
                    compare_values(a.as_ref(), b.as_ref(), *order)
                        .then(hit_a.doc_id.cmp(&hit_b.doc_id))
                });
                hits = keyed.into_iter().map(|(_, hit)| hit).collect();
            }
        }

        let hits: Vec<Hit> = hits
            .into_iter()
            .skip(request.offset)
            .take(request.limit)
            .collect();
        debug!(
            "Index '{}': search matched {total}, returning {}",
            self.name(),
            hits.len()
        );
        Ok(SearchResults { total, hits })
    }
}

/// Missing values sort last in either order.
fn compare_values(a: Option<&FieldValue>, b: Option<&FieldValue>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match order {
            SortOrder::Asc => a.sort_cmp(b),
            SortOrder::Desc => b.sort_cmp(a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::document::Document;
    use crate::index::ValueResolver;
    use crate::schema::{FieldOptions, TypeFlags};

    fn index(resolver: Option<Arc<dyn ValueResolver>>) -> Index {
        let index = Index::create("search", resolver);
        index
            .create_field("body", TypeFlags::FULLTEXT, FieldOptions::NONE)
            .unwrap();
        index
            .create_field("rank", TypeFlags::NUMERIC, FieldOptions::NONE)
            .unwrap();
        index
    }

    fn external_ids(results: &SearchResults) -> Vec<&[u8]> {
        results.hits.iter().map(|h| h.external_id.as_slice()).collect()
    }

    #[test]
    fn test_paging_in_id_order() {
        let index = index(None);
        for i in 0..5 {
            index
                .add_document(Document::builder(format!("d{i}")).add_text("body", "word").build())
                .unwrap();
        }
        let results = index
            .search(&SearchRequest::new("word").offset(1).limit(2))
            .unwrap();
        assert_eq!(results.total, 5);
        assert_eq!(external_ids(&results), vec![b"d1".as_slice(), b"d2"]);
    }

    #[test]
    fn test_no_match_is_empty() {
        let index = index(None);
        let results = index.search(&SearchRequest::new("missing")).unwrap();
        assert_eq!(results, SearchResults::default());
        let results = index.search(&SearchRequest::new("")).unwrap();
        assert_eq!(results.total, 0);
    }

    #[test]
    fn test_sort_by_score_and_resolved_field() {
        // Not sortable, so values come from the resolver; "b" has none.
        let resolver = |field: &str, _doc: u64, external_id: &[u8]| {
            assert_eq!(field, "rank");
            match external_id {
                b"a" => Some(FieldValue::Numeric(2.0)),
                b"c" => Some(FieldValue::Numeric(1.0)),
                _ => None,
            }
        };
        let index = index(Some(Arc::new(resolver)));
        for (id, score) in [("a", 0.5), ("b", 0.9), ("c", 0.1)] {
            let doc = Document::builder(id).add_text("body", "x").score(score).build();
            index.add_document(doc).unwrap();
        }

        let node = QueryNode::token(Some("body"), "x");
        let by_score = index
            .search(&SearchRequest::new(node.clone()).sort_by_score())
            .unwrap();
        assert_eq!(external_ids(&by_score), vec![b"b".as_slice(), b"a", b"c"]);

        let asc = index
            .search(&SearchRequest::new(node.clone()).sort_by_field_asc("rank"))
            .unwrap();
        assert_eq!(external_ids(&asc), vec![b"c".as_slice(), b"a", b"b"]);

        let desc = index
            .search(&SearchRequest::new(node).sort_by_field_desc("rank"))
            .unwrap();
        assert_eq!(external_ids(&desc), vec![b"a".as_slice(), b"c", b"b"]);
    }
}
