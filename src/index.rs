//! Index module for Quarry.
//!
//! An [`Index`] owns a schema, a document table and the per-field
//! structures documents are decomposed into: the term dictionary for
//! full-text and phonetic keys, one tag index per tag field and one numeric
//! range tree per numeric field.

pub mod config;
pub mod dictionary;
pub mod doc_table;
#[allow(clippy::module_inception)]
pub mod index;
pub mod numeric;
pub mod posting;
pub mod registry;
pub mod resolver;
pub mod tag;
pub mod trie;

pub use config::{IndexConfig, IndexConfigBuilder};
pub use index::{CompactionReport, Index, IndexStats};
pub use posting::DocId;
pub use registry::IndexRegistry;
pub use resolver::ValueResolver;
