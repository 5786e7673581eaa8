//! # Quarry
//!
//! An embeddable full-text and secondary-index search engine for Rust.
//!
//! ## Features
//!
//! - Typed fields: full-text (with optional phonetic matching), tag,
//!   numeric and sortable
//! - Term, prefix, fuzzy, lexicographic range, tag and numeric range queries
//! - Union, intersection, exact phrase and negation combinators
//! - Lazy results iterators that stay valid across concurrent mutation
//! - Tombstone deletion with automatic compaction
//! - A query string syntax on top of the query tree API
//!
//! ```
//! use quarry::document::Document;
//! use quarry::index::Index;
//! use quarry::schema::{FieldOptions, TypeFlags};
//!
//! let index = Index::create("idx", None);
//! index.create_field("ft1", TypeFlags::FULLTEXT, FieldOptions::NONE).unwrap();
//! for i in 0..3 {
//!     let doc = Document::builder(format!("doc{i}"))
//!         .add_text("ft1", format!("hello{i}"))
//!         .build();
//!     index.add_document(doc).unwrap();
//! }
//!
//! let ids = index
//!     .iterate_query("@ft1:hello*", None)
//!     .unwrap()
//!     .unwrap()
//!     .external_ids()
//!     .unwrap();
//! assert_eq!(ids.len(), 3);
//! ```

pub mod analysis;
pub mod document;
pub mod error;
pub mod index;
pub mod query;
pub mod schema;
pub mod search;
pub mod util;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
