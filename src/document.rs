//! Documents submitted for ingestion.
//!
//! A [`Document`] is transient: it carries an external id, a default score,
//! an optional payload and typed field values until the index decomposes it
//! into per-field entries.

#[allow(clippy::module_inception)]
pub mod document;
pub mod field_value;

pub use document::{Document, DocumentBuilder, DocumentField};
pub use field_value::FieldValue;
