//! Field schema of an index.
//!
//! A [`Schema`] maps case-sensitive field names to [`FieldSpec`]s. Each spec
//! carries the set of [`TypeFlags`] the field is indexed as and its
//! [`FieldOptions`]. The type set of a field can only grow.

pub mod field;
#[allow(clippy::module_inception)]
pub mod schema;

pub use field::{FieldOptions, FieldSpec, TypeFlags};
pub use schema::Schema;
