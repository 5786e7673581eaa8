//! Query trees, their compilation and the iterators that walk the results.
//!
//! A query is either a string parsed by [`parser::QueryParser`] or a
//! [`node::QueryNode`] tree built by hand. Compiling it against an index
//! yields a [`results::ResultsIterator`] producing documents in ascending
//! internal id order.

pub(crate) mod compiler;
pub(crate) mod context;
pub(crate) mod matcher;
pub mod node;
pub mod parser;
pub mod results;

pub use compiler::QueryOptions;
pub use node::{NodeKind, QueryNode};
pub use parser::QueryParser;
pub use results::{Hit, ResultsIterator};
