//! Text analysis for full-text fields.
//!
//! Text values are split into tokens by a [`tokenizer::Tokenizer`], passed
//! through [`token_filter::Filter`]s and collected by an
//! [`analyzer::Analyzer`]. The same analyzer normalises query terms so that
//! index-time and query-time tokens compare equal.
//!
//! Full-text fields declared with the phonetic option additionally index the
//! keys produced by [`phonetic::DoubleMetaphone`].

pub mod analyzer;
pub mod phonetic;
pub mod token;
pub mod token_filter;
pub mod tokenizer;
