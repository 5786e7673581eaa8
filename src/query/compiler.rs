//! Lowering of query trees into matcher trees.
//!
//! The compiler makes one bottom-up pass over a [`QueryNode`], resolving
//! fields against the schema and expanding prefix, fuzzy and range
//! predicates against the term dictionaries. A subtree that cannot match
//! anything compiles to `None`; the caller turns a `None` root into the null
//! iterator.

use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::Analyzer;
use crate::analysis::phonetic::DoubleMetaphone;
use crate::error::{QuarryError, Result};
use crate::index::dictionary::{TermDictionary, TermId};
use crate::index::index::IndexState;
use crate::index::numeric::NumericFilter;
use crate::index::posting::{ALL_FIELDS, FieldMask};
use crate::index::tag::TagIndex;
use crate::query::context::TermSource;
use crate::query::matcher::{
    AllMatcher, ConjunctionMatcher, DisjunctionMatcher, Matcher, NotMatcher, NumericRangeMatcher,
    TermMatcher,
};
use crate::query::node::QueryNode;
use crate::schema::FieldSpec;

/// Options applied when compiling a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Full-text fields searched by terms without a field scope. Empty means
    /// every full-text field.
    pub default_fields: Vec<String>,

    /// Overrides the index's limit on prefix, fuzzy and range expansions.
    pub max_prefix_expansions: Option<usize>,
}

impl QueryOptions {
    pub fn new() -> Self {
        QueryOptions::default()
    }

    /// Restrict unscoped terms to these fields.
    pub fn default_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_prefix_expansions(mut self, max: usize) -> Self {
        self.max_prefix_expansions = Some(max);
        self
    }
}

type Compiled = Option<Box<dyn Matcher>>;

/// Compiles query trees against one locked view of the index.
pub(crate) struct QueryCompiler<'a> {
    state: &'a IndexState,
    analyzer: &'a dyn Analyzer,
    encoder: &'a DoubleMetaphone,
    max_expansions: Option<usize>,
    /// Field mask of unscoped terms.
    default_mask: FieldMask,
}

impl<'a> QueryCompiler<'a> {
    pub(crate) fn new(
        state: &'a IndexState,
        analyzer: &'a dyn Analyzer,
        encoder: &'a DoubleMetaphone,
        options: &QueryOptions,
    ) -> Result<Self> {
        let mut default_mask = if options.default_fields.is_empty() {
            ALL_FIELDS
        } else {
            0
        };
        for name in &options.default_fields {
            default_mask |= fulltext_spec(state, name)?.text_mask();
        }
        Ok(QueryCompiler {
            state,
            analyzer,
            encoder,
            max_expansions: options
                .max_prefix_expansions
                .or(state.config.max_prefix_expansions),
            default_mask,
        })
    }

    pub(crate) fn compile(&self, node: &QueryNode) -> Result<Compiled> {
        match node {
            QueryNode::Token { field, term } => self.token(field.as_deref(), term),
            QueryNode::Prefix { field, prefix } => {
                let mask = self.text_mask(field.as_deref())?;
                let prefix = self.normalize_prefix(prefix, |term| self.analyzer.normalize(term))?;
                let ids = self.state.text.prefix(prefix.as_bytes());
                Ok(self.expand(TermSource::Text, &self.state.text, ids, mask))
            }
            QueryNode::Fuzzy {
                field,
                term,
                max_distance,
            } => {
                let mask = self.text_mask(field.as_deref())?;
                self.check_distance(*max_distance)?;
                let term = self.analyzer.normalize(term);
                let ids = self.state.text.fuzzy(term.as_bytes(), *max_distance as usize);
                Ok(self.expand(TermSource::Text, &self.state.text, ids, mask))
            }
            QueryNode::LexRange {
                field,
                lower,
                upper,
            } => {
                let mask = self.text_mask(field.as_deref())?;
                let normalize = |term: &str| self.analyzer.normalize(term);
                let ids = self
                    .state
                    .text
                    .range(to_bytes(lower, normalize), to_bytes(upper, normalize));
                Ok(self.expand(TermSource::Text, &self.state.text, ids, mask))
            }
            QueryNode::NumericRange { field, filter } => self.numeric(field, filter),
            QueryNode::Tag { field, child } => self.tag(field, child.as_deref()),
            QueryNode::Union(children) => {
                let mut matchers = Vec::with_capacity(children.len());
                for child in children {
                    matchers.extend(self.compile(child)?);
                }
                Ok(union_of(matchers))
            }
            QueryNode::Intersect { children, exact } => self.intersect(children, *exact),
            QueryNode::Not(child) => {
                let universe = self.universe();
                let compiled = match child {
                    Some(child) => self.compile(child)?,
                    None => None,
                };
                Ok(Some(match compiled {
                    Some(child) => Box::new(NotMatcher::new(universe, child)),
                    None => Box::new(universe),
                }))
            }
            QueryNode::Wildcard => Ok(Some(Box::new(self.universe()))),
        }
    }

    fn universe(&self) -> AllMatcher {
        AllMatcher::new(self.state.docs.len() as u64)
    }

    /// Field mask of a full-text predicate.
    fn text_mask(&self, field: Option<&str>) -> Result<FieldMask> {
        match field {
            Some(name) => Ok(fulltext_spec(self.state, name)?.text_mask()),
            None => Ok(self.default_mask),
        }
    }

    fn token(&self, field: Option<&str>, term: &str) -> Result<Compiled> {
        let mask = self.text_mask(field)?;
        let term = self.analyzer.normalize(term);
        if term.is_empty() {
            return Ok(None);
        }

        let mut matchers = Vec::new();
        if let Some(id) = self.state.text.lookup(term.as_bytes()) {
            matchers.extend(self.term_matcher(TermSource::Text, &self.state.text, id, mask));
        }
        let phonetic_mask = mask & self.state.schema.phonetic_mask();
        if phonetic_mask != 0 {
            for key in self.encoder.encode(&term).distinct() {
                if let Some(id) = self.state.phonetic.lookup(key.as_bytes()) {
                    matchers.extend(self.term_matcher(
                        TermSource::Phonetic,
                        &self.state.phonetic,
                        id,
                        phonetic_mask,
                    ));
                }
            }
        }
        Ok(union_of(matchers))
    }

    fn numeric(&self, field: &str, filter: &NumericFilter) -> Result<Compiled> {
        let spec = self.state.schema.require(field)?;
        if !spec.is_numeric() {
            return Err(QuarryError::type_mismatch(format!(
                "Numeric range on field '{field}' which is not numeric"
            )));
        }
        let Some(tree) = self.state.numeric.get(&spec.ordinal()) else {
            return Ok(None);
        };
        let leaves = tree.find(filter);
        if leaves.is_empty() {
            return Ok(None);
        }
        let cost = leaves
            .iter()
            .filter_map(|&leaf| tree.leaf(leaf))
            .map(|range| range.len() as u64)
            .sum();
        Ok(Some(Box::new(NumericRangeMatcher::new(
            spec.ordinal(),
            *filter,
            leaves,
            cost,
        ))))
    }

    fn tag(&self, field: &str, child: Option<&QueryNode>) -> Result<Compiled> {
        let spec = self.state.schema.require(field)?;
        if !spec.is_tag() {
            return Err(QuarryError::type_mismatch(format!(
                "Tag filter on field '{field}' which is not a tag field"
            )));
        }
        let Some(child) = child else {
            return Err(QuarryError::syntax(
                format!("Tag node on '{field}' has no predicate"),
                0,
            ));
        };
        let tags = self.state.tags.get(&spec.ordinal()).ok_or_else(|| {
            QuarryError::internal(format!("Tag field '{field}' has no tag index"))
        })?;
        self.tag_predicate(tags, spec.ordinal(), child)
    }

    /// Compile a tag predicate against one field's tag dictionary.
    fn tag_predicate(&self, tags: &TagIndex, ordinal: usize, node: &QueryNode) -> Result<Compiled> {
        let source = TermSource::Tag(ordinal);
        let dict = tags.values();
        match node {
            QueryNode::Token { term, .. } => Ok(dict
                .lookup(tags.normalize(term).as_bytes())
                .and_then(|id| self.term_matcher(source, dict, id, ALL_FIELDS))),
            QueryNode::Prefix { prefix, .. } => {
                let prefix = self.normalize_prefix(prefix, |tag| tags.normalize(tag))?;
                let ids = dict.prefix(prefix.as_bytes());
                Ok(self.expand(source, dict, ids, ALL_FIELDS))
            }
            QueryNode::Fuzzy {
                term, max_distance, ..
            } => {
                self.check_distance(*max_distance)?;
                let ids = dict.fuzzy(tags.normalize(term).as_bytes(), *max_distance as usize);
                Ok(self.expand(source, dict, ids, ALL_FIELDS))
            }
            QueryNode::LexRange { lower, upper, .. } => {
                let normalize = |tag: &str| tags.normalize(tag);
                let ids = dict.range(to_bytes(lower, normalize), to_bytes(upper, normalize));
                Ok(self.expand(source, dict, ids, ALL_FIELDS))
            }
            QueryNode::Union(children) => {
                let mut matchers = Vec::with_capacity(children.len());
                for child in children {
                    matchers.extend(self.tag_predicate(tags, ordinal, child)?);
                }
                Ok(union_of(matchers))
            }
            other => Err(QuarryError::syntax(
                format!("{:?} cannot be matched against tag values", other.kind()),
                0,
            )),
        }
    }

    fn intersect(&self, children: &[QueryNode], exact: bool) -> Result<Compiled> {
        let mut matchers = Vec::with_capacity(children.len());
        let mut empty = children.is_empty();
        for child in children {
            // Keep compiling so that errors in later children still surface.
            match self.compile(child)? {
                Some(matcher) => matchers.push(matcher),
                None => empty = true,
            }
        }
        if empty {
            return Ok(None);
        }
        if matchers.len() == 1 {
            return Ok(matchers.pop());
        }
        Ok(Some(Box::new(ConjunctionMatcher::new(matchers, exact))))
    }

    fn normalize_prefix<F: Fn(&str) -> String>(&self, prefix: &str, normalize: F) -> Result<String> {
        let prefix = normalize(prefix);
        let min = self.state.config.min_prefix_len;
        if prefix.chars().count() < min {
            return Err(QuarryError::invalid_argument(format!(
                "Prefix '{prefix}' is shorter than the minimum of {min}"
            )));
        }
        Ok(prefix)
    }

    fn check_distance(&self, max_distance: u8) -> Result<()> {
        let limit = self.state.config.max_fuzzy_distance;
        if max_distance == 0 || max_distance > limit {
            return Err(QuarryError::invalid_argument(format!(
                "Fuzzy distance {max_distance} must be between 1 and {limit}"
            )));
        }
        Ok(())
    }

    fn term_matcher(
        &self,
        source: TermSource,
        dict: &TermDictionary,
        id: TermId,
        mask: FieldMask,
    ) -> Option<Box<dyn Matcher>> {
        let list = dict.postings(id)?;
        if !list.has_field(mask) {
            return None;
        }
        let term = dict.term(id)?.to_vec();
        Some(Box::new(TermMatcher::new(
            source,
            term,
            id,
            mask,
            list.len() as u64,
        )))
    }

    /// Union of the matchers of expanded terms, up to the expansion limit.
    fn expand<I: Iterator<Item = TermId>>(
        &self,
        source: TermSource,
        dict: &TermDictionary,
        ids: I,
        mask: FieldMask,
    ) -> Compiled {
        let limit = self.max_expansions.unwrap_or(usize::MAX);
        let matchers = ids
            .filter_map(|id| self.term_matcher(source, dict, id, mask))
            .take(limit)
            .collect();
        union_of(matchers)
    }
}

fn fulltext_spec<'s>(state: &'s IndexState, name: &str) -> Result<&'s FieldSpec> {
    let spec = state.schema.require(name)?;
    if !spec.is_fulltext() {
        return Err(QuarryError::type_mismatch(format!(
            "Field '{name}' is not a full-text field"
        )));
    }
    Ok(spec)
}

fn to_bytes<F: Fn(&str) -> String>(bound: &Bound<String>, normalize: F) -> Bound<Vec<u8>> {
    match bound {
        Bound::Included(term) => Bound::Included(normalize(term).into_bytes()),
        Bound::Excluded(term) => Bound::Excluded(normalize(term).into_bytes()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

fn union_of(mut matchers: Vec<Box<dyn Matcher>>) -> Compiled {
    match matchers.len() {
        0 => None,
        1 => matchers.pop(),
        _ => Some(Box::new(DisjunctionMatcher::new(matchers))),
    }
}
