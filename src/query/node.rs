//! Query node trees.
//!
//! A [`QueryNode`] is a closed tree of predicates and boolean operators. Trees
//! are either built by hand with the constructors below or produced by the
//! [`QueryParser`](crate::query::parser::QueryParser); both paths yield the
//! same shapes for the same semantics.
//!
//! ```
//! use quarry::query::node::{NodeKind, QueryNode};
//!
//! let mut tag = QueryNode::tag("color");
//! tag.add_child(QueryNode::prefix(None, "re")).unwrap();
//!
//! let mut root = QueryNode::intersect(false);
//! root.add_child(QueryNode::token(Some("title"), "hello")).unwrap();
//! root.add_child(tag).unwrap();
//!
//! assert_eq!(root.kind(), NodeKind::Intersect);
//! assert_eq!(root.children().len(), 2);
//! ```

use std::ops::Bound;

use crate::error::{QuarryError, Result};
use crate::index::numeric::NumericFilter;

/// Discriminant of a [`QueryNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Token,
    Prefix,
    Fuzzy,
    NumericRange,
    LexRange,
    Tag,
    Union,
    Intersect,
    Not,
    Wildcard,
}

/// A node of a query tree.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    /// Exact term. `field` of `None` searches every full-text field.
    Token { field: Option<String>, term: String },

    /// Terms starting with `prefix`.
    Prefix {
        field: Option<String>,
        prefix: String,
    },

    /// Terms within `max_distance` edits of `term`.
    Fuzzy {
        field: Option<String>,
        term: String,
        max_distance: u8,
    },

    /// Documents whose numeric value in `field` passes the filter.
    NumericRange {
        field: String,
        filter: NumericFilter,
    },

    /// Terms ordered between two bounds.
    LexRange {
        field: Option<String>,
        lower: Bound<String>,
        upper: Bound<String>,
    },

    /// Match the child predicate against the values of a tag field.
    Tag {
        field: String,
        child: Option<Box<QueryNode>>,
    },

    /// Documents matching any child.
    Union(Vec<QueryNode>),

    /// Documents matching every child. With `exact`, the children are
    /// tokens that must appear at consecutive positions.
    Intersect { children: Vec<QueryNode>, exact: bool },

    /// Live documents not matching the child. No child means every document.
    Not(Option<Box<QueryNode>>),

    /// Every live document.
    Wildcard,
}

fn field_name(field: Option<&str>) -> Option<String> {
    field.map(str::to_string)
}

impl QueryNode {
    pub fn token<S: Into<String>>(field: Option<&str>, term: S) -> Self {
        QueryNode::Token {
            field: field_name(field),
            term: term.into(),
        }
    }

    pub fn prefix<S: Into<String>>(field: Option<&str>, prefix: S) -> Self {
        QueryNode::Prefix {
            field: field_name(field),
            prefix: prefix.into(),
        }
    }

    pub fn fuzzy<S: Into<String>>(field: Option<&str>, term: S, max_distance: u8) -> Self {
        QueryNode::Fuzzy {
            field: field_name(field),
            term: term.into(),
            max_distance,
        }
    }

    /// Numeric range over `field`; either bound may be infinite.
    pub fn numeric_range<S: Into<String>>(
        field: S,
        min: f64,
        max: f64,
        min_exclusive: bool,
        max_exclusive: bool,
    ) -> Self {
        QueryNode::NumericRange {
            field: field.into(),
            filter: NumericFilter::new(min, max, min_exclusive, max_exclusive),
        }
    }

    /// Lexicographic range `[lo, hi)`.
    pub fn lex_range<L: Into<String>, H: Into<String>>(field: Option<&str>, lo: L, hi: H) -> Self {
        QueryNode::lex_range_bounds(field, Bound::Included(lo.into()), Bound::Excluded(hi.into()))
    }

    /// Lexicographic range with explicit bounds.
    pub fn lex_range_bounds(field: Option<&str>, lower: Bound<String>, upper: Bound<String>) -> Self {
        QueryNode::LexRange {
            field: field_name(field),
            lower,
            upper,
        }
    }

    /// A tag node without its predicate; add one with [`QueryNode::add_child`].
    pub fn tag<S: Into<String>>(field: S) -> Self {
        QueryNode::Tag {
            field: field.into(),
            child: None,
        }
    }

    pub fn union() -> Self {
        QueryNode::Union(Vec::new())
    }

    pub fn intersect(exact: bool) -> Self {
        QueryNode::Intersect {
            children: Vec::new(),
            exact,
        }
    }

    pub fn not() -> Self {
        QueryNode::Not(None)
    }

    pub fn wildcard() -> Self {
        QueryNode::Wildcard
    }

    /// Builds a union of the given children.
    pub fn union_of(children: Vec<QueryNode>) -> Self {
        QueryNode::Union(children)
    }

    /// Builds an intersection of the given children.
    pub fn intersect_of(children: Vec<QueryNode>, exact: bool) -> Self {
        QueryNode::Intersect { children, exact }
    }

    /// Builds a negation of `child`.
    pub fn negate(child: QueryNode) -> Self {
        QueryNode::Not(Some(Box::new(child)))
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            QueryNode::Token { .. } => NodeKind::Token,
            QueryNode::Prefix { .. } => NodeKind::Prefix,
            QueryNode::Fuzzy { .. } => NodeKind::Fuzzy,
            QueryNode::NumericRange { .. } => NodeKind::NumericRange,
            QueryNode::LexRange { .. } => NodeKind::LexRange,
            QueryNode::Tag { .. } => NodeKind::Tag,
            QueryNode::Union(_) => NodeKind::Union,
            QueryNode::Intersect { .. } => NodeKind::Intersect,
            QueryNode::Not(_) => NodeKind::Not,
            QueryNode::Wildcard => NodeKind::Wildcard,
        }
    }

    /// Attach a child.
    ///
    /// Union and Intersect take any number of children; Tag and Not take
    /// exactly one. Leaves take none.
    pub fn add_child(&mut self, child: QueryNode) -> Result<()> {
        let kind = self.kind();
        match self {
            QueryNode::Union(children) | QueryNode::Intersect { children, .. } => {
                children.push(child);
                Ok(())
            }
            QueryNode::Tag { child: slot, .. } | QueryNode::Not(slot) => {
                if slot.is_some() {
                    return Err(QuarryError::syntax(
                        format!("{kind:?} node already has a child"),
                        0,
                    ));
                }
                *slot = Some(Box::new(child));
                Ok(())
            }
            _ => Err(QuarryError::syntax(
                format!("{kind:?} node cannot have children"),
                0,
            )),
        }
    }

    /// Children of this node, in order.
    pub fn children(&self) -> Vec<&QueryNode> {
        match self {
            QueryNode::Union(children) | QueryNode::Intersect { children, .. } => {
                children.iter().collect()
            }
            QueryNode::Tag { child, .. } | QueryNode::Not(child) => {
                child.iter().map(|c| c.as_ref()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// The field a leaf predicate is scoped to.
    pub fn field(&self) -> Option<&str> {
        match self {
            QueryNode::Token { field, .. }
            | QueryNode::Prefix { field, .. }
            | QueryNode::Fuzzy { field, .. }
            | QueryNode::LexRange { field, .. } => field.as_deref(),
            QueryNode::NumericRange { field, .. } | QueryNode::Tag { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_add_child_arity() {
        let mut not = QueryNode::not();
        not.add_child(QueryNode::token(None, "a")).unwrap();
        let err = not.add_child(QueryNode::token(None, "b")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QuerySyntax);

        let mut token = QueryNode::token(None, "a");
        assert!(token.add_child(QueryNode::wildcard()).is_err());

        let mut union = QueryNode::union();
        for term in ["a", "b", "c"] {
            union.add_child(QueryNode::token(None, term)).unwrap();
        }
        assert_eq!(union.children().len(), 3);
    }

    #[test]
    fn test_lex_range_default_bounds() {
        let node = QueryNode::lex_range(Some("name"), "a", "c");
        assert_eq!(
            node,
            QueryNode::LexRange {
                field: Some("name".to_string()),
                lower: Bound::Included("a".to_string()),
                upper: Bound::Excluded("c".to_string()),
            }
        );
        assert_eq!(node.field(), Some("name"));
    }

    #[test]
    fn test_kinds() {
        assert_eq!(QueryNode::wildcard().kind(), NodeKind::Wildcard);
        assert_eq!(
            QueryNode::numeric_range("n", 10.0, 30.0, false, false).kind(),
            NodeKind::NumericRange
        );
        assert_eq!(QueryNode::negate(QueryNode::wildcard()).children().len(), 1);
    }
}
