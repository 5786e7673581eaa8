//! Query parser for converting query strings into query node trees.
//!
//! Supported syntax:
//! - Terms, implicitly intersected: `hello world`. A term is split the way
//!   documents are analyzed, so `hello-world` searches the phrase
//!   `"hello world"` and `3.14` stays one term.
//! - Alternatives: `hello | world`
//! - Grouping: `(hello | hi) world`
//! - Field scope: `@title:hello`, `@title:(hello | hi)`
//! - Prefix: `hel*`
//! - Fuzzy: `%helo%` (distance 1), `%%helo%%` (2), `%%%helo%%%` (3)
//! - Exact phrase: `"hello world"`
//! - Negation: `-hello`
//! - Tags: `@color:{red | blu*}`
//! - Numeric ranges: `@price:[10 30]`, `@price:[(10 +inf]`
//! - Everything: `*`
//!
//! ```
//! use quarry::query::node::QueryNode;
//! use quarry::query::parser::QueryParser;
//!
//! let parser = QueryParser::new();
//! let node = parser.parse("(@ft1:hello1)|(@ft1:hello50)").unwrap().unwrap();
//! assert_eq!(
//!     node,
//!     QueryNode::union_of(vec![
//!         QueryNode::token(Some("ft1"), "hello1"),
//!         QueryNode::token(Some("ft1"), "hello50"),
//!     ])
//! );
//! assert!(parser.parse("   ").unwrap().is_none());
//! ```

use std::iter::Peekable;
use std::str::CharIndices;

use crate::analysis::tokenizer::{Tokenizer, UnicodeWordTokenizer};
use crate::error::{QuarryError, Result};
use crate::query::node::QueryNode;

/// Deepest fuzzy marker run accepted (`%%%term%%%`).
const MAX_FUZZY_MARKERS: u8 = 3;

/// Deepest nesting of groups, negations and field scopes.
const MAX_DEPTH: usize = 128;

/// A query string parser.
#[derive(Debug, Clone, Default)]
pub struct QueryParser {
    /// Field applied to terms without an `@field:` scope.
    default_field: Option<String>,
}

impl QueryParser {
    /// Create a new query parser. Unscoped terms search every full-text
    /// field.
    pub fn new() -> Self {
        QueryParser::default()
    }

    /// Set the default field to search in when no field is specified.
    pub fn with_default_field<S: Into<String>>(mut self, field: S) -> Self {
        self.default_field = Some(field.into());
        self
    }

    /// Get the default field.
    pub fn default_field(&self) -> Option<&str> {
        self.default_field.as_deref()
    }

    /// Parse a query string. A blank string yields `Ok(None)`.
    pub fn parse(&self, query: &str) -> Result<Option<QueryNode>> {
        let mut parser = QueryStringParser::new(query);
        parser.skip_whitespace();
        if parser.peek().is_none() {
            return Ok(None);
        }
        let node = parser.parse_union(self.default_field.as_deref())?;
        parser.skip_whitespace();
        if let Some(ch) = parser.peek() {
            return Err(parser.error(format!("Unexpected '{ch}'")));
        }
        Ok(Some(node))
    }
}

/// Internal parser over one query string.
struct QueryStringParser<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    depth: usize,
}

impl<'a> QueryStringParser<'a> {
    fn new(input: &'a str) -> Self {
        QueryStringParser {
            input,
            chars: input.char_indices().peekable(),
            depth: 0,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, ch)| ch)
    }

    fn bump(&mut self) -> Option<char> {
        self.chars.next().map(|(_, ch)| ch)
    }

    /// Byte offset of the next character.
    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map_or(self.input.len(), |&(offset, _)| offset)
    }

    fn error<S: Into<String>>(&mut self, message: S) -> QuarryError {
        let offset = self.offset();
        QuarryError::syntax(message, offset)
    }

    fn expect_char(&mut self, expected: char) -> Result<()> {
        match self.peek() {
            Some(ch) if ch == expected => {
                self.bump();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("Expected '{expected}' but found '{ch}'"))),
            None => Err(self.error(format!("Expected '{expected}' but found end of query"))),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn parse_union(&mut self, field: Option<&str>) -> Result<QueryNode> {
        let mut children = vec![self.parse_intersect(field)?];
        loop {
            self.skip_whitespace();
            if self.peek() != Some('|') {
                break;
            }
            self.bump();
            children.push(self.parse_intersect(field)?);
        }
        Ok(collapse(children, QueryNode::Union))
    }

    fn parse_intersect(&mut self, field: Option<&str>) -> Result<QueryNode> {
        let mut children = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None | Some('|') | Some(')') => break,
                Some(_) => children.push(self.parse_unary(field)?),
            }
        }
        if children.is_empty() {
            return Err(self.error("Expected a query clause"));
        }
        Ok(collapse(children, |children| QueryNode::intersect_of(children, false)))
    }

    /// Every nested clause passes through here, so this is where depth is
    /// bounded.
    fn parse_unary(&mut self, field: Option<&str>) -> Result<QueryNode> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(format!("Query nested deeper than {MAX_DEPTH} levels")));
        }
        self.depth += 1;
        let node = if self.peek() == Some('-') {
            self.bump();
            self.skip_whitespace();
            self.parse_unary(field).map(QueryNode::negate)
        } else {
            self.parse_atom(field)
        };
        self.depth -= 1;
        node
    }

    fn parse_atom(&mut self, field: Option<&str>) -> Result<QueryNode> {
        match self.peek() {
            Some('(') => {
                self.bump();
                let node = self.parse_union(field)?;
                self.skip_whitespace();
                self.expect_char(')')?;
                Ok(node)
            }
            Some('@') => self.parse_field_clause(),
            Some('"') => self.parse_phrase(field),
            Some('%') => self.parse_fuzzy(field),
            Some('*') => {
                self.bump();
                Ok(QueryNode::Wildcard)
            }
            Some('{') | Some('[') => Err(self.error("Tag and numeric filters need an @field: scope")),
            Some(ch) if is_word_char(ch) => self.parse_term(field),
            Some(ch) => Err(self.error(format!("Unexpected '{ch}'"))),
            None => Err(self.error("Unexpected end of query")),
        }
    }

    fn parse_field_clause(&mut self) -> Result<QueryNode> {
        self.bump();
        let start = self.offset();
        let mut name = String::new();
        while let Some(ch) = self.peek().filter(|&ch| is_field_char(ch)) {
            name.push(ch);
            self.bump();
        }
        if name.is_empty() {
            return Err(QuarryError::syntax("Expected a field name after '@'", start));
        }
        self.expect_char(':')?;
        self.skip_whitespace();
        match self.peek() {
            Some('{') => self.parse_tags(name),
            Some('[') => self.parse_numeric(name),
            _ => self.parse_unary(Some(&name)),
        }
    }

    fn parse_term(&mut self, field: Option<&str>) -> Result<QueryNode> {
        let start = self.offset();
        let mut words = self.read_words()?;
        if self.peek() == Some('*') {
            self.bump();
            return match words.pop() {
                Some(word) if words.is_empty() => Ok(QueryNode::prefix(field, word)),
                _ => Err(QuarryError::syntax("A prefix must be a single term", start)),
            };
        }
        let words = words
            .into_iter()
            .map(|word| QueryNode::token(field, word))
            .collect();
        Ok(collapse(words, |words| QueryNode::intersect_of(words, true)))
    }

    fn parse_fuzzy(&mut self, field: Option<&str>) -> Result<QueryNode> {
        let start = self.offset();
        let mut markers = 0u8;
        while self.peek() == Some('%') {
            self.bump();
            markers += 1;
            if markers > MAX_FUZZY_MARKERS {
                return Err(QuarryError::syntax(
                    format!("At most {MAX_FUZZY_MARKERS} fuzzy markers are allowed"),
                    start,
                ));
            }
        }
        let mut words = self.read_words()?;
        let word = match words.pop() {
            Some(word) if words.is_empty() => word,
            _ => return Err(QuarryError::syntax("A fuzzy term must be a single term", start)),
        };
        for _ in 0..markers {
            self.expect_char('%')?;
        }
        Ok(QueryNode::fuzzy(field, word, markers))
    }

    fn parse_phrase(&mut self, field: Option<&str>) -> Result<QueryNode> {
        let start = self.offset();
        self.bump();
        let mut phrase = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some(ch) => phrase.push(ch),
                None => return Err(QuarryError::syntax("Unterminated phrase", start)),
            }
        }

        let words: Vec<QueryNode> = analyze_words(&phrase)?
            .into_iter()
            .map(|word| QueryNode::token(field, word))
            .collect();
        if words.is_empty() {
            return Err(QuarryError::syntax("Empty phrase", start));
        }
        Ok(collapse(words, |words| QueryNode::intersect_of(words, true)))
    }

    fn parse_tags(&mut self, field: String) -> Result<QueryNode> {
        let start = self.offset();
        self.bump();
        let mut values = Vec::new();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some(ch @ ('|' | '}')) => {
                    let tag = value.trim();
                    if tag.is_empty() {
                        return Err(QuarryError::syntax("Empty tag value", start));
                    }
                    values.push(match tag.strip_suffix('*') {
                        Some(prefix) => QueryNode::prefix(None, prefix.trim_end()),
                        None => QueryNode::token(None, tag),
                    });
                    value.clear();
                    if ch == '}' {
                        break;
                    }
                }
                Some(ch) => value.push(ch),
                None => return Err(QuarryError::syntax("Unterminated tag list", start)),
            }
        }
        Ok(QueryNode::Tag {
            field,
            child: Some(Box::new(collapse(values, QueryNode::Union))),
        })
    }

    fn parse_numeric(&mut self, field: String) -> Result<QueryNode> {
        self.bump();
        let (min, min_exclusive) = self.parse_bound()?;
        let (max, max_exclusive) = self.parse_bound()?;
        self.skip_whitespace();
        self.expect_char(']')?;
        Ok(QueryNode::numeric_range(
            field,
            min,
            max,
            min_exclusive,
            max_exclusive,
        ))
    }

    fn parse_bound(&mut self) -> Result<(f64, bool)> {
        while self.peek().is_some_and(|ch| ch.is_whitespace() || ch == ',') {
            self.bump();
        }
        let exclusive = self.peek() == Some('(');
        if exclusive {
            self.bump();
        }
        let start = self.offset();
        let mut text = String::new();
        while let Some(ch) = self
            .peek()
            .filter(|&ch| !ch.is_whitespace() && ch != ',' && ch != ']')
        {
            text.push(ch);
            self.bump();
        }
        let value = match text.to_ascii_lowercase().as_str() {
            "" => return Err(QuarryError::syntax("Expected a numeric bound", start)),
            "inf" | "+inf" => f64::INFINITY,
            "-inf" => f64::NEG_INFINITY,
            other => other
                .parse::<f64>()
                .ok()
                .filter(|n| !n.is_nan())
                .ok_or_else(|| QuarryError::syntax(format!("Invalid number '{text}'"), start))?,
        };
        Ok((value, exclusive))
    }

    /// Read one bare term and split it into the words documents would be
    /// indexed under.
    fn read_words(&mut self) -> Result<Vec<String>> {
        let start = self.offset();
        let mut text = String::new();
        if self.peek().is_some_and(is_word_char) {
            while let Some(ch) = self.peek().filter(|&ch| is_term_char(ch)) {
                text.push(ch);
                self.bump();
            }
        }
        let words = analyze_words(&text)?;
        if words.is_empty() {
            return Err(QuarryError::syntax("Expected a term", start));
        }
        Ok(words)
    }
}

fn analyze_words(text: &str) -> Result<Vec<String>> {
    Ok(UnicodeWordTokenizer::new()
        .tokenize(text)?
        .map(|token| token.text)
        .collect())
}

/// Characters that may start a bare term.
fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Characters that may continue a bare term. Punctuation inside a term is
/// left to the tokenizer.
fn is_term_char(ch: char) -> bool {
    !ch.is_whitespace()
        && !matches!(
            ch,
            '|' | '(' | ')' | '@' | '"' | '%' | '*' | '{' | '}' | '[' | ']' | ':'
        )
}

fn is_field_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.')
}

/// A single child stands for itself; several are combined by `combine`.
fn collapse<F: FnOnce(Vec<QueryNode>) -> QueryNode>(mut children: Vec<QueryNode>, combine: F) -> QueryNode {
    if children.len() == 1 {
        if let Some(child) = children.pop() {
            return child;
        }
    }
    combine(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn parse(query: &str) -> QueryNode {
        QueryParser::new().parse(query).unwrap().unwrap()
    }

    fn syntax_offset(query: &str) -> usize {
        match QueryParser::new().parse(query) {
            Err(QuarryError::QuerySyntax { offset, .. }) => offset,
            other => panic!("expected a syntax error for {query:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_terms_and_prefix() {
        assert_eq!(parse("hello"), QueryNode::token(None, "hello"));
        assert_eq!(parse("hello*"), QueryNode::prefix(None, "hello"));
        assert_eq!(parse("@ft1:hello*"), QueryNode::prefix(Some("ft1"), "hello"));
        assert_eq!(
            parse("hello world"),
            QueryNode::intersect_of(
                vec![QueryNode::token(None, "hello"), QueryNode::token(None, "world")],
                false
            )
        );
    }

    #[test]
    fn test_precedence() {
        // Intersection binds tighter than union.
        assert_eq!(
            parse("a b | c"),
            QueryNode::union_of(vec![
                QueryNode::intersect_of(
                    vec![QueryNode::token(None, "a"), QueryNode::token(None, "b")],
                    false
                ),
                QueryNode::token(None, "c"),
            ])
        );
        assert_eq!(
            parse("@t:(a | b) -c"),
            QueryNode::intersect_of(
                vec![
                    QueryNode::union_of(vec![
                        QueryNode::token(Some("t"), "a"),
                        QueryNode::token(Some("t"), "b"),
                    ]),
                    QueryNode::negate(QueryNode::token(None, "c")),
                ],
                false
            )
        );
    }

    #[test]
    fn test_fuzzy_phrase_wildcard() {
        assert_eq!(parse("%helo%"), QueryNode::fuzzy(None, "helo", 1));
        assert_eq!(parse("@t:%%%helo%%%"), QueryNode::fuzzy(Some("t"), "helo", 3));
        assert_eq!(
            parse("\"hello world\""),
            QueryNode::intersect_of(
                vec![QueryNode::token(None, "hello"), QueryNode::token(None, "world")],
                true
            )
        );
        assert_eq!(parse("\"hello\""), QueryNode::token(None, "hello"));
        assert_eq!(parse("*"), QueryNode::Wildcard);
        assert_eq!(parse("-*"), QueryNode::negate(QueryNode::Wildcard));
    }

    #[test]
    fn test_tags_and_numbers() {
        let mut expected = QueryNode::tag("color");
        expected
            .add_child(QueryNode::union_of(vec![
                QueryNode::token(None, "light red"),
                QueryNode::prefix(None, "blu"),
            ]))
            .unwrap();
        assert_eq!(parse("@color:{ light red | blu* }"), expected);

        assert_eq!(
            parse("@n:[10 30]"),
            QueryNode::numeric_range("n", 10.0, 30.0, false, false)
        );
        assert_eq!(
            parse("@n:[(10, +inf]"),
            QueryNode::numeric_range("n", 10.0, f64::INFINITY, true, false)
        );
        assert_eq!(
            parse("@n:[-inf (-2.5]"),
            QueryNode::numeric_range("n", f64::NEG_INFINITY, -2.5, false, true)
        );
    }

    #[test]
    fn test_default_field() {
        let parser = QueryParser::new().with_default_field("body");
        assert_eq!(parser.default_field(), Some("body"));
        assert_eq!(
            parser.parse("hi @title:there").unwrap().unwrap(),
            QueryNode::intersect_of(
                vec![
                    QueryNode::token(Some("body"), "hi"),
                    QueryNode::token(Some("title"), "there"),
                ],
                false
            )
        );
    }

    #[test]
    fn test_terms_split_like_documents() {
        assert_eq!(
            parse("hello-world"),
            QueryNode::intersect_of(
                vec![QueryNode::token(None, "hello"), QueryNode::token(None, "world")],
                true
            )
        );
        assert_eq!(parse("3.14"), QueryNode::token(None, "3.14"));
        assert_eq!(parse("@t:can't"), QueryNode::token(Some("t"), "can't"));
        assert_eq!(
            parse("\"hello-world again\""),
            QueryNode::intersect_of(
                vec![
                    QueryNode::token(None, "hello"),
                    QueryNode::token(None, "world"),
                    QueryNode::token(None, "again"),
                ],
                true
            )
        );
        // A leading dash still negates.
        assert_eq!(parse("-3.14"), QueryNode::negate(QueryNode::token(None, "3.14")));
        assert_eq!(syntax_offset("a hello-wor*"), 2);
        assert_eq!(syntax_offset("%hello-world%"), 0);
    }

    #[test]
    fn test_nesting_is_bounded() {
        let nested = format!("{}a{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(parse(&nested), QueryNode::token(None, "a"));

        let open = "(".repeat(10_000);
        assert_eq!(syntax_offset(&open), MAX_DEPTH);
        let negations = format!("{}a", "-".repeat(10_000));
        assert_eq!(syntax_offset(&negations), MAX_DEPTH);
        let scopes = "@t:".repeat(10_000);
        assert_eq!(syntax_offset(&scopes), 3 * MAX_DEPTH);
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(syntax_offset("(hello"), 6);
        assert_eq!(syntax_offset("hello)"), 5);
        assert_eq!(syntax_offset("a | | b"), 4);
        assert_eq!(syntax_offset("@:x"), 1);
        assert_eq!(syntax_offset("@n:[1 x]"), 6);
        assert_eq!(syntax_offset("\"open"), 0);
        assert_eq!(syntax_offset("%%%%a%%%%"), 0);
        assert_eq!(syntax_offset("{a}"), 0);

        let err = QueryParser::new().parse("@t:{a|}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QuerySyntax);
    }
}
