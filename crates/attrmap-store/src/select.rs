//! Parser and evaluator for the select grammar.
//!
//! ```text
//! select (* | count(*)) from <name>
//!     [where <cmp> ((and | or | intersection) <cmp>)*]
//!     [order by <target> [asc | desc]]
//!     [limit <n>]
//!
//! <cmp>    := <target> (= | != | > | >= | < | <=) '<literal>'
//!           | <target> [not] like '<literal>'
//!           | <target> is [not] null
//! <target> := itemName() | `<name>` | <bare name>
//! ```
//!
//! `and` and `intersection` bind tighter than `or`. A comparison against a
//! multi-valued attribute holds if any one of its values satisfies it.
//! Values compare as plain strings.

use std::cmp::Ordering;

use crate::error::{StoreError, StoreResult};
use crate::types::Item;

/// Largest page the store will return for one select call.
pub const MAX_LIMIT: usize = 2500;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Projection {
    All,
    Count,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    ItemName,
    Attribute(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    NotLike,
    IsNull,
    IsNotNull,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comparison {
    pub target: Target,
    pub operator: Operator,
    pub value: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub target: Target,
    pub descending: bool,
}

/// A parsed select statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectStatement {
    pub projection: Projection,
    pub domain: String,
    /// Disjunction of conjunctions. Empty means "every item".
    pub predicate: Vec<Vec<Comparison>>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl SelectStatement {
    /// Parse a select statement.
    pub fn parse(query: &str) -> StoreResult<Self> {
        let tokens = tokenize(query)?;
        Parser { tokens, pos: 0 }.statement()
    }

    /// Returns `true` if `item` satisfies the where clause.
    pub fn matches(&self, item: &Item) -> bool {
        self.predicate.is_empty()
            || self
                .predicate
                .iter()
                .any(|group| group.iter().all(|cmp| cmp.matches(item)))
    }

    /// Sort items by the order-by target, if any. Items lacking the
    /// attribute sort last.
    pub fn sort(&self, items: &mut [Item]) {
        let Some(order) = &self.order_by else {
            return;
        };
        items.sort_by(|a, b| {
            match (sort_key(&order.target, a), sort_key(&order.target, b)) {
                (Some(x), Some(y)) if order.descending => y.cmp(x),
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
    }
}

impl Comparison {
    fn matches(&self, item: &Item) -> bool {
        let values = target_values(&self.target, item);
        let literal = self.value.as_deref().unwrap_or_default();
        match self.operator {
            Operator::IsNull => values.is_empty(),
            Operator::IsNotNull => !values.is_empty(),
            Operator::Eq => values.iter().any(|v| *v == literal),
            Operator::Ne => values.iter().any(|v| *v != literal),
            Operator::Gt => values.iter().any(|v| *v > literal),
            Operator::Ge => values.iter().any(|v| *v >= literal),
            Operator::Lt => values.iter().any(|v| *v < literal),
            Operator::Le => values.iter().any(|v| *v <= literal),
            Operator::Like => values.iter().any(|v| like(v, literal)),
            Operator::NotLike => values.iter().any(|v| !like(v, literal)),
        }
    }
}

fn target_values<'a>(target: &Target, item: &'a Item) -> Vec<&'a str> {
    match target {
        Target::ItemName => vec![item.name.as_str()],
        Target::Attribute(name) => item
            .attributes
            .iter()
            .filter(|a| &a.name == name)
            .map(|a| a.value.as_str())
            .collect(),
    }
}

fn sort_key<'a>(target: &Target, item: &'a Item) -> Option<&'a str> {
    target_values(target, item).into_iter().min()
}

/// `%` matches any run of characters; everything else matches literally.
fn like(value: &str, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split('%').collect();
    if parts.len() == 1 {
        return value == pattern;
    }
    let first = parts[0];
    let last = parts[parts.len() - 1];
    let Some(mut rest) = value.strip_prefix(first) else {
        return false;
    };
    for middle in &parts[1..parts.len() - 1] {
        match rest.find(middle) {
            Some(idx) => rest = &rest[idx + middle.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Word(String),
    /// Back-tick quoted name.
    Name(String),
    /// Single-quoted literal.
    Literal(String),
    Symbol(&'static str),
}

fn tokenize(input: &str) -> StoreResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '`' | '\'' => {
                let (text, end) = read_quoted(&chars, i)?;
                tokens.push(if c == '`' {
                    Token::Name(text)
                } else {
                    Token::Literal(text)
                });
                i = end;
            }
            '(' => {
                tokens.push(Token::Symbol("("));
                i += 1;
            }
            ')' => {
                tokens.push(Token::Symbol(")"));
                i += 1;
            }
            '*' => {
                tokens.push(Token::Symbol("*"));
                i += 1;
            }
            '=' => {
                tokens.push(Token::Symbol("="));
                i += 1;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::Symbol("!="));
                i += 2;
            }
            '<' | '>' => {
                let symbol = match (c, next == Some('=')) {
                    ('<', true) => "<=",
                    ('<', false) => "<",
                    (_, true) => ">=",
                    (_, false) => ">",
                };
                tokens.push(Token::Symbol(symbol));
                i += symbol.len();
            }
            c if c.is_alphanumeric() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                tokens.push(Token::Word(chars[start..i].iter().collect()));
            }
            other => {
                return Err(StoreError::InvalidQuery(format!(
                    "unexpected character {other:?} at offset {i}"
                )))
            }
        }
    }
    Ok(tokens)
}

/// Read a quoted run starting at `start`; a doubled quote is an escaped quote.
fn read_quoted(chars: &[char], start: usize) -> StoreResult<(String, usize)> {
    let quote = chars[start];
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                text.push(quote);
                i += 2;
                continue;
            }
            return Ok((text, i + 1));
        }
        text.push(chars[i]);
        i += 1;
    }
    Err(StoreError::InvalidQuery(format!(
        "unterminated {quote} quote at offset {start}"
    )))
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn statement(mut self) -> StoreResult<SelectStatement> {
        self.expect_keyword("select")?;
        let projection = if self.eat_symbol("*") {
            Projection::All
        } else {
            self.expect_keyword("count")?;
            self.expect_symbol("(")?;
            self.expect_symbol("*")?;
            self.expect_symbol(")")?;
            Projection::Count
        };
        self.expect_keyword("from")?;
        let domain = match self.next() {
            Some(Token::Name(name)) | Some(Token::Word(name)) => name,
            other => return Err(unexpected("domain name", other)),
        };

        let mut predicate = Vec::new();
        if self.eat_keyword("where") {
            predicate.push(vec![self.comparison()?]);
            loop {
                if self.eat_keyword("and") || self.eat_keyword("intersection") {
                    let cmp = self.comparison()?;
                    if let Some(group) = predicate.last_mut() {
                        group.push(cmp);
                    }
                } else if self.eat_keyword("or") {
                    predicate.push(vec![self.comparison()?]);
                } else {
                    break;
                }
            }
        }

        let mut order_by = None;
        if self.eat_keyword("order") {
            self.expect_keyword("by")?;
            let target = self.target()?;
            let descending = if self.eat_keyword("desc") {
                true
            } else {
                self.eat_keyword("asc");
                false
            };
            order_by = Some(OrderBy { target, descending });
        }

        let mut limit = None;
        if self.eat_keyword("limit") {
            let n = match self.next() {
                Some(Token::Word(w)) => w
                    .parse::<usize>()
                    .map_err(|_| StoreError::InvalidQuery(format!("invalid limit: {w}")))?,
                other => return Err(unexpected("limit", other)),
            };
            if n == 0 || n > MAX_LIMIT {
                return Err(StoreError::InvalidQuery(format!(
                    "limit must be between 1 and {MAX_LIMIT}, got {n}"
                )));
            }
            limit = Some(n);
        }

        if let Some(extra) = self.next() {
            return Err(unexpected("end of query", Some(extra)));
        }

        Ok(SelectStatement {
            projection,
            domain,
            predicate,
            order_by,
            limit,
        })
    }

    fn comparison(&mut self) -> StoreResult<Comparison> {
        let target = self.target()?;
        let (operator, needs_value) = if self.eat_keyword("like") {
            (Operator::Like, true)
        } else if self.eat_keyword("not") {
            self.expect_keyword("like")?;
            (Operator::NotLike, true)
        } else if self.eat_keyword("is") {
            let negated = self.eat_keyword("not");
            self.expect_keyword("null")?;
            let op = if negated {
                Operator::IsNotNull
            } else {
                Operator::IsNull
            };
            (op, false)
        } else {
            let op = match self.next() {
                Some(Token::Symbol("=")) => Operator::Eq,
                Some(Token::Symbol("!=")) => Operator::Ne,
                Some(Token::Symbol(">")) => Operator::Gt,
                Some(Token::Symbol(">=")) => Operator::Ge,
                Some(Token::Symbol("<")) => Operator::Lt,
                Some(Token::Symbol("<=")) => Operator::Le,
                other => return Err(unexpected("comparison operator", other)),
            };
            (op, true)
        };

        let value = if needs_value {
            match self.next() {
                Some(Token::Literal(v)) => Some(v),
                other => return Err(unexpected("quoted value", other)),
            }
        } else {
            None
        };

        Ok(Comparison {
            target,
            operator,
            value,
        })
    }

    fn target(&mut self) -> StoreResult<Target> {
        match self.next() {
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("itemName") => {
                self.expect_symbol("(")?;
                self.expect_symbol(")")?;
                Ok(Target::ItemName)
            }
            Some(Token::Name(name)) | Some(Token::Word(name)) => Ok(Target::Attribute(name)),
            other => Err(unexpected("attribute name", other)),
        }
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.tokens.get(self.pos) {
            Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> StoreResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(unexpected(keyword, self.tokens.get(self.pos).cloned()))
        }
    }

    fn eat_symbol(&mut self, symbol: &str) -> bool {
        match self.tokens.get(self.pos) {
            Some(Token::Symbol(s)) if *s == symbol => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect_symbol(&mut self, symbol: &str) -> StoreResult<()> {
        if self.eat_symbol(symbol) {
            Ok(())
        } else {
            Err(unexpected(symbol, self.tokens.get(self.pos).cloned()))
        }
    }
}

fn unexpected(expected: &str, found: Option<Token>) -> StoreError {
    StoreError::InvalidQuery(match found {
        Some(token) => format!("expected {expected}, found {token:?}"),
        None => format!("expected {expected}, found end of query"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Attribute;

    fn item(name: &str, attrs: &[(&str, &str)]) -> Item {
        Item {
            name: name.to_string(),
            attributes: attrs.iter().map(|(n, v)| Attribute::new(*n, *v)).collect(),
        }
    }

    #[test]
    fn parses_full_statement() {
        let stmt = SelectStatement::parse(
            "select * from `books` where `price` >= '0000000100' and `title` like 'Rust%' \
             or itemName() = '0000000001' order by `price` desc limit 25",
        )
        .unwrap();
        assert_eq!(stmt.projection, Projection::All);
        assert_eq!(stmt.domain, "books");
        assert_eq!(stmt.predicate.len(), 2);
        assert_eq!(stmt.predicate[0].len(), 2);
        assert_eq!(stmt.predicate[1][0].target, Target::ItemName);
        assert_eq!(
            stmt.order_by,
            Some(OrderBy {
                target: Target::Attribute("price".into()),
                descending: true
            })
        );
        assert_eq!(stmt.limit, Some(25));
    }

    #[test]
    fn parses_count_and_null_checks() {
        let stmt =
            SelectStatement::parse("SELECT count(*) FROM books WHERE `isbn` IS NOT NULL").unwrap();
        assert_eq!(stmt.projection, Projection::Count);
        assert_eq!(stmt.predicate[0][0].operator, Operator::IsNotNull);
        assert_eq!(stmt.predicate[0][0].value, None);
    }

    #[test]
    fn quoted_escapes_are_unfolded() {
        let stmt =
            SelectStatement::parse("select * from `odd``name` where `t` = 'it''s'").unwrap();
        assert_eq!(stmt.domain, "odd`name");
        assert_eq!(stmt.predicate[0][0].value.as_deref(), Some("it's"));
    }

    #[test]
    fn rejects_malformed_queries() {
        for q in [
            "",
            "select from `d`",
            "select * from `d` where",
            "select * from `d` where `a` = 3",
            "select * from `d` where `a` = 'x",
            "select * from `d` limit 0",
            "select * from `d` limit 2501",
            "select * from `d` extra",
        ] {
            assert!(
                matches!(SelectStatement::parse(q), Err(StoreError::InvalidQuery(_))),
                "{q:?} should be rejected"
            );
        }
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let stmt = SelectStatement::parse(
            "select * from d where `a` = '1' or `b` = '2' and `c` = '3'",
        )
        .unwrap();
        assert!(stmt.matches(&item("x", &[("a", "1")])));
        assert!(!stmt.matches(&item("x", &[("b", "2")])));
        assert!(stmt.matches(&item("x", &[("b", "2"), ("c", "3")])));
    }

    #[test]
    fn multi_valued_attributes_match_any_value() {
        let stmt =
            SelectStatement::parse("select * from d where `authors` = 'b'").unwrap();
        assert!(stmt.matches(&item("x", &[("authors", "a"), ("authors", "b")])));
        assert!(!stmt.matches(&item("x", &[("authors", "a")])));
    }

    #[test]
    fn like_patterns() {
        assert!(like("Rust in Action", "Rust%"));
        assert!(like("Rust in Action", "%Action"));
        assert!(like("Rust in Action", "%in%"));
        assert!(like("abc", "a%b%c"));
        assert!(!like("abc", "a%d"));
        assert!(!like("ab", "ab%b"));
        assert!(like("same", "same"));
    }

    #[test]
    fn sorting_places_missing_last() {
        let stmt = SelectStatement::parse("select * from d order by `n` desc").unwrap();
        let mut items = vec![
            item("a", &[("n", "1")]),
            item("b", &[]),
            item("c", &[("n", "3")]),
        ];
        stmt.sort(&mut items);
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}
