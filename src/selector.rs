//! A small CSS selector engine over `dom` handles
//!
//! Supports selector lists, compound selectors (`tag`, `*`, `.class`, `#id`,
//! `[attr]`, `[attr=v]`, `[attr*=v]`, `[attr^=v]`, `[attr$=v]`, `[attr~=v]`),
//! `:has(P)` / `:has(> P)` with compound arguments, and the descendant and
//! child combinators. That covers every marker the mail clients we care
//! about leave behind.

use crate::dom::{self, Handle};
use crate::error::{ParseError, Result};
use std::fmt;
use std::str::FromStr;

/// A parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    Attr {
        name: String,
        op: AttrOp,
        value: String,
    },
    Has(Vec<Relative>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Relative {
    child_only: bool,
    compound: Compound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
    Prefix,
    Suffix,
    Word,
}

impl AttrOp {
    fn matches(self, actual: &str, expected: &str) -> bool {
        match self {
            Self::Exists => true,
            Self::Equals => actual == expected,
            Self::Contains => !expected.is_empty() && actual.contains(expected),
            Self::Prefix => !expected.is_empty() && actual.starts_with(expected),
            Self::Suffix => !expected.is_empty() && actual.ends_with(expected),
            Self::Word => actual.split_ascii_whitespace().any(|word| word == expected),
        }
    }
}

impl Selector {
    /// Parse a selector list such as `div.quote, [id*="signature"]`
    pub fn parse(source: &str) -> Result<Self> {
        let mut parser = Parser::new(source);
        let alternatives = parser.selector_list()?;
        Ok(Self {
            source: source.to_string(),
            alternatives,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `node` is an element matching any alternative
    #[must_use]
    pub fn matches(&self, node: &Handle) -> bool {
        self.alternatives
            .iter()
            .any(|complex| complex.matches(node, complex.compounds.len()))
    }
}

impl FromStr for Selector {
    type Err = ParseError;

    fn from_str(source: &str) -> Result<Self> {
        Self::parse(source)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl Complex {
    /// Match right to left: the first `len` compounds must hold for `node`
    /// and its ancestry.
    fn matches(&self, node: &Handle, len: usize) -> bool {
        let Some(last) = len.checked_sub(1) else {
            return false;
        };
        if !self.compounds[last].matches(node) {
            return false;
        }
        if last == 0 {
            return true;
        }
        match self.combinators[last - 1] {
            Combinator::Child => {
                dom::parent(node).is_some_and(|parent| self.matches(&parent, last))
            }
            Combinator::Descendant => {
                dom::ancestors(node).any(|ancestor| self.matches(&ancestor, last))
            }
        }
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.conditions.is_empty()
    }

    fn matches(&self, node: &Handle) -> bool {
        let Some(tag) = dom::tag_name(node) else {
            return false;
        };
        if let Some(expected) = &self.tag
            && expected != "*"
            && !tag.eq_ignore_ascii_case(expected)
        {
            return false;
        }
        self.conditions.iter().all(|condition| condition.matches(node))
    }
}

impl Condition {
    fn matches(&self, node: &Handle) -> bool {
        match self {
            Self::Attr { name, op, value } => {
                dom::attr(node, name).is_some_and(|actual| op.matches(&actual, value))
            }
            Self::Has(relatives) => relatives.iter().any(|relative| {
                let scope = if relative.child_only {
                    dom::element_children(node)
                } else {
                    dom::descendants(node)
                };
                scope.iter().any(|candidate| relative.compound.matches(candidate))
            }),
        }
    }
}

/// Matching descendants of `scope` in document order, `scope` excluded
#[must_use]
pub fn select(scope: &Handle, selector: &Selector) -> Vec<Handle> {
    dom::descendants(scope)
        .into_iter()
        .filter(|node| selector.matches(node))
        .collect()
}

/// Result of [`siblings_until`]
pub struct SiblingRun {
    /// The start node followed by the collected element siblings
    pub nodes: Vec<Handle>,

    /// The first sibling that matched the stop selector, if any
    pub bound: Option<Handle>,
}

/// Collect `start` and its following element siblings up to, not including,
/// the first one matching `until`. Without a match every following sibling
/// is collected and `bound` is `None`.
#[must_use]
pub fn siblings_until(start: &Handle, until: &Selector) -> SiblingRun {
    let mut nodes = vec![start.clone()];
    for sibling in dom::next_element_siblings(start) {
        if until.matches(&sibling) {
            return SiblingRun {
                nodes,
                bound: Some(sibling),
            };
        }
        nodes.push(sibling);
    }
    SiblingRun { nodes, bound: None }
}

// --- Parsing ---

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, details: impl Into<String>) -> ParseError {
        ParseError::InvalidSelector {
            selector: self.source.to_string(),
            details: details.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let next = self.peek();
        self.pos += 1;
        next
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{expected}` at position {}", self.pos)))
        }
    }

    /// Skip whitespace, reporting whether any was found
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn selector_list(&mut self) -> Result<Vec<Complex>> {
        let mut alternatives = Vec::new();
        loop {
            self.skip_whitespace();
            alternatives.push(self.complex()?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => {}
                None => return Ok(alternatives),
                Some(other) => {
                    return Err(self.error(format!("unexpected `{other}`")));
                }
            }
        }
    }

    fn complex(&mut self) -> Result<Complex> {
        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();
        loop {
            let spaced = self.skip_whitespace();
            let combinator = if self.eat('>') {
                self.skip_whitespace();
                Combinator::Child
            } else if spaced && self.peek().is_some_and(|c| c != ',') {
                Combinator::Descendant
            } else {
                break;
            };
            combinators.push(combinator);
            compounds.push(self.compound()?);
        }
        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn compound(&mut self) -> Result<Compound> {
        let mut compound = Compound::default();
        if self.eat('*') {
            compound.tag = Some("*".to_string());
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.ident()?.to_ascii_lowercase());
        }
        loop {
            match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    compound.conditions.push(Condition::Attr {
                        name: "class".to_string(),
                        op: AttrOp::Word,
                        value: self.ident()?,
                    });
                }
                Some('#') => {
                    self.pos += 1;
                    compound.conditions.push(Condition::Attr {
                        name: "id".to_string(),
                        op: AttrOp::Equals,
                        value: self.ident()?,
                    });
                }
                Some('[') => {
                    self.pos += 1;
                    compound.conditions.push(self.attribute()?);
                }
                Some(':') => {
                    self.pos += 1;
                    compound.conditions.push(self.pseudo()?);
                }
                _ => break,
            }
        }
        if compound.is_empty() {
            return Err(self.error(format!("expected a selector at position {}", self.pos)));
        }
        Ok(compound)
    }

    fn ident(&mut self) -> Result<String> {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.pos += 1;
                ident.extend(self.bump());
            } else if is_ident_char(c) {
                ident.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        if ident.is_empty() {
            return Err(self.error(format!("expected a name at position {}", self.pos)));
        }
        Ok(ident)
    }

    fn attribute(&mut self) -> Result<Condition> {
        self.skip_whitespace();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let op = match self.peek() {
            Some(']') => AttrOp::Exists,
            Some('=') => AttrOp::Equals,
            Some('*') => AttrOp::Contains,
            Some('^') => AttrOp::Prefix,
            Some('$') => AttrOp::Suffix,
            Some('~') => AttrOp::Word,
            _ => return Err(self.error(format!("bad attribute operator at position {}", self.pos))),
        };
        let value = if op == AttrOp::Exists {
            String::new()
        } else {
            if op != AttrOp::Equals {
                self.pos += 1;
            }
            self.expect('=')?;
            self.skip_whitespace();
            let value = self.value()?;
            self.skip_whitespace();
            value
        };
        self.expect(']')?;
        Ok(Condition::Attr { name, op, value })
    }

    fn value(&mut self) -> Result<String> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some(c) if c == quote => return Ok(value),
                        Some('\\') => value.extend(self.bump()),
                        Some(c) => value.push(c),
                        None => return Err(self.error("unterminated string")),
                    }
                }
            }
            _ => self.ident(),
        }
    }

    fn pseudo(&mut self) -> Result<Condition> {
        let name = self.ident()?.to_ascii_lowercase();
        if name != "has" {
            return Err(self.error(format!("unsupported pseudo-class `:{name}`")));
        }
        self.expect('(')?;
        let mut relatives = Vec::new();
        loop {
            self.skip_whitespace();
            let child_only = self.eat('>');
            self.skip_whitespace();
            let compound = self.compound()?;
            relatives.push(Relative {
                child_only,
                compound,
            });
            self.skip_whitespace();
            match self.bump() {
                Some(',') => {}
                Some(')') => return Ok(Condition::Has(relatives)),
                _ => return Err(self.error("only compound selectors are supported inside :has()")),
            }
        }
    }
}

const fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}
