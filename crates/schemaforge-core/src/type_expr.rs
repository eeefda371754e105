//! # Type Expressions
//!
//! The small grammar declarations use to spell property types:
//!
//! ```text
//! expr  := base '?'?
//! base  := 'list' '<' expr '>'
//!        | 'set'  '<' expr '>'
//!        | 'map'  '<' expr ',' expr '>'
//!        | 'any'
//!        | scalar
//!        | name
//! name  := segment ('.' segment)*
//! ```
//!
//! Scalars are the keywords accepted by [`ScalarType::from_keyword`].
//! Anything else that looks like a name refers to a declared type and is
//! resolved later by the extractor.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::descriptor::ScalarType;
use crate::error::ModelError;

/// Parsed type expression, before name resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Scalar(ScalarType),
    /// Open-ended value of any shape.
    Any,
    /// Reference to a declared type, as written.
    Named(String),
    List(Box<TypeExpr>),
    Set(Box<TypeExpr>),
    Map(Box<TypeExpr>, Box<TypeExpr>),
    Nullable(Box<TypeExpr>),
}

impl FromStr for TypeExpr {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser {
            source: s,
            tokens: tokenize(s)?,
            pos: 0,
        };
        let expr = parser.expr()?;
        match parser.peek() {
            None => Ok(expr),
            Some(token) => Err(parser.error(format!("unexpected '{token}' after type"))),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(scalar) => f.write_str(scalar.keyword()),
            Self::Any => f.write_str("any"),
            Self::Named(name) => f.write_str(name),
            Self::List(items) => write!(f, "list<{items}>"),
            Self::Set(items) => write!(f, "set<{items}>"),
            Self::Map(key, value) => write!(f, "map<{key}, {value}>"),
            Self::Nullable(inner) => write!(f, "{inner}?"),
        }
    }
}

impl<'de> Deserialize<'de> for TypeExpr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for TypeExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Open,
    Close,
    Comma,
    Question,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => f.write_str(name),
            Self::Open => f.write_str("<"),
            Self::Close => f.write_str(">"),
            Self::Comma => f.write_str(","),
            Self::Question => f.write_str("?"),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, ModelError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        match c {
            '<' => tokens.push(Token::Open),
            '>' => tokens.push(Token::Close),
            ',' => tokens.push(Token::Comma),
            '?' => tokens.push(Token::Question),
            c if c.is_whitespace() => {}
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = start + c.len_utf8();
                while let Some(&(idx, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || matches!(next, '_' | '.' | '-' | '$') {
                        end = idx + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(source[start..end].to_string()));
            }
            other => {
                return Err(ModelError::InvalidTypeExpression {
                    expr: source.to_string(),
                    reason: format!("unexpected character '{other}'"),
                })
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn error(&self, reason: impl Into<String>) -> ModelError {
        ModelError::InvalidTypeExpression {
            expr: self.source.to_string(),
            reason: reason.into(),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ModelError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(self.error(format!("expected '{expected}', found '{token}'"))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn expr(&mut self) -> Result<TypeExpr, ModelError> {
        let base = self.base()?;
        if self.peek() == Some(&Token::Question) {
            self.next();
            if self.peek() == Some(&Token::Question) {
                return Err(self.error("duplicate '?'"));
            }
            return Ok(TypeExpr::Nullable(Box::new(base)));
        }
        Ok(base)
    }

    fn base(&mut self) -> Result<TypeExpr, ModelError> {
        let ident = match self.next() {
            Some(Token::Ident(ident)) => ident,
            Some(token) => return Err(self.error(format!("expected a type, found '{token}'"))),
            None => return Err(self.error("expected a type, found end of input")),
        };
        match ident.as_str() {
            "list" | "set" => {
                self.expect(Token::Open)?;
                let items = Box::new(self.expr()?);
                self.expect(Token::Close)?;
                Ok(if ident == "list" {
                    TypeExpr::List(items)
                } else {
                    TypeExpr::Set(items)
                })
            }
            "map" => {
                self.expect(Token::Open)?;
                let key = Box::new(self.expr()?);
                self.expect(Token::Comma)?;
                let value = Box::new(self.expr()?);
                self.expect(Token::Close)?;
                Ok(TypeExpr::Map(key, value))
            }
            "any" | "object" => Ok(TypeExpr::Any),
            other => {
                if other.ends_with('.') || other.contains("..") {
                    return Err(self.error(format!("malformed type name '{other}'")));
                }
                Ok(ScalarType::from_keyword(other)
                    .map(TypeExpr::Scalar)
                    .unwrap_or_else(|| TypeExpr::Named(other.to_string())))
            }
        }
    }
}
