//! Key/value walker over a tokenized config document.
//!
//! Each object is visited left to right exactly once. Nested objects are
//! handed to the callback as a [`Node`] and then skipped in full; scalar
//! values are handed over as a [`Scalar`]. Any structural surprise aborts
//! the walk with [`ConfigError::Parse`].

use std::borrow::Cow;

use tracing::trace;

use super::tokenizer::{tokenize, Token, TokenKind};
use crate::error::ConfigError;
use crate::parse::{atoi, parse_bool_fast, unescape};

/// A tokenized document. Always ends with [`Token::GUARD`].
#[derive(Debug)]
pub struct Document<'a> {
    text: &'a str,
    tokens: Vec<Token>,
}

impl<'a> Document<'a> {
    /// Tokenizes `text` with the given token budget.
    pub fn parse(text: &'a str, budget: usize) -> Result<Self, ConfigError> {
        let tokens = tokenize(text, budget)?;
        Ok(Self { text, tokens })
    }

    /// The first token, which must be an object for scanning to succeed.
    pub fn root(&self) -> Node<'_> {
        Node {
            doc: self,
            index: 0,
        }
    }

    /// Number of real tokens (excluding the guard).
    pub fn token_count(&self) -> usize {
        self.tokens.len() - 1
    }

    fn token(&self, index: usize) -> &Token {
        // The guard is always last; clamping keeps every lookup in bounds.
        &self.tokens[index.min(self.tokens.len() - 1)]
    }

    fn slice(&self, token: &Token) -> &'a str {
        self.text.get(token.start..token.end).unwrap_or("")
    }
}

/// A value handed to a scan callback.
#[derive(Debug, Clone, Copy)]
pub enum Entry<'d> {
    Scalar(Scalar<'d>),
    Object(Node<'d>),
}

/// A token that is expected to be an object.
#[derive(Debug, Clone, Copy)]
pub struct Node<'d> {
    doc: &'d Document<'d>,
    index: usize,
}

impl<'d> Node<'d> {
    /// Visits every key of this object in document order.
    ///
    /// The walk fails if this token is not an object, if the object is
    /// empty, if a key is not a string, or if a value is neither a scalar
    /// nor an object. Errors returned by `visit` abort the walk too.
    pub fn scan<F>(self, mut visit: F) -> Result<(), ConfigError>
    where
        F: FnMut(&'d str, Entry<'d>) -> Result<(), ConfigError>,
    {
        let doc = self.doc;
        let root = *doc.token(self.index);
        if root.kind != TokenKind::Object {
            return Err(ConfigError::Parse("expected object"));
        }
        if root.size == 0 {
            return Err(ConfigError::Parse("empty object"));
        }

        let mut index = self.index + 1;
        loop {
            let key = doc.token(index);
            if key.start >= root.end {
                return Ok(());
            }
            if key.kind != TokenKind::String {
                return Err(ConfigError::Parse("object key must be a string"));
            }
            let key_text = doc.slice(key);
            let value = doc.token(index + 1);

            match value.kind {
                TokenKind::Object => {
                    trace!(key = key_text, "nested object");
                    let nested_end = value.end;
                    visit(
                        key_text,
                        Entry::Object(Node {
                            doc,
                            index: index + 1,
                        }),
                    )?;
                    // Skip to the first token past the nested object.
                    index += 2;
                    while doc.token(index).end <= nested_end {
                        index += 1;
                    }
                }
                TokenKind::String | TokenKind::Primitive => {
                    let scalar = Scalar {
                        text: doc.slice(value),
                        is_string: value.kind == TokenKind::String,
                    };
                    trace!(key = key_text, value = scalar.text, "scalar");
                    visit(key_text, Entry::Scalar(scalar))?;
                    index += 2;
                }
                TokenKind::Array | TokenKind::Undefined => {
                    return Err(ConfigError::Parse("expected simple value"));
                }
            }
        }
    }
}

/// A string or primitive value.
#[derive(Debug, Clone, Copy)]
pub struct Scalar<'d> {
    text: &'d str,
    is_string: bool,
}

impl<'d> Scalar<'d> {
    /// The raw token text, without quotes and without escape decoding.
    pub fn raw(&self) -> &'d str {
        self.text
    }

    pub fn is_string(&self) -> bool {
        self.is_string
    }

    /// Lenient boolean, see [`parse_bool_fast`].
    pub fn as_bool(&self) -> bool {
        parse_bool_fast(self.text)
    }

    /// Lenient integer, see [`atoi`].
    pub fn as_i64(&self) -> i64 {
        atoi(self.text)
    }

    /// Integer clamped into `i32`.
    pub fn as_i32(&self) -> i32 {
        self.as_i64().clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }

    /// Decoded string contents.
    pub fn as_str(&self) -> Cow<'d, str> {
        unescape(self.text)
    }
}

/// Fails with a parse error when an entry is not a scalar.
pub fn expect_scalar(entry: Entry<'_>) -> Result<Scalar<'_>, ConfigError> {
    match entry {
        Entry::Scalar(scalar) => Ok(scalar),
        Entry::Object(_) => Err(ConfigError::Parse("expected simple value")),
    }
}

/// Fails with a parse error when an entry is not an object.
pub fn expect_object(entry: Entry<'_>) -> Result<Node<'_>, ConfigError> {
    match entry {
        Entry::Object(node) => Ok(node),
        Entry::Scalar(_) => Err(ConfigError::Parse("expected object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn collect(text: &str) -> Result<Vec<String>, ConfigError> {
        let doc = Document::parse(text, 64)?;
        let mut seen = Vec::new();
        doc.root().scan(|key, entry| {
            match entry {
                Entry::Scalar(s) => seen.push(format!("{key}={}", s.raw())),
                Entry::Object(_) => seen.push(format!("{key}={{}}")),
            }
            Ok(())
        })?;
        Ok(seen)
    }

    #[test]
    fn test_visits_in_document_order() {
        let seen = collect(r#"{"b":1,"a":"two","c":true}"#).unwrap();
        assert_eq!(seen, vec!["b=1", "a=two", "c=true"]);
    }

    #[test]
    fn test_skips_nested_objects() {
        let seen = collect(r#"{"x":{"deep":{"er":1},"k":[1,2]},"y":2}"#).unwrap();
        assert_eq!(seen, vec!["x={}", "y=2"]);
    }

    #[test]
    fn test_recursive_scan() {
        let doc = Document::parse(r#"{"outer":{"inner":5},"after":1}"#, 64).unwrap();
        let mut inner = 0;
        let mut after = 0;
        doc.root()
            .scan(|key, entry| {
                match key {
                    "outer" => expect_object(entry)?.scan(|key, entry| {
                        assert_eq!(key, "inner");
                        inner = expect_scalar(entry)?.as_i64();
                        Ok(())
                    })?,
                    "after" => after = expect_scalar(entry)?.as_i64(),
                    _ => unreachable!(),
                }
                Ok(())
            })
            .unwrap();
        assert_eq!((inner, after), (5, 1));
    }

    #[test]
    fn test_truncated_key_fails_cleanly() {
        let err = collect(r#"{"a":1,"b"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_trailing_key_at_end_of_document() {
        // The guard token is the value slot here.
        let doc = Document::parse(r#"{"a":{"b":1},"c"}"#, 64).unwrap();
        let result = doc.root().scan(|_, _| Ok(()));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(collect("{}"), Err(ConfigError::Parse(_))));
        assert!(matches!(collect("[1,2]"), Err(ConfigError::Parse(_))));
        assert!(matches!(collect(r#"{"a":[1]}"#), Err(ConfigError::Parse(_))));
        assert!(matches!(collect(r#"{"a":1"#), Err(ConfigError::Tokenize(_))));
    }

    #[test]
    fn test_callback_error_aborts() {
        let doc = Document::parse(r#"{"a":1,"b":2}"#, 64).unwrap();
        let mut visited = 0;
        let result = doc.root().scan(|key, _| {
            visited += 1;
            if key == "a" {
                return Err(ConfigError::invalid("a", "nope"));
            }
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(visited, 1);
    }

    #[test]
    fn test_scalar_helpers() {
        let doc = Document::parse(r#"{"s":"a\"b","n":-12,"t":true,"z":null}"#, 64).unwrap();
        doc.root()
            .scan(|key, entry| {
                let s = expect_scalar(entry)?;
                match key {
                    "s" => {
                        assert!(s.is_string());
                        assert_eq!(s.as_str(), "a\"b");
                    }
                    "n" => assert_eq!(s.as_i32(), -12),
                    "t" => assert!(s.as_bool()),
                    "z" => assert!(!s.as_bool() && !s.is_string()),
                    _ => unreachable!(),
                }
                Ok(())
            })
            .unwrap();
    }
}
