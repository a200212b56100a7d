//! Strict, flat JSON tokenizer.
//!
//! Produces a single array of tokens in document order. Containers record
//! their byte extent and the number of direct children (for objects: the
//! number of keys). A key string token has one child, its value.
//!
//! The token array is bounded by a budget so a hostile request cannot make
//! the parser allocate without limit.

use thiserror::Error;

/// Default number of tokens accepted for one config document.
pub const DEFAULT_TOKEN_BUDGET: usize = 128;

/// Kind of a JSON token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Only used by the trailing guard token.
    Undefined,
    Object,
    Array,
    String,
    /// Numbers, `true`, `false` and `null`.
    Primitive,
}

/// One token: a kind, its byte range in the source and its child count.
///
/// For strings the range excludes the quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    pub size: usize,
    parent: Option<usize>,
}

impl Token {
    /// Token appended after the last real token. Its end is unbounded, so
    /// any forward scan stops on it.
    pub const GUARD: Token = Token {
        kind: TokenKind::Undefined,
        start: usize::MAX,
        end: usize::MAX,
        size: 0,
        parent: None,
    };

    fn open(kind: TokenKind, start: usize, parent: Option<usize>) -> Self {
        Self {
            kind,
            start,
            end: usize::MAX,
            size: 0,
            parent,
        }
    }

    fn is_open(&self) -> bool {
        self.end == usize::MAX
    }

    /// Whether the token is a plain value (string or primitive).
    pub fn is_simple(&self) -> bool {
        matches!(self.kind, TokenKind::String | TokenKind::Primitive)
    }
}

/// Errors reported by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenizeError {
    /// An unexpected character was found.
    #[error("invalid character at byte {0}")]
    Invalid(usize),

    /// The input ended in the middle of a value.
    #[error("incomplete document")]
    Partial,

    /// More tokens than the budget allows.
    #[error("payload too large (more than {0} tokens)")]
    TooManyTokens(usize),
}

/// Tokenizes `text`, producing at most `budget` tokens followed by the guard.
pub fn tokenize(text: &str, budget: usize) -> Result<Vec<Token>, TokenizeError> {
    Tokenizer::new(text.as_bytes(), budget).run()
}

struct Tokenizer<'a> {
    input: &'a [u8],
    pos: usize,
    budget: usize,
    tokens: Vec<Token>,
    /// Token that new values attach to.
    sup: Option<usize>,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a [u8], budget: usize) -> Self {
        Self {
            input,
            pos: 0,
            budget,
            tokens: Vec::with_capacity(budget.min(input.len() / 2 + 1) + 1),
            sup: None,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, TokenizeError> {
        while self.pos < self.input.len() {
            let c = self.input[self.pos];
            match c {
                b'{' | b'[' => self.open_container(c)?,
                b'}' | b']' => self.close_container(c)?,
                b'"' => {
                    self.check_value_allowed(true)?;
                    self.string()?;
                }
                b'\t' | b'\r' | b'\n' | b' ' => {}
                b':' => {
                    if self.tokens.is_empty() {
                        return Err(TokenizeError::Invalid(self.pos));
                    }
                    self.sup = Some(self.tokens.len() - 1);
                }
                b',' => {
                    if let Some(sup) = self.sup {
                        let kind = self.tokens[sup].kind;
                        if kind != TokenKind::Array && kind != TokenKind::Object {
                            self.sup = self.tokens[sup].parent;
                        }
                    }
                }
                b'-' | b'0'..=b'9' | b't' | b'f' | b'n' => {
                    self.check_value_allowed(false)?;
                    self.primitive()?;
                }
                _ => return Err(TokenizeError::Invalid(self.pos)),
            }
            self.pos += 1;
        }

        if self.tokens.iter().any(Token::is_open) {
            return Err(TokenizeError::Partial);
        }

        self.tokens.push(Token::GUARD);
        Ok(self.tokens)
    }

    fn alloc(&mut self, token: Token) -> Result<usize, TokenizeError> {
        if self.tokens.len() >= self.budget {
            return Err(TokenizeError::TooManyTokens(self.budget));
        }
        self.tokens.push(token);
        Ok(self.tokens.len() - 1)
    }

    /// Object keys must be strings, a key holds exactly one value and a
    /// key is followed by `:` before its value.
    fn check_value_allowed(&self, is_string: bool) -> Result<(), TokenizeError> {
        if let Some(sup) = self.sup {
            let parent = &self.tokens[sup];
            let invalid = match parent.kind {
                TokenKind::Object => !is_string || self.has_unpaired_key(sup),
                TokenKind::String => parent.size != 0,
                _ => false,
            };
            if invalid {
                return Err(TokenizeError::Invalid(self.pos));
            }
        }
        Ok(())
    }

    /// Whether the last token is a key of `object` still waiting for `:`.
    fn has_unpaired_key(&self, object: usize) -> bool {
        self.tokens.last().is_some_and(|last| {
            last.kind == TokenKind::String && last.size == 0 && last.parent == Some(object)
        })
    }

    fn attach_to_parent(&mut self) {
        if let Some(sup) = self.sup {
            self.tokens[sup].size += 1;
        }
    }

    fn open_container(&mut self, c: u8) -> Result<(), TokenizeError> {
        if let Some(sup) = self.sup {
            if self.tokens[sup].kind == TokenKind::Object {
                return Err(TokenizeError::Invalid(self.pos));
            }
        }
        let kind = if c == b'{' {
            TokenKind::Object
        } else {
            TokenKind::Array
        };
        let index = self.alloc(Token::open(kind, self.pos, self.sup))?;
        self.attach_to_parent();
        self.sup = Some(index);
        Ok(())
    }

    fn close_container(&mut self, c: u8) -> Result<(), TokenizeError> {
        let kind = if c == b'}' {
            TokenKind::Object
        } else {
            TokenKind::Array
        };

        let open = self
            .tokens
            .iter()
            .rposition(|t| t.is_open() && t.kind != TokenKind::Undefined)
            .ok_or(TokenizeError::Invalid(self.pos))?;
        if self.tokens[open].kind != kind {
            return Err(TokenizeError::Invalid(self.pos));
        }
        self.tokens[open].end = self.pos + 1;
        self.sup = self.tokens[open].parent;

        // A container closing right after a key's value also closes that key.
        if let Some(sup) = self.sup {
            if self.tokens[sup].kind == TokenKind::String {
                self.sup = self.tokens[sup].parent;
            }
        }
        Ok(())
    }

    fn string(&mut self) -> Result<(), TokenizeError> {
        let start = self.pos;
        self.pos += 1;
        while self.pos < self.input.len() {
            match self.input[self.pos] {
                b'"' => {
                    let mut token = Token::open(TokenKind::String, start + 1, self.sup);
                    token.end = self.pos;
                    self.alloc(token)?;
                    self.attach_to_parent();
                    return Ok(());
                }
                b'\\' => {
                    self.pos += 1;
                    match self.input.get(self.pos) {
                        Some(b'"' | b'/' | b'\\' | b'b' | b'f' | b'r' | b'n' | b't') => {}
                        Some(b'u') => {
                            for _ in 0..4 {
                                self.pos += 1;
                                match self.input.get(self.pos) {
                                    Some(h) if h.is_ascii_hexdigit() => {}
                                    Some(_) => return Err(TokenizeError::Invalid(self.pos)),
                                    None => return Err(TokenizeError::Partial),
                                }
                            }
                        }
                        Some(_) => return Err(TokenizeError::Invalid(self.pos)),
                        None => return Err(TokenizeError::Partial),
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        Err(TokenizeError::Partial)
    }

    fn primitive(&mut self) -> Result<(), TokenizeError> {
        let start = self.pos;
        while self.pos < self.input.len() {
            match self.input[self.pos] {
                b'\t' | b'\r' | b'\n' | b' ' | b',' | b']' | b'}' => {
                    let mut token = Token::open(TokenKind::Primitive, start, self.sup);
                    token.end = self.pos;
                    self.alloc(token)?;
                    self.attach_to_parent();
                    // The outer loop advances past the delimiter, which must
                    // still be processed.
                    self.pos -= 1;
                    return Ok(());
                }
                c if !(32..127).contains(&c) => return Err(TokenizeError::Invalid(self.pos)),
                _ => {}
            }
            self.pos += 1;
        }
        // A primitive can only end on a delimiter, so a bare top-level
        // primitive is incomplete.
        Err(TokenizeError::Partial)
    }
}
