//! JSON plumbing for the config pipeline: a bounded tokenizer, a key/value
//! scanner over its tokens and a bounded report writer.

pub mod scanner;
pub mod tokenizer;
pub mod writer;

pub use scanner::{expect_object, expect_scalar, Document, Entry, Node, Scalar};
pub use tokenizer::{tokenize, Token, TokenKind, TokenizeError, DEFAULT_TOKEN_BUDGET};
pub use writer::{JsonStr, ReportWriter};
