//! Declaration tokens
//!
//!     A declaration `key : const real[3] in mm = 1 2 3 # note` is split at its first `=` into a
//!     head and a value segment. Both halves are tokenized with logos, with different token sets:
//!
//!         - [HeadToken]: words and the `:`, `[`, `]` punctuation. Blanks only separate tokens.
//!         - [ValueToken]: double-quoted strings (with `\"` and `\\` escapes), bare words and a
//!           trailing comment that swallows the rest of the segment.
//!
//!     Tokens are paired with their byte span so callers can report the unread remainder of a
//!     segment verbatim.

use logos::Logos;
use std::fmt;

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum HeadToken {
    #[token(":")]
    Colon,

    #[token("[")]
    OpenBracket,

    #[token("]")]
    CloseBracket,

    #[regex(r"[^ \t\r\n\f:\[\]]+", |lex| lex.slice().to_string())]
    Word(String),
}

impl fmt::Display for HeadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeadToken::Colon => f.write_str(":"),
            HeadToken::OpenBracket => f.write_str("["),
            HeadToken::CloseBracket => f.write_str("]"),
            HeadToken::Word(word) => f.write_str(word),
        }
    }
}

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum ValueToken {
    #[regex(r##""([^"\\]|\\.)*""##, unquote)]
    Quoted(String),

    #[regex(r"#[^\n]*")]
    Comment,

    #[regex(r##"[^ \t\r\n\f"#][^ \t\r\n\f"]*"##, |lex| lex.slice().to_string())]
    Word(String),
}

fn unquote(lex: &mut logos::Lexer<ValueToken>) -> String {
    let slice = lex.slice();
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Tokenize a declaration head
pub fn tokenize_head(source: &str) -> Vec<(HeadToken, logos::Span)> {
    let mut lexer = HeadToken::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        if let Ok(token) = result {
            tokens.push((token, lexer.span()));
        }
    }

    tokens
}

/// Tokenize a value segment, keeping unlexable spans (e.g. an unterminated quote) as errors
pub fn tokenize_values(source: &str) -> Vec<(Result<ValueToken, ()>, logos::Span)> {
    let mut lexer = ValueToken::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        tokens.push((result, lexer.span()));
    }

    tokens
}
