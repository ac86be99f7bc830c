//! Declaration heads
//!
//!     Grammar of a declaration line, split at its first `=`:
//!
//!         KEY [ "[" INDEX "]" ] [ "+" ] "=" VALUES
//!         KEY [ "[" INDEX "]" ] ":" [ "const" ] TYPE [ "[" SIZE "]" ] [ UNIT ] [ "+" ] "=" VALUES
//!
//!     The first form is a string scalar. `UNIT` is one of `as <label>` (real scalar),
//!     `in <symbol>` (real vector) or `as path` (string). An index selects item override of an
//!     existing vector and `+=` selects append; both are only legal in the combinations checked
//!     at the end of [parse_declaration].

use crate::props::error::Fault;
use crate::props::lexing::tokens::{tokenize_head, HeadToken};
use crate::props::store::{Cardinality, Kind};
use crate::props::units::UnitRegistry;

pub const ASSIGN: char = '=';
pub const APPEND_MARK: char = '+';
pub const LOCK_DECORATOR: &str = "const";
pub const AS_DIRECTIVE: &str = "as";
pub const IN_DIRECTIVE: &str = "in";
pub const PATH_LABEL: &str = "path";

/// Unit or path annotation of a declaration
#[derive(Debug, Clone, PartialEq)]
pub enum UnitDirective {
    None,
    /// `as <label>`: the inline unit symbol of a real scalar must belong to this label
    Label(String),
    /// `in <symbol>`: every element of a real vector is expressed in this unit
    Symbol { symbol: String, factor: f64 },
    /// `as path`
    Path,
}

/// How a declaration meets an existing key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Declare,
    Append,
    ItemOverride(usize),
}

/// A parsed declaration head plus its raw value segment
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub key: String,
    pub mode: Mode,
    pub locked: bool,
    pub kind: Kind,
    /// Declared vector size, `None` for scalars
    pub size: Option<usize>,
    pub unit: UnitDirective,
    /// Text after `=`, trimmed
    pub values: String,
}

impl Declaration {
    pub fn cardinality(&self) -> Cardinality {
        match self.size {
            Some(_) => Cardinality::Vector,
            None => Cardinality::Scalar,
        }
    }

    pub fn is_vector(&self) -> bool {
        self.size.is_some()
    }
}

struct HeadCursor<'a> {
    source: &'a str,
    tokens: Vec<(HeadToken, logos::Span)>,
    pos: usize,
}

impl<'a> HeadCursor<'a> {
    fn new(source: &'a str) -> Self {
        HeadCursor {
            source,
            tokens: tokenize_head(source),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<&HeadToken> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn next(&mut self) -> Option<HeadToken> {
        let token = self.tokens.get(self.pos).map(|(token, _)| token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &HeadToken) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn peek_word(&self) -> Option<&str> {
        match self.peek() {
            Some(HeadToken::Word(word)) => Some(word),
            _ => None,
        }
    }

    fn expect_word(&mut self, missing: impl FnOnce() -> String) -> Result<String, Fault> {
        match self.next() {
            Some(HeadToken::Word(word)) => Ok(word),
            _ => Err(Fault::syntax(missing())),
        }
    }

    /// Unconsumed head text, if any
    fn remaining(&self) -> Option<&'a str> {
        let source = self.source;
        self.tokens
            .get(self.pos)
            .map(|(_, span)| source[span.start..].trim_end())
    }
}

/// Parse a declaration line
///
/// Unit directives are validated against `units`; they are rejected outright when
/// `real_with_unit` is off.
pub fn parse_declaration(
    line: &str,
    units: &dyn UnitRegistry,
    real_with_unit: bool,
) -> Result<Declaration, Fault> {
    let (head, values) = line.split_once(ASSIGN).ok_or_else(|| {
        Fault::syntax(format!("cannot find assignment symbol '=' in '{}'", line))
    })?;
    let (head, append) = match head.strip_suffix(APPEND_MARK) {
        Some(stripped) => (stripped, true),
        None => (head, false),
    };
    let head = head.trim_end();

    let mut cursor = HeadCursor::new(head);
    let key = match cursor.next() {
        Some(HeadToken::Word(key)) => key,
        _ => {
            return Err(Fault::syntax(format!(
                "missing property key in '{}'",
                line
            )))
        }
    };
    let index = if cursor.eat(&HeadToken::OpenBracket) {
        Some(parse_index(&mut cursor, &key)?)
    } else {
        None
    };

    let mut locked = false;
    let mut kind = Kind::String;
    let mut size = None;
    let mut unit = UnitDirective::None;

    match cursor.next() {
        None => {}
        Some(HeadToken::Colon) => {
            let mut type_word =
                cursor.expect_word(|| format!("missing type specifier for key '{}'", key))?;
            if type_word == LOCK_DECORATOR {
                locked = true;
                type_word =
                    cursor.expect_word(|| format!("missing type specifier for key '{}'", key))?;
            }
            kind = Kind::from_label(&type_word).ok_or_else(|| {
                Fault::syntax(format!(
                    "invalid type specifier '{}' for key '{}'",
                    type_word, key
                ))
            })?;
            if cursor.eat(&HeadToken::OpenBracket) {
                size = Some(parse_size(&mut cursor, &key)?);
            }
            unit = parse_unit_directive(
                &mut cursor,
                &key,
                kind,
                size.is_some(),
                units,
                real_with_unit,
            )?;
        }
        Some(other) => {
            return Err(Fault::syntax(format!(
                "unexpected token '{}' after key '{}'",
                other, key
            )))
        }
    }

    if let Some(rest) = cursor.remaining() {
        return Err(Fault::syntax(format!(
            "unsupported trailing token '{}' in declaration of key '{}'",
            rest, key
        )));
    }

    let mode = match (index, append) {
        (Some(_), true) => {
            return Err(Fault::syntax(format!(
                "append mode cannot be combined with an array item for key '{}'",
                key
            )))
        }
        (Some(_), false) if size.is_some() => {
            return Err(Fault::syntax(format!(
                "array item override of key '{}' expects a scalar declaration",
                key
            )))
        }
        (Some(index), false) => Mode::ItemOverride(index),
        (None, true) if size.is_none() => {
            return Err(Fault::syntax(format!(
                "append mode is only supported for array property with key '{}'",
                key
            )))
        }
        (None, true) => Mode::Append,
        (None, false) => Mode::Declare,
    };

    Ok(Declaration {
        key,
        mode,
        locked,
        kind,
        size,
        unit,
        values: values.trim().to_string(),
    })
}

fn parse_index(cursor: &mut HeadCursor<'_>, key: &str) -> Result<usize, Fault> {
    let invalid = || Fault::syntax(format!("invalid array item format for key '{}'", key));
    let word = cursor.expect_word(|| format!("invalid array item format for key '{}'", key))?;
    let index = word.parse::<usize>().map_err(|_| invalid())?;
    if !cursor.eat(&HeadToken::CloseBracket) {
        return Err(invalid());
    }
    Ok(index)
}

fn parse_size(cursor: &mut HeadCursor<'_>, key: &str) -> Result<usize, Fault> {
    let word = cursor.expect_word(|| format!("cannot find vector size for key '{}'", key))?;
    let size = word.parse::<i64>().map_err(|_| {
        Fault::syntax(format!(
            "cannot find vector size for key '{}' in '{}'",
            key, word
        ))
    })?;
    if size < 0 {
        return Err(Fault::syntax(format!(
            "invalid vector size {} for key '{}'",
            size, key
        )));
    }
    if !cursor.eat(&HeadToken::CloseBracket) {
        return Err(Fault::syntax(format!(
            "invalid vector size closing symbol for key '{}'",
            key
        )));
    }
    usize::try_from(size)
        .map_err(|_| Fault::syntax(format!("invalid vector size {} for key '{}'", size, key)))
}

fn parse_unit_directive(
    cursor: &mut HeadCursor<'_>,
    key: &str,
    kind: Kind,
    vector: bool,
    units: &dyn UnitRegistry,
    real_with_unit: bool,
) -> Result<UnitDirective, Fault> {
    let directive = match cursor.peek_word() {
        Some(word) if word == AS_DIRECTIVE || word == IN_DIRECTIVE => word.to_string(),
        _ => return Ok(UnitDirective::None),
    };
    cursor.next();
    let argument = cursor.expect_word(|| {
        format!(
            "missing argument after '{}' directive for key '{}'",
            directive, key
        )
    })?;

    match (kind, directive.as_str()) {
        (Kind::String, AS_DIRECTIVE) if argument == PATH_LABEL => Ok(UnitDirective::Path),
        (Kind::String, _) => Err(Fault::syntax(format!(
            "unsupported directive '{} {}' for string property with key '{}'",
            directive, argument, key
        ))),
        (Kind::Boolean | Kind::Integer, _) => Err(Fault::syntax(format!(
            "non-real property with key '{}' does not support explicit unit",
            key
        ))),
        (Kind::Real, _) if !real_with_unit => Err(Fault::syntax(format!(
            "unit directive for key '{}' requires the 'real with unit' feature",
            key
        ))),
        (Kind::Real, AS_DIRECTIVE) => {
            if vector {
                return Err(Fault::syntax(format!(
                    "'as' unit label directive is not supported for real vector with key '{}'; use 'in <unit symbol>'",
                    key
                )));
            }
            if !units.is_label_valid(&argument) {
                return Err(Fault::resolution(format!(
                    "invalid unit label '{}' for key '{}'",
                    argument, key
                )));
            }
            Ok(UnitDirective::Label(argument))
        }
        (Kind::Real, _) => {
            if !vector {
                return Err(Fault::syntax(format!(
                    "'in' unit symbol directive is only supported for real vector, not for scalar key '{}'",
                    key
                )));
            }
            let unit = units.find_unit(&argument).ok_or_else(|| {
                Fault::resolution(format!(
                    "unknown unit symbol '{}' for key '{}'",
                    argument, key
                ))
            })?;
            Ok(UnitDirective::Symbol {
                symbol: argument,
                factor: unit.factor,
            })
        }
    }
}
