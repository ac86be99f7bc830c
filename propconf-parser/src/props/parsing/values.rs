//! Value readers
//!
//!     Values are read left to right from the value segment, one token per value. What a token
//!     may be depends on the declared kind:
//!
//!         boolean   `true`/`false` (any case), `1`/`0`, `T`/`F`
//!         integer   32-bit signed decimal
//!         real      anything `f64` parses, including `nan` and `inf`
//!         string    a double-quoted string or a bare word
//!
//!     A real scalar may be followed by a unit symbol when the `real with unit` feature is on.
//!     The stored value is then `number × factor` and the symbol is kept for writing back.
//!     Vectors of reals take their unit from the `in <symbol>` directive of the head instead.
//!
//!     Once the declared number of values has been read, whatever remains is returned as
//!     `trailing` unless it is a comment. Trailing text is not an error: the reader only warns.

use crate::props::error::Fault;
use crate::props::lexing::tokens::{tokenize_values, ValueToken};
use crate::props::parsing::declaration::{Declaration, UnitDirective};
use crate::props::store::{Data, Kind};
use crate::props::units::UnitRegistry;

/// Data read from a value segment
#[derive(Debug, Clone, PartialEq)]
pub struct ValueReadout {
    pub data: Data,
    /// Unread non-comment text after the last value
    pub trailing: Option<String>,
}

struct ValueCursor<'a> {
    source: &'a str,
    tokens: Vec<(Result<ValueToken, ()>, logos::Span)>,
    pos: usize,
}

impl<'a> ValueCursor<'a> {
    fn new(source: &'a str) -> Self {
        ValueCursor {
            source,
            tokens: tokenize_values(source),
            pos: 0,
        }
    }

    fn slice(&self, span: &logos::Span) -> &'a str {
        let source = self.source;
        &source[span.clone()]
    }

    /// Next value token as text; a comment or the end of the segment means the value is missing
    fn next_value(&mut self, key: &str, what: Kind) -> Result<(String, bool), Fault> {
        let (token, span) = match self.tokens.get(self.pos) {
            Some((token, span)) => (token.clone(), span.clone()),
            None => {
                return Err(Fault::syntax(format!(
                    "missing {} value for key '{}'",
                    what, key
                )))
            }
        };
        match token {
            Ok(ValueToken::Word(word)) => {
                self.pos += 1;
                Ok((word, false))
            }
            Ok(ValueToken::Quoted(text)) => {
                self.pos += 1;
                Ok((text, true))
            }
            Ok(ValueToken::Comment) => Err(Fault::syntax(format!(
                "missing {} value for key '{}'",
                what, key
            ))),
            Err(()) => Err(Fault::syntax(format!(
                "cannot read {} value from '{}' for key '{}'",
                what,
                self.slice(&span),
                key
            ))),
        }
    }

    /// Next token when it is not a comment
    fn next_word(&mut self) -> Option<Result<String, String>> {
        let (token, span) = self.tokens.get(self.pos)?.clone();
        let word = match token {
            Ok(ValueToken::Comment) => return None,
            Ok(ValueToken::Word(word)) | Ok(ValueToken::Quoted(word)) => Ok(word),
            Err(()) => Err(self.slice(&span).to_string()),
        };
        self.pos += 1;
        Some(word)
    }

    fn trailing(&self) -> Option<String> {
        match self.tokens.get(self.pos) {
            None | Some((Ok(ValueToken::Comment), _)) => None,
            Some((_, span)) => Some(self.source[span.start..].trim_end().to_string()),
        }
    }
}

/// Read the values of `decl` from `segment`
pub fn read_values(
    decl: &Declaration,
    segment: &str,
    real_with_unit: bool,
    units: &dyn UnitRegistry,
) -> Result<ValueReadout, Fault> {
    let mut cursor = ValueCursor::new(segment);
    let count = decl.size.unwrap_or(1);
    let key = decl.key.as_str();

    let data = match decl.kind {
        Kind::Boolean => {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                let (text, quoted) = cursor.next_value(key, Kind::Boolean)?;
                values.push(
                    parse_boolean(&text)
                        .filter(|_| !quoted)
                        .ok_or_else(|| invalid(Kind::Boolean, &text, key))?,
                );
            }
            Data::Boolean { values }
        }
        Kind::Integer => {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                let (text, quoted) = cursor.next_value(key, Kind::Integer)?;
                values.push(
                    text.parse::<i32>()
                        .ok()
                        .filter(|_| !quoted)
                        .ok_or_else(|| invalid(Kind::Integer, &text, key))?,
                );
            }
            Data::Integer { values }
        }
        Kind::Real => read_reals(&mut cursor, decl, count, real_with_unit, units)?,
        Kind::String => {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                let (text, _) = cursor.next_value(key, Kind::String)?;
                values.push(text);
            }
            Data::String {
                values,
                explicit_path: decl.unit == UnitDirective::Path,
            }
        }
    };

    Ok(ValueReadout {
        data,
        trailing: cursor.trailing(),
    })
}

fn read_reals(
    cursor: &mut ValueCursor<'_>,
    decl: &Declaration,
    count: usize,
    real_with_unit: bool,
    units: &dyn UnitRegistry,
) -> Result<Data, Fault> {
    let key = decl.key.as_str();
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let (text, quoted) = cursor.next_value(key, Kind::Real)?;
        values.push(
            text.parse::<f64>()
                .ok()
                .filter(|_| !quoted)
                .ok_or_else(|| invalid(Kind::Real, &text, key))?,
        );
    }

    if let UnitDirective::Symbol { symbol, factor } = &decl.unit {
        values.iter_mut().for_each(|v| *v *= factor);
        return Ok(Data::Real {
            values,
            unit_symbol: Some(symbol.clone()),
        });
    }

    let mut unit_symbol = None;
    if !decl.is_vector() {
        if let Some(word) = cursor.next_word() {
            let word = word.map_err(|raw| {
                Fault::syntax(format!(
                    "cannot read unit symbol from '{}' for key '{}'",
                    raw, key
                ))
            })?;
            if !real_with_unit {
                return Err(Fault::syntax(format!(
                    "trailing token '{}' is not allowed for real value with key '{}'; the 'real with unit' feature is disabled",
                    word, key
                )));
            }
            let unit = units.find_unit(&word).ok_or_else(|| {
                Fault::resolution(format!(
                    "invalid unit symbol '{}' for key '{}'",
                    word, key
                ))
            })?;
            if let UnitDirective::Label(label) = &decl.unit {
                if &unit.label != label {
                    return Err(Fault::semantic(format!(
                        "unit symbol '{}' of key '{}' is a {} unit, not a {} unit",
                        word, key, unit.label, label
                    )));
                }
            }
            values.iter_mut().for_each(|v| *v *= unit.factor);
            unit_symbol = Some(word);
        }
    }

    Ok(Data::Real {
        values,
        unit_symbol,
    })
}

pub fn parse_boolean(text: &str) -> Option<bool> {
    match text {
        "1" | "T" => Some(true),
        "0" | "F" => Some(false),
        _ if text.eq_ignore_ascii_case("true") => Some(true),
        _ if text.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn invalid(kind: Kind, text: &str, key: &str) -> Fault {
    Fault::syntax(format!(
        "cannot read {} value from '{}' for key '{}'",
        kind, text, key
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::parsing::declaration::parse_declaration;
    use crate::props::units::StandardUnits;

    fn read(line: &str) -> Result<ValueReadout, Fault> {
        let decl = parse_declaration(line, &StandardUnits, true)?;
        read_values(&decl, &decl.values, true, &StandardUnits)
    }

    #[test]
    fn test_booleans() {
        let out = read("flags : boolean[6] = true FALSE 1 0 T F").unwrap();
        assert_eq!(
            out.data,
            Data::Boolean {
                values: vec![true, false, true, false, true, false]
            }
        );
    }

    #[test]
    fn test_integer_vector_and_comment() {
        let out = read("v : integer[3] = 1 -2 +3 # counts").unwrap();
        assert_eq!(
            out.data,
            Data::Integer {
                values: vec![1, -2, 3]
            }
        );
        assert_eq!(out.trailing, None);
    }

    #[test]
    fn test_real_with_inline_unit() {
        let out = read("t : real = 2 s").unwrap();
        assert_eq!(
            out.data,
            Data::Real {
                values: vec![2.0e9],
                unit_symbol: Some("s".to_string())
            }
        );
    }

    #[test]
    fn test_real_without_unit_feature_rejects_symbol() {
        let decl = parse_declaration("t : real = 2 s", &StandardUnits, false).unwrap();
        let err = read_values(&decl, &decl.values, false, &StandardUnits).unwrap_err();
        assert!(matches!(err, Fault::Syntax(_)));
    }

    #[test]
    fn test_real_label_mismatch() {
        let err = read("w : real as length = 2 s").unwrap_err();
        assert!(matches!(err, Fault::Semantic(_)));
    }

    #[test]
    fn test_real_unknown_symbol() {
        let err = read("w : real = 2 furlong").unwrap_err();
        assert!(matches!(err, Fault::Resolution(_)));
    }

    #[test]
    fn test_real_vector_in_unit() {
        let out = read("p : real[2] in cm = 1 2.5").unwrap();
        assert_eq!(
            out.data,
            Data::Real {
                values: vec![10.0, 25.0],
                unit_symbol: Some("cm".to_string())
            }
        );
    }

    #[test]
    fn test_real_vector_ignores_trailing_unit() {
        let out = read("p : real[2] = 1 2 mm").unwrap();
        assert_eq!(out.trailing.as_deref(), Some("mm"));
    }

    #[test]
    fn test_special_reals() {
        let out = read("r : real[2] = nan inf").unwrap();
        match out.data {
            Data::Real { values, .. } => {
                assert!(values[0].is_nan());
                assert!(values[1].is_infinite());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_strings_quoted_and_bare() {
        let out = read("s : string[3] = \"a b\" plain \"\"").unwrap();
        assert_eq!(
            out.data,
            Data::String {
                values: vec!["a b".into(), "plain".into(), "".into()],
                explicit_path: false
            }
        );
    }

    #[test]
    fn test_path_flag() {
        let out = read("f : string as path = \"${HOME}/data\"").unwrap();
        assert!(out.data.is_explicit_path());
    }

    #[test]
    fn test_missing_values() {
        let err = read("v : integer[3] = 1 2").unwrap_err();
        assert!(err.message().contains("missing integer value"));
        let err = read("v : integer[2] = 1 # 2").unwrap_err();
        assert!(err.message().contains("missing integer value"));
    }

    #[test]
    fn test_invalid_integer() {
        let err = read("v : integer = 1.5").unwrap_err();
        assert!(err.message().contains("cannot read integer value from '1.5'"));
    }

    #[test]
    fn test_empty_vector() {
        let out = read("v : integer[0] =").unwrap();
        assert_eq!(out.data, Data::Integer { values: vec![] });
    }

    #[test]
    fn test_trailing_text_is_reported() {
        let out = read("n : integer = 4 and more").unwrap();
        assert_eq!(out.trailing.as_deref(), Some("and more"));
    }

    #[test]
    fn test_unterminated_string() {
        let err = read("s : string = \"open").unwrap_err();
        assert!(matches!(err, Fault::Syntax(_)));
    }
}
