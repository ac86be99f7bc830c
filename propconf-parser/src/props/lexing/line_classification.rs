//! Line classification
//!
//!     Determines what a logical line is, from its first non-blank characters:
//!
//!         - `#` followed (after optional blanks) by a word starting with `@`: a meta-directive
//!         - any other `#` line: a plain comment
//!         - anything else: a property declaration

/// Comment character
pub const COMMENT: char = '#';
/// Prefix of meta-directive tokens
pub const META: char = '@';

/// Line category, borrowing the relevant part of the line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType<'a> {
    Comment,
    /// Directive text starting at `@`
    Directive(&'a str),
    /// Declaration text without surrounding blanks
    Declaration(&'a str),
}

pub fn classify_line(text: &str) -> LineType<'_> {
    let trimmed = text.trim();
    match trimmed.strip_prefix(COMMENT) {
        Some(rest) => {
            let rest = rest.trim_start();
            if rest.starts_with(META) {
                LineType::Directive(rest)
            } else {
                LineType::Comment
            }
        }
        None => LineType::Declaration(trimmed),
    }
}
