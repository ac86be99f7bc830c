//! Lexing
//!
//!     The input is line oriented. Lexing happens in three small steps, each in its own module:
//!
//!         1. [line_assembler]: physical lines become logical lines. A trailing `\` joins the
//!            next physical line, blank logical lines are dropped.
//!
//!         2. [line_classification]: each logical line is a plain comment, a meta-directive
//!            (`#@...`) or a property declaration.
//!
//!         3. [tokens]: logos lexers for the two halves of a declaration, the head before `=`
//!            and the value segment after it.
//!
//!     No step here knows about types, units or the store.

pub mod line_assembler;
pub mod line_classification;
pub mod tokens;

pub use line_assembler::{LineAssembler, LogicalLine};
pub use line_classification::{classify_line, LineType};
pub use tokens::{tokenize_head, tokenize_values, HeadToken, ValueToken};
