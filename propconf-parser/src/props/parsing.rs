//! Parsing
//!
//!     Turns the text of a declaration line into typed data, in two independent halves:
//!
//!         - [declaration]: the head `key[index] : [const] type[size] [as|in ...]` and the
//!           assignment operator become a [Declaration]. This half is checked before any
//!           variant gating, so a malformed head is an error even in an inactive block.
//!
//!         - [values]: the value segment is read according to the declaration, yielding
//!           [Data](crate::props::store::Data).
//!
//!     Both are pure functions of their input plus the unit registry.

pub mod declaration;
pub mod values;

pub use declaration::{parse_declaration, Declaration, Mode, UnitDirective};
pub use values::{read_values, ValueReadout};
