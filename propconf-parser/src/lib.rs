//! # propconf
//!
//! Reader and writer for the typed properties configuration format.
//!
//! File Layout
//!
//!     Everything lives under [props]. The reading side is split the same way the data flows:
//!     src/props
//!       ├── lexing        Logical lines, line classification and logos tokens
//!       ├── parsing       Declaration heads and value segments
//!       ├── directives    `#@...` meta-comments and their effect on the parser context
//!       ├── variants      Conditional blocks and the variant resolver seam
//!       ├── includes      Include path resolution
//!       ├── overrides     Key collision policy
//!       ├── reader        Orchestration of all of the above
//!       └── writer        The inverse of the reader
//!
//!     The store, units and error types are shared by both directions.

pub mod props;

pub use props::error::{ErrorKind, Fault, Location, ReadError, WriteError};
pub use props::includes::{EnvStrategy, IncludeResolver, SearchPathResolver};
pub use props::reader::{parse_str, ReadOutcome, Reader, ReaderOptions};
pub use props::store::{Cardinality, Data, Datum, Kind, PropertyStore};
pub use props::units::{StandardUnits, Unit, UnitRegistry};
pub use props::variants::{VariantActivation, VariantRepository, VariantResolver};
pub use props::writer::{Writer, WriterOptions};
