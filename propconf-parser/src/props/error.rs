//! Error types
//!
//!     Every component returns a [Fault], a message tagged with its category. The reader is the
//!     only place that knows where it is in the input, so it wraps faults into a [ReadError]
//!     carrying a [Location]. Nothing below the reader ever sees file names or line numbers.
//!
//!     Warnings are not errors: they go through `tracing::warn!` at the point where they occur.

use std::fmt;
use std::io;
use thiserror::Error;

/// Category of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input: bad declaration head, unknown directive, unclosed block
    Syntax,
    /// Well formed input that breaks a rule: forbidden override, locked key, label mismatch
    Semantic,
    /// Something named in the input could not be found: unit, include file, variant
    Resolution,
    /// The underlying stream or file failed
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Syntax => "syntax",
            ErrorKind::Semantic => "semantic",
            ErrorKind::Resolution => "resolution",
            ErrorKind::Io => "io",
        };
        f.write_str(name)
    }
}

/// A positionless failure raised by one of the reader components
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("semantic error: {0}")]
    Semantic(String),
    #[error("resolution error: {0}")]
    Resolution(String),
}

impl Fault {
    pub fn syntax(msg: impl Into<String>) -> Self {
        Fault::Syntax(msg.into())
    }

    pub fn semantic(msg: impl Into<String>) -> Self {
        Fault::Semantic(msg.into())
    }

    pub fn resolution(msg: impl Into<String>) -> Self {
        Fault::Resolution(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Fault::Syntax(_) => ErrorKind::Syntax,
            Fault::Semantic(_) => ErrorKind::Semantic,
            Fault::Resolution(_) => ErrorKind::Resolution,
        }
    }

    /// The bare message, without the category prefix
    pub fn message(&self) -> &str {
        match self {
            Fault::Syntax(msg) | Fault::Semantic(msg) | Fault::Resolution(msg) => msg,
        }
    }
}

/// Where in the input a failure happened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub file: Option<String>,
    pub section: Option<(String, usize)>,
    pub line: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "in file '{}': ", file)?;
        }
        if let Some((name, start)) = &self.section {
            write!(f, "in section '{}' starting at line #{}: ", name, start)?;
        }
        write!(f, "at line #{}", self.line)
    }
}

/// Failure of a read call
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("{location}: {fault}")]
    At { location: Location, fault: Fault },

    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{location}: in included file '{path}': {source}")]
    Include {
        location: Location,
        path: String,
        #[source]
        source: Box<ReadError>,
    },
}

impl ReadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReadError::At { fault, .. } => fault.kind(),
            ReadError::Io { .. } => ErrorKind::Io,
            ReadError::Include { source, .. } => source.kind(),
        }
    }

    /// The innermost fault, looking through include wrappers
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            ReadError::At { fault, .. } => Some(fault),
            ReadError::Io { .. } => None,
            ReadError::Include { source, .. } => source.fault(),
        }
    }

    /// Line of the outermost failure, if the failure is positional
    pub fn line(&self) -> Option<usize> {
        match self {
            ReadError::At { location, .. } | ReadError::Include { location, .. } => {
                Some(location.line)
            }
            ReadError::Io { .. } => None,
        }
    }
}

/// Failure of a write call
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("write failed: {0}")]
    Io(#[from] io::Error),

    #[error("unknown unit symbol '{symbol}' for property '{key}'")]
    UnknownUnit { key: String, symbol: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display_full() {
        let location = Location {
            file: Some("setup.conf".to_string()),
            section: Some(("geometry".to_string(), 12)),
            line: 17,
        };
        assert_eq!(
            location.to_string(),
            "in file 'setup.conf': in section 'geometry' starting at line #12: at line #17"
        );
    }

    #[test]
    fn test_location_display_stream() {
        let location = Location {
            line: 3,
            ..Default::default()
        };
        assert_eq!(location.to_string(), "at line #3");
    }

    #[test]
    fn test_include_error_reports_innermost_kind() {
        let inner = ReadError::At {
            location: Location {
                line: 2,
                ..Default::default()
            },
            fault: Fault::resolution("unknown unit symbol 'parsecs'"),
        };
        let outer = ReadError::Include {
            location: Location {
                line: 9,
                ..Default::default()
            },
            path: "units.conf".to_string(),
            source: Box::new(inner),
        };
        assert_eq!(outer.kind(), ErrorKind::Resolution);
        assert_eq!(outer.line(), Some(9));
        assert_eq!(
            outer.fault().map(Fault::message),
            Some("unknown unit symbol 'parsecs'")
        );
        assert!(outer.to_string().contains("in included file 'units.conf'"));
    }
}
