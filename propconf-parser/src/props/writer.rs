//! Writer
//!
//!     Serializes a [PropertyStore] into text the reader accepts back. Keys are written in store
//!     order, one declaration per property, each followed by a blank line:
//!
//!         #@enable_real_with_unit            only around reals carrying a unit symbol
//!         #@description <text>               only when the datum has a description
//!         key : [const ]type[[size]][ in SYM][ as path] = v1 v2 ...
//!         #@disable_real_with_unit
//!
//!     Reals are stored in base units and divided by the factor of the unit they are written in.
//!     That unit is the datum's own symbol, unless one of the preferred symbols has the same
//!     label. Scalar reals carry the symbol after the value, vectors use `in SYM`.
//!
//!     With smart modulo on, long vectors are broken over continuation lines: after `=` and then
//!     every 10 booleans, 5 integers, or single real or string.

use crate::props::error::WriteError;
use crate::props::lexing::line_assembler::CONTINUATION;
use crate::props::parsing::declaration::{IN_DIRECTIVE, LOCK_DECORATOR, PATH_LABEL};
use crate::props::store::{Data, Datum, PropertyStore};
use crate::props::units::{StandardUnits, UnitRegistry};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

const HEADER: &str = "# List of configuration properties";
const FOOTER: &str = "# End of list of configuration properties";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    pub smart_modulo: bool,
    pub header_footer: bool,
    pub skip_private: bool,
    pub topic: Option<String>,
    /// Unit symbols to write reals in, when their label matches
    pub preferred_units: Vec<String>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            smart_modulo: true,
            header_footer: false,
            skip_private: false,
            topic: None,
            preferred_units: Vec::new(),
        }
    }
}

impl WriterOptions {
    pub fn with_smart_modulo(mut self, on: bool) -> Self {
        self.smart_modulo = on;
        self
    }

    pub fn with_header_footer(mut self, on: bool) -> Self {
        self.header_footer = on;
        self
    }

    pub fn with_skip_private(mut self, on: bool) -> Self {
        self.skip_private = on;
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_preferred_unit(mut self, symbol: impl Into<String>) -> Self {
        self.preferred_units.push(symbol.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Writer {
    options: WriterOptions,
    units: Arc<dyn UnitRegistry>,
}

impl Default for Writer {
    fn default() -> Self {
        Writer::new(WriterOptions::default())
    }
}

impl Writer {
    pub fn new(options: WriterOptions) -> Self {
        Writer {
            options,
            units: Arc::new(StandardUnits),
        }
    }

    pub fn with_units(mut self, units: impl UnitRegistry + 'static) -> Self {
        self.units = Arc::new(units);
        self
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    pub fn write_string(&self, store: &PropertyStore) -> Result<String, WriteError> {
        let mut out = String::new();
        if self.options.header_footer {
            out.push_str(HEADER);
            out.push_str("\n\n");
        }
        if !store.description().is_empty() {
            out.push_str(&format!("#@configuration {}\n\n", store.description()));
        }
        if let Some(topic) = &self.options.topic {
            out.push_str(&format!("#@topic {}\n", topic));
        }
        for (key, datum) in store.iter() {
            if self.options.skip_private && PropertyStore::is_private_key(key) {
                continue;
            }
            self.write_datum(&mut out, key, datum)?;
            out.push('\n');
        }
        if self.options.header_footer {
            out.push_str(FOOTER);
            out.push('\n');
        }
        Ok(out)
    }

    pub fn write_to<W: Write>(&self, out: &mut W, store: &PropertyStore) -> Result<(), WriteError> {
        let text = self.write_string(store)?;
        out.write_all(text.as_bytes())?;
        Ok(())
    }

    pub fn write_path(&self, path: impl AsRef<Path>, store: &PropertyStore) -> Result<(), WriteError> {
        let text = self.write_string(store)?;
        let mut out = BufWriter::new(File::create(path)?);
        out.write_all(text.as_bytes())?;
        out.flush()?;
        Ok(())
    }

    /// Symbol and factor a real datum is written with
    fn output_unit(&self, key: &str, symbol: &str) -> Result<(String, f64), WriteError> {
        let unknown = |symbol: &str| WriteError::UnknownUnit {
            key: key.to_string(),
            symbol: symbol.to_string(),
        };
        let unit = self.units.find_unit(symbol).ok_or_else(|| unknown(symbol))?;
        for preferred in &self.options.preferred_units {
            let candidate = self
                .units
                .find_unit(preferred)
                .ok_or_else(|| unknown(preferred))?;
            if candidate.label == unit.label {
                return Ok((preferred.clone(), candidate.factor));
            }
        }
        Ok((symbol.to_string(), unit.factor))
    }

    fn write_datum(&self, out: &mut String, key: &str, datum: &Datum) -> Result<(), WriteError> {
        let unit = match datum.unit_symbol() {
            Some(symbol) => Some(self.output_unit(key, symbol)?),
            None => None,
        };
        if unit.is_some() {
            out.push_str("#@enable_real_with_unit\n");
        }
        if !datum.description().is_empty() {
            out.push_str(&format!("#@description {}\n", datum.description()));
        }

        out.push_str(key);
        out.push_str(" : ");
        if datum.is_locked() {
            out.push_str(LOCK_DECORATOR);
            out.push(' ');
        }
        out.push_str(datum.kind().label());
        if datum.is_vector() {
            out.push_str(&format!("[{}]", datum.size()));
            if let Some((symbol, _)) = &unit {
                out.push_str(&format!(" {} {}", IN_DIRECTIVE, symbol));
            }
        }
        if datum.is_explicit_path() {
            out.push_str(&format!(" as {}", PATH_LABEL));
        }
        out.push_str(" =");

        let values = render_values(datum.data(), unit.as_ref().map(|(_, f)| *f));
        let modulo = match datum.data() {
            Data::Boolean { .. } => 10,
            Data::Integer { .. } => 5,
            _ => 1,
        };
        let wrap = self.options.smart_modulo && values.len() > 1 && values.len() > modulo;
        if wrap {
            out.push_str(&format!(" {}\n", CONTINUATION));
        }
        let last = values.len().saturating_sub(1);
        for (i, value) in values.iter().enumerate() {
            out.push(' ');
            out.push_str(value);
            if datum.is_scalar() {
                if let Some((symbol, _)) = &unit {
                    out.push(' ');
                    out.push_str(symbol);
                }
            }
            if wrap && i < last && (i + 1) % modulo == 0 {
                out.push_str(&format!(" {}\n", CONTINUATION));
            }
        }
        out.push('\n');

        if unit.is_some() {
            out.push_str("#@disable_real_with_unit\n");
        }
        Ok(())
    }
}

fn render_values(data: &Data, factor: Option<f64>) -> Vec<String> {
    match data {
        Data::Boolean { values } => values.iter().map(|v| v.to_string()).collect(),
        Data::Integer { values } => values.iter().map(|v| v.to_string()).collect(),
        Data::Real { values, .. } => {
            let factor = factor.unwrap_or(1.0);
            values.iter().map(|v| format_real(v / factor)).collect()
        }
        Data::String { values, .. } => values.iter().map(|v| quote(v)).collect(),
    }
}

/// Shortest text that reads back as the same `f64`
pub fn format_real(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-6..1e16).contains(&magnitude) {
        format!("{:e}", value)
    } else {
        value.to_string()
    }
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
