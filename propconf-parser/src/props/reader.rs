//! Reader
//!
//!     Drives one read call from text to [PropertyStore]:
//!
//!         logical line ──► classify ──► comment: skipped
//!                                  ├─► directive: parse, apply to the context, read queued includes
//!                                  └─► declaration: parse head, gate on variants, preprocess the
//!                                      value segment, read values, apply the collision policy
//!
//!     Reading happens in a working store that replaces the destination only when the whole input
//!     was read without error. With `dont_clear` the working store starts as a copy of the
//!     destination, so new keys are added to (and may override) what is already there.
//!
//!     Included files are read depth first by a fresh reader that shares the variant resolver and
//!     the unit registry. The include resolver is handed down too unless the including file said
//!     `#@include_no_propagate`.

use crate::props::context::ParserContext;
use crate::props::directives::{self, parse_directive, Flow};
use crate::props::error::{Fault, ReadError};
use crate::props::includes::IncludeResolver;
use crate::props::lexing::{classify_line, LineAssembler, LineType};
use crate::props::overrides;
use crate::props::parsing::{parse_declaration, read_values};
use crate::props::store::{Cardinality, Datum, PropertyStore};
use crate::props::units::{StandardUnits, UnitRegistry};
use crate::props::variants::{VariantRepository, VariantResolver};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Options fixed for a whole read call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderOptions {
    pub allow_key_override: bool,
    pub forbid_variants: bool,
    pub forbid_include: bool,
    /// Keep the destination content instead of replacing it
    pub dont_clear: bool,
    /// Required value of `#@topic`
    pub topic: Option<String>,
    /// Section name and start line, reported in error locations
    pub section: Option<(String, usize)>,
    pub verbose: bool,
}

impl ReaderOptions {
    pub fn with_allow_key_override(mut self, allow: bool) -> Self {
        self.allow_key_override = allow;
        self
    }

    pub fn with_forbid_variants(mut self, forbid: bool) -> Self {
        self.forbid_variants = forbid;
        self
    }

    pub fn with_forbid_include(mut self, forbid: bool) -> Self {
        self.forbid_include = forbid;
        self
    }

    pub fn with_dont_clear(mut self, dont_clear: bool) -> Self {
        self.dont_clear = dont_clear;
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_section(mut self, name: impl Into<String>, start_line: usize) -> Self {
        self.section = Some((name.into(), start_line));
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Result of a successful read
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutcome {
    pub store: PropertyStore,
    /// Value of the `#@topic` directive, if any
    pub topic: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Reader {
    options: ReaderOptions,
    variants: Arc<dyn VariantResolver>,
    units: Arc<dyn UnitRegistry>,
    includes: Option<Box<dyn IncludeResolver>>,
    includes_fixed: bool,
}

impl Default for Reader {
    fn default() -> Self {
        Reader {
            options: ReaderOptions::default(),
            variants: Arc::new(VariantRepository::new()),
            units: Arc::new(StandardUnits),
            includes: None,
            includes_fixed: false,
        }
    }
}

impl Reader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: ReaderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_variants(mut self, variants: impl VariantResolver + 'static) -> Self {
        self.variants = Arc::new(variants);
        self
    }

    pub fn with_units(mut self, units: impl UnitRegistry + 'static) -> Self {
        self.units = Arc::new(units);
        self
    }

    /// Use `resolver` for includes; directives can no longer reconfigure it
    pub fn with_include_resolver(mut self, resolver: impl IncludeResolver + 'static) -> Self {
        self.includes = Some(Box::new(resolver));
        self.includes_fixed = true;
        self
    }

    /// Start from `resolver`, which `#@include_dir` and `#@include_path_env` may still extend
    pub fn with_include_setup(mut self, resolver: impl IncludeResolver + 'static) -> Self {
        self.includes = Some(Box::new(resolver));
        self.includes_fixed = false;
        self
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    pub fn read_str(&self, text: &str) -> Result<ReadOutcome, ReadError> {
        self.read(text.as_bytes())
    }

    pub fn read<R: BufRead>(&self, input: R) -> Result<ReadOutcome, ReadError> {
        let mut store = PropertyStore::new();
        let topic = self.run(input, None, &mut store)?;
        Ok(ReadOutcome { store, topic })
    }

    pub fn read_path(&self, path: impl AsRef<Path>) -> Result<ReadOutcome, ReadError> {
        let mut store = PropertyStore::new();
        let topic = self.read_path_into(path, &mut store)?;
        Ok(ReadOutcome { store, topic })
    }

    /// Read into an existing store and return the topic
    ///
    /// `store` is left untouched on failure.
    pub fn read_into<R: BufRead>(
        &self,
        input: R,
        store: &mut PropertyStore,
    ) -> Result<Option<String>, ReadError> {
        self.run(input, None, store)
    }

    pub fn read_path_into(
        &self,
        path: impl AsRef<Path>,
        store: &mut PropertyStore,
    ) -> Result<Option<String>, ReadError> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let file = File::open(path).map_err(|source| ReadError::Io {
            path: name.clone(),
            source,
        })?;
        self.run(BufReader::new(file), Some(name), store)
    }

    fn run<R: BufRead>(
        &self,
        input: R,
        file: Option<String>,
        store: &mut PropertyStore,
    ) -> Result<Option<String>, ReadError> {
        let mut working = if self.options.dont_clear {
            store.clone()
        } else {
            PropertyStore::new()
        };
        let topic = self.parse(input, file, &mut working)?;
        *store = working;
        Ok(topic)
    }

    fn parse<R: BufRead>(
        &self,
        input: R,
        file: Option<String>,
        store: &mut PropertyStore,
    ) -> Result<Option<String>, ReadError> {
        let mut ctx = ParserContext::new(
            &self.options,
            self.includes.clone(),
            self.includes_fixed,
            file,
        );
        let at = |ctx: &ParserContext, fault: Fault| ReadError::At {
            location: ctx.location(),
            fault,
        };

        for line in LineAssembler::new(input) {
            let line = line.map_err(|source| ReadError::Io {
                path: ctx.file.clone().unwrap_or_else(|| "<input>".to_string()),
                source,
            })?;
            ctx.line = line.line_number;
            if ctx.verbose {
                trace!(first = line.first_line, line = ctx.line, text = %line.text, "logical line");
            }

            match classify_line(&line.text) {
                LineType::Comment => {}
                LineType::Directive(text) => {
                    let flow = parse_directive(text)
                        .and_then(|directive| directives::apply(directive, &mut ctx, store))
                        .map_err(|fault| at(&ctx, fault))?;
                    self.include_pending(&mut ctx, store)?;
                    if flow == Flow::Stop {
                        debug!(line = ctx.line, "end of parsing requested");
                        break;
                    }
                }
                LineType::Declaration(text) => {
                    self.declare(text, &mut ctx, store)
                        .map_err(|fault| at(&ctx, fault))?;
                }
            }
        }

        if let Some(rule) = ctx.conditionals.innermost() {
            let fault = Fault::syntax(format!("unclosed variant block '{}'", rule));
            return Err(at(&ctx, fault));
        }
        Ok(ctx.topic)
    }

    fn declare(
        &self,
        text: &str,
        ctx: &mut ParserContext,
        store: &mut PropertyStore,
    ) -> Result<(), Fault> {
        ctx.parsing_started = true;
        let decl = parse_declaration(text, self.units.as_ref(), ctx.real_with_unit)?;

        if !ctx.conditionals.exhibits(self.variants.as_ref())? {
            if ctx.variant_devel {
                debug!(line = ctx.line, key = %decl.key, "property not exhibited");
            }
            return Ok(());
        }
        let description = ctx.pending_description.take();

        let segment = if ctx.variants_enabled {
            self.variants
                .preprocess(&decl.values, ctx.remove_quotes)
                .map_err(|e| {
                    Fault::resolution(format!(
                        "cannot expand variant parameters for key '{}': {}",
                        decl.key, e
                    ))
                })?
        } else {
            decl.values.clone()
        };

        let readout = read_values(&decl, &segment, ctx.real_with_unit, self.units.as_ref())?;
        if let Some(trailing) = &readout.trailing {
            warn!(line = ctx.line, key = %decl.key, %trailing, "unused trailing characters");
        }

        let datum = match decl.cardinality() {
            Cardinality::Scalar => Datum::scalar(readout.data),
            Cardinality::Vector => Datum::vector(readout.data),
        }
        .with_locked(decl.locked);
        let datum = match description {
            Some(description) => datum.with_description(description),
            None => datum,
        };

        if ctx.verbose {
            debug!(line = ctx.line, key = %decl.key, mode = ?decl.mode, "property");
        }
        overrides::apply(store, &decl.key, datum, decl.mode, ctx.allow_key_override)
    }

    /// Read every queued include and merge it into `store`
    fn include_pending(
        &self,
        ctx: &mut ParserContext,
        store: &mut PropertyStore,
    ) -> Result<(), ReadError> {
        for path in std::mem::take(&mut ctx.pending_includes) {
            let nested = Reader {
                options: ReaderOptions::default().with_verbose(ctx.include_debug),
                variants: Arc::clone(&self.variants),
                units: Arc::clone(&self.units),
                includes: ctx.include_propagate.then(|| ctx.resolver.clone()),
                includes_fixed: ctx.include_propagate,
            };
            let name = path.display().to_string();
            if ctx.include_debug {
                debug!(path = %name, "reading included file");
            }
            let wrap = |ctx: &ParserContext, source: ReadError| ReadError::Include {
                location: ctx.location(),
                path: name.clone(),
                source: Box::new(source),
            };
            let included = nested.read_path(&path).map_err(|e| wrap(ctx, e))?;
            store
                .merge_with(included.store, ctx.include_allow_override)
                .map_err(|fault| ReadError::At {
                    location: ctx.location(),
                    fault,
                })?;
        }
        Ok(())
    }
}

/// Read `text` with default options
pub fn parse_str(text: &str) -> Result<PropertyStore, ReadError> {
    Reader::new().read_str(text).map(|outcome| outcome.store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::error::ErrorKind;
    use crate::props::store::Data;

    #[test]
    fn test_read_basic() {
        let store = parse_str(
            "# comment\n\
             #@description Number of events\n\
             events : integer = 42\n\
             name = \"run\"\n",
        )
        .unwrap();
        assert_eq!(store.integer("events"), Some(42));
        assert_eq!(store.get("events").unwrap().description(), "Number of events");
        assert_eq!(store.string("name"), Some("run"));
    }

    #[test]
    fn test_error_location() {
        let err = parse_str("a : integer = 1\n\nb : integer = x\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.line(), Some(3));
        assert!(err.to_string().starts_with("at line #3: "));
    }

    #[test]
    fn test_section_in_location() {
        let reader =
            Reader::new().with_options(ReaderOptions::default().with_section("detector", 12));
        let err = reader.read_str("x : integer = 1.5\n").unwrap_err();
        assert!(err
            .to_string()
            .starts_with("in section 'detector' starting at line #12: at line #1"));
    }

    #[test]
    fn test_end_stops_reading() {
        let store = parse_str("a : integer = 1\n#@end\nthis is not parsed\n").unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unclosed_variant_block() {
        let err = parse_str("#@variant_if geo:a|true\nx : integer = 1\n").unwrap_err();
        assert!(err.fault().unwrap().message().contains("unclosed variant block"));
    }

    #[test]
    fn test_failed_read_keeps_destination() {
        let reader = Reader::new().with_options(ReaderOptions::default().with_dont_clear(true));
        let mut store = PropertyStore::new();
        store.store("kept", Datum::integer(1));
        assert!(reader
            .read_into("x : integer = 2\ny : integer = oops\n".as_bytes(), &mut store)
            .is_err());
        assert_eq!(store.keys().collect::<Vec<_>>(), vec!["kept"]);

        reader
            .read_into("x : integer = 2\n".as_bytes(), &mut store)
            .unwrap();
        assert_eq!(store.keys().collect::<Vec<_>>(), vec!["kept", "x"]);
    }

    #[test]
    fn test_clear_by_default() {
        let mut store = PropertyStore::new();
        store.store("old", Datum::integer(1));
        Reader::new()
            .read_into("new : integer = 2\n".as_bytes(), &mut store)
            .unwrap();
        assert!(!store.contains("old"));
    }

    #[test]
    fn test_description_carried_past_skipped_property() {
        let mut variants = VariantRepository::new();
        variants.set_variant("geo", "a", false);
        let reader = Reader::new().with_variants(variants);
        let outcome = reader
            .read_str(
                "#@description Carried\n\
                 #@variant_only geo:a\n\
                 x : integer = 1\n\
                 y : integer = 2\n",
            )
            .unwrap();
        assert!(!outcome.store.contains("x"));
        assert_eq!(outcome.store.get("y").unwrap().description(), "Carried");
    }

    #[test]
    fn test_locked_datum() {
        let err = Reader::new()
            .with_options(ReaderOptions::default().with_allow_key_override(true))
            .read_str("a : const integer = 1\na : integer = 2\n")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Semantic);
    }

    #[test]
    fn test_real_with_unit_toggle() {
        let store = parse_str(
            "#@disable_real_with_unit\n\
             a : real = 1.5\n\
             #@enable_real_with_unit\n\
             b : real = 1.5 cm\n",
        )
        .unwrap();
        assert_eq!(store.real("a"), Some(1.5));
        assert_eq!(
            store.get("b").unwrap().data(),
            &Data::Real {
                values: vec![15.0],
                unit_symbol: Some("cm".into())
            }
        );
        assert!(parse_str("#@disable_real_with_unit\na : real = 1.5 cm\n").is_err());
    }

    #[test]
    fn test_topic_reported() {
        let outcome = Reader::new()
            .read_str("#@topic \"geometry\"\nx : integer = 1\n")
            .unwrap();
        assert_eq!(outcome.topic.as_deref(), Some("geometry"));
    }
}
