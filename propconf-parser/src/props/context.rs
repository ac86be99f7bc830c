//! Parser context
//!
//!     All state of one read call lives in a [ParserContext]: position, directive flags, the
//!     description and guard waiting for the next declaration, open variant blocks and queued
//!     includes. Only the directive processor changes the flags; the reader reads them.
//!
//!     A context never outlives its read call. Nested reads for included files get a fresh
//!     context and, when propagation is on, a clone of the include resolver.

use crate::props::error::Location;
use crate::props::includes::{IncludeResolver, SearchPathResolver};
use crate::props::reader::ReaderOptions;
use crate::props::variants::ConditionalStack;
use std::path::PathBuf;

#[derive(Debug)]
pub struct ParserContext {
    pub file: Option<String>,
    pub section: Option<(String, usize)>,
    pub line: usize,

    pub allow_key_override: bool,
    pub real_with_unit: bool,
    pub file_inclusion: bool,
    pub variants_enabled: bool,
    pub variants_forbidden: bool,
    pub include_propagate: bool,
    pub include_allow_override: bool,

    pub pending_description: Option<String>,
    pub conditionals: ConditionalStack,
    pub pending_includes: Vec<PathBuf>,
    /// Set by the first declaration or declaration-bound directive
    pub parsing_started: bool,

    pub resolver: Box<dyn IncludeResolver>,
    /// The resolver was handed over by the caller and must not be reconfigured
    pub resolver_fixed: bool,

    pub expected_topic: Option<String>,
    pub topic: Option<String>,
    pub config_seen: bool,

    pub verbose: bool,
    pub variant_devel: bool,
    pub include_debug: bool,
    pub remove_quotes: bool,
}

impl ParserContext {
    /// `resolver_fixed` freezes the given resolver against `#@include_dir` and friends
    pub fn new(
        options: &ReaderOptions,
        resolver: Option<Box<dyn IncludeResolver>>,
        resolver_fixed: bool,
        file: Option<String>,
    ) -> Self {
        let resolver = resolver.unwrap_or_else(|| Box::new(SearchPathResolver::new()));
        ParserContext {
            file,
            section: options.section.clone(),
            line: 0,
            allow_key_override: options.allow_key_override,
            real_with_unit: true,
            file_inclusion: !options.forbid_include,
            variants_enabled: !options.forbid_variants,
            variants_forbidden: options.forbid_variants,
            include_propagate: true,
            include_allow_override: true,
            pending_description: None,
            conditionals: ConditionalStack::new(),
            pending_includes: Vec::new(),
            parsing_started: false,
            resolver,
            resolver_fixed,
            expected_topic: options.topic.clone(),
            topic: None,
            config_seen: false,
            verbose: options.verbose,
            variant_devel: false,
            include_debug: false,
            remove_quotes: true,
        }
    }

    pub fn location(&self) -> Location {
        Location {
            file: self.file.clone(),
            section: self.section.clone(),
            line: self.line,
        }
    }

    /// A description or guard is waiting for its declaration
    pub fn property_pending(&self) -> bool {
        self.pending_description.is_some() || self.conditionals.has_pending_only()
    }
}
