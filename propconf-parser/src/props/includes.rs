//! Include path resolution
//!
//!     `#@include "file"` names a file the reader has to find. The reader delegates the search
//!     to an [IncludeResolver], which `#@include_dir` and `#@include_path_env` configure before
//!     the first property of a file.
//!
//!     [SearchPathResolver] is the stock implementation:
//!
//!         1. `$VAR` and `${VAR}` references are expanded from the environment. An unset
//!            variable is an error.
//!         2. An absolute path is used as is, if it names a regular file.
//!         3. A relative path is looked up in the current directory (when allowed), then in
//!            the search list. The search list is made of the explicit directories and the
//!            entries of the path environment variable (colon separated), combined according
//!            to [EnvStrategy].
//!
//!     Include cycles are not detected: a file including itself recurses until the stack runs
//!     out.

use once_cell::sync::Lazy;
use regex::Regex;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

static ENV_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("ENV_REFERENCE is a constant pattern that compiles")
});

/// Finds included files
pub trait IncludeResolver: fmt::Debug {
    fn resolve(&self, path: &str) -> Result<PathBuf, String>;

    fn append_search_dir(&mut self, dir: &str) -> Result<(), String>;

    /// Name the environment variable listing extra search directories
    fn set_path_env(&mut self, name: &str) -> Result<(), String>;

    fn set_debug(&mut self, debug: bool);

    fn clone_box(&self) -> Box<dyn IncludeResolver>;
}

impl Clone for Box<dyn IncludeResolver> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// How the path environment variable combines with explicit directories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnvStrategy {
    /// Environment entries are searched before explicit directories
    #[default]
    Prepend,
    /// Environment entries are searched after explicit directories
    Append,
    /// Environment entries replace explicit directories
    Clear,
}

/// Directory search list resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPathResolver {
    search_dirs: Vec<PathBuf>,
    path_env: Option<String>,
    env_strategy: EnvStrategy,
    allow_current_dir: bool,
    debug: bool,
}

impl Default for SearchPathResolver {
    fn default() -> Self {
        SearchPathResolver {
            search_dirs: Vec::new(),
            path_env: None,
            env_strategy: EnvStrategy::default(),
            allow_current_dir: true,
            debug: false,
        }
    }
}

impl SearchPathResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    pub fn with_path_env(mut self, name: impl Into<String>) -> Self {
        self.path_env = Some(name.into());
        self
    }

    pub fn with_env_strategy(mut self, strategy: EnvStrategy) -> Self {
        self.env_strategy = strategy;
        self
    }

    pub fn with_current_dir(mut self, allow: bool) -> Self {
        self.allow_current_dir = allow;
        self
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Effective lookup order for relative paths
    pub fn search_list(&self) -> Vec<PathBuf> {
        let mut list = self.search_dirs.clone();
        let env_dirs: Vec<PathBuf> = self
            .path_env
            .as_deref()
            .and_then(|name| env::var(name).ok())
            .map(|value| {
                value
                    .split(':')
                    .filter(|entry| !entry.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default();
        if !env_dirs.is_empty() {
            match self.env_strategy {
                EnvStrategy::Prepend => {
                    let explicit = std::mem::replace(&mut list, env_dirs);
                    list.extend(explicit);
                }
                EnvStrategy::Append => list.extend(env_dirs),
                EnvStrategy::Clear => list = env_dirs,
            }
        }
        if self.allow_current_dir {
            list.insert(0, PathBuf::from("."));
        }
        list
    }
}

impl IncludeResolver for SearchPathResolver {
    fn resolve(&self, path: &str) -> Result<PathBuf, String> {
        let expanded = expand_env(path)?;
        let candidate = Path::new(&expanded);
        if candidate.is_absolute() {
            return if candidate.is_file() {
                Ok(candidate.to_path_buf())
            } else {
                Err(format!("file '{}' was not found", expanded))
            };
        }
        for dir in self.search_list() {
            let full = dir.join(candidate);
            if self.debug {
                debug!(candidate = %full.display(), "include lookup");
            }
            if full.is_file() {
                return Ok(full);
            }
        }
        Err(format!(
            "file '{}' was not found in the include search path",
            expanded
        ))
    }

    fn append_search_dir(&mut self, dir: &str) -> Result<(), String> {
        let expanded = PathBuf::from(expand_env(dir)?);
        if !expanded.is_dir() {
            return Err(format!(
                "include dir path '{}' does not correspond to a directory",
                expanded.display()
            ));
        }
        self.search_dirs.push(expanded);
        Ok(())
    }

    fn set_path_env(&mut self, name: &str) -> Result<(), String> {
        if name.is_empty() {
            return Err("empty include path environment variable name".to_string());
        }
        self.path_env = Some(name.to_string());
        Ok(())
    }

    fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    fn clone_box(&self) -> Box<dyn IncludeResolver> {
        Box::new(self.clone())
    }
}

/// Expand `$VAR` and `${VAR}` references from the process environment
pub fn expand_env(text: &str) -> Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in ENV_REFERENCE.captures_iter(text) {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let value = env::var(name)
            .map_err(|_| format!("environment variable '{}' is not set in '{}'", name, text))?;
        out.push_str(&text[last..whole.start]);
        out.push_str(&value);
        last = whole.end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}
