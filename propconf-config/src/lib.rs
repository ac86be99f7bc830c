//! Settings shared by the propconf tools
//!
//! Three layers, later ones winning key by key:
//!
//! 1. `defaults/propconf.default.toml`, compiled in. Every key has a value here, so the
//!    deserialized [PropconfConfig] never misses a field.
//! 2. A user TOML file, either required (`--config`) or picked up when present.
//! 3. Single-key overrides such as `reader.allow_key_override = true`, set from flags.
//!
//! A user file only needs the keys it changes. [ReaderConfig] and [WriterConfig] turn the
//! result into the parser's own option types.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use propconf_parser::{EnvStrategy, ReaderOptions, SearchPathResolver, WriterOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub use config::ConfigError as LoadError;

const DEFAULT_TOML: &str = include_str!("../defaults/propconf.default.toml");

/// Everything the propconf tools read from settings
#[derive(Debug, Clone, Deserialize)]
pub struct PropconfConfig {
    pub reader: ReaderConfig,
    pub writer: WriterConfig,
    pub logging: LoggingConfig,
}

/// Reader policy and include search setup.
#[derive(Debug, Clone, Deserialize)]
pub struct ReaderConfig {
    pub allow_key_override: bool,
    pub forbid_variants: bool,
    pub forbid_include: bool,
    pub include_current_dir: bool,
    pub include_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub include_path_env: Option<String>,
    pub env_strategy: EnvStrategyConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvStrategyConfig {
    Prepend,
    Append,
    Clear,
}

/// Writer layout settings
#[derive(Debug, Clone, Deserialize)]
pub struct WriterConfig {
    pub smart_modulo: bool,
    pub header_footer: bool,
    pub skip_private: bool,
    pub preferred_units: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
}

impl ReaderConfig {
    pub fn options(&self) -> ReaderOptions {
        ReaderOptions::default()
            .with_allow_key_override(self.allow_key_override)
            .with_forbid_variants(self.forbid_variants)
            .with_forbid_include(self.forbid_include)
    }

    /// Include resolver carrying the configured search list
    pub fn include_resolver(&self) -> SearchPathResolver {
        let strategy = match self.env_strategy {
            EnvStrategyConfig::Prepend => EnvStrategy::Prepend,
            EnvStrategyConfig::Append => EnvStrategy::Append,
            EnvStrategyConfig::Clear => EnvStrategy::Clear,
        };
        let mut resolver = SearchPathResolver::new()
            .with_current_dir(self.include_current_dir)
            .with_env_strategy(strategy);
        for dir in &self.include_dirs {
            resolver = resolver.with_search_dir(dir);
        }
        if let Some(name) = &self.include_path_env {
            resolver = resolver.with_path_env(name);
        }
        resolver
    }
}

impl WriterConfig {
    pub fn options(&self) -> WriterOptions {
        let options = WriterOptions::default()
            .with_smart_modulo(self.smart_modulo)
            .with_header_footer(self.header_footer)
            .with_skip_private(self.skip_private);
        self.preferred_units
            .iter()
            .fold(options, |options, symbol| options.with_preferred_unit(symbol))
    }
}

/// Stacks settings layers over the compiled-in defaults
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        Loader {
            builder: Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml)),
        }
    }

    /// Add a settings file that must exist
    pub fn with_file(self, path: impl AsRef<Path>) -> Self {
        self.layer(path.as_ref(), true)
    }

    /// Add a settings file that is skipped when absent
    pub fn with_optional_file(self, path: impl AsRef<Path>) -> Self {
        self.layer(path.as_ref(), false)
    }

    fn layer(mut self, path: &Path, required: bool) -> Self {
        let file = File::from(path).format(FileFormat::Toml).required(required);
        self.builder = self.builder.add_source(file);
        self
    }

    /// Force `key` (dotted, e.g. `writer.smart_modulo`) over every file layer
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Merge the layers; a malformed file or a mistyped key fails here
    pub fn build(self) -> Result<PropconfConfig, ConfigError> {
        let merged = self.builder.build()?;
        merged.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// The compiled-in settings alone
pub fn load_defaults() -> Result<PropconfConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert!(!config.reader.allow_key_override);
        assert!(config.reader.include_dirs.is_empty());
        assert_eq!(config.reader.include_path_env, None);
        assert_eq!(config.reader.env_strategy, EnvStrategyConfig::Prepend);
        assert!(config.writer.smart_modulo);
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("reader.allow_key_override", true)
            .expect("override to apply")
            .set_override("writer.smart_modulo", false)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert!(config.reader.options().allow_key_override);
        assert!(!config.writer.options().smart_modulo);
    }

    #[test]
    fn layers_user_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("propconf.toml");
        fs::write(
            &path,
            "[reader]\ninclude_dirs = [\"/opt/conf\"]\ninclude_path_env = \"CONF_PATH\"\nenv_strategy = \"append\"\n\n[writer]\npreferred_units = [\"cm\", \"ms\"]\n",
        )
        .unwrap();
        let config = Loader::new().with_file(&path).build().expect("config to build");

        let resolver = config.reader.include_resolver();
        assert_eq!(resolver.search_dirs(), &[PathBuf::from("/opt/conf")]);
        assert_eq!(
            config.writer.options().preferred_units,
            vec!["cm".to_string(), "ms".to_string()]
        );
        // untouched keys keep their defaults
        assert!(config.writer.smart_modulo);
    }

    #[test]
    fn overrides_beat_file_layers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("propconf.toml");
        fs::write(&path, "[writer]\nsmart_modulo = true\nskip_private = true\n").unwrap();
        let config = Loader::new()
            .with_optional_file(&path)
            .set_override("writer.smart_modulo", false)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert!(!config.writer.smart_modulo);
        assert!(config.writer.skip_private);
    }

    #[test]
    fn mistyped_value_fails_to_build() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("propconf.toml");
        fs::write(&path, "[reader]\nenv_strategy = \"sideways\"\n").unwrap();
        assert!(Loader::new().with_file(&path).build().is_err());
    }

    #[test]
    fn missing_required_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Loader::new()
            .with_file(dir.path().join("absent.toml"))
            .build()
            .is_err());
        assert!(Loader::new()
            .with_optional_file(dir.path().join("absent.toml"))
            .build()
            .is_ok());
    }
}
