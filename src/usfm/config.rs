//! Configuration loading
//!
//! `defaults/usfm.default.toml` is embedded into the binary. User files and CLI
//! overrides are layered on top of it with [`Loader`] before deserializing into
//! [`UsfmConfig`].

use crate::usfm::formats::SerializeOptions;
use crate::usfm::parsing::ParseOptions;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../../defaults/usfm.default.toml");

/// Top-level configuration consumed by the converter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UsfmConfig {
    pub parse: ParseOptions,
    pub serialize: SerializeOptions,
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override, e.g. `serialize.forced_new_lines`.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<UsfmConfig, ConfigError> {
        let config: UsfmConfig = self.builder.build()?.try_deserialize()?;
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<UsfmConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert!(!config.parse.chunk);
        assert_eq!(config.parse.convert_to_int, vec!["occurrence", "occurrences"]);
        assert!(!config.serialize.forced_new_lines);
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("serialize.forced_new_lines", true)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert!(config.serialize.forced_new_lines);
    }

    #[test]
    fn layers_user_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[parse]\nchunk = true\ncontent_source = \"ugnt\"").unwrap();

        let config = Loader::new().with_file(file.path()).build().unwrap();
        assert!(config.parse.chunk);
        assert_eq!(config.parse.content_source.as_deref(), Some("ugnt"));
        assert_eq!(config.parse.convert_to_int, vec!["occurrence", "occurrences"]);
    }

    #[test]
    fn missing_optional_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let config = Loader::new()
            .with_optional_file(dir.path().join("absent.toml"))
            .build()
            .unwrap();
        assert!(!config.parse.chunk);
    }

    #[test]
    fn missing_required_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Loader::new().with_file(dir.path().join("absent.toml")).build().is_err());
    }
}
