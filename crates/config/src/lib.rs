//! Layered configuration.
//!
//! Values are merged in order, later sources overriding earlier ones:
//!
//! 1. built-in defaults,
//! 2. `inscribe.toml`, `inscribe.yaml` and `inscribe.json` from the config
//!    directory (each optional),
//! 3. environment variables prefixed `INSCRIBE_`, with `__` separating
//!    nested keys (e.g. `INSCRIBE_READER__BATCH_SIZE=8`).

pub mod error;
mod sections;

pub use crate::sections::{CacheConfig, ReaderConfig, StreamConfig, UploadConfig};
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "INSCRIBE_";
/// File stem of configuration files.
pub const FILE_STEM: &str = "inscribe";
const CACHE_FILE: &str = "cache.sqlite";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub reader: ReaderConfig,
    pub stream: StreamConfig,
    pub upload: UploadConfig,
    pub cache: CacheConfig,
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", FILE_STEM).ok_or_raise(|| ErrorKind::NoHomeDirectory)
}

impl Config {
    /// Load from the platform configuration directory and the environment.
    pub fn load() -> Result<Self> {
        let dirs = project_dirs()?;
        Self::load_from(dirs.config_dir())
    }

    /// Load from configuration files in `dir` and the environment.
    pub fn load_from(dir: impl AsRef<Path>) -> Result<Self> {
        Self::from_figment(Self::figment(dir.as_ref()))
    }

    /// The merged (but not yet extracted) configuration sources.
    pub fn figment(dir: &Path) -> Figment {
        let file = |extension: &str| dir.join(format!("{FILE_STEM}.{extension}"));
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file("toml")))
            .merge(Yaml::file(file("yaml")))
            .merge(Json::file(file("json")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Extract and validate a configuration.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(?config, "Loaded configuration");
        Ok(config)
    }

    /// Reject values that would stall or disable a component.
    pub fn validate(&self) -> Result<()> {
        let checks: [(bool, &'static str, &'static str); 11] = [
            (self.reader.batch_size == 0, "reader.batch_size", "must be at least 1"),
            (self.reader.concurrency == 0, "reader.concurrency", "must be at least 1"),
            (self.stream.batch_size == 0, "stream.batch_size", "must be at least 1"),
            (
                !(self.stream.target_buffer_secs.is_finite() && self.stream.target_buffer_secs > 0.0),
                "stream.target_buffer_secs",
                "must be a positive number of seconds",
            ),
            (self.stream.max_initial_chunks == 0, "stream.max_initial_chunks", "must be at least 1"),
            (self.stream.sink_open_timeout_ms == 0, "stream.sink_open_timeout_ms", "must be positive"),
            (self.stream.append_timeout_ms == 0, "stream.append_timeout_ms", "must be positive"),
            (self.upload.batch_size == 0, "upload.batch_size", "must be at least 1"),
            (self.cache.temp_ttl_secs == 0, "cache.temp_ttl_secs", "must be positive"),
            (
                self.cache.temp_max_object_bytes > self.cache.temp_budget_bytes,
                "cache.temp_max_object_bytes",
                "must not exceed cache.temp_budget_bytes",
            ),
            (self.cache.thumbnail_limit == 0, "cache.thumbnail_limit", "must be at least 1"),
        ];
        if let Some((_, field, reason)) = checks.into_iter().find(|(failed, ..)| *failed) {
            exn::bail!(ErrorKind::Invalid { field, reason });
        }
        Ok(())
    }

    /// Location of the cache database: the configured path, or a file in the
    /// platform cache directory.
    pub fn cache_path(&self) -> Result<PathBuf> {
        match &self.cache.path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.cache_dir().join(CACHE_FILE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.reader.batch_size, 4);
        assert_eq!(config.upload.batch_size, 30);
        assert_eq!(config.stream.max_initial_chunks, 24);
        assert_eq!(config.cache.thumbnail_limit, 1000);
    }

    #[test]
    fn test_files_are_layered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("inscribe.toml"), "[reader]\nbatch_size = 8\nconcurrency = 2\n").unwrap();
        std::fs::write(dir.path().join("inscribe.json"), r#"{"reader": {"concurrency": 6}}"#).unwrap();
        let config = Config::from_figment(Config::figment(dir.path())).unwrap();
        assert_eq!(config.reader.batch_size, 8);
        // JSON is merged after TOML.
        assert_eq!(config.reader.concurrency, 6);
        assert_eq!(config.reader.chunk_retries, 3);
    }

    #[test]
    fn test_environment_overrides_files() {
        Jail::expect_with(|jail| {
            jail.create_file("inscribe.yaml", "stream:\n  batch_size: 2\n  lazy_load_delay_ms: 100\n")?;
            jail.set_env("INSCRIBE_STREAM__BATCH_SIZE", "6");
            jail.set_env("INSCRIBE_CACHE__PATH", "/tmp/inscribe-test.sqlite");
            let config = Config::load_from(jail.directory()).map_err(|err| figment::Error::from(err.to_string()))?;
            assert_eq!(config.stream.batch_size, 6);
            assert_eq!(config.stream.lazy_load_delay_ms, 100);
            assert_eq!(config.cache_path().unwrap(), PathBuf::from("/tmp/inscribe-test.sqlite"));
            Ok(())
        });
    }

    #[rstest]
    #[case("[reader]\nconcurrency = 0\n", "reader.concurrency")]
    #[case("[stream]\nappend_timeout_ms = 0\n", "stream.append_timeout_ms")]
    #[case("[stream]\ntarget_buffer_secs = -1.0\n", "stream.target_buffer_secs")]
    #[case("[upload]\nbatch_size = 0\n", "upload.batch_size")]
    #[case("[cache]\ntemp_max_object_bytes = 999999999999\n", "cache.temp_max_object_bytes")]
    fn test_invalid_values_are_rejected(#[case] toml: &str, #[case] expected_field: &str) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("inscribe.toml"), toml).unwrap();
        let err = Config::from_figment(Config::figment(dir.path())).unwrap_err();
        match &*err {
            ErrorKind::Invalid { field, .. } => assert_eq!(*field, expected_field),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("inscribe.toml"), "[reader]\nbatch_size = \"many\"\n").unwrap();
        let err = Config::from_figment(Config::figment(dir.path())).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load));
    }
}
