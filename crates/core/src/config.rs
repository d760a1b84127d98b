use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::segmentation::DEFAULT_CLUSTERS;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Training-time cluster count.
    pub n_clusters: usize,
    /// Cluster-based recommendations returned per request.
    pub top_n_cluster: usize,
    /// Overall-popular recommendations returned per request.
    pub top_n_overall: usize,
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Directory holding the serialized artifact bundle.
    pub artifacts_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Explicit (CLI-level) overrides, applied last.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub n_clusters: Option<usize>,
    pub top_n_cluster: Option<usize>,
    pub top_n_overall: Option<usize>,
    pub artifacts_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig {
                n_clusters: DEFAULT_CLUSTERS,
                top_n_cluster: 5,
                top_n_overall: 5,
            },
            store: StoreConfig { artifacts_dir: PathBuf::from("artifacts") },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    /// Layered load: defaults, then `cohort.toml` (if present), then
    /// `COHORT_*` environment variables, then explicit overrides.
    /// Validation runs last and fails fast.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("cohort.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(engine) = patch.engine {
            if let Some(n_clusters) = engine.n_clusters {
                self.engine.n_clusters = n_clusters;
            }
            if let Some(top_n_cluster) = engine.top_n_cluster {
                self.engine.top_n_cluster = top_n_cluster;
            }
            if let Some(top_n_overall) = engine.top_n_overall {
                self.engine.top_n_overall = top_n_overall;
            }
        }

        if let Some(store) = patch.store {
            if let Some(artifacts_dir) = store.artifacts_dir {
                self.store.artifacts_dir = artifacts_dir;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("COHORT_ENGINE_N_CLUSTERS") {
            self.engine.n_clusters = parse_usize("COHORT_ENGINE_N_CLUSTERS", &value)?;
        }
        if let Some(value) = read_env("COHORT_ENGINE_TOP_N_CLUSTER") {
            self.engine.top_n_cluster = parse_usize("COHORT_ENGINE_TOP_N_CLUSTER", &value)?;
        }
        if let Some(value) = read_env("COHORT_ENGINE_TOP_N_OVERALL") {
            self.engine.top_n_overall = parse_usize("COHORT_ENGINE_TOP_N_OVERALL", &value)?;
        }
        if let Some(value) = read_env("COHORT_STORE_ARTIFACTS_DIR") {
            self.store.artifacts_dir = PathBuf::from(value);
        }

        let log_level = read_env("COHORT_LOGGING_LEVEL").or_else(|| read_env("COHORT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("COHORT_LOGGING_FORMAT").or_else(|| read_env("COHORT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(n_clusters) = overrides.n_clusters {
            self.engine.n_clusters = n_clusters;
        }
        if let Some(top_n_cluster) = overrides.top_n_cluster {
            self.engine.top_n_cluster = top_n_cluster;
        }
        if let Some(top_n_overall) = overrides.top_n_overall {
            self.engine.top_n_overall = top_n_overall;
        }
        if let Some(artifacts_dir) = overrides.artifacts_dir {
            self.store.artifacts_dir = artifacts_dir;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.n_clusters == 0 {
            return Err(ConfigError::Validation(
                "engine.n_clusters must be greater than zero".to_string(),
            ));
        }
        // top_n_cluster/top_n_overall of zero are valid: they request
        // empty recommendation lists, not an error.

        if self.store.artifacts_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "store.artifacts_dir must not be empty".to_string(),
            ));
        }

        let level = self.logging.level.trim().to_ascii_lowercase();
        match level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(ConfigError::Validation(
                "logging.level must be one of trace|debug|info|warn|error".to_string(),
            )),
        }
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("cohort.toml"), PathBuf::from("config/cohort.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    engine: Option<EnginePatch>,
    store: Option<StorePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct EnginePatch {
    n_clusters: Option<usize>,
    top_n_cluster: Option<usize>,
    top_n_overall: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct StorePatch {
    artifacts_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    #[test]
    fn defaults_are_valid() {
        let _guard = env_lock().lock().expect("env lock");
        clear_vars(&["COHORT_ENGINE_N_CLUSTERS", "COHORT_LOG_LEVEL", "COHORT_LOGGING_FORMAT"]);

        let config = AppConfig::load(LoadOptions::default()).expect("defaults load");
        assert_eq!(config.engine.n_clusters, 3);
        assert_eq!(config.engine.top_n_cluster, 5);
        assert_eq!(config.engine.top_n_overall, 5);
        assert_eq!(config.store.artifacts_dir, PathBuf::from("artifacts"));
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn precedence_is_defaults_file_env_overrides() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("COHORT_ENGINE_TOP_N_OVERALL", "7");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|error| error.to_string())?;
            let path = dir.path().join("cohort.toml");
            fs::write(
                &path,
                r#"
[engine]
n_clusters = 4
top_n_overall = 9

[logging]
level = "warn"
"#,
            )
            .map_err(|error| error.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    n_clusters: Some(6),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|error| format!("config load failed: {error}"))?;

            if config.engine.n_clusters != 6 {
                return Err("explicit override should win over file".to_string());
            }
            if config.engine.top_n_overall != 7 {
                return Err("env override should win over file".to_string());
            }
            if config.logging.level != "warn" {
                return Err("file value should win over default".to_string());
            }
            Ok(())
        })();

        clear_vars(&["COHORT_ENGINE_TOP_N_OVERALL"]);
        result.expect("precedence holds");
    }

    #[test]
    fn zero_cluster_count_fails_validation() {
        let _guard = env_lock().lock().expect("env lock");
        clear_vars(&["COHORT_ENGINE_N_CLUSTERS"]);

        let error = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides { n_clusters: Some(0), ..ConfigOverrides::default() },
            ..LoadOptions::default()
        })
        .expect_err("zero clusters must fail");
        assert!(matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("n_clusters")
        ));
    }

    #[test]
    fn zero_top_n_values_are_accepted() {
        let _guard = env_lock().lock().expect("env lock");
        clear_vars(&["COHORT_ENGINE_TOP_N_CLUSTER", "COHORT_ENGINE_TOP_N_OVERALL"]);

        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                top_n_cluster: Some(0),
                top_n_overall: Some(0),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("zero top-n values are a valid request");
        assert_eq!(config.engine.top_n_cluster, 0);
        assert_eq!(config.engine.top_n_overall, 0);
    }

    #[test]
    fn invalid_env_number_is_reported_with_key() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("COHORT_ENGINE_N_CLUSTERS", "three");

        let result = AppConfig::load(LoadOptions::default());
        clear_vars(&["COHORT_ENGINE_N_CLUSTERS"]);

        let error = result.expect_err("non-numeric env override must fail");
        assert!(matches!(
            error,
            ConfigError::InvalidEnvOverride { ref key, .. } if key == "COHORT_ENGINE_N_CLUSTERS"
        ));
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let _guard = env_lock().lock().expect("env lock");
        let error = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("does-not-exist.toml")),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect_err("required file is absent");
        assert!(matches!(error, ConfigError::MissingConfigFile(_)));
    }
}
