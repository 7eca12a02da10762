//! Configuration loading
//!
//! Settings resolve in priority order:
//! 1. Command-line flags (applied by each binary)
//! 2. Environment variables (`GROWMATE_*`)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! Every TOML field is optional. A missing config file is not an error unless
//! one was named explicitly.

use crate::estimator::ForestParams;
use crate::storage::validate_name;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const ENV_CONFIG: &str = "GROWMATE_CONFIG";
pub const ENV_DATABASE_URL: &str = "GROWMATE_DATABASE_URL";
pub const ENV_BUCKET: &str = "GROWMATE_BUCKET";
pub const ENV_CREDENTIALS: &str = "GROWMATE_CREDENTIALS";
pub const ENV_STORAGE_ROOT: &str = "GROWMATE_STORAGE_ROOT";

const CONFIG_FILE_NAME: &str = "growmate.toml";

/// Top-level configuration shared by both services
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GrowmateConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub training: TrainingConfig,
    pub serving: ServingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// Each service falls back to its own default port when unset
    pub port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: None,
        }
    }
}

/// How sensor and outcome logs are combined into training rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileMode {
    /// Outcome logs reference their sensor log through `sensor_log_id`
    #[default]
    Joined,
    /// Every record in either collection carries all fields itself
    Flattened,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `sqlite://path` or an `http(s)://` realtime database URL.
    /// Defaults to `logs.db` under the storage root.
    pub url: Option<String>,
    /// File holding the database access token
    pub credentials_file: Option<PathBuf>,
    pub sensor_collection: String,
    pub outcome_collection: String,
    pub reconcile_mode: ReconcileMode,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            credentials_file: None,
            sensor_collection: "initial_training_logs".to_string(),
            outcome_collection: "training_logs".to_string(),
            reconcile_mode: ReconcileMode::Joined,
        }
    }
}

impl DatabaseConfig {
    /// Read the access token named by `credentials_file`
    ///
    /// `Ok(None)` when no credential source is configured. A configured but
    /// unreadable or empty file is an error so startup can fail fast.
    pub fn load_credential(&self) -> Result<Option<String>> {
        let Some(path) = &self.credentials_file else {
            return Ok(None);
        };

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read credentials file {}: {}", path.display(), e))
        })?;

        let token = content.trim();
        if token.is_empty() {
            return Err(Error::Config(format!(
                "Credentials file {} is empty",
                path.display()
            )));
        }
        Ok(Some(token.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding buckets; OS data directory when unset
    pub root: Option<PathBuf>,
    pub bucket: String,
    pub artifact_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: None,
            bucket: "growmate-models".to_string(),
            artifact_key: "optimized_model.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Moisture level (%) the optimal duration aims for
    pub target_moisture: f64,
    /// Lower clamp for derived durations (seconds)
    pub min_duration: f64,
    /// Upper clamp for derived durations (seconds)
    pub max_duration: f64,
    /// Fewer valid rows than this refuses to fit
    pub min_training_rows: usize,
    pub forest: ForestParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            target_moisture: 50.0,
            min_duration: 5.0,
            max_duration: 600.0,
            min_training_rows: 5,
            forest: ForestParams::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServingConfig {
    /// Minimum seconds between artifact change checks; 0 checks every request
    pub refresh_interval_secs: u64,
    /// Predictor reload endpoint the trainer calls after publishing
    pub notify_url: Option<String>,
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 30,
            notify_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl GrowmateConfig {
    /// Load configuration: file (explicit or discovered), then environment
    /// overrides, then validation
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let explicit = explicit_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(ENV_CONFIG).ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => match discover_config_file() {
                Some(path) => Self::from_file(&path)?,
                None => {
                    info!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content).map_err(|e| {
            Error::Config(format!("Invalid config file {}: {}", path.display(), e))
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply `GROWMATE_*` overrides using the given variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_DATABASE_URL) {
            self.database.url = Some(url);
        }
        if let Some(bucket) = non_empty(ENV_BUCKET) {
            self.storage.bucket = bucket;
        }
        if let Some(path) = non_empty(ENV_CREDENTIALS) {
            self.database.credentials_file = Some(PathBuf::from(path));
        }
        if let Some(root) = non_empty(ENV_STORAGE_ROOT) {
            self.storage.root = Some(PathBuf::from(root));
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let t = &self.training;

        if !(t.target_moisture > 0.0 && t.target_moisture <= 100.0) {
            return Err(Error::Config(format!(
                "training.target_moisture must be in (0, 100], got {}",
                t.target_moisture
            )));
        }
        if !(t.min_duration >= 0.0) || !t.max_duration.is_finite() {
            return Err(Error::Config(
                "training.min_duration must be >= 0 and max_duration finite".to_string(),
            ));
        }
        if t.min_duration > t.max_duration {
            return Err(Error::Config(format!(
                "training.min_duration ({}) exceeds max_duration ({})",
                t.min_duration, t.max_duration
            )));
        }
        if t.min_training_rows == 0 {
            return Err(Error::Config("training.min_training_rows must be >= 1".to_string()));
        }
        if t.forest.n_trees == 0 {
            return Err(Error::Config("training.forest.n_trees must be >= 1".to_string()));
        }
        if t.forest.max_features == Some(0) {
            return Err(Error::Config("training.forest.max_features must be >= 1".to_string()));
        }

        validate_name(&self.storage.bucket, "bucket")
            .map_err(|e| Error::Config(e.to_string()))?;
        validate_name(&self.storage.artifact_key, "key")
            .map_err(|e| Error::Config(e.to_string()))?;

        if self.database.sensor_collection.is_empty() || self.database.outcome_collection.is_empty() {
            return Err(Error::Config("database collection names must not be empty".to_string()));
        }

        Ok(())
    }

    /// Storage root, falling back to the OS data directory
    pub fn storage_root(&self) -> PathBuf {
        self.storage.root.clone().unwrap_or_else(default_data_folder)
    }

    /// Database URL, falling back to a SQLite file under the storage root
    pub fn database_url(&self) -> String {
        match &self.database.url {
            Some(url) => url.clone(),
            None => format!("sqlite://{}", self.storage_root().join("logs.db").display()),
        }
    }

    /// Port from config or the calling service's default
    pub fn port_or(&self, default_port: u16) -> u16 {
        self.server.port.unwrap_or(default_port)
    }
}

/// Find the config file in the platform config locations
fn discover_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("growmate").join(CONFIG_FILE_NAME));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/growmate").join(CONFIG_FILE_NAME);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default data folder
fn default_data_folder() -> PathBuf {
    match dirs::data_local_dir() {
        Some(dir) => dir.join("growmate"),
        None => {
            warn!("Could not determine data directory, using ./growmate_data");
            PathBuf::from("./growmate_data")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = GrowmateConfig::default();
        assert_eq!(config.training.target_moisture, 50.0);
        assert_eq!(config.training.min_duration, 5.0);
        assert_eq!(config.training.max_duration, 600.0);
        assert_eq!(config.database.sensor_collection, "initial_training_logs");
        assert_eq!(config.database.outcome_collection, "training_logs");
        assert_eq!(config.database.reconcile_mode, ReconcileMode::Joined);
        assert_eq!(config.storage.artifact_key, "optimized_model.json");
        assert_eq!(config.serving.refresh_interval_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GrowmateConfig::from_toml_str(
            r#"
            [database]
            url = "https://example-rtdb.firebaseio.com"
            reconcile_mode = "flattened"

            [training]
            target_moisture = 55

            [training.forest]
            n_trees = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.database_url(), "https://example-rtdb.firebaseio.com");
        assert_eq!(config.database.reconcile_mode, ReconcileMode::Flattened);
        assert_eq!(config.training.target_moisture, 55.0);
        assert_eq!(config.training.max_duration, 600.0);
        assert_eq!(config.training.forest.n_trees, 20);
        assert_eq!(config.training.forest.max_depth, 7);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_unknown_reconcile_mode_rejected() {
        let result = GrowmateConfig::from_toml_str("[database]\nreconcile_mode = \"merged\"\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_DATABASE_URL, "sqlite:///tmp/logs.db"),
            (ENV_BUCKET, "field-models"),
            (ENV_CREDENTIALS, "/run/secrets/rtdb"),
            (ENV_STORAGE_ROOT, "  "),
        ]
        .into_iter()
        .collect();

        let mut config = GrowmateConfig::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.database_url(), "sqlite:///tmp/logs.db");
        assert_eq!(config.storage.bucket, "field-models");
        assert_eq!(
            config.database.credentials_file,
            Some(PathBuf::from("/run/secrets/rtdb"))
        );
        // Blank values are ignored
        assert_eq!(config.storage.root, None);
    }

    #[test]
    fn test_validation_rejects_inverted_bounds() {
        let mut config = GrowmateConfig::default();
        config.training.min_duration = 700.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validation_rejects_zero_max_features() {
        let mut config = GrowmateConfig::default();
        config.training.forest.max_features = Some(0);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.training.forest.max_features = Some(3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_target() {
        let mut config = GrowmateConfig::default();
        config.training.target_moisture = 0.0;
        assert!(config.validate().is_err());
        config.training.target_moisture = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_rows_and_trees() {
        let mut config = GrowmateConfig::default();
        config.training.min_training_rows = 0;
        assert!(config.validate().is_err());

        let mut config = GrowmateConfig::default();
        config.training.forest.n_trees = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_path_in_bucket() {
        let mut config = GrowmateConfig::default();
        config.storage.bucket = "a/b".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_database_url_under_storage_root() {
        let mut config = GrowmateConfig::default();
        config.storage.root = Some(PathBuf::from("/srv/growmate"));
        assert_eq!(config.database_url(), "sqlite:///srv/growmate/logs.db");
    }

    #[test]
    fn test_port_fallback() {
        let mut config = GrowmateConfig::default();
        assert_eq!(config.port_or(5780), 5780);
        config.server.port = Some(9000);
        assert_eq!(config.port_or(5780), 9000);
    }
}
