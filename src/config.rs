//! Configuration management for trackdex using the prefer crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::extract::ReconstructionHeuristic;
use crate::services::indexer::IndexerConfig;

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "trackdex.db";

/// Environment variable holding the backup channel id.
pub const BACKUP_CHANNEL_ENV: &str = "BACKUP_CHANNEL_ID";

/// Errors loading a config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {format} config: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },
}

fn parse_error(format: &'static str, e: impl std::fmt::Display) -> ConfigError {
    ConfigError::Parse {
        format,
        message: e.to_string(),
    }
}

/// Scan loop settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    /// Delay after each media item in milliseconds.
    pub item_delay_ms: u64,
    /// Consecutive fetch failures that abort a scan.
    pub max_failures: u32,
    /// Checkpoint every N fetched messages.
    pub checkpoint_every: u64,
    /// Checkpoint at least every N seconds.
    pub checkpoint_interval_secs: u64,
    /// Put the track id at the top of backup captions.
    pub include_track_id_in_caption: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            item_delay_ms: 3000,
            max_failures: 25,
            checkpoint_every: 50,
            checkpoint_interval_secs: 30,
            include_track_id_in_caption: true,
        }
    }
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Channel backups are mirrored into.
    pub backup_channel_id: Option<i64>,
    pub scan: ScanSettings,
    /// Reconstruction heuristics enabled for extraction, in order.
    pub heuristics: Vec<ReconstructionHeuristic>,
}

impl Default for Settings {
    fn default() -> Self {
        // Documents dir -> Home dir -> Current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("trackdex");

        Self {
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            backup_channel_id: None,
            scan: ScanSettings::default(),
            heuristics: ReconstructionHeuristic::ALL.to_vec(),
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Get the full path to the database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Check if the database appears to be initialized.
    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    /// Default location of the backup outbox.
    pub fn outbox_path(&self) -> PathBuf {
        self.data_dir.join("backup-outbox.jsonl")
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }

    /// Indexer tuning derived from these settings.
    pub fn indexer_config(&self) -> IndexerConfig {
        IndexerConfig {
            item_delay: Duration::from_millis(self.scan.item_delay_ms),
            max_failures: self.scan.max_failures.max(1),
            checkpoint_every: self.scan.checkpoint_every.max(1),
            checkpoint_interval: Duration::from_secs(self.scan.checkpoint_interval_secs),
            backup_destination: self.backup_channel_id,
            include_track_id_in_caption: self.scan.include_track_id_in_caption,
            heuristics: self.heuristics.clone(),
        }
    }
}

/// `scan` section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_failures: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_every: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_track_id_in_caption: Option<bool>,
}

/// `extraction` section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Enabled heuristics, e.g. `["split_hostname"]`. Empty list disables all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heuristics: Option<Vec<ReconstructionHeuristic>>,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Backup channel id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_channel_id: Option<i64>,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers trackdex config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("trackdex").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("{}", e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, ext: &str) -> Result<Self, ConfigError> {
        match ext {
            "toml" => toml::from_str(contents).map_err(|e| parse_error("TOML", e)),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| parse_error("YAML", e)),
            _ => serde_json::from_str(contents).map_err(|e| parse_error("JSON", e)),
        }
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(channel) = self.backup_channel_id {
            settings.backup_channel_id = Some(channel);
        }
        if let Some(delay) = self.scan.item_delay_ms {
            settings.scan.item_delay_ms = delay;
        }
        if let Some(max) = self.scan.max_failures {
            settings.scan.max_failures = max;
        }
        if let Some(every) = self.scan.checkpoint_every {
            settings.scan.checkpoint_every = every;
        }
        if let Some(secs) = self.scan.checkpoint_interval_secs {
            settings.scan.checkpoint_interval_secs = secs;
        }
        if let Some(include) = self.scan.include_track_id_in_caption {
            settings.scan.include_track_id_in_caption = include;
        }
        if let Some(ref heuristics) = self.extraction.heuristics {
            settings.heuristics = heuristics.clone();
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Data directory override (--data flag).
    pub data: Option<PathBuf>,
}

/// Parse the backup channel variable, ignoring empty or malformed values.
fn backup_channel_from_env() -> Option<i64> {
    let raw = std::env::var(BACKUP_CHANNEL_ENV).ok()?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(id) => Some(id),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a channel id", BACKUP_CHANNEL_ENV, raw);
            None
        }
    }
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await.unwrap_or_else(|e| {
            tracing::warn!("{}", e);
            Config::default()
        }),
        None => Config::load().await,
    };

    let mut settings = Settings::default();
    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    config.apply_to_settings(&mut settings, &base_dir);

    if let Some(data) = options.data {
        settings.data_dir = config.resolve_path(&data.to_string_lossy(), &base_dir);
    }

    // BACKUP_CHANNEL_ID environment variable takes precedence over config
    if let Some(channel) = backup_channel_from_env() {
        tracing::debug!("Using {} from environment: {}", BACKUP_CHANNEL_ENV, channel);
        settings.backup_channel_id = Some(channel);
    }

    (settings, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_config_applies_over_defaults() {
        let config = Config::parse(
            r#"
            data_dir = "archive"
            backup_channel_id = -1002003004005

            [scan]
            item_delay_ms = 500
            max_failures = 3

            [extraction]
            heuristics = ["split_hostname"]
            "#,
            "toml",
        )
        .unwrap();

        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("/srv"));

        assert_eq!(settings.data_dir, PathBuf::from("/srv/archive"));
        assert_eq!(settings.backup_channel_id, Some(-1002003004005));
        assert_eq!(settings.scan.item_delay_ms, 500);
        assert_eq!(settings.scan.max_failures, 3);
        assert_eq!(settings.scan.checkpoint_every, 50);
        assert_eq!(
            settings.heuristics,
            vec![ReconstructionHeuristic::SplitHostname]
        );
    }

    #[test]
    fn test_yaml_and_json_configs_parse() {
        let yaml = Config::parse("scan:\n  checkpoint_every: 10\n", "yaml").unwrap();
        assert_eq!(yaml.scan.checkpoint_every, Some(10));

        let json = Config::parse(r#"{"extraction": {"heuristics": []}}"#, "json").unwrap();
        assert_eq!(json.extraction.heuristics, Some(vec![]));
    }

    #[test]
    fn test_unknown_heuristic_rejected() {
        assert!(Config::parse(r#"{"extraction": {"heuristics": ["guess"]}}"#, "json").is_err());
    }

    #[test]
    fn test_indexer_config_clamps_zero_values() {
        let mut settings = Settings::with_data_dir(PathBuf::from("/tmp/x"));
        settings.scan.max_failures = 0;
        settings.scan.checkpoint_every = 0;
        let config = settings.indexer_config();
        assert_eq!(config.max_failures, 1);
        assert_eq!(config.checkpoint_every, 1);
        assert_eq!(settings.database_path(), PathBuf::from("/tmp/x/trackdex.db"));
    }

    #[tokio::test]
    async fn test_load_from_path_records_source() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("trackdex.json");
        std::fs::write(&path, r#"{"database": "other.db"}"#).unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        assert_eq!(config.database.as_deref(), Some("other.db"));
        assert_eq!(config.base_dir().as_deref(), Some(dir.path()));
    }
}
