use clap::Args;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Config file looked up when no `--config-path` is given.
pub const DEFAULT_CONFIG_FILE: &str = "prh_sync.conf";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Every tunable of a sync run. All fields are optional so layers can be merged.
#[derive(Args, Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSettings {
    #[arg(long, env = "POSTGRES_INPUT_DB", help = "Database the candidate companies are read from.")]
    pub input_db_url: Option<String>,

    #[arg(long, env = "POSTGRES_OUTPUT_DB", help = "Database the company rows are written to.")]
    pub output_db_url: Option<String>,

    #[arg(long, env = "PRH_API_URL", help = "Base URL of the PRH BIS v1 API.")]
    pub api_base_url: Option<String>,

    #[arg(long, env = "PRH_RATE_LIMIT_CALLS", help = "API calls allowed per rate limit period.")]
    pub rate_limit_calls: Option<u32>,

    #[arg(long, env = "PRH_RATE_LIMIT_PERIOD_SECS", help = "Length of the rate limit period in seconds.")]
    pub rate_limit_period_secs: Option<u64>,

    #[arg(long, env = "PRH_MAX_RETRIES", help = "Retries for transient HTTP failures.")]
    pub max_retries: Option<u32>,

    #[arg(long, help = "HTTP request timeout in seconds.")]
    pub request_timeout_secs: Option<u64>,

    #[arg(long, env = "DB_MAX_CONNECTIONS", help = "Maximum connections per database pool.")]
    pub db_max_connections: Option<u32>,

    #[arg(long, env = "PRH_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[arg(long, env = "PRH_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[arg(long, env = "PRH_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,
}

impl SyncSettings {
    /// Built-in defaults, the lowest layer.
    pub fn defaults() -> Self {
        Self {
            api_base_url: Some("https://avoindata.prh.fi/bis/v1/".to_string()),
            rate_limit_calls: Some(290),
            rate_limit_period_secs: Some(60),
            max_retries: Some(3),
            request_timeout_secs: Some(30),
            db_max_connections: Some(5),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            ..Default::default()
        }
    }

    /// Merge two settings, where `other` overrides `self` for `Some` values.
    pub fn merge(self, other: SyncSettings) -> SyncSettings {
        SyncSettings {
            input_db_url: other.input_db_url.or(self.input_db_url),
            output_db_url: other.output_db_url.or(self.output_db_url),
            api_base_url: other.api_base_url.or(self.api_base_url),
            rate_limit_calls: other.rate_limit_calls.or(self.rate_limit_calls),
            rate_limit_period_secs: other.rate_limit_period_secs.or(self.rate_limit_period_secs),
            max_retries: other.max_retries.or(self.max_retries),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
            db_max_connections: other.db_max_connections.or(self.db_max_connections),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            config_path: other.config_path.or(self.config_path),
        }
    }

    /// Reads a JSON settings file with camelCase keys.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Stacks defaults, the config file and `overrides` (CLI and environment).
    ///
    /// A missing file is fine; an unreadable or invalid one is logged and skipped.
    pub fn layered(overrides: SyncSettings) -> SyncSettings {
        let path = overrides
            .config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut settings = Self::defaults();
        if path.exists() {
            match Self::from_file(&path) {
                Ok(file) => settings = settings.merge(file),
                Err(e) => warn!(error = %e, "Ignoring config file, falling back to other sources"),
            }
        } else {
            info!(path = %path.display(), "Config file not found, using defaults and environment/CLI values");
        }

        settings.merge(overrides)
    }

    /// Fills in defaults and validates.
    pub fn resolve(self) -> Result<SyncConfig, ConfigError> {
        let s = Self::defaults().merge(self);

        let rate_limit_period_secs = s.rate_limit_period_secs.unwrap_or(60);
        if rate_limit_period_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "rate_limit_period_secs",
                reason: "must be greater than zero".into(),
            });
        }
        let db_max_connections = s.db_max_connections.unwrap_or(5);
        if db_max_connections == 0 {
            return Err(ConfigError::Invalid {
                name: "db_max_connections",
                reason: "must be greater than zero".into(),
            });
        }
        let api_base_url = s.api_base_url.ok_or(ConfigError::Missing("api_base_url"))?;
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                name: "api_base_url",
                reason: format!("'{api_base_url}' is not an http(s) url"),
            });
        }

        Ok(SyncConfig {
            input_db_url: s.input_db_url,
            output_db_url: s.output_db_url,
            api_base_url: with_trailing_slash(api_base_url),
            rate_limit_calls: s.rate_limit_calls.unwrap_or(290),
            rate_limit_period: Duration::from_secs(rate_limit_period_secs),
            max_retries: s.max_retries.unwrap_or(3),
            request_timeout: Duration::from_secs(s.request_timeout_secs.unwrap_or(30)),
            db_max_connections,
            log_dir: s.log_dir.unwrap_or_else(|| PathBuf::from("./logs")),
            log_level: s.log_level.unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// Relative paths must append to the base URL, not replace its last segment.
fn with_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub input_db_url: Option<String>,
    pub output_db_url: Option<String>,
    pub api_base_url: String,
    pub rate_limit_calls: u32,
    pub rate_limit_period: Duration,
    pub max_retries: u32,
    pub request_timeout: Duration,
    pub db_max_connections: u32,
    pub log_dir: PathBuf,
    pub log_level: String,
}

impl SyncConfig {
    pub fn input_db(&self) -> Result<&str, ConfigError> {
        self.input_db_url
            .as_deref()
            .ok_or(ConfigError::Missing("input_db_url (POSTGRES_INPUT_DB)"))
    }

    pub fn output_db(&self) -> Result<&str, ConfigError> {
        self.output_db_url
            .as_deref()
            .ok_or(ConfigError::Missing("output_db_url (POSTGRES_OUTPUT_DB)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        settings: SyncSettings,
    }

    #[test]
    fn test_defaults_resolve() {
        let config = SyncSettings::default().resolve().unwrap();
        assert_eq!(config.api_base_url, "https://avoindata.prh.fi/bis/v1/");
        assert_eq!(config.rate_limit_calls, 290);
        assert_eq!(config.rate_limit_period, Duration::from_secs(60));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.db_max_connections, 5);
        assert!(matches!(config.output_db(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_merge_prefers_other() {
        let base = SyncSettings {
            max_retries: Some(1),
            log_level: Some("debug".into()),
            ..Default::default()
        };
        let over = SyncSettings {
            max_retries: Some(7),
            ..Default::default()
        };
        let merged = base.merge(over);
        assert_eq!(merged.max_retries, Some(7));
        assert_eq!(merged.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_file_layer_sits_between_defaults_and_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"outputDbUrl": "postgres://file/out", "maxRetries": 9, "rateLimitCalls": 100}}"#
        )
        .unwrap();

        let overrides = SyncSettings {
            config_path: Some(file.path().to_path_buf()),
            rate_limit_calls: Some(50),
            ..Default::default()
        };
        let config = SyncSettings::layered(overrides).resolve().unwrap();
        assert_eq!(config.output_db().unwrap(), "postgres://file/out");
        assert_eq!(config.max_retries, 9);
        assert_eq!(config.rate_limit_calls, 50);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_file_is_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            SyncSettings::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));

        let overrides = SyncSettings {
            config_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(SyncSettings::layered(overrides.clone()), SyncSettings::defaults().merge(overrides));
    }

    #[test]
    fn test_rejects_zero_period_and_bad_url() {
        let zero = SyncSettings {
            rate_limit_period_secs: Some(0),
            ..Default::default()
        };
        assert!(matches!(zero.resolve(), Err(ConfigError::Invalid { .. })));

        let bad = SyncSettings {
            api_base_url: Some("ftp://example".into()),
            ..Default::default()
        };
        assert!(matches!(bad.resolve(), Err(ConfigError::Invalid { name: "api_base_url", .. })));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let settings = SyncSettings {
            api_base_url: Some("http://localhost:8080/bis/v1".into()),
            ..Default::default()
        };
        assert_eq!(settings.resolve().unwrap().api_base_url, "http://localhost:8080/bis/v1/");
    }

    #[test]
    fn test_cli_flags_parse() {
        let cli = Cli::try_parse_from([
            "prh",
            "--output-db-url",
            "postgres://cli/out",
            "--rate-limit-calls",
            "10",
        ])
        .unwrap();
        assert_eq!(cli.settings.output_db_url.as_deref(), Some("postgres://cli/out"));
        assert_eq!(cli.settings.rate_limit_calls, Some(10));
    }
}
