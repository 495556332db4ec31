//! Shell configuration: API endpoint, request timeout, data directory, route file.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | TASKDESK_CONFIG | config/taskdesk.toml | Optional TOML file with the fields below. |
//! | TASKDESK_API_BASE_URL | http://localhost:8000 | Task server base URL. |
//! | TASKDESK_REQUEST_TIMEOUT_MS | 5000 | Per-request timeout for the HTTP transport. |
//! | TASKDESK_DATA_DIR | ./data/taskdesk | Where the credential store lives. |
//! | TASKDESK_ROUTES_FILE | (built-in table) | TOML route table replacing the built-in one. |
//! | TASKDESK_EPHEMERAL | false | Keep the credential in memory only. |

use crate::error::RouteError;
use crate::routes::RouteTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config/taskdesk.toml";

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data/taskdesk")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub routes_file: Option<PathBuf>,
    #[serde(default)]
    pub ephemeral: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            data_dir: default_data_dir(),
            routes_file: None,
            ephemeral: false,
        }
    }
}

impl ShellConfig {
    /// Load config. Precedence: `TASKDESK_*` env > file (`TASKDESK_CONFIG` or
    /// `config/taskdesk.toml`, if present) > defaults.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path =
            std::env::var("TASKDESK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&config_path))
    }

    pub fn load_from(path: &Path) -> Result<Self, ::config::ConfigError> {
        let builder = ::config::Config::builder()
            .set_default("api_base_url", default_api_base_url())?
            .set_default("request_timeout_ms", default_request_timeout_ms())?
            .set_default("data_dir", "./data/taskdesk")?
            .set_default("ephemeral", false)?;

        let builder = if path.exists() {
            builder.add_source(::config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(
                ::config::Environment::with_prefix("TASKDESK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        built.try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    /// Sled directory for the credential mirror.
    pub fn credential_store_path(&self) -> PathBuf {
        self.data_dir.join("session")
    }

    /// Route table from `routes_file`, or the built-in one.
    pub fn route_table(&self) -> Result<RouteTable, RouteError> {
        match &self.routes_file {
            Some(path) => RouteTable::load(path),
            None => Ok(RouteTable::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskdesk.toml");
        std::fs::write(
            &path,
            "api_base_url = \"http://tasks.internal:9000\"\nrequest_timeout_ms = 1500\n",
        )
        .unwrap();

        let config = ShellConfig::load_from(&path).unwrap();
        assert_eq!(config.api_base_url, "http://tasks.internal:9000");
        assert_eq!(config.request_timeout(), Duration::from_millis(1500));
        assert_eq!(config.data_dir, PathBuf::from("./data/taskdesk"));
        assert!(config.routes_file.is_none());
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = ShellConfig::load_from(Path::new("/nonexistent/taskdesk.toml")).unwrap();
        let defaults = ShellConfig::default();
        assert_eq!(config.request_timeout_ms, defaults.request_timeout_ms);
        assert_eq!(
            config.credential_store_path(),
            PathBuf::from("./data/taskdesk").join("session")
        );
        assert!(config.route_table().unwrap().routes().count() > 0);
    }
}
