//! Configuration manager for identity.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::AppState;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_PORT: u16 = 8080;
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Domain name of current instance.
    pub url: String,
    /// Listening port.
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Related to PostgreSQL configuration.
    /// Users are kept in memory when missing.
    #[serde(skip_serializing)]
    pub postgres: Option<Postgres>,
    /// Related to metrics and traces export.
    #[serde(skip_serializing)]
    pub telemetry: Option<Telemetry>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: env!("CARGO_CRATE_NAME").to_owned(),
            url: String::default(),
            port: DEFAULT_PORT,
            version: VERSION.to_owned(),
            path: PathBuf::default(),
            postgres: None,
            telemetry: None,
        }
    }
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

/// Telemetry configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Telemetry {
    /// Serve Prometheus metrics on `/metrics`.
    #[serde(default = "enabled")]
    pub prometheus: bool,
    /// gRPC endpoint of an OTLP collector receiving spans.
    pub otlp_endpoint: Option<String>,
}

fn enabled() -> bool {
    true
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            prometheus: true,
            otlp_endpoint: None,
        }
    }
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Application version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`).
    fn normalize_url(&self, url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.to_string())
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Result<Arc<Self>, url::ParseError> {
        let file_path = if self.path.is_file() {
            &self.path
        } else {
            &Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        match File::open(file_path) {
            Ok(file) => {
                let mut config: Configuration =
                    match serde_yaml::from_reader(file) {
                        Ok(config) => config,
                        Err(err) => {
                            return Ok(Arc::new(self.error(err)));
                        },
                    };

                // set app version.
                config.version = VERSION.to_owned();
                config.path = file_path.clone();

                // normalize URLs.
                if !config.url.is_empty() {
                    config.url = self.normalize_url(&config.url)?;
                }

                Ok(Arc::new(config))
            },
            Err(err) => Ok(Arc::new(self.error(err))),
        }
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file cannot be read");
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_normalize_url() {
        let config = Configuration::default();

        assert_eq!(
            config.normalize_url("account.example.com").unwrap(),
            "https://account.example.com/"
        );
        assert_eq!(
            config.normalize_url("http://localhost:8080").unwrap(),
            "http://localhost:8080/"
        );
    }

    #[test]
    fn test_read_fallback() {
        let config = Configuration::default()
            .path(PathBuf::from("does-not-exist.yaml"))
            .read()
            .unwrap();

        // Falls back on `config.yaml` when present, defaults otherwise.
        assert_eq!(config.version(), VERSION);
    }

    #[test]
    fn test_read_file() {
        let path = std::env::temp_dir()
            .join(format!("identity-config-{}.yaml", std::process::id()));
        let mut file = File::create(&path).unwrap();
        writeln!(
            file,
            "name: identity\nurl: id.example.com\nport: 9000\npostgres:\n  address: localhost:5432\n  pool_size: 4\ntelemetry:\n  otlp_endpoint: http://localhost:4317"
        )
        .unwrap();

        let config = Configuration::default().path(path.clone()).read().unwrap();
        std::fs::remove_file(path).unwrap();

        assert_eq!(config.url, "https://id.example.com/");
        assert_eq!(config.port, 9000);
        assert_eq!(config.postgres.as_ref().unwrap().pool_size, Some(4));
        let telemetry = config.telemetry.as_ref().unwrap();
        assert!(telemetry.prometheus);
        assert_eq!(
            telemetry.otlp_endpoint.as_deref(),
            Some("http://localhost:4317")
        );
    }
}
