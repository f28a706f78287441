//! Client configuration.
//!
//! Configuration can be loaded from:
//! - TOML configuration file (`ripple.toml`, `/etc/ripple/ripple.toml`,
//!   `~/.config/ripple/ripple.toml`)
//! - Environment variables (`RIPPLE__*`, nested keys separated by `__`)
//!
//! Recognized delivery options also accept their camelCase names
//! (`pollIntervalMs`, `baseBackoffMs`, ...).

use anyhow::{Context, Result};
use ripple_core::{BackoffPolicy, PublisherConfig, Viewer};
use ripple_protocol::Role;
use ripple_transport::{DriverSettings, TransportKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file locations, in search order.
pub const CONFIG_PATHS: [&str; 3] = [
    "ripple.toml",
    "/etc/ripple/ripple.toml",
    "~/.config/ripple/ripple.toml",
];

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Delivery mechanism.
    #[serde(default)]
    pub transport: TransportKind,

    /// Poll interval in milliseconds.
    #[serde(default = "default_poll_interval", alias = "pollIntervalMs")]
    pub poll_interval_ms: u64,

    /// First reconnect delay in milliseconds.
    #[serde(default = "default_base_backoff", alias = "baseBackoffMs")]
    pub base_backoff_ms: u64,

    /// Reconnect delay cap in milliseconds.
    #[serde(default = "default_max_backoff", alias = "maxBackoffMs")]
    pub max_backoff_ms: u64,

    /// Push liveness window in milliseconds.
    #[serde(default = "default_heartbeat_timeout", alias = "heartbeatTimeoutMs")]
    pub heartbeat_timeout_ms: u64,

    /// Maximum outbound message length in characters.
    #[serde(default = "default_max_content_length", alias = "maxContentLength")]
    pub max_content_length: usize,

    /// Channel to subscribe and publish to.
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Server endpoints.
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Who events are rendered for.
    #[serde(default)]
    pub viewer: ViewerConfig,

    /// Show native notifications for notify-worthy events.
    #[serde(default = "default_true")]
    pub notifications: bool,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Server endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// WebSocket URL for push delivery.
    #[serde(default, alias = "pushUrl")]
    pub push_url: Option<String>,

    /// HTTP URL for poll delivery.
    #[serde(default, alias = "pollUrl")]
    pub poll_url: Option<String>,

    /// HTTP URL for publishing.
    #[serde(default, alias = "publishUrl")]
    pub publish_url: Option<String>,
}

/// Viewer identity and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Role of the viewer.
    #[serde(default = "default_role")]
    pub role: Role,

    /// Identity of the viewer.
    #[serde(default = "default_viewer_id")]
    pub id: String,

    /// Opaque bearer token passed through to the server.
    #[serde(default = "default_token")]
    pub token: Option<String>,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default)]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_poll_interval() -> u64 {
    5_000
}

fn default_base_backoff() -> u64 {
    1_000
}

fn default_max_backoff() -> u64 {
    30_000
}

fn default_heartbeat_timeout() -> u64 {
    45_000
}

fn default_max_content_length() -> usize {
    ripple_core::publisher::DEFAULT_MAX_CONTENT_LENGTH
}

fn default_channel() -> String {
    std::env::var("RIPPLE_CHANNEL").unwrap_or_else(|_| "lobby".to_string())
}

fn default_role() -> Role {
    Role::RegularUser
}

fn default_viewer_id() -> String {
    std::env::var("RIPPLE_VIEWER_ID").unwrap_or_else(|_| "anonymous".to_string())
}

fn default_token() -> Option<String> {
    std::env::var("RIPPLE_TOKEN").ok().filter(|t| !t.is_empty())
}

fn default_true() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            poll_interval_ms: default_poll_interval(),
            base_backoff_ms: default_base_backoff(),
            max_backoff_ms: default_max_backoff(),
            heartbeat_timeout_ms: default_heartbeat_timeout(),
            max_content_length: default_max_content_length(),
            channel: default_channel(),
            endpoints: EndpointsConfig::default(),
            viewer: ViewerConfig::default(),
            notifications: true,
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            role: default_role(),
            id: default_viewer_id(),
            token: default_token(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from the first default path found, layered with
    /// `RIPPLE__*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        Self::load_layered(Self::find_file().as_deref())
    }

    /// The first existing file among [`CONFIG_PATHS`].
    #[must_use]
    pub fn find_file() -> Option<PathBuf> {
        CONFIG_PATHS
            .iter()
            .map(|path| PathBuf::from(shellexpand::tilde(path).as_ref()))
            .find(|path| path.exists())
    }

    /// Layer an optional file with `RIPPLE__*` environment variables.
    ///
    /// The file is parsed with `toml` first, so camelCase option names
    /// resolve before the `config` crate folds key case.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or the sources cannot
    /// be merged or deserialized.
    pub fn load_layered(file: Option<&Path>) -> Result<Self> {
        let base = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let base = config::Config::try_from(&base).context("Failed to stage configuration")?;

        let layered = config::Config::builder()
            .add_source(base)
            .add_source(
                config::Environment::with_prefix("RIPPLE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?;
        layered
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Reconnect backoff policy.
    #[must_use]
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::from_millis(self.base_backoff_ms, self.max_backoff_ms)
    }

    /// The viewer events are projected for.
    #[must_use]
    pub fn viewer(&self) -> Viewer {
        Viewer::new(self.viewer.role, &self.viewer.id)
    }

    /// Settings for building the transport driver.
    #[must_use]
    pub fn driver_settings(&self) -> DriverSettings {
        DriverSettings {
            push_url: self.endpoints.push_url.clone(),
            poll_url: self.endpoints.poll_url.clone(),
            channel: self.channel.clone(),
            viewer_id: self.viewer.id.clone(),
            token: self.viewer.token.clone(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            heartbeat_timeout: Duration::from_millis(self.heartbeat_timeout_ms),
        }
    }

    /// Settings for the outbound publisher.
    #[must_use]
    pub fn publisher_config(&self) -> PublisherConfig {
        let mut config = PublisherConfig::new(&self.viewer.id, &self.channel);
        config.max_content_length = self.max_content_length;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.transport, TransportKind::Push);
        assert_eq!(config.poll_interval_ms, 5_000);
        assert_eq!(config.max_content_length, 200);
        assert_eq!(config.backoff(), BackoffPolicy::default());
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            transport = "poll"
            poll_interval_ms = 2000
            channel = "stage"

            [endpoints]
            poll_url = "http://localhost:8080/poll"

            [viewer]
            role = "moderator"
            id = "mod-1"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.transport, TransportKind::Poll);
        assert_eq!(config.poll_interval_ms, 2000);
        assert_eq!(config.viewer(), Viewer::moderator("mod-1"));

        let settings = config.driver_settings();
        assert_eq!(settings.poll_interval, Duration::from_secs(2));
        assert_eq!(settings.poll_url.as_deref(), Some("http://localhost:8080/poll"));
        assert_eq!(settings.channel, "stage");
    }

    #[test]
    fn test_camel_case_aliases() {
        let toml_str = r#"
            pollIntervalMs = 750
            baseBackoffMs = 500
            maxBackoffMs = 8000
            heartbeatTimeoutMs = 9000
            maxContentLength = 80

            [endpoints]
            pushUrl = "ws://localhost/stream"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.poll_interval_ms, 750);
        assert_eq!(config.backoff(), BackoffPolicy::from_millis(500, 8000));
        assert_eq!(config.heartbeat_timeout_ms, 9000);
        assert_eq!(config.publisher_config().max_content_length, 80);
        assert_eq!(
            config.endpoints.push_url.as_deref(),
            Some("ws://localhost/stream")
        );
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("ripple-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "channel = \"from-file\"\nmax_backoff_ms = 4000").unwrap();
        drop(file);

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.channel, "from-file");
        assert_eq!(config.max_backoff_ms, 4000);

        let layered = Config::load_layered(Some(&path)).unwrap();
        assert_eq!(layered.max_backoff_ms, 4000);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_layered_load_keeps_camel_case_options() {
        let path = std::env::temp_dir().join(format!("ripple-camel-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "pollIntervalMs = 750\nmaxContentLength = 80\nbaseBackoffMs = 250\n\n\
             [endpoints]\npushUrl = \"ws://localhost/stream\"\n\n\
             [viewer]\nid = \"42\"\ntoken = \"secret\"\n",
        )
        .unwrap();

        let config = Config::load_layered(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.poll_interval_ms, 750);
        assert_eq!(config.max_content_length, 80);
        assert_eq!(config.base_backoff_ms, 250);
        assert_eq!(
            config.endpoints.push_url.as_deref(),
            Some("ws://localhost/stream")
        );
        assert_eq!(config.viewer.id, "42");
        assert_eq!(config.viewer.token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_layered_load_without_file() {
        let config = Config::load_layered(None).unwrap();
        assert_eq!(config.base_backoff_ms, 1_000);
    }

    #[test]
    fn test_missing_file() {
        assert!(Config::from_file("/nonexistent/ripple.toml").is_err());
    }
}
