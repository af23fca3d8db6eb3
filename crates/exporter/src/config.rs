//! Exporter configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Exporter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExporterConfig {
    /// Host identity attached to every metric
    #[serde(default = "default_host_name")]
    pub host_name: String,

    /// Containers whose name contains this substring get status metrics
    #[serde(default = "default_status_selector")]
    pub status_selector: String,

    /// Namespace metrics are published under
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Docker Engine API endpoint
    #[serde(default = "default_docker_endpoint")]
    pub docker_endpoint: String,

    #[serde(default = "default_docker_timeout")]
    pub docker_timeout_secs: u64,

    /// List stopped containers as well as running ones
    #[serde(default = "default_include_stopped")]
    pub include_stopped: bool,

    /// `tcp://host:port` of an EMF listener, or `stdout`
    #[serde(default = "default_sink_endpoint")]
    pub sink_endpoint: String,

    #[serde(default = "default_sink_timeout")]
    pub sink_timeout_ms: u64,

    #[serde(default = "default_sink_max_retries")]
    pub sink_max_retries: u32,

    #[serde(default = "default_sink_retry_backoff")]
    pub sink_retry_backoff_ms: u64,

    /// Containers processed in parallel
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Collection interval in seconds
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_jitter")]
    pub jitter_secs: u64,

    /// Run a single cycle and exit
    #[serde(default)]
    pub run_once: bool,

    /// `json` or `pretty`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_host_name() -> String {
    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .ok()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_else(|| "unknown".to_string())
}

fn default_status_selector() -> String {
    "app".to_string()
}

fn default_namespace() -> String {
    exporter_lib::DEFAULT_NAMESPACE.to_string()
}

fn default_docker_endpoint() -> String {
    "http://localhost:2375".to_string()
}

fn default_docker_timeout() -> u64 {
    10
}

fn default_include_stopped() -> bool {
    true
}

fn default_sink_endpoint() -> String {
    "tcp://127.0.0.1:25888".to_string()
}

fn default_sink_timeout() -> u64 {
    5000
}

fn default_sink_max_retries() -> u32 {
    2
}

fn default_sink_retry_backoff() -> u64 {
    200
}

fn default_concurrency() -> usize {
    4
}

fn default_interval() -> u64 {
    60
}

fn default_jitter() -> u64 {
    5
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Command line values that take precedence over file and environment
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub run_once: bool,
    pub status_selector: Option<String>,
    pub host_name: Option<String>,
}

impl ExporterConfig {
    /// Load configuration from an optional file, then `EXPORTER_*`
    /// environment variables, then command line overrides
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        Self::load_with_env(file, overrides, "EXPORTER")
    }

    fn load_with_env(file: Option<&Path>, overrides: &Overrides, env_prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(config::Environment::with_prefix(env_prefix));

        if overrides.run_once {
            builder = builder.set_override("run_once", true)?;
        }
        if let Some(selector) = &overrides.status_selector {
            builder = builder.set_override("status_selector", selector.as_str())?;
        }
        if let Some(host) = &overrides.host_name {
            builder = builder.set_override("host_name", host.as_str())?;
        }

        let config: ExporterConfig = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values no cycle could run with
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        if self.interval_secs == 0 {
            anyhow::bail!("interval_secs must be at least 1");
        }
        if self.namespace.is_empty() {
            anyhow::bail!("namespace must not be empty");
        }
        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            anyhow::bail!("log_format must be json or pretty, got {}", self.log_format);
        }
        Ok(())
    }

    pub fn docker_timeout(&self) -> Duration {
        Duration::from_secs(self.docker_timeout_secs)
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_millis(self.sink_timeout_ms)
    }

    pub fn sink_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.sink_retry_backoff_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_secs(self.jitter_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // Unique prefix so the process environment does not leak in
    const TEST_PREFIX: &str = "EXPORTER_TEST_UNUSED";

    #[test]
    fn test_defaults() {
        let config =
            ExporterConfig::load_with_env(None, &Overrides::default(), TEST_PREFIX).unwrap();

        assert_eq!(config.status_selector, "app");
        assert_eq!(config.namespace, "Docker/Stats");
        assert_eq!(config.sink_endpoint, "tcp://127.0.0.1:25888");
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.interval(), Duration::from_secs(60));
        assert!(config.include_stopped);
        assert!(!config.run_once);
        assert!(!config.host_name.is_empty());
    }

    #[test]
    fn test_file_and_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "status_selector = \"svc\"\nsink_endpoint = \"stdout\"\nconcurrency = 8"
        )
        .unwrap();

        let overrides = Overrides {
            run_once: true,
            status_selector: None,
            host_name: Some("host-a".to_string()),
        };
        let config =
            ExporterConfig::load_with_env(Some(file.path()), &overrides, TEST_PREFIX).unwrap();

        assert_eq!(config.status_selector, "svc");
        assert_eq!(config.sink_endpoint, "stdout");
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.host_name, "host-a");
        assert!(config.run_once);
    }

    #[test]
    fn test_cli_selector_beats_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "status_selector = \"svc\"").unwrap();

        let overrides = Overrides {
            status_selector: Some("api".to_string()),
            ..Default::default()
        };
        let config =
            ExporterConfig::load_with_env(Some(file.path()), &overrides, TEST_PREFIX).unwrap();

        assert_eq!(config.status_selector, "api");
    }

    #[test]
    fn test_invalid_values_are_fatal() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "concurrency = 0").unwrap();

        let result =
            ExporterConfig::load_with_env(Some(file.path()), &Overrides::default(), TEST_PREFIX);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = ExporterConfig::load_with_env(
            Some(Path::new("/nonexistent/exporter.toml")),
            &Overrides::default(),
            TEST_PREFIX,
        );
        assert!(result.is_err());
    }
}
