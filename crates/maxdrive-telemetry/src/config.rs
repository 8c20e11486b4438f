//! Connector configuration, loadable from a JSON settings file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Settings file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// Settings file is not valid JSON or has the wrong shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level telemetry settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Position connector settings.
    pub position: PositionConfig,
    /// Diagnostics connector settings.
    pub diagnostics: DiagnosticsConfig,
}

impl TelemetryConfig {
    /// Load settings from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Position connector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    /// Ask the platform for high-accuracy fixes.
    pub high_accuracy: bool,
    /// Per-fix timeout in milliseconds.
    pub fix_timeout_ms: u64,
    /// Maximum acceptable fix age in milliseconds.
    pub max_fix_age_ms: u64,
    /// Bounded retry attempts after a transient fix error.
    pub max_retries: u32,
    /// Linear backoff step in milliseconds (`step × attempt`).
    pub backoff_step_ms: u64,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            fix_timeout_ms: 10_000,
            max_fix_age_ms: 1_000,
            max_retries: 3,
            backoff_step_ms: 2_000,
        }
    }
}

/// Diagnostics connector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Use the self-contained simulator instead of a real transport.
    pub simulate: bool,
    /// Diagnostics stream host.
    pub host: String,
    /// Diagnostics stream port.
    pub port: u16,
    /// Fixed delay between reconnection attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// Simulator tick period in milliseconds.
    pub sim_tick_ms: u64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            simulate: false,
            host: "localhost".to_string(),
            port: 35_000,
            retry_delay_ms: 5_000,
            sim_tick_ms: 800,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = TelemetryConfig::default();
        assert_eq!(config.diagnostics.port, 35_000);
        assert_eq!(config.diagnostics.retry_delay_ms, 5_000);
        assert_eq!(config.position.max_retries, 3);
        assert!(config.position.high_accuracy);
        assert!(!config.diagnostics.simulate);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: TelemetryConfig =
            serde_json::from_str(r#"{"diagnostics": {"simulate": true, "port": 9000}}"#).unwrap();
        assert!(config.diagnostics.simulate);
        assert_eq!(config.diagnostics.port, 9000);
        assert_eq!(config.diagnostics.host, "localhost");
        assert_eq!(config.position.fix_timeout_ms, 10_000);
    }
}
