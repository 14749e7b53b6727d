//! Configuration model for procrun

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::executor::encoding::Encoding;
use crate::executor::invocation::secs_to_duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Defaults applied to every invocation
    #[serde(default)]
    pub defaults: Defaults,

    /// Process-exit cleanup behaviour
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

/// Defaults applied to every invocation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    /// Timeout in seconds when an invocation sets none (absent = wait forever)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<f64>,

    /// Encoding for text accessors
    #[serde(default)]
    pub encoding: Encoding,

    /// Shell used for shell-string invocations
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Flag that makes the shell read a command string
    #[serde(default = "default_shell_flag")]
    pub shell_flag: String,

    /// How often `watch` polls a detached invocation
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_shell() -> String {
    if cfg!(windows) { "cmd" } else { "sh" }.to_string()
}

fn default_shell_flag() -> String {
    if cfg!(windows) { "/C" } else { "-c" }.to_string()
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            encoding: Encoding::default(),
            shell: default_shell(),
            shell_flag: default_shell_flag(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Defaults {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(secs_to_duration)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Cleanup configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CleanupConfig {
    /// Drain the cleanup registry on SIGINT/SIGTERM
    #[serde(default = "default_handle_signals")]
    pub handle_signals: bool,
}

fn default_handle_signals() -> bool {
    true
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            handle_signals: default_handle_signals(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert!(config.defaults.timeout().is_none());
        assert_eq!(config.defaults.encoding, Encoding::Utf8);
        assert_eq!(config.defaults.poll_interval(), Duration::from_millis(100));
        assert!(config.cleanup.handle_signals);
        #[cfg(unix)]
        assert_eq!(config.defaults.shell, "sh");
    }

    #[test]
    fn test_config_deserialize_partial() {
        let toml_str = r#"
            [defaults]
            timeout_secs = 2.5
            encoding = "latin1"
            shell = "bash"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.defaults.timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.defaults.encoding, Encoding::Latin1);
        assert_eq!(config.defaults.shell, "bash");
        assert_eq!(config.defaults.poll_interval_ms, 100);
        assert!(config.cleanup.handle_signals);
    }

    #[test]
    fn test_negative_timeout_means_immediate() {
        let defaults = Defaults {
            timeout_secs: Some(-1.0),
            ..Default::default()
        };
        assert_eq!(defaults.timeout(), Some(Duration::ZERO));
    }

    #[test]
    fn test_config_serialization_skips_missing_timeout() {
        let toml_str = toml::to_string(&Config::default()).unwrap();
        assert!(!toml_str.contains("timeout_secs"));
        assert!(toml_str.contains("poll_interval_ms"));
    }
}
