//! Configuration for plugin lifecycles.
//!
//! Settings come from [`Default`], from environment variables, or (with the
//! `config` feature) from JSON.

use std::env;
use std::time::Duration;

#[cfg(feature = "config")]
use serde::Deserialize;

use crate::error::{LifecycleError, LifecycleResult};

/// Prefix used by [`LifecycleConfig::from_env`].
pub const ENV_PREFIX: &str = "PLUGIN_LIFECYCLE";

/// Tunables shared by the lifecycle and the sample plugin.
///
/// # Examples
///
/// ```
/// use plugin_lifecycle::LifecycleConfig;
/// use std::time::Duration;
///
/// let config = LifecycleConfig::default()
///     .with_deferred_action_delay(Duration::from_millis(250));
/// assert_eq!(config.deferred_action_delay, Duration::from_millis(250));
/// assert!(config.cancel_pending_on_deactivate);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Delay before deferred terminal actions (hide, show, dispose) run
    pub deferred_action_delay: Duration,
    /// Name given to sample terminals
    pub terminal_name: String,
    /// Shell launched in sample terminals
    pub default_shell: String,
    /// How long the timed status bar message stays visible
    pub status_message_timeout: Duration,
    /// Cancel scheduled continuations before draining on deactivation
    pub cancel_pending_on_deactivate: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            deferred_action_delay: Duration::from_millis(3000),
            terminal_name: "Test terminal".to_string(),
            default_shell: "/bin/bash".to_string(),
            status_message_timeout: Duration::from_millis(5000),
            cancel_pending_on_deactivate: true,
        }
    }
}

impl LifecycleConfig {
    pub fn with_deferred_action_delay(mut self, delay: Duration) -> Self {
        self.deferred_action_delay = delay;
        self
    }

    pub fn with_terminal_name(mut self, name: impl Into<String>) -> Self {
        self.terminal_name = name.into();
        self
    }

    pub fn with_default_shell(mut self, shell: impl Into<String>) -> Self {
        self.default_shell = shell.into();
        self
    }

    pub fn with_status_message_timeout(mut self, timeout: Duration) -> Self {
        self.status_message_timeout = timeout;
        self
    }

    pub fn with_cancel_pending_on_deactivate(mut self, cancel: bool) -> Self {
        self.cancel_pending_on_deactivate = cancel;
        self
    }

    /// Reads `PLUGIN_LIFECYCLE_*` environment variables over the defaults.
    pub fn from_env() -> LifecycleResult<Self> {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// Reads `{prefix}_*` environment variables over the defaults.
    ///
    /// Recognised keys: `DEFERRED_ACTION_DELAY_MS`, `TERMINAL_NAME`,
    /// `DEFAULT_SHELL`, `STATUS_MESSAGE_TIMEOUT_MS`,
    /// `CANCEL_PENDING_ON_DEACTIVATE`.
    pub fn from_env_with_prefix(prefix: &str) -> LifecycleResult<Self> {
        Self::from_lookup(prefix, |key| env::var(key).ok())
    }

    /// Like [`from_env_with_prefix`](Self::from_env_with_prefix) with a custom
    /// variable source.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> LifecycleResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = |name: &str| format!("{}_{}", prefix.to_uppercase(), name);
        let mut config = Self::default();

        if let Some(value) = lookup(&key("DEFERRED_ACTION_DELAY_MS")) {
            config.deferred_action_delay = parse_millis("DEFERRED_ACTION_DELAY_MS", &value)?;
        }
        if let Some(value) = lookup(&key("TERMINAL_NAME")) {
            config.terminal_name = value;
        }
        if let Some(value) = lookup(&key("DEFAULT_SHELL")) {
            config.default_shell = value;
        }
        if let Some(value) = lookup(&key("STATUS_MESSAGE_TIMEOUT_MS")) {
            config.status_message_timeout = parse_millis("STATUS_MESSAGE_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup(&key("CANCEL_PENDING_ON_DEACTIVATE")) {
            config.cancel_pending_on_deactivate = value.trim().parse::<bool>().map_err(|_| {
                LifecycleError::Config(format!(
                    "CANCEL_PENDING_ON_DEACTIVATE must be true or false, got '{}'",
                    value
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON document; missing fields keep their defaults.
    ///
    /// ```
    /// # #[cfg(feature = "config")]
    /// # {
    /// use plugin_lifecycle::LifecycleConfig;
    ///
    /// let config = LifecycleConfig::from_json_str(r#"{ "terminal_name": "Build" }"#).unwrap();
    /// assert_eq!(config.terminal_name, "Build");
    /// # }
    /// ```
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> LifecycleResult<Self> {
        let file: ConfigFile = serde_json::from_str(json)
            .map_err(|e| LifecycleError::Config(format!("invalid JSON configuration: {}", e)))?;
        let config = file.apply(Self::default());
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> LifecycleResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LifecycleError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// Checks values the host would reject.
    pub fn validate(&self) -> LifecycleResult<()> {
        if self.terminal_name.trim().is_empty() {
            return Err(LifecycleError::Config("terminal_name must not be empty".to_string()));
        }
        if self.default_shell.trim().is_empty() {
            return Err(LifecycleError::Config("default_shell must not be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_millis(name: &str, value: &str) -> LifecycleResult<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| {
            LifecycleError::Config(format!(
                "{} must be a non-negative integer of milliseconds, got '{}'",
                name, value
            ))
        })
}

#[cfg(feature = "config")]
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    deferred_action_delay_ms: Option<u64>,
    terminal_name: Option<String>,
    default_shell: Option<String>,
    status_message_timeout_ms: Option<u64>,
    cancel_pending_on_deactivate: Option<bool>,
}

#[cfg(feature = "config")]
impl ConfigFile {
    fn apply(self, mut config: LifecycleConfig) -> LifecycleConfig {
        if let Some(ms) = self.deferred_action_delay_ms {
            config.deferred_action_delay = Duration::from_millis(ms);
        }
        if let Some(name) = self.terminal_name {
            config.terminal_name = name;
        }
        if let Some(shell) = self.default_shell {
            config.default_shell = shell;
        }
        if let Some(ms) = self.status_message_timeout_ms {
            config.status_message_timeout = Duration::from_millis(ms);
        }
        if let Some(cancel) = self.cancel_pending_on_deactivate {
            config.cancel_pending_on_deactivate = cancel;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn env_overrides_defaults() {
        let config = LifecycleConfig::from_lookup(
            "demo",
            lookup(&[
                ("DEMO_DEFERRED_ACTION_DELAY_MS", "10"),
                ("DEMO_TERMINAL_NAME", "Scratch"),
                ("DEMO_CANCEL_PENDING_ON_DEACTIVATE", "false"),
            ]),
        )
        .unwrap();

        assert_eq!(config.deferred_action_delay, Duration::from_millis(10));
        assert_eq!(config.terminal_name, "Scratch");
        assert_eq!(config.default_shell, "/bin/bash");
        assert!(!config.cancel_pending_on_deactivate);
    }

    #[test]
    fn invalid_env_values_are_config_errors() {
        let err = LifecycleConfig::from_lookup("demo", lookup(&[("DEMO_DEFERRED_ACTION_DELAY_MS", "-5")]))
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Config(msg) if msg.contains("DEFERRED_ACTION_DELAY_MS")));

        let err = LifecycleConfig::from_lookup("demo", lookup(&[("DEMO_TERMINAL_NAME", "  ")]))
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Config(_)));
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_rejects_unknown_fields() {
        let config = LifecycleConfig::from_json_str(r#"{ "deferred_action_delay_ms": 5 }"#).unwrap();
        assert_eq!(config.deferred_action_delay, Duration::from_millis(5));
        assert!(LifecycleConfig::from_json_str(r#"{ "delay": 5 }"#).is_err());
    }
}
