// src/config.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "config/proxy.toml";

const ENV_ATTEMPT_TIMEOUT: &str = "PROXY_ATTEMPT_TIMEOUT_SECS";
const ENV_SELFTEXT_MAX: &str = "PROXY_SELFTEXT_MAX_CHARS";
const ENV_SKIP_PINNED: &str = "PROXY_SKIP_PINNED";

/// Tunables for the fetch chain and post normalization.
///
/// Resolution order: built-in defaults, then `config/proxy.toml` when
/// present, then environment overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Per-strategy outbound timeout. One attempt per strategy, no retry.
    pub attempt_timeout_secs: u64,
    /// selftext is truncated to this many characters before leaving the
    /// normalizer.
    pub selftext_max_chars: usize,
    /// Drop stickied posts from JSON listings instead of flagging them.
    pub skip_pinned: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_secs: 7,
            selftext_max_chars: 300,
            skip_pinned: false,
        }
    }
}

impl ProxyConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing proxy config toml")
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading proxy config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load config with file + env fallbacks. Never fails: a broken file
    /// logs a warning and falls back to defaults so the service still
    /// boots.
    pub fn load() -> Self {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        let mut cfg = if path.exists() {
            Self::from_toml_file(path).unwrap_or_else(|e| {
                tracing::warn!(error = ?e, "proxy config file unreadable, using defaults");
                Self::default()
            })
        } else {
            Self::default()
        };
        cfg.apply_env_overrides();
        cfg
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse::<u64>(ENV_ATTEMPT_TIMEOUT) {
            self.attempt_timeout_secs = v;
        }
        if let Some(v) = env_parse::<usize>(ENV_SELFTEXT_MAX) {
            self.selftext_max_chars = v;
        }
        if let Ok(v) = std::env::var(ENV_SKIP_PINNED) {
            self.skip_pinned = matches!(v.trim(), "1" | "true" | "yes");
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = ProxyConfig::default();
        assert_eq!(cfg.attempt_timeout_secs, 7);
        assert_eq!(cfg.selftext_max_chars, 300);
        assert!(!cfg.skip_pinned);
    }

    #[test]
    fn toml_overrides_partial_fields() {
        let cfg = ProxyConfig::from_toml_str("attempt_timeout_secs = 6\n").expect("parse");
        assert_eq!(cfg.attempt_timeout_secs, 6);
        // untouched fields keep defaults
        assert_eq!(cfg.selftext_max_chars, 300);
        assert!(!cfg.skip_pinned);
    }

    #[test]
    fn toml_garbage_is_an_error() {
        assert!(ProxyConfig::from_toml_str("attempt_timeout_secs = \"soon\"").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_win() {
        std::env::set_var(super::ENV_ATTEMPT_TIMEOUT, "8");
        std::env::set_var(super::ENV_SKIP_PINNED, "true");

        let mut cfg = ProxyConfig::default();
        cfg.apply_env_overrides();
        assert_eq!(cfg.attempt_timeout_secs, 8);
        assert!(cfg.skip_pinned);

        std::env::remove_var(super::ENV_ATTEMPT_TIMEOUT);
        std::env::remove_var(super::ENV_SKIP_PINNED);
    }

    #[serial_test::serial]
    #[test]
    fn unparseable_env_values_are_ignored() {
        std::env::set_var(super::ENV_SELFTEXT_MAX, "lots");
        let mut cfg = ProxyConfig::default();
        cfg.apply_env_overrides();
        assert_eq!(cfg.selftext_max_chars, 300);
        std::env::remove_var(super::ENV_SELFTEXT_MAX);
    }
}
