//! Configuration system for nlmux.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $NLMUX_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/nlmux/config.toml
//!   3. ~/.config/nlmux/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::wire::{ServiceType, DEFAULT_GROUP, DEFAULT_PORT, NETLINK_DEFAULT};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NlmuxConfig {
    pub netlink: NetlinkConfig,
    pub services: ServicesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetlinkConfig {
    /// Netlink protocol number of the service channel.
    pub protocol: i32,
    /// Port id for unicast sends that omit a destination.
    pub default_port: u32,
    /// Multicast group for broadcast sends that omit a destination.
    pub default_group: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Service type stamped on sends that omit one.
    pub default_send_type: ServiceType,
    /// Service type the built-in default handler is bound to.
    pub default_recv_type: ServiceType,
    /// Bind the built-in default handler at startup.
    pub default_handler: bool,
    /// Bind the echo service at startup.
    pub echo: bool,
    /// Service type the echo service answers on.
    pub echo_type: ServiceType,
    /// Service type stamped on echo replies.
    pub echo_reply_type: ServiceType,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NetlinkConfig {
    fn default() -> Self {
        Self {
            protocol: NETLINK_DEFAULT,
            default_port: DEFAULT_PORT,
            default_group: DEFAULT_GROUP,
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            default_send_type: ServiceType::DEFAULT,
            default_recv_type: ServiceType::DEFAULT,
            default_handler: true,
            echo: false,
            echo_type: ServiceType(1),
            echo_reply_type: ServiceType(1),
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("nlmux")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

fn parse_bool(v: &str) -> bool {
    v == "true" || v == "1"
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl NlmuxConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            Self::from_toml_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            NlmuxConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a TOML document. Missing keys fall back to defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("NLMUX_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&NlmuxConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply NLMUX_* env var overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(p) = lookup("NLMUX_NETLINK__PROTOCOL").and_then(|v| v.parse().ok()) {
            self.netlink.protocol = p;
        }
        if let Some(p) = lookup("NLMUX_NETLINK__DEFAULT_PORT").and_then(|v| v.parse().ok()) {
            self.netlink.default_port = p;
        }
        if let Some(g) = lookup("NLMUX_NETLINK__DEFAULT_GROUP").and_then(|v| v.parse().ok()) {
            self.netlink.default_group = g;
        }
        if let Some(v) = lookup("NLMUX_SERVICES__DEFAULT_HANDLER") {
            self.services.default_handler = parse_bool(&v);
        }
        if let Some(v) = lookup("NLMUX_SERVICES__ECHO") {
            self.services.echo = parse_bool(&v);
        }
    }
}
