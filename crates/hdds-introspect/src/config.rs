// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Introspection configuration.
//!
//! Loaded from a TOML file, from environment variables, or both (file first,
//! environment on top):
//!
//! - `HDDS_INTROSPECT_MAX_DEPTH`: nesting limit for traversal (default: 32)
//! - `HDDS_INTROSPECT_MAX_SEQUENCE_LEN`: largest accepted sequence count
//!   (default: 16777216)
//! - `HDDS_INTROSPECT_LOG_LEVEL`: log filter for tools (default: "info")
//!
//! ```toml
//! max_depth = 16
//! max_sequence_len = 65536
//! log_level = "debug"
//! ```

use crate::engine::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_SEQUENCE_LEN};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use thiserror::Error;

pub const ENV_MAX_DEPTH: &str = "HDDS_INTROSPECT_MAX_DEPTH";
pub const ENV_MAX_SEQUENCE_LEN: &str = "HDDS_INTROSPECT_MAX_SEQUENCE_LEN";
pub const ENV_LOG_LEVEL: &str = "HDDS_INTROSPECT_LOG_LEVEL";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Engine limits and logging level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntrospectConfig {
    /// Maximum nesting depth for traversal and decoding.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum element count of a single sequence.
    #[serde(default = "default_max_sequence_len")]
    pub max_sequence_len: usize,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_max_sequence_len() -> usize {
    DEFAULT_MAX_SEQUENCE_LEN
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for IntrospectConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_sequence_len: DEFAULT_MAX_SEQUENCE_LEN,
            log_level: default_log_level(),
        }
    }
}

impl IntrospectConfig {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides on top of `self`.
    ///
    /// Unparseable or empty values are ignored.
    pub fn with_env(self) -> Self {
        self.with_lookup(|name| env::var(name).ok())
    }

    fn with_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(depth) = lookup(ENV_MAX_DEPTH).and_then(|s| s.trim().parse::<usize>().ok()) {
            self.max_depth = depth;
        }
        if let Some(len) =
            lookup(ENV_MAX_SEQUENCE_LEN).and_then(|s| s.trim().parse::<usize>().ok())
        {
            self.max_sequence_len = len;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|s| !s.is_empty()) {
            self.log_level = level;
        }
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be at least 1".into()));
        }
        if self.max_sequence_len == 0 {
            return Err(ConfigError::Invalid("max_sequence_len must be at least 1".into()));
        }
        if self.log_filter().is_none() {
            return Err(ConfigError::Invalid(format!("unknown log level '{}'", self.log_level)));
        }
        Ok(())
    }

    /// `log_level` as a `log` filter.
    pub fn log_filter(&self) -> Option<log::LevelFilter> {
        self.log_level.parse().ok()
    }
}
