// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration loaded from a YAML file.
//!
//! The configuration carries process-wide generation defaults (the bottom of
//! the per-field resolution cascade), the rotation policy bounds, and the
//! feature switches that gate each controller loop. Every key is optional;
//! an empty file yields the documented defaults.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::constants::{
    DEFAULT_ALLOWED_SPECIAL_CHARS, DEFAULT_LENGTH, DEFAULT_MIN_ROTATION_INTERVAL_SECS,
};
use crate::duration::parse_duration;
use crate::generate::CharsetSpec;

/// Value type of a generated field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Random characters drawn from the synthesized charset
    #[default]
    String,
    /// Raw random bytes
    Bytes,
}

impl FieldType {
    /// Parse an annotation value into a field type.
    ///
    /// The empty string means `string`; anything else unrecognized is `None`
    /// and treated as a generation error by the caller.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "" | "string" => Some(FieldType::String),
            "bytes" => Some(FieldType::Bytes),
            _ => None,
        }
    }
}

/// Configuration validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `defaults.length` was zero
    #[error("defaults.length must be a positive integer")]
    NonPositiveLength,

    /// Every charset block was disabled
    #[error("defaults.string must enable at least one of uppercase, lowercase, numbers, or specialChars")]
    NoCharsetBlocks,

    /// Specials enabled without any characters to draw from
    #[error("defaults.string.specialChars is enabled but allowedSpecialChars is empty")]
    EmptySpecialChars,
}

/// Default charset toggles for generated string values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StringDefaults {
    pub uppercase: bool,
    pub lowercase: bool,
    pub numbers: bool,
    pub special_chars: bool,
    pub allowed_special_chars: String,
}

impl Default for StringDefaults {
    fn default() -> Self {
        Self {
            uppercase: true,
            lowercase: true,
            numbers: true,
            special_chars: false,
            allowed_special_chars: DEFAULT_ALLOWED_SPECIAL_CHARS.to_string(),
        }
    }
}

/// Process-wide fallbacks for the per-field resolution cascade.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationDefaults {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub length: usize,
    pub string: StringDefaults,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            field_type: FieldType::String,
            length: DEFAULT_LENGTH,
            string: StringDefaults::default(),
        }
    }
}

/// Rotation policy bounds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RotationConfig {
    /// Lower bound enforced on every per-field rotation interval
    #[serde(deserialize_with = "deserialize_duration")]
    pub min_interval: Duration,
    /// Emit a `RotationSucceeded` event when a rotation fires
    pub create_events: bool,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(DEFAULT_MIN_ROTATION_INTERVAL_SECS),
            create_events: true,
        }
    }
}

/// Feature switches gating the controller loops.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureFlags {
    pub secret_generator: bool,
    pub secret_replicator: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            secret_generator: true,
            secret_replicator: true,
        }
    }
}

/// Top-level operator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperatorConfig {
    pub defaults: GenerationDefaults,
    pub rotation: RotationConfig,
    pub features: FeatureFlags,
}

impl OperatorConfig {
    /// Check the invariants the defaults must satisfy before any controller starts.
    ///
    /// # Errors
    ///
    /// Returns the first violated [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.length == 0 {
            return Err(ConfigError::NonPositiveLength);
        }

        let s = &self.defaults.string;
        if !s.uppercase && !s.lowercase && !s.numbers && !s.special_chars {
            return Err(ConfigError::NoCharsetBlocks);
        }
        if s.special_chars && s.allowed_special_chars.is_empty() {
            return Err(ConfigError::EmptySpecialChars);
        }

        Ok(())
    }

    /// Charset toggles as a [`CharsetSpec`], before any annotation overrides.
    #[must_use]
    pub fn default_charset(&self) -> CharsetSpec {
        let s = &self.defaults.string;
        CharsetSpec {
            lowercase: s.lowercase,
            uppercase: s.uppercase,
            numbers: s.numbers,
            special_chars: s.special_chars,
            allowed_special_chars: s.allowed_special_chars.clone(),
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let literal = String::deserialize(deserializer)?;
    parse_duration(&literal).map_err(serde::de::Error::custom)
}

/// Load and validate the operator configuration from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid YAML for the
/// schema, or fails [`OperatorConfig::validate`].
pub fn load_config(path: &Path) -> anyhow::Result<OperatorConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {e}", path.display()))?;
    let config: OperatorConfig = serde_yaml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config file {}: {e}", path.display()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
