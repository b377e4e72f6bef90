// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Annotation grammar and per-field resolution.
//!
//! Annotations under `iso.gtrfc.com/` are the operator's entire API surface.
//! This module is stateless: it interprets the annotation map of one Secret
//! and surfaces typed views. Per-field settings resolve through a three-level
//! cascade, stopping at the first defined value:
//!
//! 1. the field-specific key (`length.<field>`),
//! 2. the Secret-level key (`length`),
//! 3. the process-wide configuration default.
//!
//! Parsing is deliberately lenient where the grammar says so: an unparseable
//! `length` falls through the cascade, an unrecognized boolean is treated as
//! absent, and a bad `rotate` literal simply disables rotation for that field.

use chrono::{DateTime, Utc};
use glob::Pattern;
use k8s_openapi::api::core::v1::Secret;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::{FieldType, OperatorConfig};
use crate::constants::{
    ANNOTATION_AUTOGENERATE, ANNOTATION_GENERATED_AT, ANNOTATION_LENGTH,
    ANNOTATION_REPLICATABLE_FROM_NAMESPACES, ANNOTATION_REPLICATED_FROM, ANNOTATION_REPLICATE_FROM,
    ANNOTATION_REPLICATE_TO, ANNOTATION_ROTATE, ANNOTATION_STRING_ALLOWED_SPECIAL_CHARS,
    ANNOTATION_STRING_LOWERCASE, ANNOTATION_STRING_NUMBERS, ANNOTATION_STRING_SPECIAL_CHARS,
    ANNOTATION_STRING_UPPERCASE, ANNOTATION_TYPE,
};
use crate::duration::parse_duration;
use crate::generate::CharsetSpec;
use crate::secret_errors::{GenerationError, ReplicationError};

/// `<namespace>/<name>` reference to a Secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub namespace: String,
    pub name: String,
}

impl SourceRef {
    /// Parse a `<namespace>/<name>` reference.
    ///
    /// Exactly one `/` is consumed as the separator; further slashes belong
    /// to the name. Both components are trimmed and must be non-empty.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let (namespace, name) = value.split_once('/')?;
        let namespace = namespace.trim();
        let name = name.trim();
        if namespace.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    /// The canonical `<namespace>/<name>` identity string.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Whether this reference points at the given Secret.
    #[must_use]
    pub fn refers_to(&self, secret: &Secret) -> bool {
        secret.metadata.namespace.as_deref() == Some(self.namespace.as_str())
            && secret.metadata.name.as_deref() == Some(self.name.as_str())
    }
}

/// Typed, read-only view over one Secret's annotations.
#[derive(Debug, Clone, Copy)]
pub struct SecretAnnotations<'a> {
    annotations: Option<&'a BTreeMap<String, String>>,
}

impl<'a> SecretAnnotations<'a> {
    #[must_use]
    pub fn new(secret: &'a Secret) -> Self {
        Self {
            annotations: secret.metadata.annotations.as_ref(),
        }
    }

    #[must_use]
    pub fn from_map(annotations: &'a BTreeMap<String, String>) -> Self {
        Self {
            annotations: Some(annotations),
        }
    }

    fn get(&self, key: &str) -> Option<&'a str> {
        self.annotations.and_then(|a| a.get(key)).map(String::as_str)
    }

    fn has(&self, key: &str) -> bool {
        self.annotations.is_some_and(|a| a.contains_key(key))
    }

    // ------------------------------------------------------------------
    // Generation surface
    // ------------------------------------------------------------------

    /// The ordered list of fields named by the `autogenerate` annotation.
    ///
    /// Elements are trimmed, empties dropped, order preserved. A missing or
    /// empty annotation yields an empty list.
    #[must_use]
    pub fn autogenerate_fields(&self) -> Vec<String> {
        self.get(ANNOTATION_AUTOGENERATE)
            .map(split_list)
            .unwrap_or_default()
    }

    /// Whether the `autogenerate` annotation is present at all.
    #[must_use]
    pub fn has_autogenerate(&self) -> bool {
        self.has(ANNOTATION_AUTOGENERATE)
    }

    /// Resolve the value type for a field through the cascade.
    ///
    /// The empty string means `string`; any other unrecognized value is a
    /// generation error rather than a fall-through.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::UnknownType`] when the first defined value
    /// in the cascade is not `string`, `bytes`, or empty.
    pub fn resolve_type(
        &self,
        field: &str,
        config: &OperatorConfig,
    ) -> Result<FieldType, GenerationError> {
        let defined = self
            .get(&field_key(ANNOTATION_TYPE, field))
            .or_else(|| self.get(ANNOTATION_TYPE));

        match defined {
            Some(value) => FieldType::parse(value).ok_or_else(|| GenerationError::UnknownType {
                field: field.to_string(),
                value: value.to_string(),
            }),
            None => Ok(config.defaults.field_type),
        }
    }

    /// Resolve the value length for a field through the cascade.
    ///
    /// A value that is not a positive decimal integer is treated as absent
    /// and resolution falls through to the next level.
    #[must_use]
    pub fn resolve_length(&self, field: &str, config: &OperatorConfig) -> usize {
        self.get(&field_key(ANNOTATION_LENGTH, field))
            .and_then(parse_length)
            .or_else(|| self.get(ANNOTATION_LENGTH).and_then(parse_length))
            .unwrap_or(config.defaults.length)
    }

    /// Resolve the rotation interval for a field.
    ///
    /// There is no configuration-level rotation default; absence or a parse
    /// failure of the first defined literal both mean "no rotation" and
    /// return the zero duration.
    #[must_use]
    pub fn resolve_rotation(&self, field: &str) -> Duration {
        self.get(&field_key(ANNOTATION_ROTATE, field))
            .or_else(|| self.get(ANNOTATION_ROTATE))
            .and_then(|literal| parse_duration(literal).ok())
            .unwrap_or(Duration::ZERO)
    }

    /// The shared `generated-at` timestamp, if present and parseable.
    #[must_use]
    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        self.get(ANNOTATION_GENERATED_AT)
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .map(|t| t.with_timezone(&Utc))
    }

    /// Charset toggles with annotation overrides applied over the config defaults.
    ///
    /// For the special-character literal, *existence* of the annotation key
    /// overrides the default, so an empty value deliberately suppresses
    /// specials.
    #[must_use]
    pub fn charset_spec(&self, config: &OperatorConfig) -> CharsetSpec {
        let defaults = config.default_charset();

        let toggle = |key: &str, fallback: bool| {
            self.get(key).and_then(parse_bool).unwrap_or(fallback)
        };

        let allowed_special_chars = if self.has(ANNOTATION_STRING_ALLOWED_SPECIAL_CHARS) {
            self.get(ANNOTATION_STRING_ALLOWED_SPECIAL_CHARS)
                .unwrap_or_default()
                .to_string()
        } else {
            defaults.allowed_special_chars
        };

        CharsetSpec {
            lowercase: toggle(ANNOTATION_STRING_LOWERCASE, defaults.lowercase),
            uppercase: toggle(ANNOTATION_STRING_UPPERCASE, defaults.uppercase),
            numbers: toggle(ANNOTATION_STRING_NUMBERS, defaults.numbers),
            special_chars: toggle(ANNOTATION_STRING_SPECIAL_CHARS, defaults.special_chars),
            allowed_special_chars,
        }
    }

    // ------------------------------------------------------------------
    // Replication surface
    // ------------------------------------------------------------------

    /// The raw `replicate-from` value, if present.
    #[must_use]
    pub fn replicate_from(&self) -> Option<&'a str> {
        self.get(ANNOTATION_REPLICATE_FROM)
    }

    /// Whether the `replicate-from` annotation is present at all.
    #[must_use]
    pub fn has_replicate_from(&self) -> bool {
        self.has(ANNOTATION_REPLICATE_FROM)
    }

    /// The parsed pull-source reference.
    ///
    /// # Errors
    ///
    /// Returns [`ReplicationError::MalformedSourceRef`] when the annotation is
    /// present but not a valid `<namespace>/<name>` reference.
    pub fn source_ref(&self) -> Result<Option<SourceRef>, ReplicationError> {
        match self.replicate_from() {
            None => Ok(None),
            Some(value) => SourceRef::parse(value).map(Some).ok_or_else(|| {
                ReplicationError::MalformedSourceRef {
                    value: value.to_string(),
                }
            }),
        }
    }

    /// Target namespaces named by `replicate-to` (trimmed, empties dropped).
    #[must_use]
    pub fn replicate_to(&self) -> Vec<String> {
        self.get(ANNOTATION_REPLICATE_TO)
            .map(split_list)
            .unwrap_or_default()
    }

    /// Whether the `replicate-to` annotation is present at all.
    #[must_use]
    pub fn has_replicate_to(&self) -> bool {
        self.has(ANNOTATION_REPLICATE_TO)
    }

    /// The glob allowlist from `replicatable-from-namespaces`.
    #[must_use]
    pub fn replicatable_from_namespaces(&self) -> Vec<String> {
        self.get(ANNOTATION_REPLICATABLE_FROM_NAMESPACES)
            .map(split_list)
            .unwrap_or_default()
    }

    /// Whether the allowlist annotation is present at all.
    #[must_use]
    pub fn has_replicatable_from_namespaces(&self) -> bool {
        self.has(ANNOTATION_REPLICATABLE_FROM_NAMESPACES)
    }

    /// The ownership marker written by the replicator, if any.
    #[must_use]
    pub fn replicated_from(&self) -> Option<&'a str> {
        self.get(ANNOTATION_REPLICATED_FROM)
    }
}

/// Split a comma-separated annotation value into trimmed, non-empty elements.
#[must_use]
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a boolean annotation value.
///
/// Accepts `true`/`false`/`1`/`0`, case-insensitively; anything else is
/// treated as if the annotation were absent.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_length(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

fn field_key(base: &str, field: &str) -> String {
    format!("{base}.{field}")
}

/// Check a namespace against a glob allowlist.
///
/// Patterns are evaluated in list order and anchored to the full namespace
/// name (`*`, `?`, character classes and ranges are supported). An empty
/// allowlist admits nothing.
///
/// # Errors
///
/// Returns [`ReplicationError::MalformedAllowlistPattern`] for the first
/// malformed pattern encountered before a match.
pub fn namespace_allowed(allowlist: &[String], namespace: &str) -> Result<bool, ReplicationError> {
    for raw in allowlist {
        let pattern =
            Pattern::new(raw).map_err(|e| ReplicationError::MalformedAllowlistPattern {
                pattern: raw.clone(),
                reason: e.to_string(),
            })?;
        if pattern.matches(namespace) {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
#[path = "annotations_tests.rs"]
mod annotations_tests;
