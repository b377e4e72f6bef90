// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pure planning for the generation reconciler.
//!
//! Given one Secret's annotations, the set of fields already present in its
//! data, the operator configuration, and the current time, `plan_generation`
//! decides which fields to (re)materialize, which rotation policies to warn
//! about, and when the controller should wake up next. No I/O happens here;
//! the async reconciler applies the plan.
//!
//! All generated fields on one Secret share a single `generated-at`
//! timestamp, so any write restarts the rotation clock for every field.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::annotations::SecretAnnotations;
use crate::config::{FieldType, OperatorConfig};
use crate::secret_errors::GenerationError;

/// One pending field write with its fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWrite {
    /// Field name within the Secret's data
    pub field: String,
    /// Resolved value type
    pub field_type: FieldType,
    /// Resolved value length
    pub length: usize,
    /// Synthesized charset literal; `None` for byte values
    pub charset: Option<String>,
    /// Whether this write replaces an existing value due to rotation
    pub rotated: bool,
}

/// A field whose rotation interval violates the configured minimum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationWarning {
    pub field: String,
    pub interval: Duration,
    pub min_interval: Duration,
}

/// The outcome of one planning pass over a Secret.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerationPlan {
    /// Fields to write, in annotation order
    pub writes: Vec<FieldWrite>,
    /// Rotation policies to warn about, one event each
    pub rotation_warnings: Vec<RotationWarning>,
    /// Delay until the next rotation becomes due, if any field rotates
    pub requeue_after: Option<Duration>,
}

impl GenerationPlan {
    /// Whether at least one planned write is a rotation.
    #[must_use]
    pub fn any_rotation(&self) -> bool {
        self.writes.iter().any(|w| w.rotated)
    }
}

/// Decide what the generation reconciler must do for one Secret.
///
/// Implements the per-field state machine: absent fields are materialized,
/// present fields are rotated when their interval has elapsed since the
/// shared `generated-at` timestamp, and everything else is left untouched.
/// A rotation interval below the configured minimum produces a warning; the
/// offending field is skipped entirely if it already exists, but initial
/// generation is never blocked by a bad rotation policy.
///
/// # Errors
///
/// Returns a [`GenerationError`] when any field needing a write has an
/// unresolvable type or charset. An error aborts the whole Secret; the
/// caller must not perform partial writes.
pub fn plan_generation(
    view: &SecretAnnotations<'_>,
    present_fields: &BTreeSet<String>,
    config: &OperatorConfig,
    now: DateTime<Utc>,
) -> Result<GenerationPlan, GenerationError> {
    let fields = view.autogenerate_fields();
    if fields.is_empty() {
        return Ok(GenerationPlan::default());
    }

    let min_interval = config.rotation.min_interval;

    // Elapsed time since the shared timestamp; unknown or future timestamps
    // count as "now", which defers rotation by one full interval.
    let elapsed = view
        .generated_at()
        .map(|t0| (now - t0).to_std().unwrap_or(Duration::ZERO));

    let mut plan = GenerationPlan::default();
    let mut planned: BTreeSet<&str> = BTreeSet::new();
    let mut rotation_candidates: Vec<Duration> = Vec::new();

    for field in &fields {
        if !planned.insert(field.as_str()) {
            continue;
        }

        let interval = view.resolve_rotation(field);
        let rotates = interval > Duration::ZERO;
        let rotation_valid = !rotates || interval >= min_interval;
        let present = present_fields.contains(field);

        if !rotation_valid {
            plan.rotation_warnings.push(RotationWarning {
                field: field.clone(),
                interval,
                min_interval,
            });
            if present {
                continue;
            }
        }

        let due = rotation_valid
            && rotates
            && elapsed.is_some_and(|e| e >= interval);

        if present && !due {
            if rotation_valid && rotates {
                rotation_candidates.push(interval);
            }
            continue;
        }

        let field_type = view.resolve_type(field, config)?;
        let charset = match field_type {
            FieldType::String => Some(view.charset_spec(config).build().map_err(|source| {
                GenerationError::InvalidCharset {
                    field: field.clone(),
                    source,
                }
            })?),
            FieldType::Bytes => None,
        };

        plan.writes.push(FieldWrite {
            field: field.clone(),
            field_type,
            length: view.resolve_length(field, config),
            charset,
            rotated: present,
        });

        if rotation_valid && rotates {
            rotation_candidates.push(interval);
        }
    }

    // Any write resets the shared timestamp to `now`, so every rotating
    // field then has a full interval ahead of it. Without a write, the
    // remaining time counts from the existing timestamp.
    plan.requeue_after = rotation_candidates
        .into_iter()
        .map(|interval| {
            if plan.writes.is_empty() {
                elapsed.map_or(interval, |e| interval.saturating_sub(e))
            } else {
                interval
            }
        })
        .min();

    Ok(plan)
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod plan_tests;
