// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generation and rotation reconciler.
//!
//! Runs on every Secret carrying the `autogenerate` annotation. The decision
//! core is pure ([`plan::plan_generation`]); this module applies a plan:
//! it draws the random values, persists every changed field together with the
//! shared `generated-at` timestamp in a single merge patch, emits the
//! documented events, and hands the next rotation delay back to the
//! controller loop.
//!
//! A reconciliation that finds nothing to do writes nothing and emits
//! nothing, so an unchanged Secret round-trips silently.

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::{Patch, PatchParams};
use kube::{Api, ResourceExt};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::annotations::SecretAnnotations;
use crate::config::FieldType;
use crate::constants::ANNOTATION_GENERATED_AT;
use crate::context::Context;
use crate::duration::format_duration;
use crate::events::{
    publish_event, REASON_GENERATION_FAILED, REASON_GENERATION_SUCCEEDED,
    REASON_ROTATION_FAILED, REASON_ROTATION_SUCCEEDED,
};
use crate::generate::{generate_bytes, generate_string};
use crate::metrics;
use crate::secret_errors::GenerationError;

pub mod plan;

use plan::{FieldWrite, GenerationPlan};

const ACTION_GENERATE: &str = "Generate";
const ACTION_ROTATE: &str = "Rotate";

/// Reconcile one Secret against its `autogenerate` annotation.
///
/// # Returns
///
/// The delay until the next rotation becomes due, or `None` when no field
/// rotates and the controller should wait for the next change event.
///
/// # Errors
///
/// Returns an error only for transient API failures; the runtime redelivers
/// those. User-data errors (bad type, bad charset) are reported through a
/// `GenerationFailed` warning event and swallowed.
pub async fn reconcile_generated_secret(
    ctx: Arc<Context>,
    secret: Secret,
) -> Result<Option<Duration>> {
    let namespace = secret.namespace().unwrap_or_default();
    let name = secret.name_any();
    let view = SecretAnnotations::new(&secret);

    if !view.has_autogenerate() {
        return Ok(None);
    }

    // Conflicted Secrets are skipped silently here; the replicator owns the
    // ConflictingFeatures event so users see exactly one warning.
    if view.has_replicate_from() {
        debug!(
            "Secret {}/{} combines autogenerate with replicate-from - skipping generation",
            namespace, name
        );
        return Ok(None);
    }

    let present_fields = secret
        .data
        .as_ref()
        .map(|d| d.keys().cloned().collect())
        .unwrap_or_default();

    let now = Utc::now();
    let plan = match plan::plan_generation(&view, &present_fields, &ctx.config, now) {
        Ok(plan) => plan,
        Err(e) => {
            metrics::record_error("generator", "user_data_error");
            publish_event(
                &ctx.recorder,
                &secret,
                REASON_GENERATION_FAILED,
                ACTION_GENERATE,
                e.to_string(),
            )
            .await;
            return Ok(None);
        }
    };

    for warning in &plan.rotation_warnings {
        metrics::record_error("generator", "policy_violation");
        publish_event(
            &ctx.recorder,
            &secret,
            REASON_ROTATION_FAILED,
            ACTION_ROTATE,
            format!(
                "Rotation interval {} for field '{}' is below the configured minimum {}",
                format_duration(warning.interval),
                warning.field,
                format_duration(warning.min_interval),
            ),
        )
        .await;
    }

    if plan.writes.is_empty() {
        debug!(
            "Secret {}/{} is fully materialized, nothing to write",
            namespace, name
        );
        return Ok(plan.requeue_after);
    }

    let values = match materialize_values(&plan.writes) {
        Ok(values) => values,
        Err(e) => {
            metrics::record_error("generator", "user_data_error");
            publish_event(
                &ctx.recorder,
                &secret,
                REASON_GENERATION_FAILED,
                ACTION_GENERATE,
                e.to_string(),
            )
            .await;
            return Ok(None);
        }
    };

    // One update call carries every changed field plus the shared timestamp,
    // so partial writes are impossible.
    let generated_at = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    let patch = json!({
        "metadata": {
            "annotations": { ANNOTATION_GENERATED_AT: generated_at }
        },
        "data": serde_json::to_value(&values)?,
    });

    let api: Api<Secret> = Api::namespaced(ctx.client.clone(), &namespace);
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    let rotated = plan.writes.iter().filter(|w| w.rotated).count() as u64;
    let generated = plan.writes.len() as u64 - rotated;
    metrics::record_fields_generated(generated);
    metrics::record_fields_rotated(rotated);

    info!(
        "Wrote {} field(s) ({} rotated) on Secret {}/{}",
        plan.writes.len(),
        rotated,
        namespace,
        name
    );

    publish_write_event(&ctx, &secret, &plan).await;

    Ok(plan.requeue_after)
}

/// Draw a random value for every planned write.
pub(crate) fn materialize_values(
    writes: &[FieldWrite],
) -> Result<BTreeMap<String, ByteString>, GenerationError> {
    let mut values = BTreeMap::new();
    for write in writes {
        let bytes = match write.field_type {
            FieldType::String => {
                let charset = write.charset.as_deref().unwrap_or_default();
                generate_string(write.length, charset)
                    .map_err(|source| GenerationError::ValueGeneration {
                        field: write.field.clone(),
                        source,
                    })?
                    .into_bytes()
            }
            FieldType::Bytes => generate_bytes(write.length).map_err(|source| {
                GenerationError::ValueGeneration {
                    field: write.field.clone(),
                    source,
                }
            })?,
        };
        values.insert(write.field.clone(), ByteString(bytes));
    }
    Ok(values)
}

/// Emit the single success event for a completed write.
async fn publish_write_event(ctx: &Context, secret: &Secret, plan: &GenerationPlan) {
    let fields: Vec<&str> = plan.writes.iter().map(|w| w.field.as_str()).collect();

    if plan.any_rotation() && ctx.config.rotation.create_events {
        publish_event(
            &ctx.recorder,
            secret,
            REASON_ROTATION_SUCCEEDED,
            ACTION_ROTATE,
            format!("Rotated field(s): {}", fields.join(", ")),
        )
        .await;
    } else {
        publish_event(
            &ctx.recorder,
            secret,
            REASON_GENERATION_SUCCEEDED,
            ACTION_GENERATE,
            format!("Generated field(s): {}", fields.join(", ")),
        )
        .await;
    }
}

#[cfg(test)]
#[path = "generator_tests.rs"]
mod generator_tests;
