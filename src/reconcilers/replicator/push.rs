// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Push replication: a source Secret propagates its data into named namespaces.
//!
//! The cleanup finalizer is committed before the first copy is created, so
//! deletion of the source can always find and remove whatever was pushed.
//! Target namespaces are handled independently: one failing namespace is
//! reported through a `PushFailed` event and never blocks the others.

use anyhow::Result;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, ResourceExt};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::annotations::SecretAnnotations;
use crate::constants::{
    ANNOTATION_LAST_REPLICATED_AT, ANNOTATION_REPLICATED_FROM, FINALIZER_REPLICATE_TO_CLEANUP,
};
use crate::context::Context;
use crate::events::{publish_event, REASON_PUSH_FAILED, REASON_REPLICATION_SUCCEEDED};
use crate::metrics;
use crate::reconcilers::finalizers::ensure_finalizer;
use crate::secret_errors::ReplicationError;

use super::{merged_data, now_rfc3339, secret_id, ACTION_PUSH};

/// Outcome of ensuring one target namespace has an up-to-date copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CopyOutcome {
    /// A fresh copy was created
    Created,
    /// An owned copy was overwritten with the source's current data
    Updated,
    /// An owned copy already matched the source
    UpToDate,
    /// A foreign Secret occupies the target slot; left untouched
    Unowned,
}

/// Whether an existing Secret is owned by the given push source.
///
/// Ownership is decided solely by the `replicated-from` marker carrying the
/// source's exact identity; a missing or different marker means foreign.
pub(crate) fn is_owned_by(existing: &Secret, source_id: &str) -> bool {
    SecretAnnotations::new(existing).replicated_from() == Some(source_id)
}

/// Reconcile a push source against its `replicate-to` target list.
///
/// # Errors
///
/// Returns an error only when the finalizer cannot be persisted; per-namespace
/// failures are reported through events and swallowed.
pub async fn reconcile_push(ctx: &Context, source: &Secret) -> Result<()> {
    let view = SecretAnnotations::new(source);
    let targets = view.replicate_to();
    if targets.is_empty() {
        // A present-but-empty list asks for nothing, and gets no finalizer
        debug!("Secret {} has an empty replicate-to list", secret_id(source));
        return Ok(());
    }

    // Two-step commit: the finalizer must be durable before any copy exists,
    // so deletion can always clean up.
    ensure_finalizer(&ctx.client, source, FINALIZER_REPLICATE_TO_CLEANUP).await?;

    let source_id = secret_id(source);
    let now = now_rfc3339();
    let mut changed: Vec<String> = Vec::new();

    for target_namespace in &targets {
        match ensure_copy(ctx, source, &source_id, target_namespace, &now).await {
            Ok(CopyOutcome::Created) => {
                info!("Created copy of {} in namespace {}", source_id, target_namespace);
                changed.push(target_namespace.clone());
            }
            Ok(CopyOutcome::Updated) => {
                info!("Updated copy of {} in namespace {}", source_id, target_namespace);
                changed.push(target_namespace.clone());
            }
            Ok(CopyOutcome::UpToDate) => {
                debug!(
                    "Copy of {} in namespace {} is already up to date",
                    source_id, target_namespace
                );
            }
            Ok(CopyOutcome::Unowned) => {
                metrics::record_error("replicator", "policy_violation");
                let e = ReplicationError::UnownedTarget {
                    namespace: target_namespace.clone(),
                    name: source.name_any(),
                };
                publish_event(
                    &ctx.recorder,
                    source,
                    REASON_PUSH_FAILED,
                    ACTION_PUSH,
                    e.to_string(),
                )
                .await;
            }
            Err(e) => {
                // Keep going; the other namespaces are independent
                metrics::record_error("replicator", "api_error");
                warn!(
                    "Failed to push {} to namespace {}: {e}",
                    source_id, target_namespace
                );
                publish_event(
                    &ctx.recorder,
                    source,
                    REASON_PUSH_FAILED,
                    ACTION_PUSH,
                    format!("Failed to replicate into namespace '{target_namespace}': {e}"),
                )
                .await;
            }
        }
    }

    if !changed.is_empty() {
        metrics::record_replication("push");
        publish_event(
            &ctx.recorder,
            source,
            REASON_REPLICATION_SUCCEEDED,
            ACTION_PUSH,
            format!("Pushed data to namespace(s): {}", changed.join(", ")),
        )
        .await;
    }

    Ok(())
}

/// Ensure one target namespace holds an up-to-date, owned copy of the source.
async fn ensure_copy(
    ctx: &Context,
    source: &Secret,
    source_id: &str,
    target_namespace: &str,
    now: &str,
) -> Result<CopyOutcome> {
    let name = source.name_any();
    let api: Api<Secret> = Api::namespaced(ctx.client.clone(), target_namespace);

    let Some(existing) = api.get_opt(&name).await? else {
        let copy = build_copy(source, source_id, target_namespace, now);
        api.create(&PostParams::default(), &copy).await?;
        return Ok(CopyOutcome::Created);
    };

    if !is_owned_by(&existing, source_id) {
        return Ok(CopyOutcome::Unowned);
    }

    let merged = merged_data(source.data.as_ref(), existing.data.as_ref());
    if existing
        .data
        .as_ref()
        .map_or(merged.is_empty(), |d| *d == merged)
    {
        return Ok(CopyOutcome::UpToDate);
    }

    let patch = json!({
        "metadata": {
            "annotations": { ANNOTATION_LAST_REPLICATED_AT: now }
        },
        "data": serde_json::to_value(&merged)?,
    });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    Ok(CopyOutcome::Updated)
}

/// Assemble a fresh copy for a target namespace.
///
/// The copy keeps the source's name, type, labels, and data; its annotations
/// are only the ownership marker and the replication timestamp.
pub(crate) fn build_copy(
    source: &Secret,
    source_id: &str,
    target_namespace: &str,
    now: &str,
) -> Secret {
    let annotations: BTreeMap<String, String> = [
        (ANNOTATION_REPLICATED_FROM.to_string(), source_id.to_string()),
        (ANNOTATION_LAST_REPLICATED_AT.to_string(), now.to_string()),
    ]
    .into();

    Secret {
        metadata: ObjectMeta {
            name: source.metadata.name.clone(),
            namespace: Some(target_namespace.to_string()),
            labels: source.metadata.labels.clone(),
            annotations: Some(annotations),
            ..Default::default()
        },
        type_: source.type_.clone(),
        data: source.data.clone(),
        ..Default::default()
    }
}
