// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pull replication: a target Secret opts in to receive a source's data.
//!
//! The source must consent through its `replicatable-from-namespaces` glob
//! allowlist; without a match nothing is copied. A source that is being
//! deleted freezes the target on its last replicated snapshot.

use anyhow::Result;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Patch, PatchParams};
use kube::{Api, ResourceExt};
use serde_json::json;
use tracing::{debug, info};

use crate::annotations::{namespace_allowed, SecretAnnotations};
use crate::constants::{ANNOTATION_LAST_REPLICATED_AT, ANNOTATION_REPLICATED_FROM};
use crate::context::Context;
use crate::events::{
    publish_event, REASON_REPLICATION_FAILED, REASON_REPLICATION_SUCCEEDED, REASON_SOURCE_DELETED,
};
use crate::metrics;
use crate::secret_errors::ReplicationError;

use super::{merged_data, now_rfc3339, ACTION_PULL};

/// Reconcile a pull target against its `replicate-from` source.
///
/// # Errors
///
/// Returns an error only when the final API write fails; every other outcome
/// is a warning event on the target followed by a clean return, because a
/// retry cannot fix it (the reverse index re-triggers this target whenever
/// the source changes).
pub async fn reconcile_pull(ctx: &Context, target: &Secret) -> Result<()> {
    let namespace = target.namespace().unwrap_or_default();
    let name = target.name_any();
    let view = SecretAnnotations::new(target);

    let source_ref = match view.source_ref() {
        Ok(Some(source_ref)) => source_ref,
        // Flow selection guarantees the annotation is present
        Ok(None) => return Ok(()),
        Err(e) => {
            return fail_pull(ctx, target, &e).await;
        }
    };

    if source_ref.refers_to(target) {
        let e = ReplicationError::SelfReference {
            source_ref: source_ref.id(),
        };
        return fail_pull(ctx, target, &e).await;
    }

    // Cache read; a reverse watch wakes us if the source appears later
    let Some(source) = ctx.stores.get_secret(&source_ref.namespace, &source_ref.name) else {
        let e = ReplicationError::SourceNotFound {
            source_ref: source_ref.id(),
        };
        return fail_pull(ctx, target, &e).await;
    };

    if source.metadata.deletion_timestamp.is_some() {
        info!(
            "Source {} of {}/{} is being deleted - keeping the last replicated snapshot",
            source_ref.id(),
            namespace,
            name
        );
        publish_event(
            &ctx.recorder,
            target,
            REASON_SOURCE_DELETED,
            ACTION_PULL,
            format!(
                "Source secret '{}' is being deleted; keeping the current data as a snapshot",
                source_ref.id()
            ),
        )
        .await;
        return Ok(());
    }

    let allowlist = SecretAnnotations::new(&source).replicatable_from_namespaces();
    match namespace_allowed(&allowlist, &namespace) {
        Ok(true) => {}
        Ok(false) => {
            let e = ReplicationError::NotAllowed {
                source_ref: source_ref.id(),
                namespace: namespace.clone(),
            };
            return fail_pull(ctx, target, &e).await;
        }
        Err(e) => {
            return fail_pull(ctx, target, &e).await;
        }
    }

    let merged = merged_data(source.data.as_ref(), target.data.as_ref());
    let up_to_date = target.data.as_ref().map_or(merged.is_empty(), |d| *d == merged)
        && view.replicated_from() == Some(source_ref.id().as_str());
    if up_to_date {
        debug!(
            "Secret {}/{} already matches source {} - nothing to write",
            namespace,
            name,
            source_ref.id()
        );
        return Ok(());
    }

    let copied = source.data.as_ref().map_or(0, |d| d.len());
    let patch = json!({
        "metadata": {
            "annotations": {
                ANNOTATION_REPLICATED_FROM: source_ref.id(),
                ANNOTATION_LAST_REPLICATED_AT: now_rfc3339(),
            }
        },
        "data": serde_json::to_value(&merged)?,
    });

    let api: Api<Secret> = Api::namespaced(ctx.client.clone(), &namespace);
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    metrics::record_replication("pull");
    info!(
        "Replicated {} key(s) from {} into {}/{}",
        copied,
        source_ref.id(),
        namespace,
        name
    );

    publish_event(
        &ctx.recorder,
        target,
        REASON_REPLICATION_SUCCEEDED,
        ACTION_PULL,
        format!("Replicated {} key(s) from '{}'", copied, source_ref.id()),
    )
    .await;

    Ok(())
}

/// Report a pull failure once and stop without retrying.
async fn fail_pull(ctx: &Context, target: &Secret, error: &ReplicationError) -> Result<()> {
    metrics::record_error("replicator", "user_data_error");
    publish_event(
        &ctx.recorder,
        target,
        REASON_REPLICATION_FAILED,
        ACTION_PULL,
        error.to_string(),
    )
    .await;
    Ok(())
}
