// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Replication reconciler.
//!
//! Runs on any Secret carrying at least one of `replicate-from`,
//! `replicate-to`, or `replicatable-from-namespaces`, and on push sources
//! being deleted. Four flows, selected first-match in this order:
//!
//! 1. **Deletion** - the Secret is being deleted and still carries the
//!    cleanup finalizer: delete its pushed copies, then release the finalizer.
//! 2. **Conflict guard** - `autogenerate` combined with `replicate-from` is
//!    rejected with a single `ConflictingFeatures` warning.
//! 3. **Pull** - copy the referenced source's data into this Secret, subject
//!    to the source's namespace allowlist.
//! 4. **Push** - propagate this Secret's data into its target namespaces.

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::annotations::SecretAnnotations;
use crate::constants::FINALIZER_REPLICATE_TO_CLEANUP;
use crate::context::Context;
use crate::events::{publish_event, REASON_CONFLICTING_FEATURES};
use crate::metrics;
use crate::reconcilers::finalizers::has_finalizer;

pub mod cleanup;
pub mod pull;
pub mod push;

pub(crate) const ACTION_PULL: &str = "Pull";
pub(crate) const ACTION_PUSH: &str = "Push";

/// Which replication flow applies to a Secret, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Deletion,
    Conflict,
    Pull,
    Push,
    None,
}

/// Select the single flow to run for this Secret.
pub(crate) fn select_flow(secret: &Secret) -> Flow {
    let view = SecretAnnotations::new(secret);

    if secret.metadata.deletion_timestamp.is_some() {
        if has_finalizer(secret, FINALIZER_REPLICATE_TO_CLEANUP) {
            return Flow::Deletion;
        }
        // Nothing of ours blocks this deletion
        return Flow::None;
    }

    if view.has_autogenerate() && view.has_replicate_from() {
        return Flow::Conflict;
    }
    if view.has_replicate_from() {
        return Flow::Pull;
    }
    if view.has_replicate_to() {
        return Flow::Push;
    }
    Flow::None
}

/// Reconcile one Secret against the replication annotation surface.
///
/// # Errors
///
/// Returns an error only for transient API failures (the runtime redelivers).
/// Every user-data and policy outcome is reported through a warning event on
/// the Secret and swallowed; those are fixed by the user, not by retrying.
pub async fn reconcile_replication(ctx: Arc<Context>, secret: Secret) -> Result<()> {
    let namespace = secret.namespace().unwrap_or_default();
    let name = secret.name_any();

    match select_flow(&secret) {
        Flow::Deletion => cleanup::handle_source_deletion(&ctx, &secret).await,
        Flow::Conflict => {
            metrics::record_error("replicator", "policy_violation");
            publish_event(
                &ctx.recorder,
                &secret,
                REASON_CONFLICTING_FEATURES,
                ACTION_PULL,
                "The autogenerate and replicate-from annotations cannot be combined on one Secret"
                    .to_string(),
            )
            .await;
            Ok(())
        }
        Flow::Pull => pull::reconcile_pull(&ctx, &secret).await,
        Flow::Push => push::reconcile_push(&ctx, &secret).await,
        Flow::None => {
            debug!("Secret {}/{} needs no replication work", namespace, name);
            Ok(())
        }
    }
}

/// The `<namespace>/<name>` identity of a Secret.
#[must_use]
pub(crate) fn secret_id(secret: &Secret) -> String {
    format!(
        "{}/{}",
        secret.metadata.namespace.as_deref().unwrap_or_default(),
        secret.metadata.name.as_deref().unwrap_or_default()
    )
}

/// Current wall-clock time as the RFC 3339 literal written into annotations.
#[must_use]
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Overlay the source's data onto the target's.
///
/// Every source key overwrites the target's value for that key; keys present
/// only in the target are left in place. Removing a key from the source
/// therefore never removes it from existing copies.
#[must_use]
pub(crate) fn merged_data(
    source: Option<&BTreeMap<String, ByteString>>,
    target: Option<&BTreeMap<String, ByteString>>,
) -> BTreeMap<String, ByteString> {
    let mut merged = target.cloned().unwrap_or_default();
    if let Some(source) = source {
        for (key, value) in source {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

#[cfg(test)]
#[path = "replicator_tests.rs"]
mod replicator_tests;
