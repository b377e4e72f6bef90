// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes event emission for reconciler decisions.
//!
//! Secrets have no status subresource, so events are the operator's only
//! user-visible reporting surface: every decision a user can reach (success,
//! rejection, failure) emits exactly one event with a documented reason.
//! Publishing is best-effort; a failure to record an event is logged and never
//! fails the reconciliation that produced it.

use k8s_openapi::api::core::v1::Secret;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource};
use tracing::warn;

use crate::constants::EVENT_REPORTER;
use crate::metrics;

// ============================================================================
// Event Reasons
// ============================================================================

/// At least one field was generated for the first time
pub const REASON_GENERATION_SUCCEEDED: &str = "GenerationSucceeded";

/// Generation aborted for the whole Secret; nothing was written
pub const REASON_GENERATION_FAILED: &str = "GenerationFailed";

/// At least one field was rotated
pub const REASON_ROTATION_SUCCEEDED: &str = "RotationSucceeded";

/// A field's rotation interval violates the configured minimum
pub const REASON_ROTATION_FAILED: &str = "RotationFailed";

/// A pull or push pass copied data to or from this Secret
pub const REASON_REPLICATION_SUCCEEDED: &str = "ReplicationSucceeded";

/// A replication flow stopped before copying anything
pub const REASON_REPLICATION_FAILED: &str = "ReplicationFailed";

/// One push target namespace could not be satisfied
pub const REASON_PUSH_FAILED: &str = "PushFailed";

/// The pull source is being deleted; the target keeps its snapshot
pub const REASON_SOURCE_DELETED: &str = "SourceDeleted";

/// `autogenerate` and `replicate-from` were combined on one Secret
pub const REASON_CONFLICTING_FEATURES: &str = "ConflictingFeatures";

/// Map a reason to the Kubernetes event type it is reported with.
#[must_use]
pub fn reason_event_type(reason: &str) -> EventType {
    match reason {
        REASON_GENERATION_SUCCEEDED | REASON_ROTATION_SUCCEEDED | REASON_REPLICATION_SUCCEEDED => {
            EventType::Normal
        }
        _ => EventType::Warning,
    }
}

/// Build the event recorder both controllers share.
///
/// `instance` identifies this operator replica (typically the pod name) so
/// events from different replicas are distinguishable.
#[must_use]
pub fn build_recorder(client: Client, instance: Option<String>) -> Recorder {
    Recorder::new(
        client,
        Reporter {
            controller: EVENT_REPORTER.to_string(),
            instance,
        },
    )
}

/// Publish one event on a Secret, best-effort.
///
/// Event emission must never fail a reconciliation, so API errors here are
/// logged at warn level and swallowed.
pub async fn publish_event(
    recorder: &Recorder,
    secret: &Secret,
    reason: &str,
    action: &str,
    note: String,
) {
    let event = Event {
        type_: reason_event_type(reason),
        reason: reason.to_string(),
        note: Some(note),
        action: action.to_string(),
        secondary: None,
    };

    let reference = secret.object_ref(&());
    match recorder.publish(&event, &reference).await {
        Ok(()) => metrics::record_event_emitted(reason),
        Err(e) => {
            warn!(
                secret = %format!(
                    "{}/{}",
                    secret.metadata.namespace.as_deref().unwrap_or_default(),
                    secret.metadata.name.as_deref().unwrap_or_default()
                ),
                reason = reason,
                "Failed to publish event: {e}"
            );
        }
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod events_tests;
