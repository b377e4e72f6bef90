// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic finalizer management for namespaced Kubernetes resources.
//!
//! The replicator uses these helpers to manage the push-cleanup finalizer on
//! `v1/Secret` objects. The operations are idempotent and merge-patch based,
//! so they are safe to call on every reconciliation.

use anyhow::Result;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::json;
use tracing::info;

/// Whether the given finalizer is present on the resource.
#[must_use]
pub fn has_finalizer<T>(resource: &T, finalizer: &str) -> bool
where
    T: Resource + ResourceExt,
{
    resource
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|x| x == finalizer))
}

/// Add a finalizer to a resource if not already present.
///
/// The finalizer is persisted with its own patch before the caller performs
/// any side effects, so deletion can always find and undo them.
///
/// # Arguments
///
/// * `client` - Kubernetes client for accessing the API
/// * `resource` - The resource to add the finalizer to
/// * `finalizer` - The finalizer string to add
///
/// # Returns
///
/// Returns `true` if the finalizer was added, `false` if it was already present.
///
/// # Errors
///
/// Returns an error if the API patch operation fails.
pub async fn ensure_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<bool>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    if has_finalizer(resource, finalizer) {
        return Ok(false);
    }

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    info!(
        "Adding finalizer {} to {}/{} {}",
        finalizer,
        namespace,
        name,
        T::kind(&())
    );

    let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
    finalizers.push(finalizer.to_string());

    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    Ok(true)
}

/// Remove a finalizer from a resource.
///
/// Idempotent: removing an absent finalizer is a no-op.
///
/// # Arguments
///
/// * `client` - Kubernetes client for accessing the API
/// * `resource` - The resource to remove the finalizer from
/// * `finalizer` - The finalizer string to remove
///
/// # Errors
///
/// Returns an error if the API patch operation fails.
pub async fn remove_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    if !has_finalizer(resource, finalizer) {
        return Ok(());
    }

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    info!(
        "Removing finalizer {} from {}/{} {}",
        finalizer,
        namespace,
        name,
        T::kind(&())
    );

    let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
    finalizers.retain(|f| f != finalizer);

    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    Ok(())
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
