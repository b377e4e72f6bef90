// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for both controllers, backed by a Secret reflector store.
//!
//! The store serves two purposes:
//! - cache reads: pull flows load their source through the store instead of
//!   hitting the API server on every reconciliation;
//! - the reverse index: when a replicatable source changes, the watch mapper
//!   scans the store for Secrets that pull from it and enqueues each one.

use k8s_openapi::api::core::v1::Secret;
use kube::runtime::events::Recorder;
use kube::runtime::reflector::{ObjectRef, Store};
use kube::Client;
use std::sync::Arc;

use crate::annotations::SecretAnnotations;
use crate::config::OperatorConfig;

/// Shared context passed to both controllers.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Operator configuration loaded at startup
    pub config: OperatorConfig,

    /// Reflector stores for cross-controller queries
    pub stores: Stores,

    /// Event recorder shared by both controllers
    pub recorder: Recorder,
}

/// Collection of reflector stores for cross-controller queries.
///
/// The store is populated by a dedicated reflector task and provides
/// in-memory access to Secrets without API calls.
#[derive(Clone)]
pub struct Stores {
    pub secrets: Store<Secret>,
}

impl Stores {
    /// Look up a Secret in the reflector store.
    ///
    /// This is the cache-read path; it never touches the API server.
    #[must_use]
    pub fn get_secret(&self, namespace: &str, name: &str) -> Option<Arc<Secret>> {
        self.secrets
            .get(&ObjectRef::<Secret>::new(name).within(namespace))
    }

    /// Find every Secret that pulls from the given source.
    ///
    /// This is the reverse index: an on-demand scan of the store for Secrets
    /// whose `replicate-from` resolves to `<namespace>/<name>`. Malformed
    /// references never match; the owning reconciler reports those itself.
    ///
    /// # Returns
    ///
    /// A vector of (name, namespace) tuples for the pull targets.
    #[must_use]
    pub fn pull_targets_of(&self, namespace: &str, name: &str) -> Vec<(String, String)> {
        self.secrets
            .state()
            .iter()
            .filter(|candidate| {
                SecretAnnotations::new(candidate)
                    .source_ref()
                    .ok()
                    .flatten()
                    .is_some_and(|source| source.namespace == namespace && source.name == name)
            })
            .filter_map(|target| {
                Some((
                    target.metadata.name.clone()?,
                    target.metadata.namespace.clone()?,
                ))
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
