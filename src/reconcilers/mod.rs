// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation controllers for Secret lifecycles.
//!
//! This module contains the reconciliation logic for both halves of the
//! operator. Each controller watches Secrets and acts on its own slice of the
//! `iso.gtrfc.com/` annotation surface.
//!
//! # Reconciliation Architecture
//!
//! Isotope follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** - Monitor Secret changes via Kubernetes API
//! 2. **Reconcile** - Compare the annotation contract with the Secret's data
//! 3. **Update** - Write generated values or replicated data back
//! 4. **Report** - Emit one event per user-reachable decision
//!
//! # Available Reconcilers
//!
//! - [`reconcile_generated_secret`] - Materializes and rotates autogenerated
//!   fields, returning the delay until the next rotation
//! - [`reconcile_replication`] - Runs the pull, push, or cleanup flow for
//!   replicated Secrets and enforces the feature conflict guard
//!
//! Both reconcilers swallow user-data and policy failures after reporting
//! them through events; only transient API errors propagate to the
//! controller's error policy.

pub mod finalizers;
pub mod generator;
pub mod replicator;

pub use generator::reconcile_generated_secret;
pub use replicator::reconcile_replication;
