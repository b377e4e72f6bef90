// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # Isotope - Secret Lifecycle Controller for Kubernetes
//!
//! Isotope is a Kubernetes controller written in Rust that manages opaque
//! Secret resources along two orthogonal axes: auto-generation of random
//! field values with time-based rotation, and cross-namespace replication
//! under mutual consent. It is driven entirely by annotations under
//! `iso.gtrfc.com/` and defines no custom resource types.
//!
//! ## Overview
//!
//! This library provides the core functionality for the Isotope operator,
//! including:
//!
//! - Annotation grammar and per-field resolution
//! - Random value generation backed by a CSPRNG
//! - Generation/rotation reconciliation with requeue scheduling
//! - Pull and push replication with glob-based namespace allowlisting
//! - Finalizer-driven cleanup of pushed copies
//!
//! ## Modules
//!
//! - [`annotations`] - The annotation grammar and resolution cascade
//! - [`generate`] - Random string/byte generation and charset synthesis
//! - [`reconcilers`] - Reconciliation logic for generation and replication
//! - [`config`] - YAML configuration with process-wide defaults
//!
//! ## Example
//!
//! A Secret that asks for a generated password and a rotating API key:
//!
//! ```yaml
//! apiVersion: v1
//! kind: Secret
//! metadata:
//!   name: service-credentials
//!   annotations:
//!     iso.gtrfc.com/autogenerate: "password,api-key"
//!     iso.gtrfc.com/length.api-key: "48"
//!     iso.gtrfc.com/rotate.api-key: "30d"
//! ```
//!
//! ## Features
//!
//! - **Annotation-Driven** - No CRDs; plain Secrets carry the whole contract
//! - **Mutual Consent** - Sources allowlist the namespaces that may pull
//! - **Single-Write Updates** - All fields of one pass land in one update
//! - **Finalizer Cleanup** - Pushed copies never outlive their source
//!
//! For more information, see the [documentation](https://firestoned.github.io/isotope/).

pub mod annotations;
pub mod config;
pub mod constants;
pub mod context;
pub mod duration;
pub mod events;
pub mod generate;
pub mod metrics;
pub mod reconcilers;
pub mod secret_errors;
