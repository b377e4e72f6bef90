// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generation and replication error types for Isotope.
//!
//! This module provides specialized error types for:
//! - Field generation failures (bad type annotations, charset misconfiguration)
//! - Replication failures (malformed references, consent violations, ownership conflicts)
//!
//! These are the user-data and policy-violation outcomes of the reconciler
//! contract: they are reported once through a warning event on the Secret and
//! are never retried. Transient API failures stay `kube::Error`s and propagate
//! so the runtime redelivers them. The `Display` text of each variant is used
//! verbatim as the event note.

use thiserror::Error;

use crate::generate::GenerateError;

/// Errors that abort generation for a whole Secret.
///
/// Any one of these on any field prevents all writes for the Secret in this
/// pass; partial generation never happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The resolved `type` annotation value is not `string` or `bytes`
    #[error("Field '{field}' has unknown type '{value}' (expected 'string' or 'bytes')")]
    UnknownType {
        /// The field whose type resolution failed
        field: String,
        /// The offending annotation value
        value: String,
    },

    /// Charset synthesis failed for a string-typed field
    #[error("Field '{field}' has an invalid charset configuration: {source}")]
    InvalidCharset {
        /// The field whose charset could not be built
        field: String,
        /// The underlying charset error
        source: GenerateError,
    },

    /// The value generator rejected its inputs
    #[error("Failed to generate a value for field '{field}': {source}")]
    ValueGeneration {
        /// The field being generated
        field: String,
        /// The underlying generator error
        source: GenerateError,
    },
}

/// Errors that stop a replication flow for this reconciliation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplicationError {
    /// The `replicate-from` annotation is not `<namespace>/<name>`
    #[error("Malformed source reference '{value}' (expected '<namespace>/<name>')")]
    MalformedSourceRef {
        /// The raw annotation value
        value: String,
    },

    /// The source reference resolves to the annotated Secret itself
    #[error("Source reference '{source_ref}' references itself")]
    SelfReference {
        /// The resolved `<namespace>/<name>` identity
        source_ref: String,
    },

    /// The referenced source Secret does not exist
    #[error("Source secret '{source_ref}' not found")]
    SourceNotFound {
        /// The resolved `<namespace>/<name>` identity
        source_ref: String,
    },

    /// The source's allowlist does not admit the target namespace
    #[error("Replication of '{source_ref}' into namespace '{namespace}' is not allowed by the source")]
    NotAllowed {
        /// The resolved `<namespace>/<name>` identity of the source
        source_ref: String,
        /// The namespace that asked to pull
        namespace: String,
    },

    /// An allowlist element is not a valid glob pattern
    #[error("Malformed allowlist pattern '{pattern}': {reason}")]
    MalformedAllowlistPattern {
        /// The offending pattern
        pattern: String,
        /// Why the glob parser rejected it
        reason: String,
    },

    /// A push target exists but carries no (or a foreign) ownership marker
    #[error("Secret '{namespace}/{name}' exists and is not owned by this source; refusing to overwrite")]
    UnownedTarget {
        /// Namespace of the colliding Secret
        namespace: String,
        /// Name of the colliding Secret
        name: String,
    },
}

#[cfg(test)]
#[path = "secret_errors_tests.rs"]
mod secret_errors_tests;
