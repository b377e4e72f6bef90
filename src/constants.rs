// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Isotope operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Annotation Surface
// ============================================================================

/// Reserved prefix for every annotation this operator recognizes or writes
pub const ANNOTATION_PREFIX: &str = "iso.gtrfc.com/";

/// Comma-separated list of field names to generate and manage
pub const ANNOTATION_AUTOGENERATE: &str = "iso.gtrfc.com/autogenerate";

/// Secret-level default value type (`string` or `bytes`)
pub const ANNOTATION_TYPE: &str = "iso.gtrfc.com/type";

/// Secret-level default value length (positive integer)
pub const ANNOTATION_LENGTH: &str = "iso.gtrfc.com/length";

/// Secret-level default rotation interval (duration literal)
pub const ANNOTATION_ROTATE: &str = "iso.gtrfc.com/rotate";

/// Timestamp of the last generation write, shared by all generated fields
pub const ANNOTATION_GENERATED_AT: &str = "iso.gtrfc.com/generated-at";

/// Charset toggle: include `A..Z`
pub const ANNOTATION_STRING_UPPERCASE: &str = "iso.gtrfc.com/string.uppercase";

/// Charset toggle: include `a..z`
pub const ANNOTATION_STRING_LOWERCASE: &str = "iso.gtrfc.com/string.lowercase";

/// Charset toggle: include `0..9`
pub const ANNOTATION_STRING_NUMBERS: &str = "iso.gtrfc.com/string.numbers";

/// Charset toggle: include the special-character literal
pub const ANNOTATION_STRING_SPECIAL_CHARS: &str = "iso.gtrfc.com/string.specialChars";

/// Literal set of special characters to draw from
pub const ANNOTATION_STRING_ALLOWED_SPECIAL_CHARS: &str =
    "iso.gtrfc.com/string.allowedSpecialChars";

/// `<namespace>/<name>` reference to a source Secret to pull from
pub const ANNOTATION_REPLICATE_FROM: &str = "iso.gtrfc.com/replicate-from";

/// Comma-separated list of namespaces to push copies into
pub const ANNOTATION_REPLICATE_TO: &str = "iso.gtrfc.com/replicate-to";

/// Comma-separated glob allowlist of namespaces that may pull this Secret
pub const ANNOTATION_REPLICATABLE_FROM_NAMESPACES: &str =
    "iso.gtrfc.com/replicatable-from-namespaces";

/// Ownership marker written onto every replicated copy (`<ns>/<name>` of the source)
pub const ANNOTATION_REPLICATED_FROM: &str = "iso.gtrfc.com/replicated-from";

/// Timestamp of the last effective replication write on a copy
pub const ANNOTATION_LAST_REPLICATED_AT: &str = "iso.gtrfc.com/last-replicated-at";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer that blocks deletion of a push source until its copies are removed
pub const FINALIZER_REPLICATE_TO_CLEANUP: &str = "iso.gtrfc.com/replicate-to-cleanup";

// ============================================================================
// Charset Blocks
// ============================================================================

/// Lowercase charset block, concatenated first when enabled
pub const CHARSET_LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";

/// Uppercase charset block, concatenated second when enabled
pub const CHARSET_UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Digit charset block, concatenated third when enabled
pub const CHARSET_DIGITS: &str = "0123456789";

// ============================================================================
// Configuration Defaults
// ============================================================================

/// Default generated value length
pub const DEFAULT_LENGTH: usize = 32;

/// Default special-character literal when `specialChars` is enabled
pub const DEFAULT_ALLOWED_SPECIAL_CHARS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Default lower bound on rotation intervals (5 minutes)
pub const DEFAULT_MIN_ROTATION_INTERVAL_SECS: u64 = 300;

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

// ============================================================================
// Leader Election Constants
// ============================================================================

/// Default leader election lease duration (15 seconds)
pub const DEFAULT_LEASE_DURATION_SECS: u64 = 15;

/// Default leader election retry period (2 seconds)
pub const DEFAULT_LEASE_RETRY_PERIOD_SECS: u64 = 2;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Reporter name stamped on every Kubernetes event this operator emits
pub const EVENT_REPORTER: &str = "isotope";

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";
