// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `events.rs`

#[cfg(test)]
mod tests {
    use crate::events::{
        reason_event_type, REASON_CONFLICTING_FEATURES, REASON_GENERATION_FAILED,
        REASON_GENERATION_SUCCEEDED, REASON_PUSH_FAILED, REASON_REPLICATION_FAILED,
        REASON_REPLICATION_SUCCEEDED, REASON_ROTATION_FAILED, REASON_ROTATION_SUCCEEDED,
        REASON_SOURCE_DELETED,
    };
    use kube::runtime::events::EventType;

    fn is_normal(reason: &str) -> bool {
        matches!(reason_event_type(reason), EventType::Normal)
    }

    #[test]
    fn test_success_reasons_are_normal() {
        assert!(is_normal(REASON_GENERATION_SUCCEEDED));
        assert!(is_normal(REASON_ROTATION_SUCCEEDED));
        assert!(is_normal(REASON_REPLICATION_SUCCEEDED));
    }

    #[test]
    fn test_failure_and_policy_reasons_are_warnings() {
        for reason in [
            REASON_GENERATION_FAILED,
            REASON_ROTATION_FAILED,
            REASON_REPLICATION_FAILED,
            REASON_PUSH_FAILED,
            REASON_SOURCE_DELETED,
            REASON_CONFLICTING_FEATURES,
        ] {
            assert!(!is_normal(reason), "{reason} should be a warning");
        }
    }

    #[test]
    fn test_unknown_reason_defaults_to_warning() {
        assert!(!is_normal("SomethingElse"));
    }
}
