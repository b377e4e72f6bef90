// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use crate::constants::FINALIZER_REPLICATE_TO_CLEANUP;
    use crate::reconcilers::finalizers::has_finalizer;
    use k8s_openapi::api::core::v1::Secret;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
    use k8s_openapi::jiff::Timestamp;

    const TEST_NAMESPACE: &str = "test-namespace";
    const TEST_NAME: &str = "test-secret";

    /// Helper to create a test Secret with the given finalizers
    fn create_test_secret(finalizers: Option<Vec<String>>) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some(TEST_NAME.to_string()),
                namespace: Some(TEST_NAMESPACE.to_string()),
                finalizers,
                deletion_timestamp: None,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_has_finalizer_absent() {
        let secret = create_test_secret(None);
        assert!(!has_finalizer(&secret, FINALIZER_REPLICATE_TO_CLEANUP));

        let secret = create_test_secret(Some(vec![]));
        assert!(!has_finalizer(&secret, FINALIZER_REPLICATE_TO_CLEANUP));
    }

    #[test]
    fn test_has_finalizer_present() {
        let secret = create_test_secret(Some(vec![FINALIZER_REPLICATE_TO_CLEANUP.to_string()]));
        assert!(has_finalizer(&secret, FINALIZER_REPLICATE_TO_CLEANUP));
    }

    #[test]
    fn test_has_finalizer_ignores_other_finalizers() {
        let secret = create_test_secret(Some(vec!["kubernetes.io/pv-protection".to_string()]));
        assert!(!has_finalizer(&secret, FINALIZER_REPLICATE_TO_CLEANUP));

        let secret = create_test_secret(Some(vec![
            "kubernetes.io/pv-protection".to_string(),
            FINALIZER_REPLICATE_TO_CLEANUP.to_string(),
        ]));
        assert!(has_finalizer(&secret, FINALIZER_REPLICATE_TO_CLEANUP));
    }

    #[test]
    fn test_deletion_timestamp_and_finalizer_combination() {
        // Being deleted WITH the finalizer: cleanup must run
        let mut deleting = create_test_secret(Some(vec![FINALIZER_REPLICATE_TO_CLEANUP.to_string()]));
        deleting.metadata.deletion_timestamp = Some(Time(Timestamp::now()));
        assert!(deleting.metadata.deletion_timestamp.is_some());
        assert!(has_finalizer(&deleting, FINALIZER_REPLICATE_TO_CLEANUP));

        // Being deleted WITHOUT the finalizer: nothing for us to do
        let mut deleting = create_test_secret(None);
        deleting.metadata.deletion_timestamp = Some(Time(Timestamp::now()));
        assert!(deleting.metadata.deletion_timestamp.is_some());
        assert!(!has_finalizer(&deleting, FINALIZER_REPLICATE_TO_CLEANUP));
    }

    #[test]
    fn test_finalizer_list_manipulation() {
        // The list operations ensure_finalizer/remove_finalizer perform
        let mut finalizers: Vec<String> = vec![];

        finalizers.push(FINALIZER_REPLICATE_TO_CLEANUP.to_string());
        assert_eq!(finalizers.len(), 1);

        // Idempotency check - don't add if already present
        if !finalizers.contains(&FINALIZER_REPLICATE_TO_CLEANUP.to_string()) {
            finalizers.push(FINALIZER_REPLICATE_TO_CLEANUP.to_string());
        }
        assert_eq!(finalizers.len(), 1);

        finalizers.retain(|f| f != FINALIZER_REPLICATE_TO_CLEANUP);
        assert!(finalizers.is_empty());
    }
}
