// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `context.rs`

#[cfg(test)]
mod tests {
    use crate::context::Stores;
    use k8s_openapi::api::core::v1::Secret;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kube::runtime::reflector;
    use kube::runtime::watcher;
    use std::collections::BTreeMap;

    fn secret(namespace: &str, name: &str, annotations: &[(&str, &str)]) -> Secret {
        let annotations: BTreeMap<String, String> = annotations
            .iter()
            .map(|(k, v)| (format!("iso.gtrfc.com/{k}"), (*v).to_string()))
            .collect();

        Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                annotations: (!annotations.is_empty()).then_some(annotations),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn stores_with(secrets: Vec<Secret>) -> Stores {
        let (store, mut writer) = reflector::store();
        for s in secrets {
            writer.apply_watcher_event(&watcher::Event::Apply(s));
        }
        Stores { secrets: store }
    }

    #[test]
    fn test_get_secret_by_identity() {
        let stores = stores_with(vec![
            secret("production", "db", &[]),
            secret("staging", "db", &[]),
        ]);

        let found = stores.get_secret("production", "db").unwrap();
        assert_eq!(found.metadata.namespace.as_deref(), Some("production"));
        assert!(stores.get_secret("production", "missing").is_none());
        assert!(stores.get_secret("qa", "db").is_none());
    }

    #[test]
    fn test_pull_targets_of_matches_source_identity() {
        let stores = stores_with(vec![
            secret("production", "db", &[("replicatable-from-namespaces", "*")]),
            secret("staging", "db", &[("replicate-from", "production/db")]),
            secret("qa", "db-copy", &[("replicate-from", "production/db")]),
            secret("dev", "db", &[("replicate-from", "production/other")]),
            secret("ops", "unrelated", &[]),
        ]);

        let mut targets = stores.pull_targets_of("production", "db");
        targets.sort();

        assert_eq!(
            targets,
            vec![
                ("db".to_string(), "staging".to_string()),
                ("db-copy".to_string(), "qa".to_string()),
            ]
        );
    }

    #[test]
    fn test_pull_targets_of_ignores_malformed_references() {
        let stores = stores_with(vec![secret("staging", "db", &[("replicate-from", "junk")])]);
        assert!(stores.pull_targets_of("production", "db").is_empty());
    }

    #[test]
    fn test_pull_targets_of_no_targets() {
        let stores = stores_with(vec![secret("production", "db", &[])]);
        assert!(stores.pull_targets_of("production", "db").is_empty());
    }
}
