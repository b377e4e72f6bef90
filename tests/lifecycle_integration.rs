// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! End-to-end integration tests for the Isotope Secret operator
//!
//! These tests verify the operator is working correctly in a Kubernetes
//! cluster. They require both a reachable cluster and a running Isotope
//! operator with the default configuration.
//!
//! Run with: cargo test --test lifecycle_integration -- --ignored

#![allow(clippy::items_after_statements)]

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, DeleteParams};
use serde_json::json;
use std::time::Duration;

mod common;
use common::{
    cleanup_test_namespace, create_secret, create_test_namespace, get_kube_client_or_skip,
    wait_for_secret, wait_for_secret_gone,
};

const OPERATOR_TIMEOUT: Duration = Duration::from_secs(30);
const SETTLE_TIME: Duration = Duration::from_secs(5);

const GENERATED_AT: &str = "iso.gtrfc.com/generated-at";
const REPLICATED_FROM: &str = "iso.gtrfc.com/replicated-from";
const LAST_REPLICATED_AT: &str = "iso.gtrfc.com/last-replicated-at";
const CLEANUP_FINALIZER: &str = "iso.gtrfc.com/replicate-to-cleanup";

fn field_bytes(secret: &Secret, field: &str) -> Option<Vec<u8>> {
    secret.data.as_ref()?.get(field).map(|b| b.0.clone())
}

fn annotation<'a>(secret: &'a Secret, key: &str) -> Option<&'a str> {
    secret
        .metadata
        .annotations
        .as_ref()?
        .get(key)
        .map(String::as_str)
}

// ============================================================================
// Basic Connectivity Tests
// ============================================================================

#[tokio::test]
#[ignore] // Run with: cargo test --test lifecycle_integration -- --ignored
async fn test_kubernetes_connectivity() {
    println!("\n=== Test: Kubernetes Connectivity ===\n");

    let client = match get_kube_client_or_skip().await {
        Some(c) => c,
        None => return,
    };

    let secrets: Api<Secret> = Api::all(client);
    match secrets.list(&kube::api::ListParams::default().limit(5)).await {
        Ok(list) => {
            println!("Connected; cluster has at least {} secret(s)", list.items.len());
        }
        Err(e) => panic!("Failed to list secrets: {e}"),
    }
}

// ============================================================================
// Generation Scenarios
// ============================================================================

#[tokio::test]
#[ignore]
async fn test_basic_generation() {
    println!("\n=== Test: Basic Generation ===\n");

    let client = match get_kube_client_or_skip().await {
        Some(c) => c,
        None => return,
    };
    let namespace = "isotope-test-generation";
    create_test_namespace(&client, namespace).await.unwrap();

    create_secret(
        &client,
        namespace,
        json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": "generated",
                "namespace": namespace,
                "annotations": {
                    "iso.gtrfc.com/autogenerate": "password",
                    "iso.gtrfc.com/length": "32"
                }
            }
        }),
    )
    .await
    .unwrap();

    let secret = wait_for_secret(&client, namespace, "generated", OPERATOR_TIMEOUT, |s| {
        field_bytes(s, "password").is_some()
    })
    .await
    .expect("operator did not generate the password field");

    let password = String::from_utf8(field_bytes(&secret, "password").unwrap()).unwrap();
    assert_eq!(password.len(), 32);
    assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));

    let generated_at = annotation(&secret, GENERATED_AT).expect("generated-at missing");
    assert!(chrono::DateTime::parse_from_rfc3339(generated_at).is_ok());

    cleanup_test_namespace(&client, namespace).await;
}

#[tokio::test]
#[ignore]
async fn test_existing_value_preserved() {
    println!("\n=== Test: Existing Value Preserved ===\n");

    let client = match get_kube_client_or_skip().await {
        Some(c) => c,
        None => return,
    };
    let namespace = "isotope-test-preserve";
    create_test_namespace(&client, namespace).await.unwrap();

    create_secret(
        &client,
        namespace,
        json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": "partial",
                "namespace": namespace,
                "annotations": {
                    "iso.gtrfc.com/autogenerate": "password,api-key"
                }
            },
            "data": {
                "password": BASE64.encode("keep-me")
            }
        }),
    )
    .await
    .unwrap();

    let secret = wait_for_secret(&client, namespace, "partial", OPERATOR_TIMEOUT, |s| {
        field_bytes(s, "api-key").is_some()
    })
    .await
    .expect("operator did not generate the api-key field");

    assert_eq!(field_bytes(&secret, "password").unwrap(), b"keep-me");
    assert_eq!(field_bytes(&secret, "api-key").unwrap().len(), 32);
    assert!(annotation(&secret, GENERATED_AT).is_some());

    cleanup_test_namespace(&client, namespace).await;
}

#[tokio::test]
#[ignore]
async fn test_conflict_rejection() {
    println!("\n=== Test: Conflicting Features Rejected ===\n");

    let client = match get_kube_client_or_skip().await {
        Some(c) => c,
        None => return,
    };
    let namespace = "isotope-test-conflict";
    create_test_namespace(&client, namespace).await.unwrap();

    create_secret(
        &client,
        namespace,
        json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": "conflicted",
                "namespace": namespace,
                "annotations": {
                    "iso.gtrfc.com/autogenerate": "password",
                    "iso.gtrfc.com/replicate-from": "somewhere/else"
                }
            }
        }),
    )
    .await
    .unwrap();

    // Give the operator time to (wrongly) act, then verify it did not
    tokio::time::sleep(SETTLE_TIME).await;

    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = secrets.get("conflicted").await.unwrap();
    assert!(
        field_bytes(&secret, "password").is_none(),
        "no field may be generated on a conflicted Secret"
    );
    assert!(annotation(&secret, REPLICATED_FROM).is_none());

    cleanup_test_namespace(&client, namespace).await;
}

// ============================================================================
// Replication Scenarios
// ============================================================================

#[tokio::test]
#[ignore]
async fn test_pull_replication_with_consent() {
    println!("\n=== Test: Pull Replication With Mutual Consent ===\n");

    let client = match get_kube_client_or_skip().await {
        Some(c) => c,
        None => return,
    };
    let source_ns = "isotope-test-pull-src";
    let target_ns = "isotope-test-pull-dst";
    create_test_namespace(&client, source_ns).await.unwrap();
    create_test_namespace(&client, target_ns).await.unwrap();

    create_secret(
        &client,
        source_ns,
        json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": "db",
                "namespace": source_ns,
                "annotations": {
                    "iso.gtrfc.com/replicatable-from-namespaces":
                        format!("{target_ns},env-*")
                }
            },
            "data": {
                "user": BASE64.encode("u"),
                "pass": BASE64.encode("p")
            }
        }),
    )
    .await
    .unwrap();

    create_secret(
        &client,
        target_ns,
        json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": "db",
                "namespace": target_ns,
                "annotations": {
                    "iso.gtrfc.com/replicate-from": format!("{source_ns}/db")
                }
            }
        }),
    )
    .await
    .unwrap();

    let target = wait_for_secret(&client, target_ns, "db", OPERATOR_TIMEOUT, |s| {
        field_bytes(s, "user").is_some() && field_bytes(s, "pass").is_some()
    })
    .await
    .expect("operator did not replicate the source data");

    assert_eq!(field_bytes(&target, "user").unwrap(), b"u");
    assert_eq!(field_bytes(&target, "pass").unwrap(), b"p");
    assert_eq!(
        annotation(&target, REPLICATED_FROM),
        Some(format!("{source_ns}/db").as_str())
    );
    assert!(annotation(&target, LAST_REPLICATED_AT).is_some());

    cleanup_test_namespace(&client, source_ns).await;
    cleanup_test_namespace(&client, target_ns).await;
}

#[tokio::test]
#[ignore]
async fn test_pull_denied_without_consent() {
    println!("\n=== Test: Pull Denied Without Consent ===\n");

    let client = match get_kube_client_or_skip().await {
        Some(c) => c,
        None => return,
    };
    let source_ns = "isotope-test-deny-src";
    let target_ns = "isotope-test-deny-dst";
    create_test_namespace(&client, source_ns).await.unwrap();
    create_test_namespace(&client, target_ns).await.unwrap();

    // Source without any allowlist: nobody may pull
    create_secret(
        &client,
        source_ns,
        json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": { "name": "db", "namespace": source_ns },
            "data": { "pass": BASE64.encode("p") }
        }),
    )
    .await
    .unwrap();

    create_secret(
        &client,
        target_ns,
        json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": "db",
                "namespace": target_ns,
                "annotations": {
                    "iso.gtrfc.com/replicate-from": format!("{source_ns}/db")
                }
            }
        }),
    )
    .await
    .unwrap();

    tokio::time::sleep(SETTLE_TIME).await;

    let secrets: Api<Secret> = Api::namespaced(client.clone(), target_ns);
    let target = secrets.get("db").await.unwrap();
    assert!(
        field_bytes(&target, "pass").is_none(),
        "data must not replicate without the source's consent"
    );

    cleanup_test_namespace(&client, source_ns).await;
    cleanup_test_namespace(&client, target_ns).await;
}

#[tokio::test]
#[ignore]
async fn test_push_with_unowned_collision() {
    println!("\n=== Test: Push With Unowned Collision ===\n");

    let client = match get_kube_client_or_skip().await {
        Some(c) => c,
        None => return,
    };
    let source_ns = "isotope-test-push-src";
    let target_ns = "isotope-test-push-dst";
    create_test_namespace(&client, source_ns).await.unwrap();
    create_test_namespace(&client, target_ns).await.unwrap();

    // Pre-existing target with no ownership marker
    create_secret(
        &client,
        target_ns,
        json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": { "name": "x", "namespace": target_ns },
            "data": { "k": BASE64.encode("old") }
        }),
    )
    .await
    .unwrap();

    create_secret(
        &client,
        source_ns,
        json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": "x",
                "namespace": source_ns,
                "annotations": {
                    "iso.gtrfc.com/replicate-to": target_ns
                }
            },
            "data": { "k": BASE64.encode("new") }
        }),
    )
    .await
    .unwrap();

    // The source must pick up the cleanup finalizer even though the push fails
    let source = wait_for_secret(&client, source_ns, "x", OPERATOR_TIMEOUT, |s| {
        s.metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|x| x == CLEANUP_FINALIZER))
    })
    .await
    .expect("operator did not add the cleanup finalizer");
    assert!(source.metadata.deletion_timestamp.is_none());

    // The unowned target keeps its data
    tokio::time::sleep(SETTLE_TIME).await;
    let secrets: Api<Secret> = Api::namespaced(client.clone(), target_ns);
    let target = secrets.get("x").await.unwrap();
    assert_eq!(field_bytes(&target, "k").unwrap(), b"old");
    assert!(annotation(&target, REPLICATED_FROM).is_none());

    cleanup_test_namespace(&client, source_ns).await;
    cleanup_test_namespace(&client, target_ns).await;
}

#[tokio::test]
#[ignore]
async fn test_push_cleanup_on_delete() {
    println!("\n=== Test: Push Cleanup On Source Deletion ===\n");

    let client = match get_kube_client_or_skip().await {
        Some(c) => c,
        None => return,
    };
    let source_ns = "isotope-test-cleanup-src";
    let target_ns_1 = "isotope-test-cleanup-s1";
    let target_ns_2 = "isotope-test-cleanup-s2";
    create_test_namespace(&client, source_ns).await.unwrap();
    create_test_namespace(&client, target_ns_1).await.unwrap();
    create_test_namespace(&client, target_ns_2).await.unwrap();

    create_secret(
        &client,
        source_ns,
        json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": "y",
                "namespace": source_ns,
                "annotations": {
                    "iso.gtrfc.com/replicate-to": format!("{target_ns_1},{target_ns_2}")
                }
            },
            "data": { "k": BASE64.encode("v") }
        }),
    )
    .await
    .unwrap();

    // Wait for both copies to propagate
    for ns in [target_ns_1, target_ns_2] {
        wait_for_secret(&client, ns, "y", OPERATOR_TIMEOUT, |s| {
            annotation(s, REPLICATED_FROM) == Some(format!("{source_ns}/y").as_str())
        })
        .await
        .unwrap_or_else(|| panic!("copy did not appear in {ns}"));
    }

    // Delete the source; the finalizer must drain the copies first
    let secrets: Api<Secret> = Api::namespaced(client.clone(), source_ns);
    secrets.delete("y", &DeleteParams::default()).await.unwrap();

    assert!(
        wait_for_secret_gone(&client, target_ns_1, "y", OPERATOR_TIMEOUT).await,
        "copy in {target_ns_1} was not cleaned up"
    );
    assert!(
        wait_for_secret_gone(&client, target_ns_2, "y", OPERATOR_TIMEOUT).await,
        "copy in {target_ns_2} was not cleaned up"
    );
    assert!(
        wait_for_secret_gone(&client, source_ns, "y", OPERATOR_TIMEOUT).await,
        "source was not released after cleanup"
    );

    cleanup_test_namespace(&client, source_ns).await;
    cleanup_test_namespace(&client, target_ns_1).await;
    cleanup_test_namespace(&client, target_ns_2).await;
}
