// Common test utilities for integration tests

use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::api::{Api, DeleteParams, PostParams};
use kube::client::Client;
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;

/// Get a Kubernetes client or skip the test if not in a cluster
pub async fn get_kube_client_or_skip() -> Option<Client> {
    match Client::try_default().await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping integration test: not running in Kubernetes cluster: {e}");
            None
        }
    }
}

/// Create a test namespace
pub async fn create_test_namespace(
    client: &Client,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    let ns = serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "labels": {
                "test": "integration",
                "managed-by": "isotope-test"
            }
        }
    }))?;

    match namespaces.create(&PostParams::default(), &ns).await {
        Ok(_) => {
            println!("Created test namespace: {name}");
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 409 => {
            println!("Test namespace already exists: {name}");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Cleanup test namespace
pub async fn cleanup_test_namespace(client: &Client, name: &str) {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    match namespaces.delete(name, &DeleteParams::default()).await {
        Ok(_) => println!("Deleted test namespace: {name}"),
        Err(kube::Error::Api(ae)) if ae.code == 404 => {
            println!("Test namespace already deleted: {name}");
        }
        Err(e) => eprintln!("Failed to delete test namespace {name}: {e}"),
    }
}

/// Create a Secret from a JSON value
pub async fn create_secret(
    client: &Client,
    namespace: &str,
    secret_json: serde_json::Value,
) -> Result<Secret, Box<dyn std::error::Error>> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret: Secret = serde_json::from_value(secret_json)?;

    match secrets.create(&PostParams::default(), &secret).await {
        Ok(created) => Ok(created),
        Err(kube::Error::Api(ae)) if ae.code == 409 => {
            let name = secret.metadata.name.clone().unwrap_or_default();
            println!("Secret already exists: {namespace}/{name}");
            Ok(secrets.get(&name).await?)
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Poll until `predicate` is satisfied for the named Secret, or time out.
///
/// Returns the Secret that satisfied the predicate, or None after the
/// timeout (including when the Secret does not exist).
pub async fn wait_for_secret(
    client: &Client,
    namespace: &str,
    name: &str,
    timeout: Duration,
    predicate: impl Fn(&Secret) -> bool,
) -> Option<Secret> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let deadline = std::time::Instant::now() + timeout;

    loop {
        if let Ok(Some(secret)) = secrets.get_opt(name).await {
            if predicate(&secret) {
                return Some(secret);
            }
        }
        if std::time::Instant::now() >= deadline {
            return None;
        }
        sleep(Duration::from_millis(500)).await;
    }
}

/// Poll until the named Secret is gone, or time out.
pub async fn wait_for_secret_gone(
    client: &Client,
    namespace: &str,
    name: &str,
    timeout: Duration,
) -> bool {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let deadline = std::time::Instant::now() + timeout;

    loop {
        match secrets.get_opt(name).await {
            Ok(None) => return true,
            _ => {
                if std::time::Instant::now() >= deadline {
                    return false;
                }
                sleep(Duration::from_millis(500)).await;
            }
        }
    }
}
