// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{routing::get, Router};
use clap::Parser;
use futures::StreamExt;
use isotope::{
    config::{load_config, OperatorConfig},
    constants::{
        DEFAULT_LEASE_DURATION_SECS, DEFAULT_LEASE_RETRY_PERIOD_SECS, ERROR_REQUEUE_DURATION_SECS,
        METRICS_SERVER_BIND_ADDRESS, METRICS_SERVER_PATH, METRICS_SERVER_PORT,
        TOKIO_WORKER_THREADS,
    },
    context::{Context, Stores},
    events::build_recorder,
    metrics,
    reconcilers::{reconcile_generated_secret, reconcile_replication},
};
use k8s_openapi::api::core::v1::Secret;
use kube::{
    runtime::{
        controller::Action,
        reflector::{self, ObjectRef},
        watcher, Controller,
    },
    Api, Client, ResourceExt,
};
use kube_lease_manager::LeaseManagerBuilder;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

/// Secret generation and replication operator for Kubernetes
#[derive(Parser)]
#[command(name = "isotope", version, about)]
struct Cli {
    /// Path to the operator configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("isotope-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

/// Initialize logging with custom format
///
/// Respects `RUST_LOG` environment variable if set, otherwise defaults to INFO level.
/// Respects `RUST_LOG_FORMAT` environment variable for output format (json or text).
fn initialize_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting Isotope Secret operator");
}

/// Load the operator configuration, or the documented defaults without `--config`.
fn initialize_config(cli: &Cli) -> Result<OperatorConfig> {
    let config = match &cli.config {
        Some(path) => {
            info!(config = %path.display(), "Loading operator configuration");
            load_config(path)?
        }
        None => {
            info!("No --config given, using built-in defaults");
            let config = OperatorConfig::default();
            config.validate()?;
            config
        }
    };

    debug!(
        min_interval = ?config.rotation.min_interval,
        generator = config.features.secret_generator,
        replicator = config.features.secret_replicator,
        "Operator configuration loaded"
    );
    Ok(config)
}

/// Initialize the Secret reflector and create the shared context.
///
/// The reflector spawns a background task that watches every Secret in the
/// cluster and keeps the store current. Both controllers read sources and the
/// reverse index out of this store instead of issuing API queries.
fn initialize_shared_context(client: Client, config: OperatorConfig) -> Arc<Context> {
    info!("Initializing Secret reflector");

    let secrets_api = Api::<Secret>::all(client.clone());
    let (secrets_store, secrets_writer) = reflector::store();

    tokio::spawn(async move {
        let stream = watcher(secrets_api, watcher::Config::default());
        reflector::reflector(secrets_writer, stream)
            .for_each(|_| futures::future::ready(()))
            .await;
        warn!("Secret reflector stream ended");
    });

    let instance = std::env::var("POD_NAME").ok();
    let recorder = build_recorder(client.clone(), instance);

    Arc::new(Context {
        client,
        config,
        stores: Stores {
            secrets: secrets_store,
        },
        recorder,
    })
}

/// Start the Prometheus metrics HTTP server
///
/// Serves metrics on the configured port and path (default: 0.0.0.0:8080/metrics)
///
/// # Returns
/// A `JoinHandle` that can be used to monitor the server task
fn start_metrics_server() -> tokio::task::JoinHandle<()> {
    info!(
        bind_address = METRICS_SERVER_BIND_ADDRESS,
        port = METRICS_SERVER_PORT,
        path = METRICS_SERVER_PATH,
        "Starting Prometheus metrics HTTP server"
    );

    tokio::spawn(async move {
        // Define the metrics endpoint handler
        async fn metrics_handler() -> String {
            match metrics::gather_metrics() {
                Ok(metrics_text) => metrics_text,
                Err(e) => {
                    error!("Failed to gather metrics: {}", e);
                    String::from("# Error gathering metrics\n")
                }
            }
        }

        // Build the router with the metrics endpoint
        let app = Router::new().route(METRICS_SERVER_PATH, get(metrics_handler));

        // Bind to the configured address and port
        let bind_addr = format!("{METRICS_SERVER_BIND_ADDRESS}:{METRICS_SERVER_PORT}");
        let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind metrics server to {bind_addr}: {e}");
                return;
            }
        };

        info!("Metrics server listening on http://{bind_addr}{METRICS_SERVER_PATH}");

        // Run the server
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {e}");
        }
    })
}

/// Leader election configuration
struct LeaderElectionConfig {
    enabled: bool,
    lease_name: String,
    lease_namespace: String,
    identity: String,
    lease_duration: u64,
    retry_period: u64,
}

/// Load leader election configuration from environment variables
fn load_leader_election_config() -> LeaderElectionConfig {
    let enabled = std::env::var("ISO_ENABLE_LEADER_ELECTION")
        .unwrap_or_else(|_| "true".to_string())
        .parse::<bool>()
        .unwrap_or(true);

    let lease_name =
        std::env::var("ISO_LEASE_NAME").unwrap_or_else(|_| "isotope-leader".to_string());

    let lease_namespace = std::env::var("ISO_LEASE_NAMESPACE")
        .or_else(|_| std::env::var("POD_NAMESPACE"))
        .unwrap_or_else(|_| "isotope-system".to_string());

    let lease_duration = std::env::var("ISO_LEASE_DURATION_SECONDS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_LEASE_DURATION_SECS);

    let retry_period = std::env::var("ISO_LEASE_RETRY_PERIOD_SECONDS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_LEASE_RETRY_PERIOD_SECS);

    let identity = std::env::var("POD_NAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| format!("isotope-{}", rand::random::<u32>()));

    LeaderElectionConfig {
        enabled,
        lease_name,
        lease_namespace,
        identity,
        lease_duration,
        retry_period,
    }
}

async fn async_main() -> Result<()> {
    initialize_logging();

    let cli = Cli::parse();
    let config = initialize_config(&cli)?;

    debug!("Initializing Kubernetes client");
    let kube_config = kube::Config::infer().await?;
    let client = Client::try_from(kube_config)?;
    info!("Kubernetes client initialized");

    let context = initialize_shared_context(client.clone(), config);

    // Start the metrics HTTP server
    let _metrics_handle = start_metrics_server();

    let leader_election_config = load_leader_election_config();

    if leader_election_config.enabled {
        info!(
            lease_name = %leader_election_config.lease_name,
            lease_namespace = %leader_election_config.lease_namespace,
            identity = %leader_election_config.identity,
            lease_duration_secs = leader_election_config.lease_duration,
            "Leader election enabled"
        );

        info!("Starting leader election, waiting to acquire leadership...");
        let lease_manager =
            LeaseManagerBuilder::new(client.clone(), &leader_election_config.lease_name)
                .with_namespace(&leader_election_config.lease_namespace)
                .with_identity(&leader_election_config.identity)
                .with_duration(leader_election_config.lease_duration)
                .with_grace(leader_election_config.retry_period)
                .build()
                .await?;

        let (leader_rx, _lease_handle) = lease_manager.watch().await;

        // Wait until we become leader
        let mut rx = leader_rx.clone();
        while !*rx.borrow_and_update() {
            rx.changed().await?;
        }

        info!("Leadership acquired, starting controllers");
        metrics::record_leader_elected(&leader_election_config.identity);

        let identity = leader_election_config.identity.clone();
        let shutdown_result: Result<()> = tokio::select! {
            result = wait_for_shutdown_signal() => result,

            result = monitor_leadership(leader_rx) => {
                warn!("Leadership lost, shutting down so a peer can take over");
                metrics::record_leader_lost(&identity);
                result
            }

            result = run_all_operators(context.clone()) => result,
        };
        shutdown_result?;
    } else {
        warn!("Leader election DISABLED - running without high availability");

        let shutdown_result: Result<()> = tokio::select! {
            result = wait_for_shutdown_signal() => result,
            result = run_all_operators(context.clone()) => result,
        };
        shutdown_result?;
    }

    info!("Graceful shutdown completed successfully");
    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::select! {
        // Monitor for SIGINT (Ctrl+C)
        result = tokio::signal::ctrl_c() => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            result.map_err(anyhow::Error::from)
        }

        // Monitor for SIGTERM (Kubernetes sends this when deleting pods)
        result = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = signal(SignalKind::terminate())?;
                sigterm.recv().await;
                Ok::<(), anyhow::Error>(())
            }
            #[cfg(not(unix))]
            {
                // On non-Unix platforms, just wait forever
                std::future::pending::<()>().await;
                Ok::<(), anyhow::Error>(())
            }
        } => {
            info!("Received SIGTERM (pod termination), initiating graceful shutdown...");
            result
        }
    }
}

/// Monitor leadership status - returns when leadership is lost or an error occurs
async fn monitor_leadership(
    mut leader_rx: tokio::sync::watch::Receiver<bool>,
) -> Result<(), anyhow::Error> {
    loop {
        leader_rx.changed().await?;
        if !*leader_rx.borrow() {
            // Leadership lost
            return Ok(());
        }
    }
}

/// Run the feature-enabled operators
///
/// Operators should never exit - if one does, we log it and exit the main
/// process so the pod restarts in a clean state.
async fn run_all_operators(context: Arc<Context>) -> Result<()> {
    let features = context.config.features.clone();
    if !features.secret_generator && !features.secret_replicator {
        anyhow::bail!("Both features are disabled; nothing to run");
    }

    tokio::select! {
        result = run_generator_operator(context.clone()), if features.secret_generator => {
            error!("CRITICAL: generator operator exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("generator operator exited unexpectedly without error")
        }
        result = run_replicator_operator(context.clone()), if features.secret_replicator => {
            error!("CRITICAL: replicator operator exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("replicator operator exited unexpectedly without error")
        }
    }
}

/// Run the generation/rotation operator
async fn run_generator_operator(context: Arc<Context>) -> Result<()> {
    info!("Starting Secret generator operator");

    let api = Api::<Secret>::all(context.client.clone());

    Controller::new(api, watcher::Config::default())
        .run(reconcile_generator_wrapper, error_policy, context)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Reconcile wrapper for the generator
async fn reconcile_generator_wrapper(
    secret: Arc<Secret>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = std::time::Instant::now();

    let result = Box::pin(reconcile_generated_secret(ctx.clone(), (*secret).clone())).await;
    let duration = start.elapsed();

    match result {
        Ok(requeue_after) => {
            metrics::record_reconciliation_success("generator", duration);
            match requeue_after {
                Some(delay) => {
                    debug!(
                        "Secret {} reconciled, next rotation due in {:?}",
                        secret.name_any(),
                        delay
                    );
                    Ok(Action::requeue(delay))
                }
                None => Ok(Action::await_change()),
            }
        }
        Err(e) => {
            error!("Failed to reconcile Secret {}: {}", secret.name_any(), e);
            metrics::record_reconciliation_error("generator", duration);
            metrics::record_error("generator", "api_error");
            Err(e.into())
        }
    }
}

/// Run the replication operator
///
/// Besides reconciling every Secret, this controller maps changes of any
/// replicatable source onto the Secrets that pull from it. Pull targets
/// cannot watch their source directly, so the mapper scans the reflector
/// store (the reverse index) and enqueues each dependent target.
async fn run_replicator_operator(context: Arc<Context>) -> Result<()> {
    info!("Starting Secret replicator operator");

    let api = Api::<Secret>::all(context.client.clone());
    let sources_api = Api::<Secret>::all(context.client.clone());
    let stores_for_watch = context.stores.clone();

    Controller::new(api, watcher::Config::default())
        .watches(sources_api, watcher::Config::default(), move |source| {
            let Some(namespace) = source.namespace() else {
                return Vec::new();
            };

            // Only Secrets that offer themselves for pulling fan out
            if !isotope::annotations::SecretAnnotations::new(&source)
                .has_replicatable_from_namespaces()
            {
                return Vec::new();
            }

            let name = source.name_any();
            stores_for_watch
                .pull_targets_of(&namespace, &name)
                .into_iter()
                .map(|(target_name, target_namespace)| {
                    ObjectRef::<Secret>::new(&target_name).within(&target_namespace)
                })
                .collect()
        })
        .run(reconcile_replicator_wrapper, error_policy, context)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Reconcile wrapper for the replicator
async fn reconcile_replicator_wrapper(
    secret: Arc<Secret>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = std::time::Instant::now();

    let result = Box::pin(reconcile_replication(ctx.clone(), (*secret).clone())).await;
    let duration = start.elapsed();

    match result {
        Ok(()) => {
            metrics::record_reconciliation_success("replicator", duration);
            Ok(Action::await_change())
        }
        Err(e) => {
            error!("Failed to reconcile Secret {}: {}", secret.name_any(), e);
            metrics::record_reconciliation_error("replicator", duration);
            metrics::record_error("replicator", "api_error");
            Err(e.into())
        }
    }
}

/// Requeue with a fixed delay on transient errors; the watch stream delivers
/// everything else.
#[allow(clippy::needless_pass_by_value)]
fn error_policy(secret: Arc<Secret>, error: &ReconcileError, _ctx: Arc<Context>) -> Action {
    warn!(
        "Reconciliation of Secret {} failed, requeueing: {}",
        secret.name_any(),
        error
    );
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}
