// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cleanup of pushed copies when their source is deleted.
//!
//! The cleanup finalizer keeps the source object alive until every copy
//! carrying its ownership marker is gone. Any list or delete failure leaves
//! the finalizer in place and surfaces the error so the runtime redelivers;
//! the finalizer is only released after a fully successful sweep.

use anyhow::Result;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{DeleteParams, ListParams};
use kube::{Api, ResourceExt};
use tracing::{debug, info};

use crate::annotations::SecretAnnotations;
use crate::constants::FINALIZER_REPLICATE_TO_CLEANUP;
use crate::context::Context;
use crate::metrics;
use crate::reconcilers::finalizers::remove_finalizer;

use super::secret_id;

/// Delete every pushed copy of a deleted source, then release the finalizer.
///
/// # Errors
///
/// Returns an error when listing Secrets or deleting a copy fails for any
/// reason other than the copy already being gone. The finalizer stays until
/// a later pass succeeds.
pub async fn handle_source_deletion(ctx: &Context, source: &Secret) -> Result<()> {
    let source_id = secret_id(source);
    let view = SecretAnnotations::new(source);

    info!("Secret {} is being deleted", source_id);

    if !view.has_replicate_to() {
        // Never pushed anything under this annotation; nothing to clean
        return remove_finalizer(&ctx.client, source, FINALIZER_REPLICATE_TO_CLEANUP).await;
    }

    let api: Api<Secret> = Api::all(ctx.client.clone());
    let copies = api.list(&ListParams::default()).await?;

    let mut pruned: u64 = 0;
    for copy in &copies.items {
        if SecretAnnotations::new(copy).replicated_from() != Some(source_id.as_str()) {
            continue;
        }
        let Some(namespace) = copy.namespace() else {
            continue;
        };
        let name = copy.name_any();

        let namespaced: Api<Secret> = Api::namespaced(ctx.client.clone(), &namespace);
        match namespaced.delete(&name, &DeleteParams::default()).await {
            Ok(_) => {
                info!("Deleted replicated copy {namespace}/{name} of {source_id}");
                pruned += 1;
            }
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!("Replicated copy {namespace}/{name} already gone");
            }
            Err(e) => return Err(e.into()),
        }
    }

    metrics::record_copies_pruned(pruned);
    info!(
        "Cleanup of {} removed {} copie(s); releasing finalizer",
        source_id, pruned
    );

    remove_finalizer(&ctx.client, source, FINALIZER_REPLICATE_TO_CLEANUP).await
}
