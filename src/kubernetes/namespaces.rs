// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace management utilities

use crate::error::{Result, SonarStackError};
use crate::manifest::{submit, ApplyMode};
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::{DeleteParams, ObjectMeta},
    Api, Client,
};
use tracing::{info, instrument};

/// Create a namespace. In create mode an existing namespace is an error.
#[instrument(skip(client))]
pub async fn create_namespace(client: &Client, namespace: &str, mode: ApplyMode) -> Result<()> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let ns = Namespace {
        metadata: ObjectMeta {
            name: Some(namespace.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    submit(&namespaces, &ns, mode).await?;
    info!("Namespace {} created successfully", namespace);
    Ok(())
}

/// Request deletion of a namespace; returns `false` when it was already gone.
#[instrument(skip(client))]
pub async fn delete_namespace(client: &Client, namespace: &str) -> Result<bool> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    match namespaces.delete(namespace, &DeleteParams::default()).await {
        Ok(_) => {
            info!("Deletion of namespace {} requested", namespace);
            Ok(true)
        }
        Err(kube::Error::Api(err)) if err.code == 404 => {
            info!("Namespace {} does not exist", namespace);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Check whether a namespace still exists (terminating counts as existing).
/// Failing to reach the API server is a `TransportError`.
pub async fn namespace_exists(client: &Client, namespace: &str) -> Result<bool> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    match namespaces.get_opt(namespace).await {
        Ok(ns) => Ok(ns.is_some()),
        Err(e @ kube::Error::Api(_)) => Err(e.into()),
        Err(e) => Err(SonarStackError::TransportError(format!(
            "checking namespace {}: {}",
            namespace, e
        ))),
    }
}
