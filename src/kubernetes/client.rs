// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Control-plane client creation

use crate::error::{Result, SonarStackError};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config as KConfig};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Create a Kubernetes client.
///
/// With an explicit kubeconfig path or context the client is built from that
/// kubeconfig, otherwise the configuration is inferred (in-cluster service
/// account first, then `~/.kube/config`).
#[instrument]
pub async fn create_client(kubeconfig: Option<&Path>, context: Option<&str>) -> Result<Client> {
    let options = KubeConfigOptions {
        context: context.map(str::to_string),
        ..Default::default()
    };

    let config = match kubeconfig {
        Some(path) => {
            debug!("Reading kubeconfig from {}", path.display());
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                SonarStackError::ConfigError(format!(
                    "Failed to read kubeconfig {}: {}",
                    path.display(),
                    e
                ))
            })?;
            KConfig::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .map_err(|e| {
                    SonarStackError::ConfigError(format!("Failed to create config: {}", e))
                })?
        }
        None if context.is_some() => KConfig::from_kubeconfig(&options).await.map_err(|e| {
            SonarStackError::ConfigError(format!("Failed to load kubeconfig context: {}", e))
        })?,
        None => KConfig::infer().await.map_err(|e| {
            SonarStackError::ConfigError(format!("Failed to infer config: {}", e))
        })?,
    };

    info!("Using Kubernetes API server {}", config.cluster_url);

    Client::try_from(config)
        .map_err(|e| SonarStackError::ConfigError(format!("Failed to create client: {}", e)))
}
