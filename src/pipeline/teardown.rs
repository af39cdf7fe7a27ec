// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Removal of everything the deployment pipeline created.

use crate::config::Config;
use crate::constants::poll;
use crate::error::Result;
use crate::kubernetes::{delete_namespace, namespace_exists};
use crate::secrets::SecretStore;
use crate::wait::Poller;
use kube::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Deletes both namespaces and the published secret, waiting for each to disappear
/// before moving on. Anything already gone counts as deleted.
pub struct TeardownPipeline {
    client: Client,
    config: Config,
    poller: Poller,
    secret_store: Arc<dyn SecretStore>,
}

impl TeardownPipeline {
    pub fn new(client: Client, config: Config, secret_store: Arc<dyn SecretStore>) -> Self {
        Self {
            client,
            config,
            poller: Poller::new(Duration::from_secs(poll::ABSENCE_INTERVAL_SECS)),
            secret_store,
        }
    }

    pub fn with_poller(mut self, poller: Poller) -> Self {
        self.poller = poller;
        self
    }

    pub async fn run(&self) -> Result<()> {
        let d = &self.config.deploy;

        self.remove_namespace(&d.sonar_namespace).await?;
        self.remove_namespace(&d.database_namespace).await?;
        self.remove_secret(&self.config.auth.secret_name()).await?;

        info!("Teardown complete");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_namespace(&self, namespace: &str) -> Result<()> {
        if delete_namespace(&self.client, namespace).await? {
            let client = &self.client;
            self.poller
                .wait_for_absent(&format!("Namespace {}", namespace), || {
                    namespace_exists(client, namespace)
                })
                .await?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_secret(&self, name: &str) -> Result<()> {
        let store = self.secret_store.as_ref();
        if store.delete_secret(name).await? {
            self.poller
                .wait_for_absent(&format!("Secret {}", name), || store.secret_exists(name))
                .await?;
        }
        Ok(())
    }
}
