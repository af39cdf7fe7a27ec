// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Sequential provisioning of the database and SonarQube stacks.

use crate::config::Config;
use crate::constants::{names, poll, sonar as sonar_constants};
use crate::error::Result;
use crate::kubernetes::{create_namespace, TypeCatalog};
use crate::manifest::{decode_all, read_manifest, submit, ApplyMode, ResourceApplier};
use crate::pipeline::{ProvisioningContext, Stage};
use crate::resources::{
    database_claim, database_init_config, jdbc_url, sonar_database_secret, PublishedCredentials,
};
use crate::secrets::SecretStore;
use crate::sonar::{host_url, TokenIssuer};
use crate::wait::Poller;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Secret, Service};
use kube::{Api, Client};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Drives a deployment through [`Stage::ALL`], one stage at a time.
///
/// A failing stage aborts the run. Resources created by earlier stages stay in
/// place; cleanup is the job of the teardown pipeline.
pub struct DeployPipeline {
    client: Client,
    config: Config,
    applier: ResourceApplier,
    poller: Poller,
    secret_store: Arc<dyn SecretStore>,
    token_issuer: Arc<dyn TokenIssuer>,
    context: ProvisioningContext,
}

impl DeployPipeline {
    pub fn new(
        client: Client,
        catalog: Arc<TypeCatalog>,
        config: Config,
        mode: ApplyMode,
        secret_store: Arc<dyn SecretStore>,
        token_issuer: Arc<dyn TokenIssuer>,
    ) -> Self {
        let poller = Poller::new(config.poll_interval());
        Self {
            applier: ResourceApplier::new(client.clone(), catalog, mode),
            client,
            config,
            poller,
            secret_store,
            token_issuer,
            context: ProvisioningContext::default(),
        }
    }

    pub fn with_poller(mut self, poller: Poller) -> Self {
        self.poller = poller;
        self
    }

    pub fn context(&self) -> &ProvisioningContext {
        &self.context
    }

    /// Run every remaining stage up to and including [`Stage::Done`]
    pub async fn run(&mut self) -> Result<&ProvisioningContext> {
        self.run_through(Stage::Done).await
    }

    /// Run the remaining stages up to and including `last`.
    ///
    /// Stages completed by an earlier call are not entered again.
    pub async fn run_through(&mut self, last: Stage) -> Result<&ProvisioningContext> {
        if self.context.has_completed(last) {
            return Ok(&self.context);
        }

        let start = self.context.completed().len();
        for stage in Stage::ALL.into_iter().skip(start) {
            info!("Entering stage {}", stage);
            if let Err(e) = self.enter(stage).await {
                error!("Stage {} failed: {}", stage, e);
                return Err(e);
            }
            self.context.mark_completed(stage);

            if stage == last {
                break;
            }
        }

        Ok(&self.context)
    }

    #[instrument(skip_all, fields(stage = %stage))]
    async fn enter(&mut self, stage: Stage) -> Result<()> {
        let d = &self.config.deploy;
        let mode = self.applier.mode();

        match stage {
            Stage::NamespaceCreated => {
                create_namespace(&self.client, &d.database_namespace, mode).await?;
            }
            Stage::StorageClaimCreated => {
                let claims: Api<PersistentVolumeClaim> =
                    Api::namespaced(self.client.clone(), &d.database_namespace);
                submit(&claims, &database_claim(d), mode).await?;
                info!("PersistentVolumeClaim {} created successfully", names::DATABASE_CLAIM);
            }
            Stage::SecretApplied => {
                self.applier
                    .apply_file(&d.database_secret_manifest, &d.database_namespace)
                    .await?;
            }
            Stage::ConfigApplied => {
                let config_maps: Api<ConfigMap> =
                    Api::namespaced(self.client.clone(), &d.database_namespace);
                submit(&config_maps, &database_init_config(d), mode).await?;
                info!("ConfigMap {} created successfully", names::DATABASE_INIT_CONFIG);

                self.applier
                    .apply_file(&d.database_config_manifest, &d.database_namespace)
                    .await?;
            }
            Stage::WorkloadApplied => {
                self.applier
                    .apply_file(&d.database_manifest, &d.database_namespace)
                    .await?;
            }
            Stage::ServiceApplied => match &d.database_service_manifest {
                Some(manifest) => {
                    self.applier
                        .apply_file(manifest, &d.database_namespace)
                        .await?;
                }
                None => info!(
                    "Service {} is created by {}",
                    d.database_service,
                    d.database_manifest.display()
                ),
            },
            Stage::ServiceReady => {
                let services: Api<Service> =
                    Api::namespaced(self.client.clone(), &d.database_namespace);
                let endpoints = self
                    .poller
                    .wait_for_service_ready(&services, &d.database_service)
                    .await?;
                let url = jdbc_url(&d.database_service, &d.database_namespace);
                info!(
                    "PostgreSQL database deployed, external address {}, JDBC URL {}",
                    endpoints.external, url
                );
                self.context.record_database(endpoints, url);
            }
            Stage::SecondaryNamespaceCreated => {
                create_namespace(&self.client, &d.sonar_namespace, mode).await?;
            }
            Stage::SecondaryResourcesApplied => {
                self.applier
                    .apply_file(&d.sonar_claims_manifest, &d.sonar_namespace)
                    .await?;

                let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &d.sonar_namespace);
                let secret = sonar_database_secret(d, self.context.require_jdbc_url()?);
                submit(&secrets, &secret, mode).await?;
                info!("Secret {} created successfully", names::SONAR_SECRET);

                self.apply_sonar_workload().await?;

                self.applier
                    .apply_file(&d.sonar_service_manifest, &d.sonar_namespace)
                    .await?;
            }
            Stage::SecondaryServiceReady => {
                let services: Api<Service> =
                    Api::namespaced(self.client.clone(), &d.sonar_namespace);
                let endpoints = self
                    .poller
                    .wait_for_service_ready(&services, &d.sonar_service)
                    .await?;
                let url = host_url(&d.sonar_transport, &endpoints.external, &d.sonar_port)?;
                info!("SonarQube deployed at {}", url);
                self.context.record_sonar(endpoints, url);
            }
            Stage::DnsReady => {
                let host = &self.context.require_database()?.external;
                self.poller
                    .with_interval(Duration::from_secs(poll::DNS_INTERVAL_SECS))
                    .wait_for_dns(host)
                    .await?;
            }
            Stage::TokenIssued => {
                let token = self
                    .token_issuer
                    .issue_token(self.context.require_sonar_host_url()?)
                    .await?;
                info!("SonarQube analysis token issued");
                self.context.record_token(token);
            }
            Stage::SecretPublished => {
                let name = self.config.auth.secret_name();
                let credentials = PublishedCredentials {
                    jdbc_username: &d.sonar_db_user,
                    jdbc_password: &d.sonar_db_password,
                    jdbc_url: self.context.require_jdbc_url()?,
                    host_url: self.context.require_sonar_host_url()?,
                    token: self.context.require_sonar_token()?,
                };
                let value = serde_json::to_string(&credentials)?;

                self.secret_store
                    .create_secret(&name, &value, sonar_constants::SECRET_DESCRIPTION)
                    .await?;
                info!("Secret {} published to the secret store", name);
            }
            Stage::Done => {
                info!(
                    "Deployment complete: SonarQube at {}, database in namespace {}",
                    self.context.sonar_host_url().unwrap_or_default(),
                    d.database_namespace
                );
            }
        }

        Ok(())
    }

    /// Apply the SonarQube workload with its container image taken from configuration
    async fn apply_sonar_workload(&self) -> Result<()> {
        let d = &self.config.deploy;
        let payload = read_manifest(&d.sonar_manifest).await?;
        let mut documents = decode_all(&payload)?;

        let mut overridden = 0;
        for doc in &mut documents {
            if doc.set_container_image(names::SONAR_CONTAINER, &d.sonar_image) {
                overridden += 1;
            }
        }
        if overridden == 0 {
            warn!(
                "No container named {} in {}, image left unchanged",
                names::SONAR_CONTAINER,
                d.sonar_manifest.display()
            );
        }

        info!("Applying manifest {}", d.sonar_manifest.display());
        self.applier
            .apply_documents(documents, &d.sonar_namespace)
            .await?;
        Ok(())
    }
}
