// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sonarstack::config::Config;
use sonarstack::constants::poll;
use sonarstack::kubernetes::{create_client, TypeCatalog};
use sonarstack::manifest::ApplyMode;
use sonarstack::pipeline::{DeployPipeline, TeardownPipeline};
use sonarstack::secrets::AwsSecretStore;
use sonarstack::sonar::SonarTokenClient;
use sonarstack::wait::Poller;

/// Provision a PostgreSQL-backed SonarQube stack on Kubernetes
#[derive(Parser, Debug)]
#[command(name = "sonarstack", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Deployment configuration
    #[arg(long, global = true, default_value = "config.json")]
    config: PathBuf,

    /// Cloud identity configuration
    #[arg(long, global = true, default_value = "../config_crd.json")]
    auth_config: PathBuf,

    /// Kubeconfig file; inferred from the environment when absent
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    context: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database and SonarQube stacks
    Deploy {
        /// Use server-side apply, so existing objects are updated instead of rejected
        #[arg(long)]
        upsert: bool,

        /// Give up on any single readiness wait after this many seconds
        #[arg(long)]
        wait_timeout_secs: Option<u64>,
    },
    /// Delete both stacks and the published secret
    Destroy {
        #[arg(long)]
        wait_timeout_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config, &cli.auth_config).with_context(|| {
        format!(
            "Failed to load configuration from {} and {}",
            cli.config.display(),
            cli.auth_config.display()
        )
    })?;
    info!(
        "Configuration loaded: cluster={}, database namespace={}, SonarQube namespace={}",
        config.deploy.cluster_name, config.deploy.database_namespace, config.deploy.sonar_namespace
    );

    let client = create_client(cli.kubeconfig.as_deref(), cli.context.as_deref()).await?;
    info!("Connected to Kubernetes cluster");

    let secret_store = Arc::new(AwsSecretStore::new(&config.auth).await);

    match cli.command {
        Command::Deploy {
            upsert,
            wait_timeout_secs,
        } => {
            let catalog = Arc::new(TypeCatalog::discover(&client).await?);

            let mode = if upsert {
                ApplyMode::Upsert
            } else {
                ApplyMode::Create
            };
            let poller = Poller::new(config.poll_interval())
                .with_deadline(wait_timeout_secs.map(Duration::from_secs));

            let mut pipeline = DeployPipeline::new(
                client,
                catalog,
                config,
                mode,
                secret_store,
                Arc::new(SonarTokenClient::new()),
            )
            .with_poller(poller);

            let ctx = pipeline.run().await?;
            if let Some(url) = ctx.sonar_host_url() {
                info!("SonarQube is available at {}", url);
            }
        }
        Command::Destroy { wait_timeout_secs } => {
            let poller = Poller::new(Duration::from_secs(poll::ABSENCE_INTERVAL_SECS))
                .with_deadline(wait_timeout_secs.map(Duration::from_secs));

            TeardownPipeline::new(client, config, secret_store)
                .with_poller(poller)
                .run()
                .await?;
        }
    }

    Ok(())
}
