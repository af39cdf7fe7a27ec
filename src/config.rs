// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::poll;
use crate::error::{Result, SonarStackError};
use serde::{de::DeserializeOwned, Deserialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Deployment parameters for the database and SonarQube stacks (`config.json`)
#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    #[serde(rename = "ClusterName", default)]
    pub cluster_name: String,
    #[serde(rename = "NSDataBase")]
    pub database_namespace: String,
    #[serde(rename = "PvcDBsize")]
    pub database_storage_size: String,
    #[serde(rename = "PGSecret")]
    pub database_secret_manifest: PathBuf,
    #[serde(rename = "NSSonar")]
    pub sonar_namespace: String,
    #[serde(rename = "PvcSonar")]
    pub sonar_claims_manifest: PathBuf,
    #[serde(rename = "StorageClass")]
    pub storage_class: String,
    #[serde(rename = "Sonaruser")]
    pub sonar_db_user: String,
    #[serde(rename = "Sonarpass")]
    pub sonar_db_password: String,
    #[serde(rename = "PGsql")]
    pub database_manifest: PathBuf,
    #[serde(rename = "PGconf")]
    pub database_config_manifest: PathBuf,
    /// Separate database Service manifest; without it the Service ships inside `PGsql`
    #[serde(rename = "PGsvcManifest", default)]
    pub database_service_manifest: Option<PathBuf>,
    #[serde(rename = "DepSonar")]
    pub sonar_manifest: PathBuf,
    #[serde(rename = "SonarSvcManifest", default = "default_sonar_service_manifest")]
    pub sonar_service_manifest: PathBuf,
    #[serde(rename = "PGsvc")]
    pub database_service: String,
    #[serde(rename = "SonarSVC")]
    pub sonar_service: String,
    #[serde(rename = "SonarPort")]
    pub sonar_port: String,
    /// URL scheme prefix including `://`, e.g. `http://`
    #[serde(rename = "SonarTransport")]
    pub sonar_transport: String,
    #[serde(rename = "SonarTagImage")]
    pub sonar_image: String,
    #[serde(rename = "PollIntervalSecs", default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_sonar_service_manifest() -> PathBuf {
    PathBuf::from("dist/sonarsvc.yaml")
}

fn default_poll_interval() -> u64 {
    poll::SERVICE_INTERVAL_SECS
}

/// Cloud identity parameters shared by all stacks (`config_crd.json`)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Account", default)]
    pub account: String,
    #[serde(rename = "SSOProfile", default)]
    pub sso_profile: Option<String>,
    /// Suffix disambiguating parallel environments
    #[serde(rename = "Index", default)]
    pub index: String,
    #[serde(rename = "AWSsecret")]
    pub secret_prefix: String,
}

impl AuthConfig {
    /// Name of the cloud secret that receives the SonarQube credentials
    pub fn secret_name(&self) -> String {
        format!("{}{}", self.secret_prefix, self.index)
    }
}

/// Complete configuration, read once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub deploy: DeployConfig,
    pub auth: AuthConfig,
}

impl Config {
    /// Load and validate both configuration files
    pub fn load(deploy_path: &Path, auth_path: &Path) -> Result<Self> {
        let config = Config {
            deploy: read_json(deploy_path)?,
            auth: read_json(auth_path)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.deploy;
        for (key, value) in [
            ("NSDataBase", &d.database_namespace),
            ("NSSonar", &d.sonar_namespace),
            ("PGsvc", &d.database_service),
            ("SonarSVC", &d.sonar_service),
            ("PvcDBsize", &d.database_storage_size),
            ("Region", &self.auth.region),
        ] {
            if value.trim().is_empty() {
                return Err(SonarStackError::ConfigError(format!("{} must not be empty", key)));
            }
        }

        if d.database_namespace == d.sonar_namespace {
            return Err(SonarStackError::ConfigError(
                "NSDataBase and NSSonar must be different namespaces".to_string(),
            ));
        }

        if !d.sonar_transport.ends_with("://") {
            return Err(SonarStackError::ConfigError(format!(
                "SonarTransport must be a scheme prefix like 'http://', got '{}'",
                d.sonar_transport
            )));
        }

        if d.poll_interval_secs == 0 {
            return Err(SonarStackError::ConfigError(
                "PollIntervalSecs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.deploy.poll_interval_secs)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read(path).map_err(|e| {
        SonarStackError::ConfigError(format!(
            "Problem with the configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    serde_json::from_slice(&content).map_err(|e| {
        SonarStackError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
    })
}
