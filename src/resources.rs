// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Fixed objects built from configuration by the deployment pipeline

use crate::config::DeployConfig;
use crate::constants::{database, names};
use k8s_openapi::api::core::v1::{
    ConfigMap, PersistentVolumeClaim, PersistentVolumeClaimSpec, Secret, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

/// In-cluster JDBC URL of the PostgreSQL service
pub fn jdbc_url(service: &str, namespace: &str) -> String {
    format!(
        "jdbc:postgresql://{}.{}.svc.cluster.local:{}/{}?currentSchema=public",
        service,
        namespace,
        database::PORT,
        database::NAME
    )
}

/// Claim for the PostgreSQL data directory
pub fn database_claim(config: &DeployConfig) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(names::DATABASE_CLAIM.to_string()),
            namespace: Some(config.database_namespace.clone()),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            storage_class_name: Some(config.storage_class.clone()).filter(|s| !s.is_empty()),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(config.database_storage_size.clone()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Shell script run by the PostgreSQL image on first start
pub fn init_script(user: &str, password: &str) -> String {
    format!(
        r#"psql -v ON_ERROR_STOP=1 --username "postgres" --dbname "postgres" <<-'EOSQL'
CREATE ROLE {user} WITH LOGIN PASSWORD '{password}';
CREATE DATABASE {db} WITH ENCODING 'UTF8' OWNER {user} TEMPLATE=template0;
GRANT ALL PRIVILEGES ON DATABASE {db} TO {user};
EOSQL
"#,
        user = user,
        password = password.replace('\'', "''"),
        db = database::NAME
    )
}

/// ConfigMap mounted into the database's init directory
pub fn database_init_config(config: &DeployConfig) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(names::DATABASE_INIT_CONFIG.to_string()),
            namespace: Some(config.database_namespace.clone()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            names::DATABASE_INIT_SCRIPT.to_string(),
            init_script(&config.sonar_db_user, &config.sonar_db_password),
        )])),
        ..Default::default()
    }
}

/// Secret giving SonarQube its database connection
pub fn sonar_database_secret(config: &DeployConfig, jdbc_url: &str) -> Secret {
    let data = [
        ("SONAR_JDBC_USERNAME", config.sonar_db_user.as_str()),
        ("SONAR_JDBC_PASSWORD", config.sonar_db_password.as_str()),
        ("SONAR_JDBC_URL", jdbc_url),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
    .collect();

    Secret {
        metadata: ObjectMeta {
            name: Some(names::SONAR_SECRET.to_string()),
            namespace: Some(config.sonar_namespace.clone()),
            ..Default::default()
        },
        data: Some(data),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

/// Connection details published to the cloud secret store
#[derive(Debug, Clone, serde::Serialize)]
pub struct PublishedCredentials<'a> {
    #[serde(rename = "SONAR_JDBC_USERNAME")]
    pub jdbc_username: &'a str,
    #[serde(rename = "SONAR_JDBC_PASSWORD")]
    pub jdbc_password: &'a str,
    #[serde(rename = "SONAR_JDBC_URL")]
    pub jdbc_url: &'a str,
    #[serde(rename = "SONAR_HOST_URL")]
    pub host_url: &'a str,
    #[serde(rename = "SONAR_TOKEN")]
    pub token: &'a str,
}
