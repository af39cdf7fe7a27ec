// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SonarStackError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to discover cluster resource types: {0}")]
    DiscoveryError(String),

    #[error("Unknown resource type {kind} ({api_version}) in discovery snapshot")]
    UnknownType { api_version: String, kind: String },

    #[error("Failed to decode manifest: {0}")]
    DecodeError(String),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Failed to apply {kind} {name}: {source}")]
    ApplyError {
        kind: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("Control plane unreachable while {0}")]
    TransportError(String),

    #[error("Timed out waiting for {0}")]
    WaitTimedOut(String),

    #[error("Token issuance failed: {0}")]
    TokenError(String),

    #[error("Secret store error: {0}")]
    SecretStoreError(String),

    #[error("Missing provisioning value: {0}")]
    MissingContext(&'static str),

    #[error("I/O error on {path}: {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl SonarStackError {
    /// True when the error is a Kubernetes 404 (resource does not exist).
    pub fn is_not_found(&self) -> bool {
        match self {
            SonarStackError::KubeError(kube::Error::Api(err))
            | SonarStackError::ApplyError {
                source: kube::Error::Api(err),
                ..
            } => err.code == 404,
            _ => false,
        }
    }

    /// True when a create was rejected because the object already exists.
    pub fn is_already_exists(&self) -> bool {
        match self {
            SonarStackError::KubeError(kube::Error::Api(err))
            | SonarStackError::ApplyError {
                source: kube::Error::Api(err),
                ..
            } => err.code == 409 && err.reason == "AlreadyExists",
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SonarStackError>;
