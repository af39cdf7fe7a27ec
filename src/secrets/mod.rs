// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Externally held secrets (cloud secret store).

pub mod aws;

use crate::error::Result;
use async_trait::async_trait;

pub use aws::AwsSecretStore;

/// A key/value secret store outside the cluster
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Create a new secret; an existing secret with the same name is an error
    async fn create_secret(&self, name: &str, value: &str, description: &str) -> Result<()>;

    /// Whether the secret exists and is not scheduled for deletion
    async fn secret_exists(&self, name: &str) -> Result<bool>;

    /// Delete the secret without a recovery window.
    /// Returns `false` when there was nothing to delete.
    async fn delete_secret(&self, name: &str) -> Result<bool>;
}
