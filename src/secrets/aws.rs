// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! AWS Secrets Manager backend

use crate::config::AuthConfig;
use crate::error::{Result, SonarStackError};
use crate::secrets::SecretStore;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::config::Region;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::operation::delete_secret::DeleteSecretError;
use aws_sdk_secretsmanager::Client;
use tracing::{debug, info, instrument};

/// A secret that is missing or already scheduled for deletion counts as gone.
/// DeleteSecret reports the latter as an invalid request.
fn already_gone(err: &DeleteSecretError) -> bool {
    match err {
        DeleteSecretError::ResourceNotFoundException(_) => true,
        DeleteSecretError::InvalidRequestException(e) => e
            .message()
            .is_some_and(|m| m.contains("marked for deletion")),
        _ => false,
    }
}

pub struct AwsSecretStore {
    client: Client,
}

impl AwsSecretStore {
    /// Build a client for the configured region and, when set, named profile
    pub async fn new(auth: &AuthConfig) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(auth.region.clone()));
        if let Some(profile) = auth.sso_profile.as_deref().filter(|p| !p.is_empty()) {
            debug!("Using AWS profile {}", profile);
            loader = loader.profile_name(profile);
        }

        let sdk_config = loader.load().await;
        Self {
            client: Client::new(&sdk_config),
        }
    }
}

#[async_trait]
impl SecretStore for AwsSecretStore {
    #[instrument(skip(self, value))]
    async fn create_secret(&self, name: &str, value: &str, description: &str) -> Result<()> {
        self.client
            .create_secret()
            .name(name)
            .secret_string(value)
            .description(description)
            .send()
            .await
            .map_err(|e| {
                SonarStackError::SecretStoreError(format!(
                    "Failed to create secret {}: {}",
                    name,
                    DisplayErrorContext(&e)
                ))
            })?;

        info!("AWS secret {} created successfully", name);
        Ok(())
    }

    async fn secret_exists(&self, name: &str) -> Result<bool> {
        match self.client.describe_secret().secret_id(name).send().await {
            Ok(output) => Ok(output.deleted_date().is_none()),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception()) =>
            {
                Ok(false)
            }
            Err(e) => Err(SonarStackError::SecretStoreError(format!(
                "Failed to describe secret {}: {}",
                name,
                DisplayErrorContext(&e)
            ))),
        }
    }

    #[instrument(skip(self))]
    async fn delete_secret(&self, name: &str) -> Result<bool> {
        let result = self
            .client
            .delete_secret()
            .secret_id(name)
            .force_delete_without_recovery(true)
            .send()
            .await;

        match result {
            Ok(_) => {
                info!("Deletion of AWS secret {} requested", name);
                Ok(true)
            }
            Err(e) if e.as_service_error().is_some_and(already_gone) => {
                info!("AWS secret {} does not exist or is already being deleted", name);
                Ok(false)
            }
            Err(e) => Err(SonarStackError::SecretStoreError(format!(
                "Failed to delete secret {}: {}",
                name,
                DisplayErrorContext(&e)
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_secretsmanager::types::error::{
        InvalidRequestException, ResourceNotFoundException,
    };

    #[test]
    fn test_missing_secret_is_gone() {
        let err = DeleteSecretError::ResourceNotFoundException(
            ResourceNotFoundException::builder()
                .message("Secrets Manager can't find the specified secret.")
                .build(),
        );

        assert!(already_gone(&err));
    }

    #[test]
    fn test_secret_scheduled_for_deletion_is_gone() {
        let err = DeleteSecretError::InvalidRequestException(
            InvalidRequestException::builder()
                .message("You can't perform this operation on the secret because it was marked for deletion.")
                .build(),
        );

        assert!(already_gone(&err));
    }

    #[test]
    fn test_other_invalid_request_is_an_error() {
        let err = DeleteSecretError::InvalidRequestException(
            InvalidRequestException::builder()
                .message("You can't use ForceDeleteWithoutRecovery in conjunction with RecoveryWindowInDays.")
                .build(),
        );

        assert!(!already_gone(&err));
    }
}
