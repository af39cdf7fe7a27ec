// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! SonarQube analysis token issuance

use crate::constants::sonar;
use crate::error::{Result, SonarStackError};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument};
use url::Url;

/// Response of the `user_tokens/generate` endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserToken {
    pub login: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub expiration_date: Option<String>,
    pub token: String,
    #[serde(rename = "type", default)]
    pub token_type: Option<String>,
}

/// Mints an access token on a deployed SonarQube instance
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue_token(&self, host_url: &str) -> Result<String>;
}

/// Build the externally reachable base URL of the SonarQube service
pub fn host_url(transport: &str, address: &str, port: &str) -> Result<String> {
    let raw = format!("{}{}:{}", transport, address, port);
    Url::parse(&raw).map_err(|e| {
        SonarStackError::ConfigError(format!("Invalid SonarQube URL {}: {}", raw, e))
    })?;
    Ok(raw)
}

/// URL of the token generation endpoint, including the token name and type
pub fn token_url(host_url: &str) -> Result<Url> {
    let mut url = Url::parse(host_url)
        .and_then(|base| base.join(sonar::TOKEN_ENDPOINT))
        .map_err(|e| SonarStackError::TokenError(format!("Invalid URL {}: {}", host_url, e)))?;

    url.query_pairs_mut()
        .append_pair("name", sonar::TOKEN_NAME)
        .append_pair("type", sonar::TOKEN_TYPE);
    Ok(url)
}

/// Token issuer talking to the SonarQube web API with the bootstrap admin account.
///
/// The fixed default credentials only work on a freshly installed instance.
pub struct SonarTokenClient {
    http: reqwest::Client,
    user: String,
    password: String,
}

impl SonarTokenClient {
    pub fn new() -> Self {
        Self::with_credentials(sonar::BOOTSTRAP_USER, sonar::BOOTSTRAP_PASSWORD)
    }

    pub fn with_credentials(user: &str, password: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            user: user.to_string(),
            password: password.to_string(),
        }
    }
}

impl Default for SonarTokenClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenIssuer for SonarTokenClient {
    #[instrument(skip(self))]
    async fn issue_token(&self, host_url: &str) -> Result<String> {
        let url = token_url(host_url)?;

        let response = self
            .http
            .post(url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| SonarStackError::TokenError(format!("Error sending request: {}", e)))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(SonarStackError::TokenError(format!(
                "Request failed with status code: {}",
                status.as_u16()
            )));
        }

        let token: UserToken = response.json().await.map_err(|e| {
            SonarStackError::TokenError(format!("Error decoding JSON response: {}", e))
        })?;

        info!("Token {} created for {}", token.name, token.login);
        Ok(token.token)
    }
}
