// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Values produced by earlier stages and consumed by later ones.

use crate::error::{Result, SonarStackError};
use crate::pipeline::Stage;
use crate::wait::ServiceEndpoints;
use tracing::warn;

/// Accumulated results of a deployment run.
///
/// Each value is recorded once; nothing is ever rolled back.
#[derive(Debug, Clone, Default)]
pub struct ProvisioningContext {
    completed: Vec<Stage>,
    database: Option<ServiceEndpoints>,
    jdbc_url: Option<String>,
    sonar: Option<ServiceEndpoints>,
    sonar_host_url: Option<String>,
    sonar_token: Option<String>,
}

fn record<T>(slot: &mut Option<T>, value: T, what: &str) {
    if slot.is_some() {
        warn!("{} already recorded, keeping the first value", what);
        return;
    }
    *slot = Some(value);
}

impl ProvisioningContext {
    pub fn completed(&self) -> &[Stage] {
        &self.completed
    }

    pub fn has_completed(&self, stage: Stage) -> bool {
        self.completed.contains(&stage)
    }

    /// Last stage that exited normally
    pub fn current_stage(&self) -> Option<Stage> {
        self.completed.last().copied()
    }

    pub(crate) fn mark_completed(&mut self, stage: Stage) {
        self.completed.push(stage);
    }

    pub(crate) fn record_database(&mut self, endpoints: ServiceEndpoints, jdbc_url: String) {
        record(&mut self.database, endpoints, "database endpoints");
        record(&mut self.jdbc_url, jdbc_url, "JDBC URL");
    }

    pub(crate) fn record_sonar(&mut self, endpoints: ServiceEndpoints, host_url: String) {
        record(&mut self.sonar, endpoints, "SonarQube endpoints");
        record(&mut self.sonar_host_url, host_url, "SonarQube host URL");
    }

    pub(crate) fn record_token(&mut self, token: String) {
        record(&mut self.sonar_token, token, "SonarQube token");
    }

    pub fn database(&self) -> Option<&ServiceEndpoints> {
        self.database.as_ref()
    }

    pub fn jdbc_url(&self) -> Option<&str> {
        self.jdbc_url.as_deref()
    }

    pub fn sonar(&self) -> Option<&ServiceEndpoints> {
        self.sonar.as_ref()
    }

    pub fn sonar_host_url(&self) -> Option<&str> {
        self.sonar_host_url.as_deref()
    }

    pub fn sonar_token(&self) -> Option<&str> {
        self.sonar_token.as_deref()
    }

    pub(crate) fn require_database(&self) -> Result<&ServiceEndpoints> {
        self.database()
            .ok_or(SonarStackError::MissingContext("database endpoints"))
    }

    pub(crate) fn require_jdbc_url(&self) -> Result<&str> {
        self.jdbc_url().ok_or(SonarStackError::MissingContext("JDBC URL"))
    }

    pub(crate) fn require_sonar_host_url(&self) -> Result<&str> {
        self.sonar_host_url()
            .ok_or(SonarStackError::MissingContext("SonarQube host URL"))
    }

    pub(crate) fn require_sonar_token(&self) -> Result<&str> {
        self.sonar_token()
            .ok_or(SonarStackError::MissingContext("SonarQube token"))
    }
}
