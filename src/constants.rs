// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// The field manager name used for server-side apply in upsert mode
pub const FIELD_MANAGER: &str = "sonarstack";

/// Fixed object names created by the deployment pipeline
pub mod names {
    /// Persistent volume claim backing the PostgreSQL data directory
    pub const DATABASE_CLAIM: &str = "pgsql-data";
    /// ConfigMap holding the database bootstrap script
    pub const DATABASE_INIT_CONFIG: &str = "pgsql-init";
    /// Key of the bootstrap script inside the init ConfigMap
    pub const DATABASE_INIT_SCRIPT: &str = "init.sh";
    /// Secret carrying the JDBC credentials for SonarQube
    pub const SONAR_SECRET: &str = "sonarsecret";
    /// Container in the SonarQube workload whose image is overridden
    pub const SONAR_CONTAINER: &str = "sonarqube";
}

/// Database connection parameters
pub mod database {
    pub const NAME: &str = "sonarqube";
    pub const PORT: u16 = 5432;
}

/// SonarQube bootstrap parameters
pub mod sonar {
    /// Default administrator credentials of a fresh SonarQube install.
    /// Only used once to mint the analysis token.
    pub const BOOTSTRAP_USER: &str = "admin";
    pub const BOOTSTRAP_PASSWORD: &str = "admin";
    pub const TOKEN_ENDPOINT: &str = "/api/user_tokens/generate";
    pub const TOKEN_NAME: &str = "awsanalyse";
    pub const TOKEN_TYPE: &str = "GLOBAL_ANALYSIS_TOKEN";
    pub const SECRET_DESCRIPTION: &str = "SonarQube database connection";
}

/// Polling configuration
pub mod poll {
    /// Default interval between service readiness checks
    pub const SERVICE_INTERVAL_SECS: u64 = 5;
    /// Interval between namespace / secret absence checks during teardown
    pub const ABSENCE_INTERVAL_SECS: u64 = 2;
    /// Interval between DNS resolution attempts
    pub const DNS_INTERVAL_SECS: u64 = 3;
}
