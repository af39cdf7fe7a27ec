// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deployment and teardown orchestration.

pub mod context;
pub mod deploy;
pub mod teardown;

use std::fmt;

pub use context::ProvisioningContext;
pub use deploy::DeployPipeline;
pub use teardown::TeardownPipeline;

/// Deployment stages, in the only order they can be entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    NamespaceCreated,
    StorageClaimCreated,
    SecretApplied,
    ConfigApplied,
    WorkloadApplied,
    ServiceApplied,
    ServiceReady,
    SecondaryNamespaceCreated,
    SecondaryResourcesApplied,
    SecondaryServiceReady,
    DnsReady,
    TokenIssued,
    SecretPublished,
    Done,
}

impl Stage {
    pub const ALL: [Stage; 14] = [
        Stage::NamespaceCreated,
        Stage::StorageClaimCreated,
        Stage::SecretApplied,
        Stage::ConfigApplied,
        Stage::WorkloadApplied,
        Stage::ServiceApplied,
        Stage::ServiceReady,
        Stage::SecondaryNamespaceCreated,
        Stage::SecondaryResourcesApplied,
        Stage::SecondaryServiceReady,
        Stage::DnsReady,
        Stage::TokenIssued,
        Stage::SecretPublished,
        Stage::Done,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::NamespaceCreated => "NamespaceCreated",
            Stage::StorageClaimCreated => "StorageClaimCreated",
            Stage::SecretApplied => "SecretApplied",
            Stage::ConfigApplied => "ConfigApplied",
            Stage::WorkloadApplied => "WorkloadApplied",
            Stage::ServiceApplied => "ServiceApplied",
            Stage::ServiceReady => "ServiceReady",
            Stage::SecondaryNamespaceCreated => "SecondaryNamespaceCreated",
            Stage::SecondaryResourcesApplied => "SecondaryResourcesApplied",
            Stage::SecondaryServiceReady => "SecondaryServiceReady",
            Stage::DnsReady => "DNSReady",
            Stage::TokenIssued => "TokenIssued",
            Stage::SecretPublished => "SecretPublished",
            Stage::Done => "Done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
