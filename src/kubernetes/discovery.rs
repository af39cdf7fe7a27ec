// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Point-in-time catalog of the resource types a cluster serves.

use crate::error::{Result, SonarStackError};
use kube::discovery::{ApiResource, Discovery, Scope};
use kube::Client;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TypeKey {
    group: String,
    version: String,
    kind: String,
}

impl TypeKey {
    fn new(group: &str, version: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
        }
    }
}

/// REST endpoint and scope of one discovered resource type
#[derive(Debug, Clone)]
pub struct ResourceType {
    pub api_resource: ApiResource,
    pub scope: Scope,
}

impl ResourceType {
    pub fn is_namespaced(&self) -> bool {
        self.scope == Scope::Namespaced
    }
}

/// Lookup table from `(group, version, kind)` to the endpoint serving it.
///
/// Built once per run and read-only afterwards. Types added to the cluster later
/// in the run are not visible; build a new catalog instead.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: HashMap<TypeKey, ResourceType>,
}

impl TypeCatalog {
    /// Run a full discovery against the cluster, covering every served version of every group.
    #[instrument(skip(client))]
    pub async fn discover(client: &Client) -> Result<Self> {
        let discovery = Discovery::new(client.clone())
            .run()
            .await
            .map_err(|e| SonarStackError::DiscoveryError(e.to_string()))?;

        let mut resources = vec![];
        for group in discovery.groups() {
            for version in group.versions() {
                for (ar, caps) in group.versioned_resources(version) {
                    debug!("Discovered {} ({}) as {}", ar.kind, ar.api_version, ar.plural);
                    resources.push((ar, caps.scope));
                }
            }
        }

        let catalog = Self::from_resources(resources);
        info!("Discovered {} resource types", catalog.len());
        Ok(catalog)
    }

    /// Build a catalog from an explicit list of resource types
    pub fn from_resources(resources: impl IntoIterator<Item = (ApiResource, Scope)>) -> Self {
        let types = resources
            .into_iter()
            .map(|(api_resource, scope)| {
                let key = TypeKey::new(&api_resource.group, &api_resource.version, &api_resource.kind);
                (key, ResourceType { api_resource, scope })
            })
            .collect();

        Self { types }
    }

    /// Resolve a document's `apiVersion` and `kind` to its endpoint
    pub fn resolve(&self, api_version: &str, kind: &str) -> Result<&ResourceType> {
        let (group, version) = split_api_version(api_version);
        self.types
            .get(&TypeKey::new(group, version, kind))
            .ok_or_else(|| SonarStackError::UnknownType {
                api_version: api_version.to_string(),
                kind: kind.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Split `group/version` into its parts; a bare version belongs to the core group.
pub fn split_api_version(api_version: &str) -> (&str, &str) {
    api_version.split_once('/').unwrap_or(("", api_version))
}
