// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Generic resource creation from decoded manifests

use crate::constants::FIELD_MANAGER;
use crate::error::{Result, SonarStackError};
use crate::kubernetes::TypeCatalog;
use crate::manifest::decode::{decode_all, RawDocument};
use kube::{
    api::{ApiResource, DynamicObject, Patch, PatchParams, PostParams},
    Api, Client, Resource,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// How objects are submitted to the cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApplyMode {
    /// Plain create; an object that already exists is an error
    #[default]
    Create,
    /// Server-side apply, creating or taking over the object
    Upsert,
}

/// Submit a typed object according to the apply mode
pub async fn submit<K>(api: &Api<K>, obj: &K, mode: ApplyMode) -> Result<K>
where
    K: Resource<DynamicType = ()> + Clone + Serialize + DeserializeOwned + Debug,
{
    submit_as(api, obj, &K::kind(&()), mode).await
}

async fn submit_as<K>(api: &Api<K>, obj: &K, kind: &str, mode: ApplyMode) -> Result<K>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Debug,
{
    let name = obj.meta().name.clone().unwrap_or_default();

    let result = match mode {
        ApplyMode::Create => api.create(&PostParams::default(), obj).await,
        ApplyMode::Upsert => {
            if name.is_empty() {
                return Err(SonarStackError::DecodeError(format!(
                    "{} without metadata.name cannot be upserted",
                    kind
                )));
            }
            let pp = PatchParams::apply(FIELD_MANAGER).force();
            api.patch(&name, &pp, &Patch::Apply(obj)).await
        }
    };

    result.map_err(|source| SonarStackError::ApplyError {
        kind: kind.to_string(),
        name,
        source,
    })
}

/// A document resolved against the type catalog, ready to be created
#[derive(Debug)]
struct PlannedObject {
    api_resource: ApiResource,
    namespace: Option<String>,
    object: DynamicObject,
}

/// Creates the resources described by manifests, in document order
#[derive(Clone)]
pub struct ResourceApplier {
    client: Client,
    catalog: Arc<TypeCatalog>,
    mode: ApplyMode,
}

impl ResourceApplier {
    pub fn new(client: Client, catalog: Arc<TypeCatalog>, mode: ApplyMode) -> Self {
        Self {
            client,
            catalog,
            mode,
        }
    }

    pub fn mode(&self) -> ApplyMode {
        self.mode
    }

    /// Read a manifest file fully and apply it
    pub async fn apply_file(&self, path: &Path, default_namespace: &str) -> Result<usize> {
        let payload = read_manifest(path).await?;
        info!("Applying manifest {}", path.display());
        self.apply(&payload, default_namespace).await
    }

    /// Apply every document of a payload. Returns the number of objects created.
    pub async fn apply(&self, payload: &[u8], default_namespace: &str) -> Result<usize> {
        let documents = decode_all(payload)?;
        self.apply_documents(documents, default_namespace).await
    }

    /// Apply already decoded documents.
    ///
    /// All documents are resolved before the first create: an unknown kind anywhere
    /// in the payload fails it without touching the cluster. Creates then run in
    /// document order and stop at the first failure.
    #[instrument(skip(self, documents), fields(documents = documents.len(), mode = ?self.mode))]
    pub async fn apply_documents(
        &self,
        documents: Vec<RawDocument>,
        default_namespace: &str,
    ) -> Result<usize> {
        let plan = documents
            .into_iter()
            .map(|doc| self.plan(doc, default_namespace))
            .collect::<Result<Vec<_>>>()?;

        for planned in &plan {
            self.submit_planned(planned).await?;
        }

        Ok(plan.len())
    }

    fn plan(&self, mut doc: RawDocument, default_namespace: &str) -> Result<PlannedObject> {
        let resource_type = self.catalog.resolve(doc.api_version(), doc.kind())?;

        let namespace = if resource_type.is_namespaced() {
            let meta = doc.metadata_mut();
            let ns = meta
                .namespace
                .clone()
                .filter(|ns| !ns.is_empty())
                .unwrap_or_else(|| default_namespace.to_string());
            meta.namespace = Some(ns.clone());
            Some(ns)
        } else {
            None
        };

        Ok(PlannedObject {
            api_resource: resource_type.api_resource.clone(),
            namespace,
            object: doc.into_dynamic(),
        })
    }

    async fn submit_planned(&self, planned: &PlannedObject) -> Result<DynamicObject> {
        let ar = &planned.api_resource;
        let api: Api<DynamicObject> = match &planned.namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, ar),
            None => Api::all_with(self.client.clone(), ar),
        };

        debug!(
            "Submitting {} {} in namespace {:?}",
            ar.kind,
            planned.object.metadata.name.as_deref().unwrap_or_default(),
            planned.namespace
        );

        let created = submit_as(&api, &planned.object, &ar.kind, self.mode).await?;
        info!(
            "{} {} created successfully",
            ar.kind,
            created.metadata.name.as_deref().unwrap_or_default()
        );
        Ok(created)
    }
}

/// Read a manifest file fully into memory
pub async fn read_manifest(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|source| SonarStackError::IoError {
            path: path.display().to_string(),
            source,
        })
}
