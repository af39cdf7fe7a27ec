// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Multi-document manifest decoding

use crate::error::{Result, SonarStackError};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{
    ConfigMap, Namespace, PersistentVolumeClaim, PodSpec, Secret, Service,
};
use kube::api::{DynamicObject, ObjectMeta, TypeMeta};
use serde::{de::DeserializeOwned, Deserialize};

/// A document of a kind the pipeline knows.
///
/// `object` is a read-only typed view for inspection. The body submitted to the
/// cluster is the document as written, so fields unknown to the typed model survive.
#[derive(Debug, Clone)]
pub struct Typed<K> {
    pub object: K,
    body: DynamicObject,
}

impl<K: DeserializeOwned> Typed<K> {
    fn from_value(value: serde_yaml::Value, body: DynamicObject) -> serde_yaml::Result<Self> {
        Ok(Self {
            object: serde_yaml::from_value(value)?,
            body,
        })
    }
}

impl<K> Typed<K> {
    pub fn body(&self) -> &DynamicObject {
        &self.body
    }
}

/// One decoded manifest document.
///
/// Kinds the pipeline inspects also carry their typed form; anything else is
/// kept as an untyped object only.
#[derive(Debug, Clone)]
pub enum RawDocument {
    Namespace(Typed<Namespace>),
    PersistentVolumeClaim(Typed<PersistentVolumeClaim>),
    ConfigMap(Typed<ConfigMap>),
    Secret(Typed<Secret>),
    Service(Typed<Service>),
    Deployment(Typed<Deployment>),
    StatefulSet(Typed<StatefulSet>),
    Opaque(DynamicObject),
}

macro_rules! each_variant {
    ($doc:expr, $typed:ident => $on_typed:expr, $opaque:ident => $on_opaque:expr) => {
        match $doc {
            RawDocument::Namespace($typed) => $on_typed,
            RawDocument::PersistentVolumeClaim($typed) => $on_typed,
            RawDocument::ConfigMap($typed) => $on_typed,
            RawDocument::Secret($typed) => $on_typed,
            RawDocument::Service($typed) => $on_typed,
            RawDocument::Deployment($typed) => $on_typed,
            RawDocument::StatefulSet($typed) => $on_typed,
            RawDocument::Opaque($opaque) => $on_opaque,
        }
    };
}

fn static_type<K: k8s_openapi::Resource>(_: &K) -> (&'static str, &'static str) {
    (K::API_VERSION, K::KIND)
}

impl RawDocument {
    fn from_value(index: usize, value: serde_yaml::Value) -> Result<Self> {
        let types: TypeMeta = serde_yaml::from_value(value.clone()).map_err(|e| {
            SonarStackError::DecodeError(format!(
                "document {} has no apiVersion/kind: {}",
                index, e
            ))
        })?;

        let invalid = |e: serde_yaml::Error| {
            SonarStackError::DecodeError(format!(
                "document {} ({} {}): {}",
                index, types.api_version, types.kind, e
            ))
        };

        let body: DynamicObject = serde_yaml::from_value(value.clone()).map_err(invalid)?;

        let doc = match (types.api_version.as_str(), types.kind.as_str()) {
            ("v1", "Namespace") => {
                RawDocument::Namespace(Typed::from_value(value, body).map_err(invalid)?)
            }
            ("v1", "PersistentVolumeClaim") => {
                RawDocument::PersistentVolumeClaim(Typed::from_value(value, body).map_err(invalid)?)
            }
            ("v1", "ConfigMap") => {
                RawDocument::ConfigMap(Typed::from_value(value, body).map_err(invalid)?)
            }
            ("v1", "Secret") => RawDocument::Secret(Typed::from_value(value, body).map_err(invalid)?),
            ("v1", "Service") => {
                RawDocument::Service(Typed::from_value(value, body).map_err(invalid)?)
            }
            ("apps/v1", "Deployment") => {
                RawDocument::Deployment(Typed::from_value(value, body).map_err(invalid)?)
            }
            ("apps/v1", "StatefulSet") => {
                RawDocument::StatefulSet(Typed::from_value(value, body).map_err(invalid)?)
            }
            _ => RawDocument::Opaque(body),
        };

        Ok(doc)
    }

    pub fn api_version(&self) -> &str {
        self.type_meta().0
    }

    pub fn kind(&self) -> &str {
        self.type_meta().1
    }

    fn type_meta(&self) -> (&str, &str) {
        match self {
            RawDocument::Opaque(obj) => obj
                .types
                .as_ref()
                .map(|t| (t.api_version.as_str(), t.kind.as_str()))
                .unwrap_or(("", "")),
            RawDocument::Namespace(t) => static_type(&t.object),
            RawDocument::PersistentVolumeClaim(t) => static_type(&t.object),
            RawDocument::ConfigMap(t) => static_type(&t.object),
            RawDocument::Secret(t) => static_type(&t.object),
            RawDocument::Service(t) => static_type(&t.object),
            RawDocument::Deployment(t) => static_type(&t.object),
            RawDocument::StatefulSet(t) => static_type(&t.object),
        }
    }

    /// The untyped document that is submitted to the cluster
    pub fn body(&self) -> &DynamicObject {
        each_variant!(self, t => &t.body, obj => obj)
    }

    fn body_mut(&mut self) -> &mut DynamicObject {
        each_variant!(self, t => &mut t.body, obj => obj)
    }

    pub fn metadata(&self) -> &ObjectMeta {
        &self.body().metadata
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.body_mut().metadata
    }

    /// Object name, or an empty string for unnamed documents
    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    /// Point the named container of a workload at a new image, in both the typed
    /// view and the submitted body.
    /// Returns `false` when the document is not a workload or has no such container.
    pub fn set_container_image(&mut self, container: &str, image: &str) -> bool {
        let (pod_spec, body): (Option<&mut PodSpec>, &mut DynamicObject) = match self {
            RawDocument::Deployment(Typed { object, body }) => (
                object.spec.as_mut().and_then(|s| s.template.spec.as_mut()),
                body,
            ),
            RawDocument::StatefulSet(Typed { object, body }) => (
                object.spec.as_mut().and_then(|s| s.template.spec.as_mut()),
                body,
            ),
            _ => return false,
        };

        let Some(spec) = pod_spec else {
            return false;
        };
        let Some(index) = spec.containers.iter().position(|c| c.name == container) else {
            return false;
        };

        let pointer = format!("/spec/template/spec/containers/{}", index);
        match body.data.pointer_mut(&pointer).and_then(|c| c.as_object_mut()) {
            Some(raw) => {
                raw.insert("image".to_string(), serde_json::Value::from(image));
                spec.containers[index].image = Some(image.to_string());
                true
            }
            None => false,
        }
    }

    /// Convert into the untyped form used for generic create calls
    pub fn into_dynamic(self) -> DynamicObject {
        each_variant!(self, t => t.body, obj => obj)
    }
}

/// Lazy iterator over the documents of one payload.
///
/// Yields at most one error, after which iteration ends.
pub struct Documents<'a> {
    inner: serde_yaml::Deserializer<'a>,
    index: usize,
    failed: bool,
}

impl Iterator for Documents<'_> {
    type Item = Result<RawDocument>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let de = self.inner.next()?;
            self.index += 1;

            let result = serde_yaml::Value::deserialize(de)
                .map_err(|e| {
                    SonarStackError::DecodeError(format!("document {}: {}", self.index, e))
                })
                .and_then(|value| {
                    // Empty documents (bare separators, comments) carry nothing
                    if value.is_null() {
                        Ok(None)
                    } else {
                        RawDocument::from_value(self.index, value).map(Some)
                    }
                });

            match result {
                Ok(None) => continue,
                Ok(Some(doc)) => return Some(Ok(doc)),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Decode a payload of zero or more `---` separated YAML (or JSON) documents
pub fn decode(payload: &[u8]) -> Documents<'_> {
    Documents {
        inner: serde_yaml::Deserializer::from_slice(payload),
        index: 0,
        failed: false,
    }
}

/// Decode a whole payload; any malformed document fails the entire call
pub fn decode_all(payload: &[u8]) -> Result<Vec<RawDocument>> {
    decode(payload).collect()
}
