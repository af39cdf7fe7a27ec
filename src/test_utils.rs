// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for faking a Kubernetes control plane.

use crate::error::{Result as SonarResult, SonarStackError};
use crate::secrets::SecretStore;
use crate::sonar::TokenIssuer;
use async_trait::async_trait;
use futures::future::BoxFuture;
use http::{Request, Response};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::Client;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

#[derive(Clone, Debug)]
enum Reply {
    Json(u16, String),
    /// Answer with the request body, as the API server does for a successful create
    Echo(u16),
}

/// A request observed by the mock, in arrival order.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: Option<serde_json::Value>,
}

impl RecordedRequest {
    /// `metadata.name` of the submitted object, if any
    pub fn object_name(&self) -> Option<&str> {
        self.body.as_ref()?.get("metadata")?.get("name")?.as_str()
    }
}

#[derive(Default)]
struct State {
    routes: HashMap<(String, String), VecDeque<Reply>>,
    requests: Vec<RecordedRequest>,
}

impl State {
    /// Replies are consumed in order; the last one keeps answering.
    fn next_reply(&mut self, method: &str, path: &str) -> Option<Reply> {
        let queue = self
            .routes
            .get_mut(&(method.to_string(), path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

/// A mock HTTP service that answers scripted responses per exact request path
/// and records every request it sees.
#[derive(Clone, Default)]
pub struct MockService {
    state: Arc<Mutex<State>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, method: &str, path: &str, reply: Reply) -> Self {
        self.state
            .lock()
            .unwrap()
            .routes
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Queue a response for GET requests on the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.push("GET", path, Reply::Json(status, body.to_string()))
    }

    /// Queue a response for POST requests on the exact path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.push("POST", path, Reply::Json(status, body.to_string()))
    }

    /// Queue a response for DELETE requests on the exact path
    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.push("DELETE", path, Reply::Json(status, body.to_string()))
    }

    /// Accept creates on the path, echoing the submitted object back
    pub fn accept_post(self, path: &str) -> Self {
        self.push("POST", path, Reply::Echo(201))
    }

    /// Accept server-side apply patches on the path, echoing the object back
    pub fn accept_patch(self, path: &str) -> Self {
        self.push("PATCH", path, Reply::Echo(200))
    }

    /// Register discovery documents for the given `(apiVersion, kind, plural, namespaced)` types
    pub fn with_discovery(self, types: &[(&str, &str, &str, bool)]) -> Self {
        let mut by_group_version: BTreeMap<&str, Vec<serde_json::Value>> = BTreeMap::new();
        for &(api_version, kind, plural, namespaced) in types {
            by_group_version
                .entry(api_version)
                .or_default()
                .push(serde_json::json!({
                    "name": plural,
                    "singularName": kind.to_lowercase(),
                    "namespaced": namespaced,
                    "kind": kind,
                    "verbs": ["create", "delete", "get", "list", "patch"]
                }));
        }

        let mut core_versions = vec![];
        let mut groups: BTreeMap<&str, Vec<serde_json::Value>> = BTreeMap::new();
        let mut mock = self;
        for (group_version, resources) in by_group_version {
            let list = serde_json::json!({
                "kind": "APIResourceList",
                "apiVersion": "v1",
                "groupVersion": group_version,
                "resources": resources
            })
            .to_string();
            match group_version.split_once('/') {
                Some((group, version)) => {
                    groups.entry(group).or_default().push(serde_json::json!({
                        "groupVersion": group_version,
                        "version": version
                    }));
                    mock = mock.on_get(&format!("/apis/{}", group_version), 200, &list);
                }
                None => {
                    core_versions.push(group_version.to_string());
                    mock = mock.on_get(&format!("/api/{}", group_version), 200, &list);
                }
            }
        }

        let group_list: Vec<_> = groups
            .into_iter()
            .map(|(name, versions)| {
                serde_json::json!({
                    "name": name,
                    "preferredVersion": versions[0].clone(),
                    "versions": versions
                })
            })
            .collect();

        mock.on_get(
            "/api",
            200,
            &serde_json::json!({
                "kind": "APIVersions",
                "versions": core_versions,
                "serverAddressByClientCIDRs": []
            })
            .to_string(),
        )
        .on_get(
            "/apis",
            200,
            &serde_json::json!({
                "kind": "APIGroupList",
                "apiVersion": "v1",
                "groups": group_list
            })
            .to_string(),
        )
    }

    /// Build a kube Client backed by this mock; the mock keeps recording
    pub fn client(&self) -> Client {
        Client::new(self.clone(), "default")
    }

    /// All requests seen so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Requests matching the method, in arrival order
    pub fn requests_with(&self, method: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    /// Number of requests on the exact method and path
    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let state = self.state.clone();

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let method = parts.method.to_string();
            let path = parts.uri.path().to_string();
            let bytes = body.collect().await?.to_bytes();

            let reply = {
                let mut state = state.lock().unwrap();
                state.requests.push(RecordedRequest {
                    method: method.clone(),
                    path: path.clone(),
                    query: parts.uri.query().map(str::to_string),
                    body: serde_json::from_slice(&bytes).ok(),
                });
                state.next_reply(&method, &path)
            };

            let (status, payload) = match reply {
                Some(Reply::Json(status, body)) => (status, body.into_bytes()),
                Some(Reply::Echo(status)) => (status, bytes.to_vec()),
                // Default 404 for unmatched requests
                None => (404, not_found_json("resource", &path).into_bytes()),
            };

            Ok::<_, tower::BoxError>(
                Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(Body::from(payload))
                    .unwrap(),
            )
        })
    }
}

/// Create a mock namespace JSON response
pub fn namespace_json(name: &str) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "uid": "test-uid"
        }
    })
    .to_string()
}

/// Create a mock LoadBalancer service JSON response; an empty address means not yet provisioned
pub fn service_json(name: &str, namespace: &str, cluster_ip: &str, address: &str) -> String {
    let ingress = if address.is_empty() {
        serde_json::json!([])
    } else if address.parse::<std::net::IpAddr>().is_ok() {
        serde_json::json!([{ "ip": address }])
    } else {
        serde_json::json!([{ "hostname": address }])
    };

    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": { "name": name, "namespace": namespace },
        "spec": { "type": "LoadBalancer", "clusterIP": cluster_ip },
        "status": { "loadBalancer": { "ingress": ingress } }
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

/// Create a 409 already exists response
pub fn already_exists_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" already exists", resource, name),
        "reason": "AlreadyExists",
        "code": 409
    })
    .to_string()
}

/// Create a 500 internal error response
pub fn internal_error_json(message: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": "InternalError",
        "code": 500
    })
    .to_string()
}

/// In-memory secret store
#[derive(Default)]
pub struct FakeSecretStore {
    secrets: Mutex<BTreeMap<String, String>>,
}

impl FakeSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(self, name: &str, value: &str) -> Self {
        self.secrets
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.secrets.lock().unwrap().get(name).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl SecretStore for FakeSecretStore {
    async fn create_secret(&self, name: &str, value: &str, _description: &str) -> SonarResult<()> {
        let mut secrets = self.secrets.lock().unwrap();
        if secrets.contains_key(name) {
            return Err(SonarStackError::SecretStoreError(format!(
                "secret {} already exists",
                name
            )));
        }
        secrets.insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn secret_exists(&self, name: &str) -> SonarResult<bool> {
        Ok(self.secrets.lock().unwrap().contains_key(name))
    }

    async fn delete_secret(&self, name: &str) -> SonarResult<bool> {
        Ok(self.secrets.lock().unwrap().remove(name).is_some())
    }
}

/// Token issuer returning a fixed token and recording the hosts it was asked for
pub struct FakeTokenIssuer {
    token: String,
    hosts: Mutex<Vec<String>>,
}

impl FakeTokenIssuer {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            hosts: Mutex::new(vec![]),
        }
    }

    pub fn hosts(&self) -> Vec<String> {
        self.hosts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenIssuer for FakeTokenIssuer {
    async fn issue_token(&self, host_url: &str) -> SonarResult<String> {
        self.hosts.lock().unwrap().push(host_url.to_string());
        Ok(self.token.clone())
    }
}
