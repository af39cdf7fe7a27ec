// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Fixed-interval readiness polling.

use crate::error::{Result, SonarStackError};
use k8s_openapi::api::core::v1::Service;
use kube::Api;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Outcome of a single check
#[derive(Debug)]
pub enum Check<T> {
    Ready(T),
    Pending,
}

/// Addresses of a load-balanced service once it is reachable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    /// Load balancer hostname, or its IP when no hostname is published
    pub external: String,
    pub cluster_ip: Option<String>,
}

/// Blocking poll loop with a fixed sleep between attempts.
///
/// Without a deadline a wait only ends when its condition holds or a fatal
/// error occurs.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    interval: Duration,
    deadline: Option<Duration>,
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Bound every wait started by this poller
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Same deadline, different interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `check` until it reports ready. A check error ends the wait immediately.
    pub async fn poll_until<T, F, Fut>(&self, what: &str, mut check: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Check<T>>>,
    {
        let started = Instant::now();
        let mut attempts: u64 = 0;

        loop {
            attempts += 1;
            if let Check::Ready(value) = check().await? {
                debug!("{} after {} attempts", what, attempts);
                return Ok(value);
            }

            if let Some(deadline) = self.deadline {
                if started.elapsed() + self.interval > deadline {
                    return Err(SonarStackError::WaitTimedOut(what.to_string()));
                }
            }

            debug!("Waiting for {} (attempt {}), retrying in {:?}", what, attempts, self.interval);
            sleep(self.interval).await;
        }
    }

    /// Wait until a LoadBalancer service publishes an external address.
    ///
    /// Fetch errors are treated as "not ready yet" and retried.
    pub async fn wait_for_service_ready(
        &self,
        services: &Api<Service>,
        name: &str,
    ) -> Result<ServiceEndpoints> {
        info!("Waiting for service {} to become ready...", name);
        let what = format!("service {} to become ready", name);

        let endpoints = self
            .poll_until(&what, || async move {
                match services.get(name).await {
                    Ok(service) => Ok(match service_endpoints(&service) {
                        Some(endpoints) => Check::Ready(endpoints),
                        None => Check::Pending,
                    }),
                    Err(e) => {
                        warn!("Failed to fetch service {}: {}, retrying", name, e);
                        Ok(Check::Pending)
                    }
                }
            })
            .await?;

        info!("Service {} is reachable at {}", name, endpoints.external);
        Ok(endpoints)
    }

    /// Wait until `exists` reports the resource gone. Any check error is fatal.
    pub async fn wait_for_absent<F, Fut>(&self, what: &str, mut exists: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        let description = format!("{} to be deleted", what);
        self.poll_until(&description, || {
            let still_there = exists();
            async move {
                Ok(if still_there.await? {
                    Check::Pending
                } else {
                    Check::Ready(())
                })
            }
        })
        .await?;

        info!("{} has been deleted", what);
        Ok(())
    }

    /// Wait until `host` resolves through the system resolver
    pub async fn wait_for_dns(&self, host: &str) -> Result<()> {
        info!("Waiting for DNS resolution of {}...", host);
        let what = format!("DNS resolution of {}", host);

        self.poll_until(&what, || async move {
            Ok(match tokio::net::lookup_host((host, 0)).await {
                Ok(mut addrs) => {
                    if addrs.next().is_some() {
                        Check::Ready(())
                    } else {
                        Check::Pending
                    }
                }
                Err(e) => {
                    debug!("{} does not resolve yet: {}", host, e);
                    Check::Pending
                }
            })
        })
        .await?;

        info!("DNS resolution for {} is successful", host);
        Ok(())
    }
}

/// External and cluster addresses of a service, if its load balancer is provisioned
pub fn service_endpoints(service: &Service) -> Option<ServiceEndpoints> {
    let ingress = service
        .status
        .as_ref()?
        .load_balancer
        .as_ref()?
        .ingress
        .as_ref()?
        .first()?;

    let external = ingress
        .hostname
        .clone()
        .filter(|h| !h.is_empty())
        .or_else(|| ingress.ip.clone().filter(|ip| !ip.is_empty()))?;

    Some(ServiceEndpoints {
        external,
        cluster_ip: service.spec.as_ref().and_then(|s| s.cluster_ip.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{internal_error_json, not_found_json, service_json, MockService};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SERVICE_PATH: &str = "/api/v1/namespaces/db-ns/services/db-svc";

    fn fast_poller() -> Poller {
        Poller::new(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_service_ready_after_k_fetches() {
        let pending = service_json("db-svc", "db-ns", "172.20.0.10", "");
        let ready = service_json("db-svc", "db-ns", "172.20.0.10", "10.0.0.5");
        let mock = MockService::new()
            .on_get(SERVICE_PATH, 200, &pending)
            .on_get(SERVICE_PATH, 200, &pending)
            .on_get(SERVICE_PATH, 200, &ready);
        let services: Api<Service> = Api::namespaced(mock.client(), "db-ns");

        let endpoints = fast_poller()
            .wait_for_service_ready(&services, "db-svc")
            .await
            .unwrap();

        assert_eq!(endpoints.external, "10.0.0.5");
        assert_eq!(endpoints.cluster_ip.as_deref(), Some("172.20.0.10"));
        assert_eq!(mock.count("GET", SERVICE_PATH), 3);
    }

    #[tokio::test]
    async fn test_service_ready_prefers_hostname() {
        let ready = service_json("db-svc", "db-ns", "172.20.0.10", "abc.elb.amazonaws.com");
        let mock = MockService::new().on_get(SERVICE_PATH, 200, &ready);
        let services: Api<Service> = Api::namespaced(mock.client(), "db-ns");

        let endpoints = fast_poller()
            .wait_for_service_ready(&services, "db-svc")
            .await
            .unwrap();

        assert_eq!(endpoints.external, "abc.elb.amazonaws.com");
        assert_eq!(mock.count("GET", SERVICE_PATH), 1);
    }

    #[tokio::test]
    async fn test_service_ready_retries_fetch_errors() {
        let ready = service_json("db-svc", "db-ns", "172.20.0.10", "10.0.0.5");
        let mock = MockService::new()
            .on_get(SERVICE_PATH, 500, &internal_error_json("apiserver restarting"))
            .on_get(SERVICE_PATH, 404, &not_found_json("services", "db-svc"))
            .on_get(SERVICE_PATH, 200, &ready);
        let services: Api<Service> = Api::namespaced(mock.client(), "db-ns");

        let endpoints = fast_poller()
            .wait_for_service_ready(&services, "db-svc")
            .await
            .unwrap();

        assert_eq!(endpoints.external, "10.0.0.5");
        assert_eq!(mock.count("GET", SERVICE_PATH), 3);
    }

    #[tokio::test]
    async fn test_service_ready_deadline() {
        let pending = service_json("db-svc", "db-ns", "172.20.0.10", "");
        let mock = MockService::new().on_get(SERVICE_PATH, 200, &pending);
        let services: Api<Service> = Api::namespaced(mock.client(), "db-ns");
        let poller = Poller::new(Duration::from_millis(5))
            .with_deadline(Some(Duration::from_millis(20)));

        let err = poller
            .wait_for_service_ready(&services, "db-svc")
            .await
            .unwrap_err();

        assert!(matches!(err, SonarStackError::WaitTimedOut(_)));
        assert!(mock.count("GET", SERVICE_PATH) >= 1);
    }

    #[tokio::test]
    async fn test_absent_after_several_checks() {
        let calls = AtomicUsize::new(0);

        fast_poller()
            .wait_for_absent("namespace db-ns", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok(n < 4) }
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_absent_aborts_on_first_error() {
        let calls = AtomicUsize::new(0);

        let err = fast_poller()
            .wait_for_absent("namespace db-ns", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<bool, _>(SonarStackError::TransportError("connection refused".to_string())) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SonarStackError::TransportError(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dns_resolves_ip_literal() {
        fast_poller().wait_for_dns("10.0.0.5").await.unwrap();
    }

    #[test]
    fn test_service_endpoints_without_status() {
        let service = Service::default();
        assert_eq!(service_endpoints(&service), None);
    }
}
