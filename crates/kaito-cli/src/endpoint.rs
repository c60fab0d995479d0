//! Inference endpoint discovery.
//!
//! Given a workspace, find a base URL for its OpenAI-compatible server that
//! is reachable from wherever the CLI runs. Tiers, in order:
//!
//! 1. External load balancer, only when explicitly requested.
//! 2. Cluster DNS (`<name>.<namespace>.svc.cluster.local`), when the name
//!    resolves. Only a DNS lookup is made, no HTTP request.
//! 3. A local `kubectl port-forward`, found by HEAD-probing localhost ports
//!    one after another.
//!
//! ```text
//!  Service ──► clusterIP? ──► external? ──► DNS ok? ──► localhost:{ports} ──► error
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace};

use crate::cluster::ClusterClient;
use crate::error::CliError;
use crate::workspace::WorkspaceRef;

/// Port every workspace Service listens on.
pub const SERVICE_PORT: u16 = 80;

/// Local ports probed for a port-forward when none are configured.
pub const DEFAULT_LOCAL_PORTS: [u16; 4] = [8080, 8000, 3000, 5000];

/// Timeout for each local probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// How a resolved endpoint is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessClass {
    /// Cluster DNS name, reachable from inside the cluster or via split-horizon DNS.
    ClusterInternal,
    /// A port-forward on localhost.
    LocalPortForward,
    /// A cloud load balancer ingress.
    ExternalLoadBalancer,
}

impl AccessClass {
    /// Coarse `"external"` / `"cluster"` label used in JSON output.
    #[must_use]
    pub const fn access_label(self) -> &'static str {
        match self {
            Self::ExternalLoadBalancer => "external",
            Self::ClusterInternal | Self::LocalPortForward => "cluster",
        }
    }
}

impl fmt::Display for AccessClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ClusterInternal => "cluster-internal",
            Self::LocalPortForward => "local port-forward",
            Self::ExternalLoadBalancer => "external load balancer",
        };
        f.write_str(s)
    }
}

/// A reachable inference server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    /// Base URL without a trailing slash, e.g. `http://localhost:8080`.
    pub base_url: String,
    /// Reachability tier.
    pub access: AccessClass,
}

impl Endpoint {
    /// Create a new endpoint.
    pub fn new(base_url: impl Into<String>, access: AccessClass) -> Self {
        Self {
            base_url: base_url.into(),
            access,
        }
    }

    /// URL of the chat completions route.
    #[must_use]
    pub fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Network checks used by the resolver.
pub trait EndpointProbe: Send + Sync {
    /// Whether `host` resolves via DNS.
    fn resolves(&self, host: &str) -> impl Future<Output = bool> + Send;

    /// Whether a server at `url` answers a HEAD request with a status below 500.
    fn responds(&self, url: &str) -> impl Future<Output = bool> + Send;
}

/// [`EndpointProbe`] doing real DNS lookups and HTTP requests.
#[derive(Debug, Clone)]
pub struct NetworkProbe {
    http: reqwest::Client,
}

impl NetworkProbe {
    /// Create a probe with the default per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self, CliError> {
        Self::with_timeout(PROBE_TIMEOUT)
    }

    /// Create a probe with a custom per-request timeout.
    ///
    /// Probes only target localhost, so proxy environment variables are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(timeout: Duration) -> Result<Self, CliError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| CliError::Request(e.to_string()))?;
        Ok(Self { http })
    }
}

impl EndpointProbe for NetworkProbe {
    async fn resolves(&self, host: &str) -> bool {
        match tokio::net::lookup_host((host, SERVICE_PORT)).await {
            Ok(mut addrs) => addrs.next().is_some(),
            Err(e) => {
                trace!(host, error = %e, "DNS lookup failed");
                false
            }
        }
    }

    async fn responds(&self, url: &str) -> bool {
        match self.http.head(url).send().await {
            Ok(resp) => {
                let status = resp.status();
                trace!(url, %status, "Probe answered");
                // A 404 still proves a server is listening.
                status.as_u16() < 500
            }
            Err(e) => {
                trace!(url, error = %e, "Probe failed");
                false
            }
        }
    }
}

/// Resolves a workspace to a reachable [`Endpoint`].
#[derive(Debug)]
pub struct EndpointResolver<'a, C, P> {
    cluster: &'a C,
    probe: P,
    local_ports: Vec<u16>,
}

impl<'a, C: ClusterClient, P: EndpointProbe> EndpointResolver<'a, C, P> {
    /// Create a resolver probing [`DEFAULT_LOCAL_PORTS`].
    pub fn new(cluster: &'a C, probe: P) -> Self {
        Self {
            cluster,
            probe,
            local_ports: DEFAULT_LOCAL_PORTS.to_vec(),
        }
    }

    /// Probe exactly these local ports, in order. An empty list keeps the defaults.
    #[must_use]
    pub fn with_local_ports(mut self, ports: Vec<u16>) -> Self {
        if !ports.is_empty() {
            self.local_ports = ports;
        }
        self
    }

    /// Resolve the workspace Service to a reachable endpoint.
    ///
    /// # Errors
    ///
    /// - [`CliError::ResourceNotFound`] if the Service does not exist.
    /// - [`CliError::Unreachable`] if the Service is headless or no tier answers.
    pub async fn resolve(
        &self,
        workspace: &WorkspaceRef,
        prefer_external: bool,
    ) -> Result<Endpoint, CliError> {
        let svc = self
            .cluster
            .get_service(&workspace.namespace, &workspace.name)
            .await?;

        if !svc.has_cluster_ip() {
            return Err(CliError::Unreachable {
                name: workspace.name.clone(),
                reason: format!("service {} has no cluster IP", workspace.name),
            });
        }

        if prefer_external {
            match svc.external_address().filter(|_| svc.is_load_balancer()) {
                Some(addr) => {
                    let endpoint = Endpoint::new(
                        format!("http://{addr}:{SERVICE_PORT}"),
                        AccessClass::ExternalLoadBalancer,
                    );
                    debug!(url = %endpoint.base_url, "Using external load balancer endpoint");
                    return Ok(endpoint);
                }
                None => debug!(
                    service = %workspace.name,
                    "No load balancer ingress, falling back to internal tiers"
                ),
            }
        }

        let host = workspace.service_host();
        if self.probe.resolves(&host).await {
            let endpoint = Endpoint::new(
                format!("http://{host}:{SERVICE_PORT}"),
                AccessClass::ClusterInternal,
            );
            debug!(url = %endpoint.base_url, "Using cluster-internal endpoint");
            return Ok(endpoint);
        }
        debug!(%host, "Cluster DNS name does not resolve, probing local ports");

        for port in &self.local_ports {
            let url = format!("http://localhost:{port}");
            if self.probe.responds(&url).await {
                debug!(%url, "Using local port-forward endpoint");
                return Ok(Endpoint::new(url, AccessClass::LocalPortForward));
            }
        }

        Err(CliError::port_forward_required(
            &workspace.name,
            &workspace.namespace,
        ))
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeProbe;
    use super::*;
    use crate::cluster::fake::FakeCluster;
    use crate::cluster::{IngressPoint, ServiceInfo, LOAD_BALANCER};

    fn cluster_ip_service() -> ServiceInfo {
        ServiceInfo {
            cluster_ip: Some("10.0.0.12".into()),
            service_type: Some("ClusterIP".into()),
            ingress: vec![],
        }
    }

    fn lb_service(ingress: Vec<IngressPoint>) -> ServiceInfo {
        ServiceInfo {
            cluster_ip: Some("10.0.0.12".into()),
            service_type: Some(LOAD_BALANCER.into()),
            ingress,
        }
    }

    fn llama() -> WorkspaceRef {
        WorkspaceRef::new("llama", "ml")
    }

    #[test]
    fn chat_completions_url() {
        let e = Endpoint::new("http://localhost:8080/", AccessClass::LocalPortForward);
        assert_eq!(e.chat_completions_url(), "http://localhost:8080/v1/chat/completions");
    }

    #[tokio::test]
    async fn cluster_dns_wins_over_port_forward() {
        let cluster = FakeCluster::new().with_service("ml", "llama", cluster_ip_service());
        let probe = FakeProbe::default()
            .resolving("llama.ml.svc.cluster.local")
            .answering("http://localhost:8080");
        let resolver = EndpointResolver::new(&cluster, probe);

        let endpoint = resolver.resolve(&llama(), false).await.expect("resolve");
        assert_eq!(endpoint.base_url, "http://llama.ml.svc.cluster.local:80");
        assert_eq!(endpoint.access, AccessClass::ClusterInternal);
        assert!(resolver.probe.probed().is_empty());
    }

    #[tokio::test]
    async fn port_forward_probed_in_order_and_short_circuits() {
        let cluster = FakeCluster::new().with_service("ml", "llama", cluster_ip_service());
        let probe = FakeProbe::default().answering("http://localhost:3000");
        let resolver = EndpointResolver::new(&cluster, probe);

        let endpoint = resolver.resolve(&llama(), false).await.expect("resolve");
        assert_eq!(endpoint.base_url, "http://localhost:3000");
        assert_eq!(endpoint.access, AccessClass::LocalPortForward);
        assert_eq!(
            resolver.probe.probed(),
            vec![
                "http://localhost:8080",
                "http://localhost:8000",
                "http://localhost:3000"
            ]
        );
    }

    #[tokio::test]
    async fn nothing_reachable_asks_for_port_forward() {
        let cluster = FakeCluster::new().with_service("ml", "llama", cluster_ip_service());
        let resolver = EndpointResolver::new(&cluster, FakeProbe::default());

        let err = resolver.resolve(&llama(), false).await.expect_err("unreachable");
        assert!(matches!(err, CliError::Unreachable { .. }));
        assert!(err.to_string().contains("kubectl port-forward svc/llama"));
        assert_eq!(resolver.probe.probed().len(), DEFAULT_LOCAL_PORTS.len());
    }

    #[tokio::test]
    async fn custom_local_ports_replace_defaults() {
        let cluster = FakeCluster::new().with_service("ml", "llama", cluster_ip_service());
        let resolver = EndpointResolver::new(&cluster, FakeProbe::default())
            .with_local_ports(vec![9999]);
        assert_eq!(resolver.local_ports, vec![9999]);

        let _ = resolver.resolve(&llama(), false).await;
        assert_eq!(resolver.probe.probed(), vec!["http://localhost:9999"]);
    }

    #[tokio::test]
    async fn empty_local_ports_keep_defaults() {
        let cluster = FakeCluster::new();
        let resolver = EndpointResolver::new(&cluster, FakeProbe::default()).with_local_ports(vec![]);
        assert_eq!(resolver.local_ports, DEFAULT_LOCAL_PORTS.to_vec());
    }

    #[tokio::test]
    async fn headless_service_is_rejected() {
        for ip in ["None", ""] {
            let svc = ServiceInfo {
                cluster_ip: Some(ip.into()),
                ..cluster_ip_service()
            };
            let cluster = FakeCluster::new().with_service("ml", "llama", svc);
            let probe = FakeProbe::default()
                .resolving("llama.ml.svc.cluster.local")
                .answering("http://localhost:8080");
            let resolver = EndpointResolver::new(&cluster, probe);

            let err = resolver.resolve(&llama(), false).await.expect_err("headless");
            assert!(matches!(err, CliError::Unreachable { .. }));
            assert!(err.to_string().contains("no cluster IP"));
        }
    }

    #[tokio::test]
    async fn missing_service_is_not_found() {
        let cluster = FakeCluster::new();
        let resolver = EndpointResolver::new(&cluster, FakeProbe::default());
        let err = resolver.resolve(&llama(), false).await.expect_err("missing");
        assert!(matches!(err, CliError::ResourceNotFound { kind: "service", .. }));
    }

    #[tokio::test]
    async fn external_preferred_when_requested() {
        let svc = lb_service(vec![IngressPoint {
            ip: Some("20.1.2.3".into()),
            hostname: None,
        }]);
        let cluster = FakeCluster::new().with_service("ml", "llama", svc);
        let probe = FakeProbe::default().resolving("llama.ml.svc.cluster.local");
        let resolver = EndpointResolver::new(&cluster, probe);

        let endpoint = resolver.resolve(&llama(), true).await.expect("resolve");
        assert_eq!(endpoint.base_url, "http://20.1.2.3:80");
        assert_eq!(endpoint.access, AccessClass::ExternalLoadBalancer);
        assert_eq!(endpoint.access.access_label(), "external");

        let endpoint = resolver.resolve(&llama(), false).await.expect("resolve");
        assert_eq!(endpoint.access, AccessClass::ClusterInternal);
    }

    #[tokio::test]
    async fn external_hostname_used_when_no_ip() {
        let svc = lb_service(vec![IngressPoint {
            ip: None,
            hostname: Some("llama.eastus.cloudapp.azure.com".into()),
        }]);
        let cluster = FakeCluster::new().with_service("ml", "llama", svc);
        let resolver = EndpointResolver::new(&cluster, FakeProbe::default());

        let endpoint = resolver.resolve(&llama(), true).await.expect("resolve");
        assert_eq!(endpoint.base_url, "http://llama.eastus.cloudapp.azure.com:80");
    }

    #[tokio::test]
    async fn external_without_ingress_falls_back() {
        let cluster = FakeCluster::new().with_service("ml", "llama", lb_service(vec![]));
        let probe = FakeProbe::default().answering("http://localhost:8000");
        let resolver = EndpointResolver::new(&cluster, probe);

        let endpoint = resolver.resolve(&llama(), true).await.expect("resolve");
        assert_eq!(endpoint.access, AccessClass::LocalPortForward);
        assert_eq!(endpoint.base_url, "http://localhost:8000");
    }

    #[tokio::test]
    async fn external_ignored_for_non_load_balancer() {
        let svc = ServiceInfo {
            ingress: vec![IngressPoint {
                ip: Some("20.1.2.3".into()),
                hostname: None,
            }],
            ..cluster_ip_service()
        };
        let cluster = FakeCluster::new().with_service("ml", "llama", svc);
        let probe = FakeProbe::default().resolving("llama.ml.svc.cluster.local");
        let resolver = EndpointResolver::new(&cluster, probe);

        let endpoint = resolver.resolve(&llama(), true).await.expect("resolve");
        assert_eq!(endpoint.access, AccessClass::ClusterInternal);
    }
}
