//! Kubernetes access.
//!
//! Everything the CLI reads from the cluster goes through [`ClusterClient`],
//! so readiness and endpoint logic can be tested with a fake cluster.
//! [`KubeClusterClient`] is the production implementation on top of the
//! `kube` crate.

use std::future::Future;
use std::path::PathBuf;

use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::{debug, trace};

use crate::error::CliError;
use crate::workspace::{
    Workspace, WORKSPACE_GROUP, WORKSPACE_KIND, WORKSPACE_PLURAL, WORKSPACE_VERSION,
};

/// Service type exposing an external load balancer.
pub const LOAD_BALANCER: &str = "LoadBalancer";

/// Sentinel `clusterIP` of a headless Service.
pub const HEADLESS_CLUSTER_IP: &str = "None";

/// Load balancer ingress point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngressPoint {
    /// Ingress IP, if assigned.
    pub ip: Option<String>,
    /// Ingress hostname, if assigned.
    pub hostname: Option<String>,
}

/// The Service fields endpoint resolution consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceInfo {
    /// `spec.clusterIP`.
    pub cluster_ip: Option<String>,
    /// `spec.type`.
    pub service_type: Option<String>,
    /// `status.loadBalancer.ingress`.
    pub ingress: Vec<IngressPoint>,
}

impl ServiceInfo {
    /// True when the Service has a routable cluster IP.
    #[must_use]
    pub fn has_cluster_ip(&self) -> bool {
        self.cluster_ip
            .as_deref()
            .is_some_and(|ip| !ip.is_empty() && ip != HEADLESS_CLUSTER_IP)
    }

    /// True for `type: LoadBalancer`.
    #[must_use]
    pub fn is_load_balancer(&self) -> bool {
        self.service_type.as_deref() == Some(LOAD_BALANCER)
    }

    /// First ingress address, IP preferred over hostname within an entry.
    #[must_use]
    pub fn external_address(&self) -> Option<&str> {
        self.ingress.iter().find_map(|point| {
            point
                .ip
                .as_deref()
                .filter(|ip| !ip.is_empty())
                .or_else(|| point.hostname.as_deref().filter(|h| !h.is_empty()))
        })
    }
}

impl From<&Service> for ServiceInfo {
    fn from(svc: &Service) -> Self {
        let spec = svc.spec.as_ref();
        let ingress = svc
            .status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
            .map(|points| {
                points
                    .iter()
                    .map(|p| IngressPoint {
                        ip: p.ip.clone(),
                        hostname: p.hostname.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            cluster_ip: spec.and_then(|s| s.cluster_ip.clone()),
            service_type: spec.and_then(|s| s.type_.clone()),
            ingress,
        }
    }
}

/// Read access to the cluster objects the CLI needs.
pub trait ClusterClient: Send + Sync {
    /// Namespace to use when none is given on the command line.
    fn default_namespace(&self) -> &str;

    /// Fetch a workspace.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::ResourceNotFound`] if it does not exist.
    fn get_workspace(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<Workspace, CliError>> + Send;

    /// List workspaces in a namespace, or in all namespaces for `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn list_workspaces(
        &self,
        namespace: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Workspace>, CliError>> + Send;

    /// Fetch a Service.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::ResourceNotFound`] if it does not exist.
    fn get_service(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<ServiceInfo, CliError>> + Send;
}

/// How to locate cluster credentials.
#[derive(Debug, Clone, Default)]
pub struct KubeSettings {
    /// Explicit kubeconfig file.
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context override.
    pub context: Option<String>,
}

/// [`ClusterClient`] backed by the kube crate.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
    workspace_resource: ApiResource,
}

impl std::fmt::Debug for KubeClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterClient")
            .field("default_namespace", &self.client.default_namespace())
            .finish_non_exhaustive()
    }
}

impl KubeClusterClient {
    /// Build a client from kubeconfig or in-cluster credentials.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::KubeConfig`] if no usable configuration is found.
    pub async fn connect(settings: &KubeSettings) -> Result<Self, CliError> {
        let options = KubeConfigOptions {
            context: settings.context.clone(),
            ..KubeConfigOptions::default()
        };

        let config = match (&settings.kubeconfig, &settings.context) {
            (Some(path), _) => {
                debug!(path = %path.display(), "Loading kubeconfig");
                let kubeconfig = Kubeconfig::read_from(path)
                    .map_err(|e| CliError::KubeConfig(e.to_string()))?;
                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(|e| CliError::KubeConfig(e.to_string()))?
            }
            (None, Some(_)) => Config::from_kubeconfig(&options)
                .await
                .map_err(|e| CliError::KubeConfig(e.to_string()))?,
            (None, None) => Config::infer()
                .await
                .map_err(|e| CliError::KubeConfig(e.to_string()))?,
        };

        let client = Client::try_from(config).map_err(|e| CliError::KubeConfig(e.to_string()))?;
        Ok(Self::from_client(client))
    }

    /// Wrap an existing kube client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        let gvk = GroupVersionKind::gvk(WORKSPACE_GROUP, WORKSPACE_VERSION, WORKSPACE_KIND);
        Self {
            client,
            workspace_resource: ApiResource::from_gvk_with_plural(&gvk, WORKSPACE_PLURAL),
        }
    }

    fn workspace_from(obj: DynamicObject, fallback_namespace: &str) -> Workspace {
        let name = obj.metadata.name.unwrap_or_default();
        let namespace = obj
            .metadata
            .namespace
            .unwrap_or_else(|| fallback_namespace.to_string());
        let workspace = Workspace::new(name, namespace, obj.data);
        match obj.metadata.creation_timestamp {
            Some(ts) => workspace.with_created(ts.0),
            None => workspace,
        }
    }
}

impl ClusterClient for KubeClusterClient {
    fn default_namespace(&self) -> &str {
        self.client.default_namespace()
    }

    async fn get_workspace(&self, namespace: &str, name: &str) -> Result<Workspace, CliError> {
        trace!(namespace, name, "Fetching workspace");
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &self.workspace_resource);
        let obj = api
            .get(name)
            .await
            .map_err(|e| map_kube_error(e, "workspace", name, namespace))?;
        Ok(Self::workspace_from(obj, namespace))
    }

    async fn list_workspaces(&self, namespace: Option<&str>) -> Result<Vec<Workspace>, CliError> {
        let api: Api<DynamicObject> = match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &self.workspace_resource),
            None => Api::all_with(self.client.clone(), &self.workspace_resource),
        };
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| CliError::Kube(format!("failed to list workspaces: {e}")))?;
        let fallback = namespace.unwrap_or_default();
        Ok(list
            .items
            .into_iter()
            .map(|obj| Self::workspace_from(obj, fallback))
            .collect())
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<ServiceInfo, CliError> {
        trace!(namespace, name, "Fetching service");
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let svc = api
            .get(name)
            .await
            .map_err(|e| map_kube_error(e, "service", name, namespace))?;
        Ok(ServiceInfo::from(&svc))
    }
}

/// Translate a kube error, turning 404 into [`CliError::ResourceNotFound`].
pub fn map_kube_error(err: kube::Error, kind: &'static str, name: &str, namespace: &str) -> CliError {
    match err {
        kube::Error::Api(response) if response.code == 404 => CliError::ResourceNotFound {
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
        },
        other => CliError::Kube(format!("failed to get {kind} {name}: {other}")),
    }
}
