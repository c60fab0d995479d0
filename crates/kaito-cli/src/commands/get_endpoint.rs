//! Endpoint lookup command implementation.

use std::io::Write;

use super::{require_workspace_name, resolve_namespace};
use crate::cli::GetEndpointArgs;
use crate::cluster::ClusterClient;
use crate::endpoint::{EndpointProbe, EndpointResolver};
use crate::error::CliError;
use crate::output::{EndpointReport, OutputFormat};
use crate::readiness;
use crate::workspace::WorkspaceRef;

/// Get-endpoint command executor.
#[derive(Debug, Clone)]
pub struct GetEndpointCommand {
    args: GetEndpointArgs,
}

impl GetEndpointCommand {
    /// Create a new get-endpoint command.
    #[must_use]
    pub fn new(args: GetEndpointArgs) -> Self {
        Self { args }
    }

    /// Check flag values without touching the cluster.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Validation`] for a blank workspace name.
    pub fn validate(&self) -> Result<(), CliError> {
        require_workspace_name(&self.args.workspace.workspace_name)
    }

    /// Execute the get-endpoint command.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace is missing or not ready, if no
    /// endpoint is reachable, or if output fails.
    pub async fn execute<C, P, W>(&self, cluster: &C, probe: P, writer: &mut W) -> Result<(), CliError>
    where
        C: ClusterClient,
        P: EndpointProbe,
        W: Write,
    {
        let namespace = resolve_namespace(self.args.workspace.namespace.as_deref(), cluster);
        let reference = WorkspaceRef::new(&self.args.workspace.workspace_name, namespace);

        readiness::check_ready(cluster, &reference).await?;
        let endpoint = EndpointResolver::new(cluster, probe)
            .with_local_ports(self.args.workspace.local_ports.clone())
            .resolve(&reference, self.args.external)
            .await?;

        let report = EndpointReport::new(&reference.name, &reference.namespace, &endpoint);
        OutputFormat::new(self.args.format.into()).write(writer, &report)
    }
}
