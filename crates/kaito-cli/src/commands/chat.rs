//! Interactive chat command implementation.
//!
//! Flow: validate parameters, check readiness, resolve an internal
//! endpoint, then hand over to the REPL.

use std::io::{BufRead, Write};

use tracing::info;

use super::{require_workspace_name, resolve_namespace};
use crate::cli::ChatArgs;
use crate::cluster::ClusterClient;
use crate::endpoint::{EndpointProbe, EndpointResolver};
use crate::error::CliError;
use crate::inference::ChatBackend;
use crate::params::GenerationParams;
use crate::readiness;
use crate::session::{ChatSession, SessionInfo};
use crate::workspace::WorkspaceRef;

/// Model name shown when the workspace does not declare one.
pub const UNKNOWN_MODEL: &str = "Unknown";

/// Chat command executor.
#[derive(Debug, Clone)]
pub struct ChatCommand {
    args: ChatArgs,
}

impl ChatCommand {
    /// Create a new chat command.
    #[must_use]
    pub fn new(args: ChatArgs) -> Self {
        Self { args }
    }

    /// Check flag values without touching the cluster.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Validation`] for a blank workspace name or
    /// out-of-range generation parameters.
    pub fn validate(&self) -> Result<GenerationParams, CliError> {
        require_workspace_name(&self.args.workspace.workspace_name)?;
        GenerationParams::new(
            self.args.system_prompt.clone(),
            self.args.temperature,
            self.args.max_tokens,
            self.args.top_p,
        )
    }

    /// Execute the chat command.
    ///
    /// `params` is the result of [`Self::validate`].
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace is missing or not ready, if no
    /// endpoint is reachable, or if writing the transcript fails. Failures of
    /// individual messages are reported inline and do not end the session.
    #[allow(clippy::too_many_arguments)]
    pub async fn execute<C, P, B, R, W, E>(
        &self,
        cluster: &C,
        probe: P,
        backend: &B,
        params: GenerationParams,
        input: R,
        out: &mut W,
        err: &mut E,
    ) -> Result<(), CliError>
    where
        C: ClusterClient,
        P: EndpointProbe,
        B: ChatBackend,
        R: BufRead,
        W: Write,
        E: Write,
    {
        let namespace = resolve_namespace(self.args.workspace.namespace.as_deref(), cluster);
        let reference = WorkspaceRef::new(&self.args.workspace.workspace_name, namespace);

        let workspace = readiness::check_ready(cluster, &reference).await?;
        let endpoint = EndpointResolver::new(cluster, probe)
            .with_local_ports(self.args.workspace.local_ports.clone())
            .resolve(&reference, false)
            .await?;
        info!(workspace = %reference, url = %endpoint.base_url, access = %endpoint.access, "Resolved inference endpoint");

        let info = SessionInfo {
            workspace: reference.name.clone(),
            namespace: reference.namespace.clone(),
            model: workspace
                .model_name()
                .unwrap_or_else(|| UNKNOWN_MODEL.to_string()),
        };
        let session = ChatSession::new(backend, endpoint, info);
        session.run(params, input, out, err).await?;
        Ok(())
    }
}
