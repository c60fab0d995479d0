//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`chat`] - Interactive chat with a workspace model
//! - [`get_endpoint`] - Inference endpoint lookup
//! - [`status`] - Workspace status
//! - [`version`] - Version information
//!
//! Commands that need the cluster are generic over [`ClusterClient`] and
//! expose a `validate` step that runs before any client is built.

pub mod chat;
pub mod get_endpoint;
pub mod status;
pub mod version;

pub use chat::ChatCommand;
pub use get_endpoint::GetEndpointCommand;
pub use status::StatusCommand;
pub use version::VersionCommand;

use crate::cluster::ClusterClient;
use crate::error::CliError;

/// Namespace used when neither the flag nor the kubeconfig names one.
pub const FALLBACK_NAMESPACE: &str = "default";

/// Pick the namespace: explicit flag, then the client's context namespace,
/// then `default`.
pub fn resolve_namespace<C: ClusterClient>(flag: Option<&str>, client: &C) -> String {
    flag.filter(|ns| !ns.is_empty())
        .or_else(|| Some(client.default_namespace()).filter(|ns| !ns.is_empty()))
        .unwrap_or(FALLBACK_NAMESPACE)
        .to_string()
}

fn require_workspace_name(name: &str) -> Result<(), CliError> {
    if name.trim().is_empty() {
        return Err(CliError::validation("workspace-name is required"));
    }
    Ok(())
}
