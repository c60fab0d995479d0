//! Workspace status command implementation.
//!
//! Shows either one workspace in detail or a table of workspaces with their
//! readiness conditions.

use std::io::Write;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::resolve_namespace;
use crate::cli::StatusArgs;
use crate::cluster::ClusterClient;
use crate::error::CliError;
use crate::output::{OutputFormat, WorkspaceDetail, WorkspaceList, WorkspaceSummary};
use crate::workspace::WorkspaceRef;

/// Status command executor.
#[derive(Debug, Clone)]
pub struct StatusCommand {
    args: StatusArgs,
}

impl StatusCommand {
    /// Create a new status command.
    #[must_use]
    pub fn new(args: StatusArgs) -> Self {
        Self { args }
    }

    /// Check flag combinations without touching the cluster.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Validation`] when `--all-namespaces` is combined
    /// with `--namespace` or a workspace name, or when the workspace reference
    /// names another kind.
    pub fn validate(&self) -> Result<(), CliError> {
        if self.args.all_namespaces {
            if self.args.namespace.is_some() {
                return Err(CliError::validation(
                    "--all-namespaces and --namespace cannot be used together",
                ));
            }
            if self.args.workspace.is_some() {
                return Err(CliError::validation(
                    "--all-namespaces cannot be used with a workspace name",
                ));
            }
        }
        if let Some(ref reference) = self.args.workspace {
            WorkspaceRef::parse(reference, "")?;
        }
        Ok(())
    }

    /// Execute the status command, computing ages relative to `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace does not exist, the cluster request
    /// fails, or output fails.
    pub async fn execute<C, W>(
        &self,
        cluster: &C,
        writer: &mut W,
        now: DateTime<Utc>,
    ) -> Result<(), CliError>
    where
        C: ClusterClient,
        W: Write,
    {
        self.validate()?;
        let format = OutputFormat::new(self.args.format);

        if let Some(ref reference) = self.args.workspace {
            let namespace = resolve_namespace(self.args.namespace.as_deref(), cluster);
            let reference = WorkspaceRef::parse(reference, namespace)?;
            let ws = cluster
                .get_workspace(&reference.namespace, &reference.name)
                .await?;
            return format.write(writer, &WorkspaceDetail::from(&ws));
        }

        let namespace = if self.args.all_namespaces {
            None
        } else {
            Some(resolve_namespace(self.args.namespace.as_deref(), cluster))
        };
        let workspaces = cluster.list_workspaces(namespace.as_deref()).await?;
        debug!(count = workspaces.len(), namespace = ?namespace, "Listed workspaces");

        let list = WorkspaceList {
            namespace,
            workspaces: workspaces
                .iter()
                .map(|ws| WorkspaceSummary::new(ws, now))
                .collect(),
        };
        format.write(writer, &list)
    }
}
