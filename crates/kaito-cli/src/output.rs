//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::Format;
use crate::endpoint::{AccessClass, Endpoint};
use crate::error::CliError;
use crate::workspace::{
    Condition, Workspace, INFERENCE_READY, JOB_STARTED, RESOURCE_READY, WORKSPACE_READY,
};

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Result of `get-endpoint`.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointReport {
    /// Workspace name.
    pub workspace: String,
    /// Workspace namespace.
    pub namespace: String,
    /// Base URL of the inference server.
    pub endpoint: String,
    /// Always `inference`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// `external` or `cluster`.
    pub access: &'static str,
    /// Exact reachability tier.
    pub access_class: AccessClass,
}

impl EndpointReport {
    /// Build a report for a resolved endpoint.
    #[must_use]
    pub fn new(workspace: &str, namespace: &str, endpoint: &Endpoint) -> Self {
        Self {
            workspace: workspace.to_string(),
            namespace: namespace.to_string(),
            endpoint: endpoint.base_url.clone(),
            kind: "inference",
            access: endpoint.access.access_label(),
            access_class: endpoint.access,
        }
    }
}

impl TableDisplay for EndpointReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{}", self.endpoint)?;
        Ok(())
    }
}

/// Detailed status of one workspace.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceDetail {
    /// Workspace name.
    pub name: String,
    /// Workspace namespace.
    pub namespace: String,
    /// GPU instance type.
    pub instance_type: Option<String>,
    /// Model identifier.
    pub model: Option<String>,
    /// Status conditions, `None` when the workspace has no status yet.
    pub conditions: Option<Vec<Condition>>,
}

impl From<&Workspace> for WorkspaceDetail {
    fn from(ws: &Workspace) -> Self {
        Self {
            name: ws.name.clone(),
            namespace: ws.namespace.clone(),
            instance_type: ws.instance_type(),
            model: ws.model_name(),
            conditions: ws.conditions().found(),
        }
    }
}

impl TableDisplay for WorkspaceDetail {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Name:      {}", self.name)?;
        writeln!(writer, "Namespace: {}", self.namespace)?;
        if let Some(ref instance) = self.instance_type {
            writeln!(writer, "Instance:  {instance}")?;
        }
        if let Some(ref model) = self.model {
            writeln!(writer, "Model:     {model}")?;
        }

        let Some(ref conditions) = self.conditions else {
            writeln!(writer, "Status:    No status available")?;
            return Ok(());
        };

        writeln!(writer)?;
        writeln!(writer, "Conditions:")?;
        for c in conditions {
            if c.message.is_empty() {
                writeln!(writer, "  {}: {}", c.type_, c.status)?;
            } else {
                writeln!(writer, "  {}: {} ({})", c.type_, c.status, c.message)?;
            }
        }
        writeln!(writer)?;
        Ok(())
    }
}

/// One row of the workspace list.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceSummary {
    /// Workspace name.
    pub name: String,
    /// Workspace namespace.
    pub namespace: String,
    /// GPU instance type, empty if unset.
    pub instance: String,
    /// `ResourceReady` status.
    pub resource_ready: String,
    /// `InferenceReady` status.
    pub inference_ready: String,
    /// `JobStarted` status.
    pub job_started: String,
    /// `WorkspaceReady` status.
    pub workspace_ready: String,
    /// Age, e.g. `3d4h`.
    pub age: String,
}

impl WorkspaceSummary {
    /// Summarise a workspace relative to `now`.
    #[must_use]
    pub fn new(ws: &Workspace, now: DateTime<Utc>) -> Self {
        Self {
            name: ws.name.clone(),
            namespace: ws.namespace.clone(),
            instance: ws.instance_type().unwrap_or_default(),
            resource_ready: ws.condition_status(RESOURCE_READY).to_string(),
            inference_ready: ws.condition_status(INFERENCE_READY).to_string(),
            job_started: ws.condition_status(JOB_STARTED).to_string(),
            workspace_ready: ws.condition_status(WORKSPACE_READY).to_string(),
            age: ws
                .created
                .map_or_else(|| "<unknown>".to_string(), |created| format_age(now - created)),
        }
    }
}

/// Workspaces in one namespace or across all namespaces.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceList {
    /// Namespace listed, `None` for all namespaces.
    pub namespace: Option<String>,
    /// Rows.
    pub workspaces: Vec<WorkspaceSummary>,
}

impl TableDisplay for WorkspaceList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.workspaces.is_empty() {
            match self.namespace {
                Some(ref ns) => writeln!(writer, "No workspaces found in namespace {ns}.")?,
                None => writeln!(writer, "No workspaces found in any namespace.")?,
            }
            return Ok(());
        }

        let all = self.namespace.is_none();
        if all {
            write!(writer, "{:<30} {:<15} ", "NAME", "NAMESPACE")?;
        } else {
            write!(writer, "{:<30} ", "NAME")?;
        }
        writeln!(
            writer,
            "{:<25} {:<15} {:<15} {:<10} {:<15} {:<10}",
            "INSTANCE", "RESOURCEREADY", "INFERENCEREADY", "JOBSTARTED", "WORKSPACEREADY", "AGE"
        )?;

        for w in &self.workspaces {
            if all {
                write!(
                    writer,
                    "{:<30} {:<15} ",
                    truncate(&w.name, 30),
                    truncate(&w.namespace, 15)
                )?;
            } else {
                write!(writer, "{:<30} ", truncate(&w.name, 30))?;
            }
            writeln!(
                writer,
                "{:<25} {:<15} {:<15} {:<10} {:<15} {:<10}",
                truncate(&w.instance, 25),
                w.resource_ready,
                w.inference_ready,
                w.job_started,
                w.workspace_ready,
                w.age
            )?;
        }
        Ok(())
    }
}

/// Build and version information.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    /// Crate version.
    pub version: &'static str,
    /// Target operating system.
    pub os: &'static str,
    /// Target architecture.
    pub arch: &'static str,
}

impl VersionInfo {
    /// Information for the running binary.
    #[must_use]
    pub const fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        }
    }
}

impl TableDisplay for VersionInfo {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "kubectl-kaito version: {}", self.version)?;
        writeln!(writer, "Platform: {}/{}", self.os, self.arch)?;
        Ok(())
    }
}

/// Compact `kubectl`-style age.
fn format_age(age: chrono::TimeDelta) -> String {
    let secs = age.num_seconds().max(0);
    let (days, hours, mins) = (secs / 86_400, (secs % 86_400) / 3600, (secs % 3600) / 60);
    match (days, hours, mins) {
        (0, 0, 0) => format!("{secs}s"),
        (0, 0, m) => format!("{m}m"),
        (0, h, m) => format!("{h}h{m}m"),
        (d, h, _) => format!("{d}d{h}h"),
    }
}

/// Truncate a string to a maximum number of characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
