//! CLI error types.

use thiserror::Error;

/// Exit code for flag and argument validation failures.
pub const EXIT_VALIDATION: u8 = 2;

/// Exit code for every other failure.
pub const EXIT_FAILURE: u8 = 1;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// A flag or argument value is out of its declared range.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A Kubernetes object does not exist.
    #[error("{kind} {name} not found in namespace {namespace}")]
    ResourceNotFound {
        /// Object kind, e.g. `workspace` or `service`.
        kind: &'static str,
        /// Object name.
        name: String,
        /// Namespace that was searched.
        namespace: String,
    },

    /// The workspace exists but has not reported `WorkspaceReady=True`.
    #[error(
        "workspace {name} is not ready yet. Use 'kubectl kaito status {name} -n {namespace}' to check status"
    )]
    NotReady {
        /// Workspace name.
        name: String,
        /// Workspace namespace.
        namespace: String,
    },

    /// No reachable inference endpoint could be found.
    #[error("workspace {name} endpoint is not accessible: {reason}")]
    Unreachable {
        /// Workspace name.
        name: String,
        /// Why the endpoint is unreachable, including remediation text.
        reason: String,
    },

    /// Transport-level failure while calling the inference endpoint.
    #[error("failed to send request: {0}")]
    Request(String),

    /// The inference endpoint answered with a non-200 status.
    #[error("API request failed with status {status}: {body}")]
    ApiStatus {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The inference endpoint answered 200 with an unexpected body.
    #[error("unexpected response format: {0}")]
    ResponseFormat(String),

    /// Kubeconfig could not be loaded or a client could not be built.
    #[error("configuration error: {0}")]
    KubeConfig(String),

    /// Kubernetes API failure other than not-found.
    #[error("kubernetes API error: {0}")]
    Kube(String),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => EXIT_VALIDATION,
            _ => EXIT_FAILURE,
        }
    }

    /// Shorthand for a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Unreachable-endpoint error carrying port-forward remediation text.
    pub fn port_forward_required(name: &str, namespace: &str) -> Self {
        Self::Unreachable {
            name: name.to_string(),
            reason: format!(
                "no cluster-internal or local endpoint responded.\n\n\
                 To chat with this workspace, first set up port-forwarding:\n  \
                 kubectl port-forward svc/{name} 8080:80 -n {namespace}\n\n\
                 Then try the command again (it will automatically detect the local endpoint)"
            ),
        }
    }
}
