//! Workspace readiness gate.
//!
//! Endpoint discovery only proceeds once the controller reports
//! `WorkspaceReady=True` on the workspace.

use tracing::{debug, warn};

use crate::cluster::ClusterClient;
use crate::error::CliError;
use crate::workspace::{ConditionStatus, Lookup, Workspace, WorkspaceRef, WORKSPACE_READY};

/// Fetch the workspace and require `WorkspaceReady=True`.
///
/// Returns the fetched workspace so callers can read display metadata
/// without a second round trip.
///
/// # Errors
///
/// Returns [`CliError::ResourceNotFound`] if the workspace does not exist and
/// [`CliError::NotReady`] if the condition is absent, unreadable or not `True`.
pub async fn check_ready<C: ClusterClient>(
    client: &C,
    workspace: &WorkspaceRef,
) -> Result<Workspace, CliError> {
    let ws = client
        .get_workspace(&workspace.namespace, &workspace.name)
        .await?;
    ensure_ready(&ws)?;
    debug!(workspace = %workspace, "Workspace is ready");
    Ok(ws)
}

/// Readiness decision on an already fetched workspace.
///
/// # Errors
///
/// Returns [`CliError::NotReady`] unless `WorkspaceReady` is `True`.
pub fn ensure_ready(ws: &Workspace) -> Result<(), CliError> {
    let not_ready = || CliError::NotReady {
        name: ws.name.clone(),
        namespace: ws.namespace.clone(),
    };

    match ws.condition(WORKSPACE_READY) {
        Lookup::Found(condition) if condition.status == ConditionStatus::True => Ok(()),
        Lookup::Found(condition) => {
            debug!(
                status = %condition.status,
                reason = %condition.reason,
                message = %condition.message,
                "WorkspaceReady not True"
            );
            Err(not_ready())
        }
        Lookup::Missing => {
            debug!(workspace = %ws.name, "No WorkspaceReady condition");
            Err(not_ready())
        }
        Lookup::TypeMismatch { path, expected } => {
            warn!(workspace = %ws.name, %path, expected, "Malformed workspace status");
            Err(not_ready())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::fake::FakeCluster;
    use serde_json::{json, Value};

    fn ws(status: Value) -> Workspace {
        Workspace::new("llama", "default", json!({ "status": status }))
    }

    #[tokio::test]
    async fn ready_workspace_passes() {
        let cluster = FakeCluster::new().with_workspace(ws(json!({
            "conditions": [
                {"type": "ResourceReady", "status": "True"},
                {"type": "WorkspaceReady", "status": "True"}
            ]
        })));
        let got = check_ready(&cluster, &WorkspaceRef::new("llama", "default"))
            .await
            .expect("should be ready");
        assert_eq!(got.name, "llama");
    }

    #[tokio::test]
    async fn false_condition_is_not_ready() {
        let cluster = FakeCluster::new().with_workspace(ws(json!({
            "conditions": [{"type": "WorkspaceReady", "status": "False", "reason": "Provisioning"}]
        })));
        let err = check_ready(&cluster, &WorkspaceRef::new("llama", "default"))
            .await
            .expect_err("should not be ready");
        assert!(matches!(err, CliError::NotReady { .. }));
        assert!(err.to_string().contains("kubectl kaito status llama"));
    }

    #[tokio::test]
    async fn other_conditions_true_is_not_ready() {
        let cluster = FakeCluster::new().with_workspace(ws(json!({
            "conditions": [{"type": "InferenceReady", "status": "True"}]
        })));
        let err = check_ready(&cluster, &WorkspaceRef::new("llama", "default"))
            .await
            .expect_err("should not be ready");
        assert!(matches!(err, CliError::NotReady { .. }));
    }

    #[tokio::test]
    async fn missing_workspace_is_not_found() {
        let cluster = FakeCluster::new();
        let err = check_ready(&cluster, &WorkspaceRef::new("ghost", "default"))
            .await
            .expect_err("should fail");
        assert!(matches!(err, CliError::ResourceNotFound { kind: "workspace", .. }));
    }

    #[test]
    fn no_status_is_not_ready() {
        let w = Workspace::new("llama", "default", json!({}));
        assert!(matches!(ensure_ready(&w), Err(CliError::NotReady { .. })));
    }

    #[test]
    fn odd_sibling_condition_does_not_hide_readiness() {
        let w = ws(json!({"conditions": [
            {"type": "ResourceReady", "status": "True", "reason": null},
            {"type": "JobStarted", "status": 7},
            {"type": "WorkspaceReady", "status": "True"}
        ]}));
        assert!(ensure_ready(&w).is_ok());
    }

    #[test]
    fn malformed_conditions_are_not_ready() {
        let w = ws(json!({"conditions": {"type": "WorkspaceReady"}}));
        assert!(matches!(ensure_ready(&w), Err(CliError::NotReady { .. })));
    }
}
