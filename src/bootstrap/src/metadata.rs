//! Post-provisioning node metadata and cluster join.
//!
//! Label, taint, and annotation appends go through the cluster-management
//! CLI; join resolves the control-plane endpoint first, then runs kubeadm
//! with the shared bootstrap token.

use std::sync::Arc;

use machine::RemoteHost;

use crate::cluster::ClusterConfig;
use crate::command::{Command, KubectlCommand, RemoteCommand};
use crate::error::StructuredError;

/// Run a CLI-wrapped command and translate the outcome into the shared
/// error contract. Non-empty stderr counts as failure even on a clean exit.
fn run_cli(command: &dyn Command, reason: &str) -> Result<String, StructuredError> {
    let (output, error) = command.execute();
    if let Some(e) = error {
        return Err(StructuredError::new(
            reason,
            format!("`{}`: {e}", command.describe()),
        ));
    }
    if !output.error_output.is_empty() {
        return Err(StructuredError::new(
            reason,
            format!("`{}`: {}", command.describe(), output.error_text().trim()),
        ));
    }
    Ok(output.standard_text())
}

/// Append one label to a node.
pub fn append_label(
    host: Arc<dyn RemoteHost>,
    kubeconfig: &str,
    node: &str,
    key: &str,
    value: &str,
) -> Result<String, StructuredError> {
    let pair = format!("{key}={value}");
    let command = KubectlCommand::new(host)
        .args(["label", "node", node, pair.as_str(), "--overwrite"])
        .kubeconfig(kubeconfig);
    tracing::info!("[Metadata] Appending label {pair} to {node}");
    run_cli(&command, "Append label to node error")
}

/// Append one taint to a node. `effect` is NoSchedule, PreferNoSchedule,
/// or NoExecute.
pub fn append_taint(
    host: Arc<dyn RemoteHost>,
    kubeconfig: &str,
    node: &str,
    key: &str,
    value: &str,
    effect: &str,
) -> Result<String, StructuredError> {
    let taint = format!("{key}={value}:{effect}");
    let command = KubectlCommand::new(host)
        .args(["taint", "node", node, taint.as_str(), "--overwrite"])
        .kubeconfig(kubeconfig);
    tracing::info!("[Metadata] Appending taint {taint} to {node}");
    run_cli(&command, "Append taint to node error")
}

/// Append one annotation to a node.
pub fn append_annotation(
    host: Arc<dyn RemoteHost>,
    kubeconfig: &str,
    node: &str,
    key: &str,
    value: &str,
) -> Result<String, StructuredError> {
    let pair = format!("{key}={value}");
    let command = KubectlCommand::new(host)
        .args(["annotate", "node", node, pair.as_str(), "--overwrite"])
        .kubeconfig(kubeconfig);
    tracing::info!("[Metadata] Appending annotation {key} to {node}");
    run_cli(&command, "Append annotation to node error")
}

/// Join this machine to the cluster. The control-plane endpoint is resolved
/// from the cluster's connectivity mode before the join command is built.
pub fn join_cluster(
    host: Arc<dyn RemoteHost>,
    cluster: &ClusterConfig,
) -> Result<String, StructuredError> {
    if cluster.bootstrap_token.is_empty() {
        return Err(StructuredError::invalid_parameter(
            "bootstrap token cannot be empty",
        ));
    }
    let endpoint = cluster.control_plane_endpoint()?;

    let command = RemoteCommand::new(host, "kubeadm").args([
        "join".to_string(),
        endpoint.to_string(),
        "--token".to_string(),
        cluster.bootstrap_token.clone(),
        "--discovery-token-unsafe-skip-ca-verification".to_string(),
    ]);
    tracing::info!("[Metadata] Joining cluster via {endpoint}");

    let (output, error) = command.execute();
    if let Some(e) = error {
        return Err(StructuredError::new(
            "Join node to cluster error",
            format!("`{}`: {e}", command.describe()),
        ));
    }
    Ok(output.standard_text())
}
