//! Placeholder pod batches
//!
//! Builds the pod spec shared by a wave's members and runs the per-batch
//! create and delete sweeps. Both sweeps tolerate individual failures: a
//! pod that cannot be created or deleted is logged and counted, never
//! aborts the batch. Batch membership is always re-derived from the
//! platform by label query afterwards, never from sweep return values.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Affinity, Container, Pod, PodAffinityTerm, PodAntiAffinity, PodSpec, ResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::ResourceExt;
use tracing::{error, info};

use crate::client::{WorkloadClient, DISCOVERY_LABEL, PLACEHOLDER_IMAGE};
use crate::names;
use crate::requests::ResourceRequests;

/// Topology key the anti-affinity term spreads across
const HOSTNAME_TOPOLOGY_KEY: &str = "kubernetes.io/hostname";

/// Build one placeholder pod for a batch
///
/// Every member shares the name prefix, discovery label, resource requests,
/// and a required anti-affinity term that keeps two members off the same
/// host. Uniqueness comes from the server-side `generateName` suffix.
pub fn placeholder_pod(prefix: &str, namespace: &str, requests: &ResourceRequests) -> Pod {
    let labels: BTreeMap<String, String> =
        [(DISCOVERY_LABEL.to_string(), "true".to_string())].into();
    Pod {
        metadata: ObjectMeta {
            generate_name: Some(format!("{prefix}-")),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: "default".to_string(),
                image: Some(PLACEHOLDER_IMAGE.to_string()),
                resources: Some(ResourceRequirements {
                    requests: Some(requests.to_resource_list()),
                    ..Default::default()
                }),
                ..Default::default()
            }],
            affinity: Some(Affinity {
                pod_anti_affinity: Some(PodAntiAffinity {
                    required_during_scheduling_ignored_during_execution: Some(vec![
                        PodAffinityTerm {
                            label_selector: Some(LabelSelector {
                                match_labels: Some(labels),
                                ..Default::default()
                            }),
                            topology_key: HOSTNAME_TOPOLOGY_KEY.to_string(),
                            ..Default::default()
                        },
                    ]),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Create `count` placeholder pods sharing one random name prefix
///
/// Individual creation failures are logged and skipped. Returns the number
/// of successful creations.
pub async fn create_batch(
    client: &dyn WorkloadClient,
    count: usize,
    namespace: &str,
    requests: &ResourceRequests,
) -> usize {
    let prefix = names::batch_prefix();
    let mut success = 0;
    for _ in 0..count {
        let pod = placeholder_pod(&prefix, namespace, requests);
        match client.create_pod(&pod).await {
            Ok(()) => success += 1,
            Err(e) => error!(prefix = %prefix, error = %e, "creating pod"),
        }
    }
    info!(pods = success, prefix = %prefix, "created pods");
    success
}

/// Delete every pod currently carrying the discovery label
///
/// Already-absent targets count as success; true failures are logged and
/// the sweep continues. Returns the number of successful deletions. A
/// failure to list the batch is returned to the caller; the termination
/// poll re-derives membership and retries under its own policy.
pub async fn deprovision_batch(client: &dyn WorkloadClient) -> anyhow::Result<usize> {
    let pods = client.list_batch().await?;
    let mut success = 0;
    for pod in &pods {
        let name = pod.name_any();
        match client.delete_pod(&name).await {
            Ok(()) => success += 1,
            Err(e) => error!(pod = %name, error = %e, "deleting pod"),
        }
    }
    info!(pods = success, "deleted pods");
    Ok(success)
}

/// Whether the platform reports this pod's `Ready` condition as true
pub fn is_pod_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .map(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
        .unwrap_or(false)
}
