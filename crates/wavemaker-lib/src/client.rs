//! Workload platform access
//!
//! The wave controller talks to the cluster through the [`WorkloadClient`]
//! trait so tests can inject a fake platform. The production implementation
//! writes through a namespaced `Api<Pod>` and reads from a label-filtered
//! reflector cache kept in sync by a background task.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, PostParams};
use kube::runtime::reflector::{self, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::ResourceExt;
use tracing::warn;

/// Label key marking a pod as belonging to a wavemaker batch
pub const DISCOVERY_LABEL: &str = "wavemaker.io/wave";

/// Minimal no-op image run by every placeholder pod
pub const PLACEHOLDER_IMAGE: &str = "public.ecr.aws/eks-distro/kubernetes/pause:3.2";

/// Platform operations the wave controller needs
#[async_trait]
pub trait WorkloadClient: Send + Sync {
    /// Create one placeholder pod.
    async fn create_pod(&self, pod: &Pod) -> Result<()>;

    /// List all pods carrying the discovery label.
    async fn list_batch(&self) -> Result<Vec<Pod>>;

    /// Delete a pod by name. An already-absent target is success.
    async fn delete_pod(&self, name: &str) -> Result<()>;
}

/// Production [`WorkloadClient`] backed by the Kubernetes API
///
/// Reads come from a reflector store fed by a background watch on the
/// discovery label; [`KubeWorkloadClient::new`] does not return until the
/// store has completed its initial sync, so the read path is warm before
/// the first wave starts.
pub struct KubeWorkloadClient {
    pods: Api<Pod>,
    cache: Store<Pod>,
}

impl KubeWorkloadClient {
    pub async fn new(client: kube::Client, namespace: &str) -> Result<Self> {
        let pods: Api<Pod> = Api::namespaced(client, namespace);

        let (reader, writer) = reflector::store();
        let watch = watcher(
            pods.clone(),
            watcher::Config::default().labels(DISCOVERY_LABEL),
        )
        .default_backoff();
        let mut stream = reflector::reflector(writer, watch).applied_objects().boxed();
        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                if let Err(e) = event {
                    warn!(error = %e, "pod cache sync error");
                }
            }
        });
        reader
            .wait_until_ready()
            .await
            .context("waiting for initial pod cache sync")?;

        Ok(Self {
            pods,
            cache: reader,
        })
    }
}

#[async_trait]
impl WorkloadClient for KubeWorkloadClient {
    async fn create_pod(&self, pod: &Pod) -> Result<()> {
        self.pods
            .create(&PostParams::default(), pod)
            .await
            .with_context(|| format!("creating pod {}", pod.name_any()))?;
        Ok(())
    }

    async fn list_batch(&self) -> Result<Vec<Pod>> {
        // The watcher is already filtered to the discovery label.
        Ok(self.cache.state().iter().map(|p| (**p).clone()).collect())
    }

    async fn delete_pod(&self, name: &str) -> Result<()> {
        match self.pods.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e).with_context(|| format!("deleting pod {name}")),
        }
    }
}

fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}
