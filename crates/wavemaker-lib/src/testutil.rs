//! Shared in-memory platform fake for unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, PodCondition, PodStatus};

use crate::client::WorkloadClient;

/// In-memory stand-in for the orchestration platform
///
/// Stores created pods in a vec, hands out generated names, and can be
/// configured to report readiness immediately, never, or to fail every
/// other create/delete call.
pub(crate) struct FakePlatform {
    pods: Mutex<Vec<Pod>>,
    ready_on_create: bool,
    fail_every_other_create: bool,
    fail_every_other_delete: bool,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    list_calls: AtomicUsize,
    delete_failures: AtomicUsize,
    seq: AtomicUsize,
}

impl FakePlatform {
    fn new(ready_on_create: bool) -> Self {
        Self {
            pods: Mutex::new(Vec::new()),
            ready_on_create,
            fail_every_other_create: false,
            fail_every_other_delete: false,
            create_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            delete_failures: AtomicUsize::new(0),
            seq: AtomicUsize::new(0),
        }
    }

    /// Created pods report a true `Ready` condition at once.
    pub(crate) fn ready_immediately() -> Self {
        Self::new(true)
    }

    /// Created pods never gain a `Ready` condition on their own.
    pub(crate) fn never_ready() -> Self {
        Self::new(false)
    }

    /// Every second create call fails.
    pub(crate) fn fail_every_other_create(mut self) -> Self {
        self.fail_every_other_create = true;
        self
    }

    /// Every second delete call fails.
    pub(crate) fn fail_every_other_delete(mut self) -> Self {
        self.fail_every_other_delete = true;
        self
    }

    /// Flip every stored pod to ready.
    pub(crate) fn mark_all_ready(&self) {
        for pod in self.pods.lock().unwrap().iter_mut() {
            pod.status = Some(ready_status());
        }
    }

    pub(crate) fn pod_count(&self) -> usize {
        self.pods.lock().unwrap().len()
    }

    pub(crate) fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn delete_failures(&self) -> usize {
        self.delete_failures.load(Ordering::SeqCst)
    }
}

fn ready_status() -> PodStatus {
    PodStatus {
        conditions: Some(vec![PodCondition {
            type_: "Ready".to_string(),
            status: "True".to_string(),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

#[async_trait]
impl WorkloadClient for FakePlatform {
    async fn create_pod(&self, pod: &Pod) -> Result<()> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_every_other_create && call % 2 == 1 {
            anyhow::bail!("simulated create failure");
        }
        let mut stored = pod.clone();
        let suffix = self.seq.fetch_add(1, Ordering::SeqCst);
        let prefix = stored.metadata.generate_name.clone().unwrap_or_default();
        stored.metadata.name = Some(format!("{prefix}{suffix}"));
        if self.ready_on_create {
            stored.status = Some(ready_status());
        }
        self.pods.lock().unwrap().push(stored);
        Ok(())
    }

    async fn list_batch(&self) -> Result<Vec<Pod>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pods.lock().unwrap().clone())
    }

    async fn delete_pod(&self, name: &str) -> Result<()> {
        let call = self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_every_other_delete && call % 2 == 1 {
            self.delete_failures.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("simulated delete failure");
        }
        // An absent target is success, mirroring the platform's not-found
        // tolerance.
        self.pods
            .lock()
            .unwrap()
            .retain(|p| p.metadata.name.as_deref() != Some(name));
        Ok(())
    }
}
