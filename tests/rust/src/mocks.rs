//! In-memory mocks for the connect backend and the cluster accessor.
//!
//! `MockConnectBackend` scripts one outcome per authentication strategy and
//! counts attempts, so lifecycle tests can assert exactly how many sequences
//! ran. `MockCluster` serves canned records, counts accessor calls, and can
//! inject delays and failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use kubemcp_core::domain::config::EffectiveConfig;
use kubemcp_core::domain::connection::AuthStrategy;
use kubemcp_server::cluster::{
    ClusterAccess, ClusterError, DeploymentRecord, ListFilter, LogQuery, NamespaceRecord,
    PodDetail, PodRecord, PodStatusRecord, ServiceRecord,
};
use kubemcp_server::connection::ConnectBackend;

// ============================================================================
// MockConnectBackend
// ============================================================================

/// What one scripted strategy does when the manager reaches it.
#[derive(Clone)]
pub enum ScriptedOutcome {
    /// Fails the applicability check; no attempt is spent.
    Inapplicable(&'static str),
    /// Attempt runs and fails with this reason.
    Fails(&'static str),
    /// Attempt holds the sequence briefly, then fails, so another caller
    /// can arrive while the state is still Connecting.
    FailsSlowly(&'static str),
    /// Attempt never completes; only the manager's timeout ends it.
    Hangs,
    /// Attempt succeeds with this accessor.
    Succeeds(Arc<MockCluster>),
}

pub struct MockConnectBackend {
    outcomes: Mutex<HashMap<AuthStrategy, ScriptedOutcome>>,
    attempts: Mutex<HashMap<AuthStrategy, usize>>,
}

impl Default for MockConnectBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnectBackend {
    /// Every strategy starts inapplicable; script the ones the test needs.
    pub fn new() -> Self {
        let outcomes = AuthStrategy::ORDER
            .into_iter()
            .map(|strategy| (strategy, ScriptedOutcome::Inapplicable("not scripted")))
            .collect();
        Self {
            outcomes: Mutex::new(outcomes),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_outcome(self, strategy: AuthStrategy, outcome: ScriptedOutcome) -> Self {
        self.outcomes.lock().insert(strategy, outcome);
        self
    }

    pub fn script(&self, strategy: AuthStrategy, outcome: ScriptedOutcome) {
        self.outcomes.lock().insert(strategy, outcome);
    }

    /// Attempts spent on one strategy (applicability checks not included).
    pub fn attempts(&self, strategy: AuthStrategy) -> usize {
        self.attempts.lock().get(&strategy).copied().unwrap_or(0)
    }

    pub fn total_attempts(&self) -> usize {
        self.attempts.lock().values().sum()
    }

    fn outcome(&self, strategy: AuthStrategy) -> ScriptedOutcome {
        self.outcomes
            .lock()
            .get(&strategy)
            .cloned()
            .unwrap_or(ScriptedOutcome::Inapplicable("not scripted"))
    }
}

#[async_trait]
impl ConnectBackend for MockConnectBackend {
    fn applicable(&self, strategy: AuthStrategy, _config: &EffectiveConfig) -> Result<(), String> {
        match self.outcome(strategy) {
            ScriptedOutcome::Inapplicable(reason) => Err(reason.to_string()),
            _ => Ok(()),
        }
    }

    async fn attempt(
        &self,
        strategy: AuthStrategy,
        _config: &EffectiveConfig,
    ) -> Result<Arc<dyn ClusterAccess>, String> {
        *self.attempts.lock().entry(strategy).or_insert(0) += 1;
        match self.outcome(strategy) {
            ScriptedOutcome::Inapplicable(reason) => Err(reason.to_string()),
            ScriptedOutcome::Fails(reason) => Err(reason.to_string()),
            ScriptedOutcome::FailsSlowly(reason) => {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Err(reason.to_string())
            }
            ScriptedOutcome::Hangs => {
                tokio::time::sleep(Duration::from_secs(86_400)).await;
                Err("hang elapsed".to_string())
            }
            ScriptedOutcome::Succeeds(cluster) => Ok(cluster as Arc<dyn ClusterAccess>),
        }
    }
}

// ============================================================================
// MockCluster
// ============================================================================

#[derive(Default)]
pub struct MockCluster {
    pods: Mutex<Vec<PodRecord>>,
    services: Mutex<Vec<ServiceRecord>>,
    deployments: Mutex<Vec<DeploymentRecord>>,
    namespaces: Mutex<Vec<NamespaceRecord>>,
    statuses: Mutex<Vec<PodStatusRecord>>,
    /// Keyed by `namespace/name`.
    pod_details: Mutex<HashMap<String, PodDetail>>,
    log_lines: Mutex<Vec<String>>,
    fail_with: Mutex<Option<ClusterError>>,
    probe_failure: Mutex<Option<ClusterError>>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
    probe_calls: AtomicUsize,
    last_filter: Mutex<Option<ListFilter>>,
    last_log_query: Mutex<Option<(String, String, LogQuery)>>,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pods(self, pods: Vec<PodRecord>) -> Self {
        *self.pods.lock() = pods;
        self
    }

    pub fn with_namespaces(self, namespaces: Vec<NamespaceRecord>) -> Self {
        *self.namespaces.lock() = namespaces;
        self
    }

    pub fn with_statuses(self, statuses: Vec<PodStatusRecord>) -> Self {
        *self.statuses.lock() = statuses;
        self
    }

    pub fn with_pod_detail(self, detail: PodDetail) -> Self {
        let key = format!("{}/{}", detail.namespace, detail.name);
        self.pod_details.lock().insert(key, detail);
        self
    }

    pub fn with_log_lines(self, count: usize) -> Self {
        *self.log_lines.lock() = (0..count).map(|i| format!("line-{i}")).collect();
        self
    }

    /// Every accessor call fails with `err`.
    pub fn with_failure(self, err: ClusterError) -> Self {
        *self.fail_with.lock() = Some(err);
        self
    }

    /// The liveness probe fails; accessor calls are unaffected.
    pub fn with_probe_failure(self, err: ClusterError) -> Self {
        *self.probe_failure.lock() = Some(err);
        self
    }

    /// Every accessor call sleeps before answering.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = Some(delay);
        self
    }

    /// Accessor calls served (the liveness probe is counted separately).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn last_filter(&self) -> Option<ListFilter> {
        self.last_filter.lock().clone()
    }

    pub fn last_log_query(&self) -> Option<(String, String, LogQuery)> {
        self.last_log_query.lock().clone()
    }

    async fn begin(&self) -> Result<(), ClusterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.fail_with.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ClusterAccess for MockCluster {
    async fn probe(&self) -> Result<String, ClusterError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        match self.probe_failure.lock().clone() {
            Some(err) => Err(err),
            None => Ok("v1.28.4-mock".to_string()),
        }
    }

    async fn list_pods(&self, filter: &ListFilter) -> Result<Vec<PodRecord>, ClusterError> {
        self.begin().await?;
        *self.last_filter.lock() = Some(filter.clone());
        Ok(self.pods.lock().clone())
    }

    async fn list_services(
        &self,
        _namespace: Option<&str>,
    ) -> Result<Vec<ServiceRecord>, ClusterError> {
        self.begin().await?;
        Ok(self.services.lock().clone())
    }

    async fn list_deployments(
        &self,
        _namespace: Option<&str>,
    ) -> Result<Vec<DeploymentRecord>, ClusterError> {
        self.begin().await?;
        Ok(self.deployments.lock().clone())
    }

    async fn list_namespaces(&self) -> Result<Vec<NamespaceRecord>, ClusterError> {
        self.begin().await?;
        Ok(self.namespaces.lock().clone())
    }

    async fn describe_pod(&self, namespace: &str, name: &str) -> Result<PodDetail, ClusterError> {
        self.begin().await?;
        self.pod_details
            .lock()
            .get(&format!("{namespace}/{name}"))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound {
                message: format!("pods \"{name}\" not found"),
            })
    }

    async fn pod_status(&self, filter: &ListFilter) -> Result<Vec<PodStatusRecord>, ClusterError> {
        self.begin().await?;
        *self.last_filter.lock() = Some(filter.clone());
        Ok(self.statuses.lock().clone())
    }

    async fn pod_logs(
        &self,
        namespace: &str,
        name: &str,
        query: &LogQuery,
    ) -> Result<String, ClusterError> {
        self.begin().await?;
        *self.last_log_query.lock() =
            Some((namespace.to_string(), name.to_string(), query.clone()));
        let lines = self.log_lines.lock();
        let skip = lines.len().saturating_sub(query.tail_lines);
        Ok(lines[skip..].join("\n"))
    }
}

// ============================================================================
// Record fixtures
// ============================================================================

pub fn pod(name: &str, namespace: &str) -> PodRecord {
    PodRecord {
        name: name.to_string(),
        namespace: namespace.to_string(),
        status: Some("Running".to_string()),
        created: Some("2024-05-01T12:00:00+00:00".to_string()),
        ready_containers: 1,
        total_containers: 1,
        node: Some("node-a".to_string()),
        pod_ip: Some("10.0.0.5".to_string()),
    }
}

pub fn pods(count: usize, namespace: &str) -> Vec<PodRecord> {
    (0..count).map(|i| pod(&format!("pod-{i}"), namespace)).collect()
}

pub fn namespace_record(name: &str, labels: &[(&str, &str)]) -> NamespaceRecord {
    NamespaceRecord {
        name: name.to_string(),
        status: Some("Active".to_string()),
        created: Some("2024-05-01T12:00:00+00:00".to_string()),
        labels: labels
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
    }
}

pub fn pod_detail(name: &str, namespace: &str) -> PodDetail {
    PodDetail {
        name: name.to_string(),
        namespace: namespace.to_string(),
        status: Some("Running".to_string()),
        created: Some("2024-05-01T12:00:00+00:00".to_string()),
        node: Some("node-a".to_string()),
        pod_ip: Some("10.0.0.5".to_string()),
        host_ip: Some("192.168.1.10".to_string()),
        labels: [("app".to_string(), "web".to_string())].into(),
        annotations: Default::default(),
        containers: Vec::new(),
        conditions: Vec::new(),
    }
}

pub fn status_record(name: &str, namespace: &str, phase: &str) -> PodStatusRecord {
    PodStatusRecord {
        name: name.to_string(),
        namespace: namespace.to_string(),
        phase: Some(phase.to_string()),
        ready: "1/1".to_string(),
        restarts: 0,
        age: Some("2024-05-01T12:00:00+00:00".to_string()),
        node: Some("node-a".to_string()),
        pod_ip: Some("10.0.0.5".to_string()),
        reason: None,
    }
}
