//! Connection lifecycle
//!
//! The cluster session is established lazily, on the first request that
//! needs it. Authentication strategies are tried in a fixed order, every
//! attempt is bounded by the configured timeout, and a candidate session
//! must pass a liveness probe before the state flips to Ready. Once Ready,
//! later calls reuse the session without re-authenticating.

mod backend;
mod state;

pub use backend::KubeConnectBackend;
pub use state::ConnectionState;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use kubemcp_core::domain::config::EffectiveConfig;
use kubemcp_core::domain::connection::{AuthStrategy, ConnectionStatus, StrategyFailure};
use kubemcp_core::error::ConnectionError;

use crate::cluster::ClusterAccess;

/// One authentication mechanism, as seen by the manager. Splitting the
/// applicability check from the attempt keeps the fallback loop a plain
/// iteration and lets tests script each strategy independently.
#[async_trait]
pub trait ConnectBackend: Send + Sync {
    /// Fast eligibility check. `Err(reason)` skips the strategy without
    /// spending an attempt on it.
    fn applicable(&self, strategy: AuthStrategy, config: &EffectiveConfig) -> Result<(), String>;

    /// Authenticate with one strategy and return a live accessor.
    async fn attempt(
        &self,
        strategy: AuthStrategy,
        config: &EffectiveConfig,
    ) -> Result<Arc<dyn ClusterAccess>, String>;
}

pub struct ConnectionManager {
    config: Arc<EffectiveConfig>,
    backend: Arc<dyn ConnectBackend>,
    state: ConnectionState,
    handle: parking_lot::RwLock<Option<Arc<dyn ClusterAccess>>>,
    /// Serializes attempt sequences so concurrent early requests share one.
    connect_lock: tokio::sync::Mutex<()>,
}

impl ConnectionManager {
    pub fn new(config: Arc<EffectiveConfig>, backend: Arc<dyn ConnectBackend>) -> Self {
        Self {
            config,
            backend,
            state: ConnectionState::new(),
            handle: parking_lot::RwLock::new(None),
            connect_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> kubemcp_core::domain::connection::ConnectionSnapshot {
        self.state.snapshot()
    }

    /// Return the live accessor, establishing it first if needed.
    ///
    /// Callers that arrive while another task is mid-sequence wait for that
    /// sequence and adopt its outcome; a Failed state starts exactly one new
    /// sequence on the next call.
    pub async fn ensure_connected(&self) -> Result<Arc<dyn ClusterAccess>, ConnectionError> {
        if let Some(handle) = self.ready_handle() {
            return Ok(handle);
        }

        // The epoch counts completed sequences, so a caller that arrives
        // before or during the current sequence holds the pre-completion
        // value; a higher epoch after the lock means a sequence finished
        // while we waited and its failure is ours to adopt.
        let observed = self.state.snapshot();
        let _guard = self.connect_lock.lock().await;

        if let Some(handle) = self.ready_handle() {
            return Ok(handle);
        }
        let current = self.state.snapshot();
        if current.status == ConnectionStatus::Failed
            && current.attempt_count > observed.attempt_count
        {
            return Err(ConnectionError {
                attempts: current.failures,
            });
        }

        self.connect_sequence().await
    }

    /// Drop the session and return to Uninitialized. The next request will
    /// authenticate from scratch; used when configuration is reloaded.
    pub async fn reset(&self) {
        let _guard = self.connect_lock.lock().await;
        *self.handle.write() = None;
        self.state.reset();
        info!("cluster connection reset");
    }

    fn ready_handle(&self) -> Option<Arc<dyn ClusterAccess>> {
        if self.state.snapshot().status == ConnectionStatus::Ready {
            self.handle.read().clone()
        } else {
            None
        }
    }

    async fn connect_sequence(&self) -> Result<Arc<dyn ClusterAccess>, ConnectionError> {
        self.state.mark_connecting();
        let timeout = self.config.timeout();
        let mut failures: Vec<StrategyFailure> = Vec::new();

        for strategy in AuthStrategy::ORDER {
            if let Err(reason) = self.backend.applicable(strategy, &self.config) {
                debug!(strategy = %strategy, reason = %reason, "strategy not applicable");
                failures.push(StrategyFailure {
                    strategy,
                    reason: format!("skipped: {reason}"),
                });
                continue;
            }

            info!(strategy = %strategy, "attempting cluster authentication");
            let handle = match tokio::time::timeout(
                timeout,
                self.backend.attempt(strategy, &self.config),
            )
            .await
            {
                Err(_) => {
                    failures.push(StrategyFailure {
                        strategy,
                        reason: format!("timed out after {}s", self.config.timeout_seconds),
                    });
                    continue;
                }
                Ok(Err(reason)) => {
                    failures.push(StrategyFailure { strategy, reason });
                    continue;
                }
                Ok(Ok(handle)) => handle,
            };

            // A session that authenticates but cannot serve a cheap read is
            // treated like any other strategy failure; fallback continues.
            match tokio::time::timeout(timeout, handle.probe()).await {
                Err(_) => {
                    failures.push(StrategyFailure {
                        strategy,
                        reason: format!(
                            "liveness probe timed out after {}s",
                            self.config.timeout_seconds
                        ),
                    });
                }
                Ok(Err(err)) => {
                    failures.push(StrategyFailure {
                        strategy,
                        reason: format!("liveness probe failed: {err}"),
                    });
                }
                Ok(Ok(version)) => {
                    info!(
                        strategy = %strategy,
                        version = %version,
                        skipped_or_failed = failures.len(),
                        "cluster connection established"
                    );
                    *self.handle.write() = Some(Arc::clone(&handle));
                    self.state.mark_ready(strategy, failures);
                    return Ok(handle);
                }
            }
        }

        warn!(
            attempts = failures.len(),
            "no authentication strategy produced a usable session"
        );
        self.state.mark_failed(failures.clone());
        Err(ConnectionError { attempts: failures })
    }
}
