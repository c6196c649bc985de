//! Connection state tracking
//!
//! One `ConnectionState` exists per process. Writers hold the lock only for
//! the duration of a field update, never across an await.

use chrono::Utc;
use parking_lot::RwLock;

use kubemcp_core::domain::connection::{
    AuthStrategy, ConnectionSnapshot, ConnectionStatus, StrategyFailure,
};

#[derive(Debug, Default)]
pub struct ConnectionState {
    snapshot: RwLock<ConnectionSnapshot>,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.snapshot.read().clone()
    }

    /// Begin a new attempt sequence. The attempt counter stays where it is:
    /// it only moves when a sequence completes, so a caller that snapshots
    /// mid-sequence still holds the pre-completion epoch and can recognize
    /// the in-flight outcome as the one to adopt.
    pub fn mark_connecting(&self) {
        let mut snapshot = self.snapshot.write();
        snapshot.status = ConnectionStatus::Connecting;
        snapshot.strategy = None;
        snapshot.last_attempt_at = Some(Utc::now());
        snapshot.failures.clear();
    }

    /// The sequence succeeded with `strategy`. Failures from the strategies
    /// tried before it stay in the snapshot as diagnostics.
    pub fn mark_ready(&self, strategy: AuthStrategy, failures: Vec<StrategyFailure>) {
        let mut snapshot = self.snapshot.write();
        snapshot.status = ConnectionStatus::Ready;
        snapshot.strategy = Some(strategy);
        snapshot.established_at = Some(Utc::now());
        snapshot.attempt_count += 1;
        snapshot.consecutive_failures = 0;
        snapshot.failures = failures;
    }

    /// Every strategy failed.
    pub fn mark_failed(&self, failures: Vec<StrategyFailure>) {
        let mut snapshot = self.snapshot.write();
        snapshot.status = ConnectionStatus::Failed;
        snapshot.strategy = None;
        snapshot.established_at = None;
        snapshot.attempt_count += 1;
        snapshot.consecutive_failures += 1;
        snapshot.failures = failures;
    }

    /// Forget the session entirely; the next request starts from scratch.
    pub fn reset(&self) {
        *self.snapshot.write() = ConnectionSnapshot::default();
    }
}
