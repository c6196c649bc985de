//! Connection state model
//!
//! The manager in the server crate owns the live state machine; these are
//! the shared shapes it exposes. The snapshot keeps every strategy's
//! failure from the most recent sequence, so a successful fallback still
//! shows what the earlier strategies said.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of the single cluster session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No attempt has run yet
    Uninitialized,
    /// An authentication sequence is in flight
    Connecting,
    /// Probed and usable; terminal until an explicit reset
    Ready,
    /// The last sequence exhausted every strategy; the next request retries
    Failed,
}

/// One way of establishing a cluster session, tried in a fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategy {
    InCluster,
    KubeconfigFile,
    Token,
}

impl AuthStrategy {
    /// Narrowest credential source first.
    pub const ORDER: [AuthStrategy; 3] = [
        AuthStrategy::InCluster,
        AuthStrategy::KubeconfigFile,
        AuthStrategy::Token,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InCluster => "in_cluster",
            Self::KubeconfigFile => "kubeconfig",
            Self::Token => "token",
        }
    }
}

impl std::fmt::Display for AuthStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why one strategy did not produce a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyFailure {
    pub strategy: AuthStrategy,
    pub reason: String,
}

impl std::fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.strategy, self.reason)
    }
}

/// Point-in-time view of the connection state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    pub status: ConnectionStatus,
    /// The strategy that produced the current session, when Ready
    pub strategy: Option<AuthStrategy>,
    pub established_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Completed authentication sequences, successful or not
    pub attempt_count: u64,
    pub consecutive_failures: u32,
    /// Per-strategy outcomes from the most recent sequence
    pub failures: Vec<StrategyFailure>,
}

impl Default for ConnectionSnapshot {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::Uninitialized,
            strategy: None,
            established_at: None,
            last_attempt_at: None,
            attempt_count: 0,
            consecutive_failures: 0,
            failures: Vec::new(),
        }
    }
}
