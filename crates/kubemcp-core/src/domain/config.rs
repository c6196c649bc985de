//! Effective configuration
//!
//! The single merged, validated configuration every runtime decision reads.
//! It is immutable once built; a reload produces a fresh value instead of
//! patching this one in place.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::request::Operation;

/// Which layer a configuration value came from. Ordered lowest to highest
/// precedence; later layers win per field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
    Embedded,
    Cli,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Default => "defaults",
            Self::File => "config file",
            Self::Environment => "environment",
            Self::Embedded => "embedded config",
            Self::Cli => "command line",
        };
        f.write_str(label)
    }
}

/// The merged configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    /// Explicit kubeconfig path; `None` falls back to `~/.kube/config`
    pub kubeconfig_path: Option<PathBuf>,
    /// Kubeconfig context to select; `None` uses the file's current context
    pub context: Option<String>,
    /// API server URL for bearer-token authentication
    pub api_server: Option<String>,
    /// Bearer token for token authentication
    pub token: Option<String>,
    /// Bound on every connection attempt and cluster call, in seconds
    pub timeout_seconds: u64,
    /// Reject any operation tagged as mutating
    pub read_only: bool,
    /// Surface cluster-side 403s as permission_denied rather than generic errors
    pub rbac_check: bool,
    /// Strip the sensitive-field deny-list from every payload
    pub filter_sensitive_data: bool,
    /// Verbs a request may use; anything outside this set is rejected
    pub allowed_operations: BTreeSet<Operation>,
    /// Namespace applied to tool calls that do not name one
    pub default_namespace: String,
    /// Namespaces requests may touch; empty means unrestricted
    pub allowed_namespaces: Vec<String>,
    /// Cap on items in a single listing response
    pub max_items_per_request: usize,
    /// Cap on log lines in a single response
    pub max_log_lines: usize,
    /// Log verbosity when RUST_LOG is not set
    pub log_level: String,
    /// Emit one structured audit line per dispatched request
    pub audit_log: bool,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            kubeconfig_path: None,
            context: None,
            api_server: None,
            token: None,
            timeout_seconds: 30,
            read_only: true,
            rbac_check: true,
            filter_sensitive_data: true,
            allowed_operations: Operation::ALL.into_iter().collect(),
            default_namespace: "default".to_string(),
            allowed_namespaces: Vec::new(),
            max_items_per_request: 1000,
            max_log_lines: 100,
            log_level: "info".to_string(),
            audit_log: true,
        }
    }
}

impl EffectiveConfig {
    /// The per-call timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Whether `namespace` passes the allow-list. An empty list allows all.
    pub fn namespace_allowed(&self, namespace: &str) -> bool {
        self.allowed_namespaces.is_empty()
            || self.allowed_namespaces.iter().any(|ns| ns == namespace)
    }
}
