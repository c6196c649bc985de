//! Partial configuration fragments.
//!
//! Every source (environment, file, embedded overlay, CLI) is normalized to a
//! [`ConfigOverlay`] before merging, so the merge itself is a single
//! field-by-field pass regardless of where the values came from.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::domain::request::Operation;

/// A sparse set of configuration fields. `None` means "this source has
/// nothing to say about the field", never "unset the field".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverlay {
    pub kubeconfig_path: Option<PathBuf>,
    pub context: Option<String>,
    pub api_server: Option<String>,
    pub token: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub read_only: Option<bool>,
    pub rbac_check: Option<bool>,
    pub filter_sensitive_data: Option<bool>,
    pub allowed_operations: Option<BTreeSet<Operation>>,
    pub default_namespace: Option<String>,
    pub allowed_namespaces: Option<Vec<String>>,
    pub max_items_per_request: Option<usize>,
    pub max_log_lines: Option<usize>,
    pub log_level: Option<String>,
    pub audit_log: Option<bool>,
}

impl ConfigOverlay {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
