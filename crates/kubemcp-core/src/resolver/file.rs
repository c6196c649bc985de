//! YAML configuration file source.
//!
//! The file is organized into sections so operators can keep cluster access,
//! security posture, and output limits grouped. Unknown keys are ignored,
//! which lets one file serve multiple server versions.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::config::ConfigSource;
use crate::domain::request::Operation;
use crate::error::ConfigError;

use super::overlay::ConfigOverlay;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub kubernetes: KubernetesSection,
    pub security: SecuritySection,
    pub resources: ResourcesSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KubernetesSection {
    pub kubeconfig_path: Option<PathBuf>,
    pub context: Option<String>,
    pub api_server: Option<String>,
    pub token: Option<String>,
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SecuritySection {
    pub read_only_mode: Option<bool>,
    pub rbac_check: Option<bool>,
    pub filter_sensitive_data: Option<bool>,
    pub allowed_operations: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResourcesSection {
    pub default_namespace: Option<String>,
    pub allowed_namespaces: Option<Vec<String>>,
    pub max_items_per_request: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub max_log_lines: Option<usize>,
    pub enable_audit: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::File {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        serde_yaml::from_str(&raw).map_err(|err| ConfigError::File {
            path: path.display().to_string(),
            message: err.to_string(),
        })
    }

    pub fn into_overlay(self) -> Result<ConfigOverlay, ConfigError> {
        let allowed_operations = match self.security.allowed_operations {
            None => None,
            Some(names) => {
                let mut ops = BTreeSet::new();
                for name in &names {
                    let op = name.parse::<Operation>().map_err(|message| {
                        ConfigError::invalid("allowed_operations", ConfigSource::File, message)
                    })?;
                    ops.insert(op);
                }
                Some(ops)
            }
        };

        Ok(ConfigOverlay {
            kubeconfig_path: self.kubernetes.kubeconfig_path,
            context: self.kubernetes.context,
            api_server: self.kubernetes.api_server,
            token: self.kubernetes.token,
            timeout_seconds: self.kubernetes.timeout,
            read_only: self.security.read_only_mode,
            rbac_check: self.security.rbac_check,
            filter_sensitive_data: self.security.filter_sensitive_data,
            allowed_operations,
            default_namespace: self.resources.default_namespace,
            allowed_namespaces: self.resources.allowed_namespaces,
            max_items_per_request: self.resources.max_items_per_request,
            max_log_lines: self.logging.max_log_lines,
            log_level: self.logging.level,
            audit_log: self.logging.enable_audit,
        })
    }
}
