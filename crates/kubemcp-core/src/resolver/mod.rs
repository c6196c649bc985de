//! Configuration resolution
//!
//! Five layers merge into one immutable [`EffectiveConfig`]: hardcoded
//! defaults, then the YAML file, then environment variables, then an
//! embedded overlay, then CLI flags. The merge is per field; a layer that
//! omits a field leaves the lower layer's value in place.

mod env;
mod file;
mod overlay;

pub use env::{overlay_from_env, EnvVars};
pub use file::FileConfig;
pub use overlay::ConfigOverlay;

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::domain::config::{ConfigSource, EffectiveConfig};
use crate::error::ConfigError;

/// File consulted when no explicit config path is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Merge every configuration layer and validate the result.
///
/// `embedded` is for callers that construct the server in process instead
/// of launching the binary; it sits between the environment and the CLI.
/// Missing optional layers are skipped, but an explicitly named config
/// file that does not exist is an error.
pub fn resolve(
    cli: &ConfigOverlay,
    embedded: Option<&ConfigOverlay>,
    config_file: Option<&Path>,
    env: &EnvVars,
) -> Result<EffectiveConfig, ConfigError> {
    let mut merged = Merged::new();

    if let Some(overlay) = file_overlay(config_file)? {
        merged.apply(&overlay, ConfigSource::File);
    }
    merged.apply(&overlay_from_env(env)?, ConfigSource::Environment);
    if let Some(overlay) = embedded {
        merged.apply(overlay, ConfigSource::Embedded);
    }
    merged.apply(cli, ConfigSource::Cli);

    merged.validate()?;
    info!(
        read_only = merged.config.read_only,
        rbac_check = merged.config.rbac_check,
        filter_sensitive_data = merged.config.filter_sensitive_data,
        timeout_seconds = merged.config.timeout_seconds,
        allowed_operations = merged.config.allowed_operations.len(),
        "configuration resolved"
    );
    Ok(merged.config)
}

fn file_overlay(config_file: Option<&Path>) -> Result<Option<ConfigOverlay>, ConfigError> {
    let path = match config_file {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::File {
                    path: path.display().to_string(),
                    message: "file not found".to_string(),
                });
            }
            path.to_path_buf()
        }
        None => {
            let fallback = Path::new(DEFAULT_CONFIG_FILE);
            if !fallback.exists() {
                return Ok(None);
            }
            fallback.to_path_buf()
        }
    };
    debug!(path = %path.display(), "loading config file");
    FileConfig::load(&path)?.into_overlay().map(Some)
}

/// Accumulator for the upward merge. Tracks which layer set each field so
/// validation errors can name the source that supplied the bad value.
struct Merged {
    config: EffectiveConfig,
    origins: BTreeMap<&'static str, ConfigSource>,
}

impl Merged {
    fn new() -> Self {
        Self {
            config: EffectiveConfig::default(),
            origins: BTreeMap::new(),
        }
    }

    fn origin(&self, field: &'static str) -> ConfigSource {
        self.origins
            .get(field)
            .copied()
            .unwrap_or(ConfigSource::Default)
    }

    fn apply(&mut self, overlay: &ConfigOverlay, source: ConfigSource) {
        if let Some(path) = &overlay.kubeconfig_path {
            self.config.kubeconfig_path = Some(path.clone());
            self.origins.insert("kubeconfig_path", source);
        }
        if let Some(context) = &overlay.context {
            self.config.context = Some(context.clone());
            self.origins.insert("context", source);
        }
        if let Some(api_server) = &overlay.api_server {
            self.config.api_server = Some(api_server.clone());
            self.origins.insert("api_server", source);
        }
        if let Some(token) = &overlay.token {
            self.config.token = Some(token.clone());
            self.origins.insert("token", source);
        }
        if let Some(timeout) = overlay.timeout_seconds {
            self.config.timeout_seconds = timeout;
            self.origins.insert("timeout_seconds", source);
        }
        if let Some(read_only) = overlay.read_only {
            log_safety_flag("read_only", self.config.read_only, read_only, source);
            self.config.read_only = read_only;
            self.origins.insert("read_only", source);
        }
        if let Some(rbac_check) = overlay.rbac_check {
            log_safety_flag("rbac_check", self.config.rbac_check, rbac_check, source);
            self.config.rbac_check = rbac_check;
            self.origins.insert("rbac_check", source);
        }
        if let Some(filter) = overlay.filter_sensitive_data {
            self.config.filter_sensitive_data = filter;
            self.origins.insert("filter_sensitive_data", source);
        }
        if let Some(ops) = &overlay.allowed_operations {
            self.config.allowed_operations = ops.clone();
            self.origins.insert("allowed_operations", source);
        }
        if let Some(namespace) = &overlay.default_namespace {
            self.config.default_namespace = namespace.clone();
            self.origins.insert("default_namespace", source);
        }
        if let Some(namespaces) = &overlay.allowed_namespaces {
            self.config.allowed_namespaces = namespaces.clone();
            self.origins.insert("allowed_namespaces", source);
        }
        if let Some(max_items) = overlay.max_items_per_request {
            self.config.max_items_per_request = max_items;
            self.origins.insert("max_items_per_request", source);
        }
        if let Some(max_lines) = overlay.max_log_lines {
            self.config.max_log_lines = max_lines;
            self.origins.insert("max_log_lines", source);
        }
        if let Some(level) = &overlay.log_level {
            self.config.log_level = level.clone();
            self.origins.insert("log_level", source);
        }
        if let Some(audit) = overlay.audit_log {
            self.config.audit_log = audit;
            self.origins.insert("audit_log", source);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.config.timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "timeout_seconds",
                self.origin("timeout_seconds"),
                "must be a positive integer",
            ));
        }
        if self.config.max_items_per_request == 0 {
            return Err(ConfigError::invalid(
                "max_items_per_request",
                self.origin("max_items_per_request"),
                "must be a positive integer",
            ));
        }
        if self.config.max_log_lines == 0 {
            return Err(ConfigError::invalid(
                "max_log_lines",
                self.origin("max_log_lines"),
                "must be a positive integer",
            ));
        }
        if self.config.allowed_operations.is_empty() {
            warn!("allowed_operations is empty; every request will be rejected");
        }
        Ok(())
    }
}

/// Safety flag changes are never silent. Disabling one is a warning naming
/// the layer that did it.
fn log_safety_flag(field: &'static str, before: bool, after: bool, source: ConfigSource) {
    if before && !after {
        warn!(field, source = %source, "safety flag disabled");
    } else {
        debug!(field, value = after, source = %source, "safety flag set");
    }
}
