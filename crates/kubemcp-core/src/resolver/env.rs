//! Environment variable source.
//!
//! Variables are captured into an [`EnvVars`] snapshot up front. Tests inject
//! their own pairs instead of mutating the process environment, which is not
//! safe under a multi-threaded test runner.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::domain::config::ConfigSource;
use crate::domain::request::Operation;
use crate::error::ConfigError;

use super::overlay::ConfigOverlay;

pub const ENV_KUBECONFIG: &str = "KUBECONFIG";
pub const ENV_CONTEXT: &str = "MCP_KUBERNETES_CONTEXT";
pub const ENV_API_SERVER: &str = "MCP_KUBERNETES_API_SERVER";
pub const ENV_API_TOKEN: &str = "MCP_KUBERNETES_API_TOKEN";
pub const ENV_TIMEOUT: &str = "MCP_KUBERNETES_TIMEOUT";
pub const ENV_READ_ONLY: &str = "MCP_KUBERNETES_READ_ONLY";
pub const ENV_RBAC_CHECK: &str = "MCP_KUBERNETES_RBAC_CHECK";
pub const ENV_FILTER_SENSITIVE: &str = "MCP_KUBERNETES_FILTER_SENSITIVE";
pub const ENV_ALLOWED_OPERATIONS: &str = "MCP_KUBERNETES_ALLOWED_OPERATIONS";
pub const ENV_NAMESPACE: &str = "MCP_KUBERNETES_NAMESPACE";
pub const ENV_ALLOWED_NAMESPACES: &str = "MCP_KUBERNETES_ALLOWED_NAMESPACES";
pub const ENV_MAX_RESOURCES: &str = "MCP_KUBERNETES_MAX_RESOURCES";
pub const ENV_LOG_LINES: &str = "MCP_KUBERNETES_LOG_LINES";
pub const ENV_LOG_LEVEL: &str = "MCP_KUBERNETES_LOG_LEVEL";

/// Snapshot of the variables the resolver reads.
#[derive(Debug, Clone, Default)]
pub struct EnvVars {
    vars: HashMap<String, String>,
}

impl EnvVars {
    /// Capture from the real process environment.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build from explicit pairs, for tests and embedding.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Non-empty value for `key`, if set. Empty strings count as unset so
    /// `MCP_KUBERNETES_CONTEXT=` does not override a file-provided context.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }
}

/// Translate the snapshot into an overlay, failing on unparseable values
/// rather than silently falling back to defaults.
pub fn overlay_from_env(env: &EnvVars) -> Result<ConfigOverlay, ConfigError> {
    let mut overlay = ConfigOverlay::default();

    if let Some(path) = env.get(ENV_KUBECONFIG) {
        overlay.kubeconfig_path = Some(PathBuf::from(path));
    }
    overlay.context = env.get(ENV_CONTEXT).map(str::to_string);
    overlay.api_server = env.get(ENV_API_SERVER).map(str::to_string);
    overlay.token = env.get(ENV_API_TOKEN).map(str::to_string);
    overlay.timeout_seconds = parse_u64(env, ENV_TIMEOUT, "timeout_seconds")?;
    overlay.read_only = parse_bool(env, ENV_READ_ONLY, "read_only")?;
    overlay.rbac_check = parse_bool(env, ENV_RBAC_CHECK, "rbac_check")?;
    overlay.filter_sensitive_data = parse_bool(env, ENV_FILTER_SENSITIVE, "filter_sensitive_data")?;
    overlay.allowed_operations = parse_operations(env)?;
    overlay.default_namespace = env.get(ENV_NAMESPACE).map(str::to_string);
    overlay.allowed_namespaces = env
        .get(ENV_ALLOWED_NAMESPACES)
        .map(|raw| split_list(raw).map(str::to_string).collect());
    overlay.max_items_per_request = parse_usize(env, ENV_MAX_RESOURCES, "max_items_per_request")?;
    overlay.max_log_lines = parse_usize(env, ENV_LOG_LINES, "max_log_lines")?;
    overlay.log_level = env.get(ENV_LOG_LEVEL).map(str::to_string);

    Ok(overlay)
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|part| !part.is_empty())
}

fn parse_bool(
    env: &EnvVars,
    key: &str,
    field: &'static str,
) -> Result<Option<bool>, ConfigError> {
    let Some(raw) = env.get(key) else {
        return Ok(None);
    };
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(Some(true)),
        "false" | "0" | "no" => Ok(Some(false)),
        other => Err(ConfigError::invalid(
            field,
            ConfigSource::Environment,
            format!("{key}={other:?} is not a boolean (expected true/false, 1/0, yes/no)"),
        )),
    }
}

fn parse_u64(env: &EnvVars, key: &str, field: &'static str) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = env.get(key) else {
        return Ok(None);
    };
    raw.parse::<u64>().map(Some).map_err(|_| {
        ConfigError::invalid(
            field,
            ConfigSource::Environment,
            format!("{key}={raw:?} is not a non-negative integer"),
        )
    })
}

fn parse_usize(env: &EnvVars, key: &str, field: &'static str) -> Result<Option<usize>, ConfigError> {
    let Some(raw) = env.get(key) else {
        return Ok(None);
    };
    raw.parse::<usize>().map(Some).map_err(|_| {
        ConfigError::invalid(
            field,
            ConfigSource::Environment,
            format!("{key}={raw:?} is not a non-negative integer"),
        )
    })
}

fn parse_operations(env: &EnvVars) -> Result<Option<BTreeSet<Operation>>, ConfigError> {
    let Some(raw) = env.get(ENV_ALLOWED_OPERATIONS) else {
        return Ok(None);
    };
    let mut ops = BTreeSet::new();
    for part in split_list(raw) {
        let op = part.parse::<Operation>().map_err(|message| {
            ConfigError::invalid("allowed_operations", ConfigSource::Environment, message)
        })?;
        ops.insert(op);
    }
    Ok(Some(ops))
}
