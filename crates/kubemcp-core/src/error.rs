//! Error taxonomy
//!
//! Three families: configuration errors (fatal at startup, recoverable on
//! reload), connection errors (every strategy exhausted), and per-request
//! errors (translated into structured protocol payloads, never raw panics).

use thiserror::Error;

use crate::domain::config::ConfigSource;
use crate::domain::connection::StrategyFailure;
use crate::domain::request::DenialReason;

/// Configuration that cannot be resolved into an effective config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A source supplied a value that fails validation or parsing.
    #[error("invalid value for `{field}` from {origin}: {message}")]
    InvalidValue {
        field: &'static str,
        origin: ConfigSource,
        message: String,
    },
    /// The YAML file could not be read or parsed.
    #[error("config file {path}: {message}")]
    File { path: String, message: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, origin: ConfigSource, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            origin,
            message: message.into(),
        }
    }
}

/// Every authentication strategy failed or was inapplicable. Carries each
/// strategy's own reason; callers need the full diagnostic, not the last one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to establish cluster connection: [{}]", format_attempts(attempts))]
pub struct ConnectionError {
    pub attempts: Vec<StrategyFailure>,
}

fn format_attempts(attempts: &[StrategyFailure]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A failure inside one dispatched request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The safety gate rejected the request.
    #[error("{reason}: {message}")]
    Denied {
        reason: DenialReason,
        message: String,
    },
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    /// Cluster-side RBAC said no to the authenticated identity.
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
    #[error("request exceeded the {seconds}s timeout")]
    Timeout { seconds: u64 },
    #[error("not found: {message}")]
    NotFound { message: String },
    /// Any other cluster API failure, reported by kind only.
    #[error("cluster api error: {message}")]
    Api { code: Option<u16>, message: String },
}

impl RequestError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for the protocol error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Denied { reason, .. } => reason.as_str(),
            Self::Connection(_) => "connection_error",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::Timeout { .. } => "timeout",
            Self::NotFound { .. } => "not_found",
            Self::Api { .. } => "cluster_api_error",
        }
    }
}
