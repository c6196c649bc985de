//! Request-scoped types
//!
//! A `RequestContext` lives for exactly one inbound protocol call. The
//! dispatcher builds it, the safety gate fills in the decision, and it is
//! dropped when the response goes out.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Verbs a request may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    List,
    Get,
    Watch,
    Logs,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::List,
        Operation::Get,
        Operation::Watch,
        Operation::Logs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Get => "get",
            Self::Watch => "watch",
            Self::Logs => "logs",
        }
    }

    /// Whether this verb can change cluster state. Every exposed verb is a
    /// read today; the read-only gate keys off this tag so a future mutating
    /// verb cannot slip past it.
    pub fn is_mutating(&self) -> bool {
        match self {
            Self::List | Self::Get | Self::Watch | Self::Logs => false,
        }
    }
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "list" => Ok(Self::List),
            "get" => Ok(Self::Get),
            "watch" => Ok(Self::Watch),
            "logs" => Ok(Self::Logs),
            other => Err(format!("unknown operation '{other}'")),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource kinds exposed through the protocol surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Pods,
    Services,
    Deployments,
    Namespaces,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Pods,
        ResourceKind::Services,
        ResourceKind::Deployments,
        ResourceKind::Namespaces,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pods => "pods",
            Self::Services => "services",
            Self::Deployments => "deployments",
            Self::Namespaces => "namespaces",
        }
    }

    /// Namespaces themselves are cluster-scoped; everything else lives
    /// inside a namespace.
    pub fn is_namespaced(&self) -> bool {
        !matches!(self, Self::Namespaces)
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pods" => Ok(Self::Pods),
            "services" => Ok(Self::Services),
            "deployments" => Ok(Self::Deployments),
            "namespaces" => Ok(Self::Namespaces),
            other => Err(format!("unknown resource kind '{other}'")),
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the safety gate rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    OperationNotAllowed,
    ReadOnlyViolation,
    NamespaceNotAllowed,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OperationNotAllowed => "operation_not_allowed",
            Self::ReadOnlyViolation => "read_only_violation",
            Self::NamespaceNotAllowed => "namespace_not_allowed",
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The safety gate's verdict on one request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationDecision {
    pub allowed: bool,
    pub reason: Option<DenialReason>,
    /// Field names (and `*pattern*` entries) stripped from the response
    pub redact_fields: &'static [&'static str],
    /// When set, a cluster-side 403 is reported as permission_denied
    pub rbac_aware: bool,
}

impl AuthorizationDecision {
    pub fn allow(redact_fields: &'static [&'static str], rbac_aware: bool) -> Self {
        Self {
            allowed: true,
            reason: None,
            redact_fields,
            rbac_aware,
        }
    }

    pub fn deny(reason: DenialReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            redact_fields: &[],
            rbac_aware: false,
        }
    }
}

/// Everything known about one inbound call.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub operation: Operation,
    pub resource_kind: ResourceKind,
    pub namespace: Option<String>,
    /// Arguments exactly as the protocol delivered them
    pub raw_arguments: Map<String, Value>,
    /// Populated by the safety gate
    pub decision: Option<AuthorizationDecision>,
}

impl RequestContext {
    pub fn new(operation: Operation, resource_kind: ResourceKind) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            operation,
            resource_kind,
            namespace: None,
            raw_arguments: Map::new(),
            decision: None,
        }
    }

    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.raw_arguments = arguments;
        self
    }
}
