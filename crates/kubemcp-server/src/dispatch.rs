//! Request dispatch
//!
//! Every protocol call runs the same pipeline: validate arguments, consult
//! the safety gate, obtain the cluster session, run the accessor call under
//! the configured timeout, cap and redact the result, and wrap it in an
//! envelope whose metadata always reports the applied limit and whether the
//! payload was truncated. Failures come back as [`RequestError`] values; the
//! MCP handler is the only place they are translated into protocol errors.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use kubemcp_core::domain::config::EffectiveConfig;
use kubemcp_core::domain::request::{
    AuthorizationDecision, DenialReason, Operation, RequestContext, ResourceKind,
};
use kubemcp_core::error::RequestError;
use kubemcp_core::safety;

use crate::cluster::{ClusterAccess, ClusterError, ListFilter, LogQuery};
use crate::connection::ConnectionManager;

/// Log lines returned when the caller does not ask for a count.
pub const DEFAULT_LOG_LINES: usize = 100;

/// Limits applied to one response. The payload itself is capped silently;
/// this block is where a caller learns that happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseMeta {
    pub request_id: Uuid,
    pub count: usize,
    pub truncated: bool,
    pub limit_applied: usize,
}

/// A shaped, redacted payload plus its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResponse {
    pub body: Value,
    pub meta: ResponseMeta,
}

impl DispatchResponse {
    /// The wire form: the body with the metadata attached under `meta`.
    pub fn into_json(self) -> Value {
        let mut value = self.body;
        if let Value::Object(map) = &mut value {
            map.insert(
                "meta".to_string(),
                serde_json::to_value(&self.meta).unwrap_or(Value::Null),
            );
        }
        value
    }
}

pub struct RequestDispatcher {
    config: Arc<EffectiveConfig>,
    connection: Arc<ConnectionManager>,
}

impl RequestDispatcher {
    pub fn new(config: Arc<EffectiveConfig>, connection: Arc<ConnectionManager>) -> Self {
        Self { config, connection }
    }

    pub fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    /// Serve a `k8s://<kind>` resource read. Namespaced kinds fall back to
    /// the configured default namespace when the URI names none; the
    /// namespaces listing is cluster-scoped and carries no namespace.
    pub async fn read_listing(
        &self,
        kind: ResourceKind,
        namespace: Option<String>,
    ) -> Result<DispatchResponse, RequestError> {
        let namespace = if kind.is_namespaced() {
            namespace.or_else(|| Some(self.config.default_namespace.clone()))
        } else {
            None
        };
        let mut ctx = RequestContext::new(Operation::List, kind).with_namespace(namespace);
        let started = Instant::now();
        let result = self.list_inner(&mut ctx).await;
        self.audit(&ctx, &result, started);
        result
    }

    /// The `get_pod_logs` tool. `lines` defaults to [`DEFAULT_LOG_LINES`]
    /// and is capped at `max_log_lines`; the cap is reported as truncation.
    pub async fn get_pod_logs(
        &self,
        arguments: &Map<String, Value>,
    ) -> Result<DispatchResponse, RequestError> {
        let mut ctx = RequestContext::new(Operation::Logs, ResourceKind::Pods)
            .with_arguments(arguments.clone());
        let started = Instant::now();
        let result = self.logs_inner(&mut ctx).await;
        self.audit(&ctx, &result, started);
        result
    }

    /// The `describe_pod` tool.
    pub async fn describe_pod(
        &self,
        arguments: &Map<String, Value>,
    ) -> Result<DispatchResponse, RequestError> {
        let mut ctx = RequestContext::new(Operation::Get, ResourceKind::Pods)
            .with_arguments(arguments.clone());
        let started = Instant::now();
        let result = self.describe_inner(&mut ctx).await;
        self.audit(&ctx, &result, started);
        result
    }

    /// The `get_pod_status` tool: a pod listing filtered by label/field
    /// selectors. With no namespace argument the query is cluster-wide,
    /// which a namespace-restricted configuration rejects rather than
    /// narrowing silently.
    pub async fn get_pod_status(
        &self,
        arguments: &Map<String, Value>,
    ) -> Result<DispatchResponse, RequestError> {
        let mut ctx = RequestContext::new(Operation::Get, ResourceKind::Pods)
            .with_arguments(arguments.clone());
        let started = Instant::now();
        let result = self.status_inner(&mut ctx).await;
        self.audit(&ctx, &result, started);
        result
    }

    async fn list_inner(
        &self,
        ctx: &mut RequestContext,
    ) -> Result<DispatchResponse, RequestError> {
        let (decision, cluster) = self.admit(ctx).await?;
        let namespace = ctx.namespace.clone();

        let (items, truncated) = match ctx.resource_kind {
            ResourceKind::Pods => {
                let filter = ListFilter {
                    namespace,
                    ..Default::default()
                };
                self.capped(self.bounded(cluster.list_pods(&filter), &decision).await?)?
            }
            ResourceKind::Services => self.capped(
                self.bounded(cluster.list_services(namespace.as_deref()), &decision)
                    .await?,
            )?,
            ResourceKind::Deployments => self.capped(
                self.bounded(cluster.list_deployments(namespace.as_deref()), &decision)
                    .await?,
            )?,
            ResourceKind::Namespaces => {
                self.capped(self.bounded(cluster.list_namespaces(), &decision).await?)?
            }
        };

        let count = items.len();
        self.respond(
            ctx,
            &decision,
            json!({
                "kind": ctx.resource_kind.as_str(),
                "namespace": ctx.namespace,
                "items": Value::Array(items),
            }),
            count,
            truncated,
            self.config.max_items_per_request,
        )
    }

    async fn logs_inner(&self, ctx: &mut RequestContext) -> Result<DispatchResponse, RequestError> {
        let pod_name = required_str(&ctx.raw_arguments, "pod_name")?;
        let namespace = optional_str(&ctx.raw_arguments, "namespace")?
            .unwrap_or_else(|| self.config.default_namespace.clone());
        let container = optional_str(&ctx.raw_arguments, "container")?;
        let requested = optional_count(&ctx.raw_arguments, "lines")?.unwrap_or(DEFAULT_LOG_LINES);
        ctx.namespace = Some(namespace.clone());

        let capped = requested.min(self.config.max_log_lines);
        let (decision, cluster) = self.admit(ctx).await?;

        let query = LogQuery {
            container: container.clone(),
            tail_lines: capped,
        };
        let text = self
            .bounded(cluster.pod_logs(&namespace, &pod_name, &query), &decision)
            .await?;
        let returned = text.lines().count();

        self.respond(
            ctx,
            &decision,
            json!({
                "pod_name": pod_name,
                "namespace": namespace,
                "container": container,
                "logs": text,
            }),
            returned,
            requested > capped,
            capped,
        )
    }

    async fn describe_inner(
        &self,
        ctx: &mut RequestContext,
    ) -> Result<DispatchResponse, RequestError> {
        let pod_name = required_str(&ctx.raw_arguments, "pod_name")?;
        let namespace = optional_str(&ctx.raw_arguments, "namespace")?
            .unwrap_or_else(|| self.config.default_namespace.clone());
        ctx.namespace = Some(namespace.clone());

        let (decision, cluster) = self.admit(ctx).await?;
        let detail = self
            .bounded(cluster.describe_pod(&namespace, &pod_name), &decision)
            .await?;
        let detail = to_json(&detail)?;

        self.respond(ctx, &decision, json!({ "pod": detail }), 1, false, 1)
    }

    async fn status_inner(
        &self,
        ctx: &mut RequestContext,
    ) -> Result<DispatchResponse, RequestError> {
        let filter = ListFilter {
            namespace: optional_str(&ctx.raw_arguments, "namespace")?,
            label_selector: optional_str(&ctx.raw_arguments, "label_selector")?,
            field_selector: optional_str(&ctx.raw_arguments, "field_selector")?,
        };
        ctx.namespace = filter.namespace.clone();

        let (decision, cluster) = self.admit(ctx).await?;
        let (items, truncated) =
            self.capped(self.bounded(cluster.pod_status(&filter), &decision).await?)?;

        let count = items.len();
        self.respond(
            ctx,
            &decision,
            json!({
                "namespace": ctx.namespace,
                "pods": Value::Array(items),
            }),
            count,
            truncated,
            self.config.max_items_per_request,
        )
    }

    /// Gate the request, then obtain the session. A denial never reaches the
    /// connection manager.
    async fn admit(
        &self,
        ctx: &mut RequestContext,
    ) -> Result<(AuthorizationDecision, Arc<dyn ClusterAccess>), RequestError> {
        let decision = safety::authorize(ctx, &self.config);
        ctx.decision = Some(decision.clone());
        if !decision.allowed {
            let reason = decision.reason.unwrap_or(DenialReason::OperationNotAllowed);
            debug!(request_id = %ctx.request_id, reason = %reason, "request denied");
            return Err(RequestError::Denied {
                message: denial_message(ctx, reason),
                reason,
            });
        }
        let cluster = self.connection.ensure_connected().await?;
        Ok((decision, cluster))
    }

    async fn bounded<T, F>(
        &self,
        call: F,
        decision: &AuthorizationDecision,
    ) -> Result<T, RequestError>
    where
        F: Future<Output = Result<T, ClusterError>>,
    {
        match tokio::time::timeout(self.config.timeout(), call).await {
            Err(_) => Err(RequestError::Timeout {
                seconds: self.config.timeout_seconds,
            }),
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(map_cluster_error(err, decision.rbac_aware)),
        }
    }

    /// Serialize and cap a listing at `max_items_per_request`.
    fn capped<T: Serialize>(&self, items: Vec<T>) -> Result<(Vec<Value>, bool), RequestError> {
        let limit = self.config.max_items_per_request;
        let truncated = items.len() > limit;
        let mut out = Vec::with_capacity(items.len().min(limit));
        for item in items.iter().take(limit) {
            out.push(to_json(item)?);
        }
        Ok((out, truncated))
    }

    fn respond(
        &self,
        ctx: &RequestContext,
        decision: &AuthorizationDecision,
        mut body: Value,
        count: usize,
        truncated: bool,
        limit_applied: usize,
    ) -> Result<DispatchResponse, RequestError> {
        safety::redact(&mut body, decision.redact_fields);
        Ok(DispatchResponse {
            body,
            meta: ResponseMeta {
                request_id: ctx.request_id,
                count,
                truncated,
                limit_applied,
            },
        })
    }

    fn audit(
        &self,
        ctx: &RequestContext,
        result: &Result<DispatchResponse, RequestError>,
        started: Instant,
    ) {
        if !self.config.audit_log {
            return;
        }
        let outcome = match result {
            Ok(_) => "ok",
            Err(err) => err.code(),
        };
        info!(
            target: "kubemcp::audit",
            request_id = %ctx.request_id,
            operation = %ctx.operation,
            kind = %ctx.resource_kind,
            namespace = ctx.namespace.as_deref().unwrap_or("-"),
            outcome,
            duration_ms = started.elapsed().as_millis() as u64,
            "request handled"
        );
    }
}

fn denial_message(ctx: &RequestContext, reason: DenialReason) -> String {
    match reason {
        DenialReason::OperationNotAllowed => {
            format!("operation '{}' is not in the allowed set", ctx.operation)
        }
        DenialReason::ReadOnlyViolation => {
            format!("operation '{}' would mutate the cluster", ctx.operation)
        }
        DenialReason::NamespaceNotAllowed => match ctx.namespace.as_deref() {
            Some(namespace) => format!("namespace '{namespace}' is not in the allowed set"),
            None => "a namespace is required when access is namespace-restricted".to_string(),
        },
    }
}

fn map_cluster_error(err: ClusterError, rbac_aware: bool) -> RequestError {
    match err {
        ClusterError::NotFound { message } => RequestError::NotFound { message },
        ClusterError::Forbidden { message } if rbac_aware => {
            RequestError::PermissionDenied { message }
        }
        ClusterError::Forbidden { message } => RequestError::Api {
            code: Some(403),
            message,
        },
        ClusterError::Api { status, message } => RequestError::Api {
            code: Some(status),
            message,
        },
        ClusterError::Other { message } => RequestError::Api {
            code: None,
            message,
        },
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, RequestError> {
    serde_json::to_value(value).map_err(|err| RequestError::Api {
        code: None,
        message: format!("response serialization failed: {err}"),
    })
}

fn required_str(args: &Map<String, Value>, key: &str) -> Result<String, RequestError> {
    match args.get(key) {
        Some(Value::String(value)) if !value.is_empty() => Ok(value.clone()),
        Some(_) => Err(RequestError::invalid_argument(format!(
            "`{key}` must be a non-empty string"
        ))),
        None => Err(RequestError::invalid_argument(format!("`{key}` is required"))),
    }
}

fn optional_str(args: &Map<String, Value>, key: &str) -> Result<Option<String>, RequestError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) if !value.is_empty() => Ok(Some(value.clone())),
        Some(Value::String(_)) => Ok(None),
        Some(_) => Err(RequestError::invalid_argument(format!(
            "`{key}` must be a string"
        ))),
    }
}

fn optional_count(args: &Map<String, Value>, key: &str) -> Result<Option<usize>, RequestError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => match number.as_u64() {
            Some(value) if value > 0 => Ok(Some(value as usize)),
            _ => Err(RequestError::invalid_argument(format!(
                "`{key}` must be a positive integer"
            ))),
        },
        Some(_) => Err(RequestError::invalid_argument(format!(
            "`{key}` must be a positive integer"
        ))),
    }
}
