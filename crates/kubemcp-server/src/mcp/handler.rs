//! MCP protocol handler
//!
//! The protocol boundary. Resource reads and tool calls are forwarded to
//! the dispatcher; every internal error is translated here into either a
//! protocol error or an `is_error` tool result carrying a structured
//! `{"error": {"code", "message"}}` envelope. Nothing below this layer
//! formats protocol payloads.

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::{
    model::*,
    service::RequestContext as McpRequestContext,
    ErrorData as McpError, RoleServer, ServerHandler,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use kubemcp_core::error::RequestError;

use crate::dispatch::{DispatchResponse, RequestDispatcher};

use super::uri;

#[derive(Clone)]
pub struct KubeMcpHandler {
    dispatcher: Arc<RequestDispatcher>,
}

impl KubeMcpHandler {
    pub fn new(dispatcher: Arc<RequestDispatcher>) -> Self {
        Self { dispatcher }
    }

    fn render(response: DispatchResponse) -> Result<String, McpError> {
        serde_json::to_string_pretty(&response.into_json())
            .map_err(|err| McpError::internal_error(format!("rendering response: {err}"), None))
    }
}

impl ServerHandler for KubeMcpHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "kubemcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Read-only view of a Kubernetes cluster. Resources list pods, \
                 services, deployments, and namespaces; tools fetch pod logs, \
                 pod details, and filtered pod status. No operation mutates \
                 cluster state."
                    .to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _params: Option<PaginatedRequestParams>,
        _context: McpRequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let resources = vec![
            resource(
                "k8s://pods",
                "Pods",
                "Pods in a namespace: phase, container readiness, node, pod IP",
            ),
            resource(
                "k8s://services",
                "Services",
                "Services in a namespace: type, cluster IP, ports, selector",
            ),
            resource(
                "k8s://deployments",
                "Deployments",
                "Deployments in a namespace: desired/ready/updated/available replicas",
            ),
            resource(
                "k8s://namespaces",
                "Namespaces",
                "All namespaces: phase and labels",
            ),
        ];
        debug!(count = resources.len(), "list_resources");
        Ok(ListResourcesResult::with_all_items(resources))
    }

    async fn read_resource(
        &self,
        params: ReadResourceRequestParams,
        _context: McpRequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        debug!(uri = %params.uri, "read_resource");
        let (kind, namespace) = uri::parse(&params.uri).map_err(protocol_error)?;
        let response = self
            .dispatcher
            .read_listing(kind, namespace)
            .await
            .map_err(protocol_error)?;
        let text = Self::render(response)?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, params.uri)],
        })
    }

    async fn list_tools(
        &self,
        _params: Option<PaginatedRequestParams>,
        _context: McpRequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = vec![
            tool(
                "get_pod_logs",
                "Fetch recent log lines from a pod's container",
                json!({
                    "type": "object",
                    "properties": {
                        "pod_name": {"type": "string", "description": "Name of the pod"},
                        "namespace": {"type": "string", "description": "Namespace of the pod (defaults to the configured namespace)"},
                        "lines": {"type": "integer", "minimum": 1, "description": "Number of log lines to return (capped by the server)"},
                        "container": {"type": "string", "description": "Container name, for multi-container pods"}
                    },
                    "required": ["pod_name"]
                }),
            ),
            tool(
                "describe_pod",
                "Detailed view of one pod: containers, conditions, node, IPs, labels",
                json!({
                    "type": "object",
                    "properties": {
                        "pod_name": {"type": "string", "description": "Name of the pod"},
                        "namespace": {"type": "string", "description": "Namespace of the pod (defaults to the configured namespace)"}
                    },
                    "required": ["pod_name"]
                }),
            ),
            tool(
                "get_pod_status",
                "Pod status listing, optionally filtered by namespace and selectors",
                json!({
                    "type": "object",
                    "properties": {
                        "namespace": {"type": "string", "description": "Restrict to one namespace; omit for all namespaces"},
                        "label_selector": {"type": "string", "description": "Kubernetes label selector, e.g. app=web"},
                        "field_selector": {"type": "string", "description": "Kubernetes field selector, e.g. status.phase=Running"}
                    }
                }),
            ),
        ];
        debug!(count = tools.len(), "list_tools");
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        params: CallToolRequestParams,
        _context: McpRequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let arguments = params.arguments.unwrap_or_default();
        info!(tool = %params.name, "call_tool");

        let result = match params.name.as_ref() {
            "get_pod_logs" => self.dispatcher.get_pod_logs(&arguments).await,
            "describe_pod" => self.dispatcher.describe_pod(&arguments).await,
            "get_pod_status" => self.dispatcher.get_pod_status(&arguments).await,
            other => {
                return Err(McpError::invalid_params(
                    format!("unknown tool '{other}'"),
                    None,
                ))
            }
        };

        match result {
            Ok(response) => Ok(CallToolResult {
                content: vec![Content::text(Self::render(response)?)],
                structured_content: None,
                is_error: Some(false),
                meta: None,
            }),
            Err(err) => {
                debug!(tool = %params.name, code = err.code(), "tool call failed");
                let envelope = json!({
                    "error": {
                        "code": err.code(),
                        "message": err.to_string(),
                    }
                });
                Ok(CallToolResult {
                    content: vec![Content::text(envelope.to_string())],
                    structured_content: None,
                    is_error: Some(true),
                    meta: None,
                })
            }
        }
    }
}

fn resource(uri: &'static str, name: &str, description: &str) -> Resource {
    let mut raw = RawResource::new(uri, name.to_string());
    raw.description = Some(description.to_string());
    raw.mime_type = Some("application/json".to_string());
    raw.no_annotation()
}

fn tool(name: &'static str, description: &'static str, schema: Value) -> Tool {
    let schema = match schema {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    };
    Tool::new(
        Cow::Borrowed(name),
        Cow::Borrowed(description),
        Arc::new(schema),
    )
}

/// Resource reads have no in-band error channel, so failures become
/// protocol errors. Only the error code and a readable reason cross this
/// boundary.
fn protocol_error(err: RequestError) -> McpError {
    let data = Some(json!({"code": err.code()}));
    match err {
        RequestError::InvalidArgument { .. } => McpError::invalid_params(err.to_string(), data),
        _ => McpError::internal_error(err.to_string(), data),
    }
}
