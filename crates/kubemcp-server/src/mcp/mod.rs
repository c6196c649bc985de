//! MCP protocol surface: `k8s://` URIs and the server handler.

mod handler;
pub mod uri;

pub use handler::KubeMcpHandler;
