//! # KubeMCP Server
//!
//! Read-only Kubernetes cluster access over the Model Context Protocol.
//!
//! ## Modules
//!
//! - `connection` - Lazy session establishment with strategy fallback
//! - `cluster` - The accessor seam and compact record shapes
//! - `dispatch` - The request pipeline: gate, connect, bound, cap, redact
//! - `mcp` - Protocol handler and `k8s://` URI parsing
//!
//! Policy lives in `kubemcp-core`; this crate owns all I/O.

pub mod cluster;
pub mod connection;
pub mod dispatch;
pub mod mcp;

pub use connection::{ConnectBackend, ConnectionManager, KubeConnectBackend};
pub use dispatch::{DispatchResponse, RequestDispatcher, ResponseMeta};
pub use mcp::KubeMcpHandler;
