//! Domain types for configuration, requests, and connection state
//!
//! - Configuration (EffectiveConfig and the source it came from)
//! - Requests (Operation, ResourceKind, RequestContext, AuthorizationDecision)
//! - Connection state (status, strategy, diagnostics snapshot)

pub mod config;
pub mod connection;
pub mod request;

pub use config::*;
pub use connection::*;
pub use request::*;
