//! # KubeMCP Core Library
//!
//! Domain logic and policy for the KubeMCP server.
//!
//! ## Modules
//!
//! - `domain` - Core types (EffectiveConfig, RequestContext, connection state)
//! - `resolver` - Five-source configuration resolution
//! - `safety` - Request authorization and output redaction
//! - `error` - Error taxonomy shared across crates
//!
//! Nothing in this crate talks to a cluster. The server crate owns all I/O;
//! everything here is deterministic given its inputs, which keeps the merge
//! and policy logic testable without a live API server.

pub mod domain;
pub mod error;
pub mod resolver;
pub mod safety;

// Re-export commonly used types
pub use domain::*;
pub use error::{ConfigError, ConnectionError, RequestError};
pub use resolver::{ConfigOverlay, EnvVars};
