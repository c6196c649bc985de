//! Request authorization
//!
//! [`authorize`] is a pure function of the request context and the
//! effective configuration. It performs no I/O and never fails; every
//! outcome is a decision, and the dispatcher turns denials into
//! structured errors.
//!
//! Checks run in a fixed order and stop at the first denial:
//! 1. the verb must be in `allowed_operations`
//! 2. under `read_only`, mutating verbs are rejected
//! 3. under a namespace allow-list, namespaced requests must name a
//!    listed namespace; a request naming none is rejected, never
//!    broadened to "all allowed namespaces"
//! 4. `rbac_check` only annotates the decision; the cluster enforces
//!    RBAC on the authenticated identity

mod redaction;

pub use redaction::{redact, DENY_LIST};

use crate::domain::config::EffectiveConfig;
use crate::domain::request::{AuthorizationDecision, DenialReason, RequestContext};

pub fn authorize(ctx: &RequestContext, config: &EffectiveConfig) -> AuthorizationDecision {
    if !config.allowed_operations.contains(&ctx.operation) {
        return AuthorizationDecision::deny(DenialReason::OperationNotAllowed);
    }

    // No mutating verb is exposed today; the check guards future ones.
    if config.read_only && ctx.operation.is_mutating() {
        return AuthorizationDecision::deny(DenialReason::ReadOnlyViolation);
    }

    // Cluster-scoped kinds carry no namespace, so the allow-list does not
    // apply to them.
    if !config.allowed_namespaces.is_empty() && ctx.resource_kind.is_namespaced() {
        match ctx.namespace.as_deref() {
            Some(namespace) if config.namespace_allowed(namespace) => {}
            _ => return AuthorizationDecision::deny(DenialReason::NamespaceNotAllowed),
        }
    }

    let redact_fields: &'static [&'static str] = if config.filter_sensitive_data {
        DENY_LIST
    } else {
        &[]
    };
    AuthorizationDecision::allow(redact_fields, config.rbac_check)
}
