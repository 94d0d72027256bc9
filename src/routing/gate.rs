//! Authentication gate evaluation.
//!
//! # Responsibilities
//! - Define the contract of the authentication collaborator
//! - Record pass/block state as gates are met during descent
//!
//! # Design Decisions
//! - The gate never redirects or renders; it only records state
//! - Blocking is sticky: once a gate fails, later passes cannot clear it
//! - Collaborator calls are synchronous (backed by in-memory session state)

use std::collections::HashSet;

use serde::Serialize;

use crate::observability::metrics;

/// Authentication collaborator consulted for every gate.
pub trait Authenticator {
    /// True if the current request holds a valid grant for `tag`.
    fn validate(&self, tag: &str) -> bool;

    /// Where to send a request that failed the gate for `tag`, if known.
    fn resolve_fail_url(&self, _tag: &str) -> Option<String> {
        None
    }
}

impl<A: Authenticator + ?Sized> Authenticator for &A {
    fn validate(&self, tag: &str) -> bool {
        (**self).validate(tag)
    }

    fn resolve_fail_url(&self, tag: &str) -> Option<String> {
        (**self).resolve_fail_url(tag)
    }
}

/// Fixed set of granted tags.
#[derive(Debug, Clone, Default)]
pub struct GrantedTags(HashSet<String>);

impl GrantedTags {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tags.into_iter().map(Into::into).collect())
    }
}

impl Authenticator for GrantedTags {
    fn validate(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }
}

/// Gate outcome accumulated along one walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateState {
    /// Last tag evaluated, after capture substitution.
    pub tag: Option<String>,
    /// Result of the last evaluation.
    pub passed: bool,
    /// Set by the first failed evaluation; never cleared.
    pub blocked: bool,
    /// Tag of the first failed evaluation.
    pub blocked_by: Option<String>,
}

impl Default for GateState {
    fn default() -> Self {
        Self {
            tag: None,
            passed: true,
            blocked: false,
            blocked_by: None,
        }
    }
}

impl GateState {
    /// Evaluate a gate for an already resolved tag.
    pub fn evaluate(self, tag: String, auth: &dyn Authenticator) -> Self {
        let passed = auth.validate(&tag);
        metrics::record_gate_check(passed);

        let mut blocked_by = self.blocked_by;
        if !passed && !self.blocked {
            tracing::warn!(tag = %tag, "Authentication gate blocked");
            blocked_by = Some(tag.clone());
        }

        Self {
            blocked: self.blocked || !passed,
            blocked_by,
            tag: Some(tag),
            passed,
        }
    }

    /// A gate whose captured tag could not be resolved fails closed.
    pub fn unresolved(self) -> Self {
        Self {
            tag: None,
            passed: false,
            blocked: true,
            blocked_by: self.blocked_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_gate_passes() {
        let gate = GateState::default();
        assert!(gate.passed);
        assert!(!gate.blocked);
        assert_eq!(gate.tag, None);
    }

    #[test]
    fn test_block_is_sticky() {
        let auth = GrantedTags::new(["admin"]);
        let gate = GateState::default()
            .evaluate("customer".into(), &auth)
            .evaluate("admin".into(), &auth);

        assert!(gate.passed);
        assert!(gate.blocked);
        assert_eq!(gate.tag.as_deref(), Some("admin"));
        assert_eq!(gate.blocked_by.as_deref(), Some("customer"));
    }

    #[test]
    fn test_first_failure_is_kept() {
        let auth = GrantedTags::default();
        let gate = GateState::default()
            .evaluate("customer".into(), &auth)
            .evaluate("admin".into(), &auth)
            .unresolved();

        assert!(gate.blocked);
        assert_eq!(gate.blocked_by.as_deref(), Some("customer"));
    }

    #[test]
    fn test_all_passing() {
        let auth = GrantedTags::new(["customer", "admin"]);
        let gate = GateState::default()
            .evaluate("customer".into(), &auth)
            .evaluate("admin".into(), &auth);
        assert!(gate.passed);
        assert!(!gate.blocked);
        assert_eq!(gate.blocked_by, None);
    }

    #[test]
    fn test_reference_forwarding() {
        struct Deny;
        impl Authenticator for Deny {
            fn validate(&self, _tag: &str) -> bool {
                false
            }
            fn resolve_fail_url(&self, tag: &str) -> Option<String> {
                Some(format!("/login?for={}", tag))
            }
        }

        let deny = Deny;
        let by_ref: &dyn Authenticator = &&deny;
        assert!(!by_ref.validate("x"));
        assert_eq!(by_ref.resolve_fail_url("x").as_deref(), Some("/login?for=x"));
    }
}
