//! Request path resolution.
//!
//! # Responsibilities
//! - Own one validated configuration snapshot (settings + route tree)
//! - Run the full resolution pipeline for a path
//! - Expand aliases for every redirect target it produces
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Per-request state lives on the stack of [`Dispatcher::resolve`]
//! - Client-caused failures are [`Resolution`] values, never errors

use std::time::Instant;

use crate::config::loader::ConfigError;
use crate::config::schema::EngineConfig;
use crate::config::validation::validate_config;
use crate::observability::metrics;
use crate::routing::binder::bind;
use crate::routing::descriptor::{assemble, Assembly, Resolution};
use crate::routing::gate::{Authenticator, GateState};
use crate::routing::matcher::Walk;
use crate::routing::policy::Policy;
use crate::routing::tokenizer::tokenize;
use crate::routing::tree::RouteTree;

/// Resolves request paths against one configuration snapshot.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: EngineConfig,
    tree: RouteTree,
}

impl Dispatcher {
    /// Validate the configuration and build the route tree.
    pub fn from_config(config: EngineConfig) -> Result<Self, ConfigError> {
        let tree = validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(Self { config, tree })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tree(&self) -> &RouteTree {
        &self.tree
    }

    /// Resolve a request path (query string already stripped or ignored).
    pub fn resolve(&self, path: &str, auth: &dyn Authenticator) -> Resolution {
        let start = Instant::now();
        let resolution = self.resolve_inner(path, auth);

        metrics::record_resolution(resolution.outcome(), start.elapsed());
        tracing::debug!(path = %path, outcome = resolution.outcome(), "Route resolved");
        resolution
    }

    fn resolve_inner(&self, path: &str, auth: &dyn Authenticator) -> Resolution {
        let tokens = tokenize(path);
        let mut walk = Walk::start(self.tree.root(), Policy::seeded(&self.config), auth);
        walk.descend(&tokens, auth);

        let remaining = &tokens[walk.depth()..];
        let Some(terminal) = walk.terminal(remaining) else {
            return Resolution::NotFound {
                path: path.to_string(),
                fallback: self.fallback(&walk.policy().error404_url),
            };
        };
        walk.enter_leaf(terminal.leaf, auth);

        let trailing = &remaining[terminal.consumed..];
        let force = self.config.parameters.force;
        let bound = match bind(&terminal.leaf.spec().parameters, trailing, force) {
            Ok(bound) => bound,
            Err(cause) => {
                tracing::warn!(path = %path, error = %cause, "Parameter arity violation");
                return Resolution::Redirect {
                    target: self.expand_alias(&self.config.parameters.redirect_on_fail),
                    cause,
                };
            }
        };

        let areas = walk.areas().to_vec();
        let matched = walk.matched().to_vec();
        let (policy, captures, gate) = walk.into_parts();
        let fail_url = self.fail_url(&policy, &captures, &gate, auth);

        let descriptor = assemble(
            Assembly {
                path,
                areas: &areas,
                matched: &matched,
                leaf: terminal.leaf,
                policy,
                dynamic_segments: captures,
                trailing: bound,
                raw_trailing: trailing.iter().map(|t| t.raw().to_string()).collect(),
                gate,
                fail_url,
            },
            &self.config,
        );
        Resolution::Resolved(Box::new(descriptor))
    }

    /// Fail URL for a blocked walk: the inherited template first, then the
    /// collaborator.
    fn fail_url(
        &self,
        policy: &Policy,
        captures: &indexmap::IndexMap<String, String>,
        gate: &GateState,
        auth: &dyn Authenticator,
    ) -> Option<String> {
        if !gate.blocked {
            return None;
        }
        let url = match &policy.auth_fail_url {
            Some(template) => Some(template.render(captures)),
            None => gate.blocked_by.as_deref().and_then(|tag| auth.resolve_fail_url(tag)),
        };
        url.map(|u| self.expand_alias(&u))
    }

    fn fallback(&self, target: &str) -> Option<String> {
        if target.is_empty() {
            None
        } else {
            Some(self.expand_alias(target))
        }
    }

    /// Replace a configured alias by its URL; anything else is returned as is.
    pub fn expand_alias(&self, target: &str) -> String {
        self.config
            .url_alias
            .get(target)
            .cloned()
            .unwrap_or_else(|| target.to_string())
    }

    /// Expanded not-found target from the global settings.
    pub fn not_found_url(&self) -> Option<String> {
        self.fallback(&self.config.error404_url)
    }
}
