//! Tree descent for one request.
//!
//! # Responsibilities
//! - Consume tokens against literal children, then the wildcard child
//! - Fold each visited node's policy into the accumulator
//! - Evaluate authentication gates as nodes are entered
//! - Pick the terminal method once descent stops
//!
//! # Design Decisions
//! - A [`Walk`] is request-scoped and owned by the caller; nothing is shared
//! - Literal child beats a method leaf of the same name, which beats the wildcard
//! - Gates run on entry, so a captured tag sees the capture just made
//! - The default method consumes no token

use indexmap::IndexMap;

use crate::routing::gate::{Authenticator, GateState};
use crate::routing::policy::{Policy, PolicyOverrides};
use crate::routing::tokenizer::Segment;
use crate::routing::tree::{AreaKind, AreaNode, MethodLeaf, DEFAULT_METHOD};

/// State accumulated while descending the tree.
#[derive(Debug, Clone)]
pub struct Walk<'t> {
    node: &'t AreaNode,
    policy: Policy,
    captures: IndexMap<String, String>,
    gate: GateState,
    areas: Vec<String>,
    matched: Vec<String>,
}

/// Method picked at the final tree position.
#[derive(Debug, Clone, Copy)]
pub struct Terminal<'t> {
    pub leaf: &'t MethodLeaf,
    /// Tokens consumed by the method name (0 or 1).
    pub consumed: usize,
}

impl<'t> Walk<'t> {
    /// Begin at the root, applying its own declarations.
    pub fn start(root: &'t AreaNode, seed: Policy, auth: &dyn Authenticator) -> Self {
        let mut walk = Self {
            node: root,
            policy: seed,
            captures: IndexMap::new(),
            gate: GateState::default(),
            areas: Vec::new(),
            matched: Vec::new(),
        };
        walk.visit(root.policy(), auth);
        walk
    }

    /// Consume as many leading tokens as the tree allows.
    pub fn descend(&mut self, tokens: &[Segment], auth: &dyn Authenticator) {
        for token in tokens {
            let node = self.node;
            let child = match node.area(token.key()) {
                Some(area) => area,
                None if node.method(token.key()).is_some() => break,
                None => match node.wildcard() {
                    Some(wildcard) => wildcard,
                    None => break,
                },
            };
            self.enter(child, token, auth);
        }
    }

    fn enter(&mut self, child: &'t AreaNode, token: &Segment, auth: &dyn Authenticator) {
        if child.kind() == AreaKind::Wildcard {
            self.captures.insert(child.name().to_string(), token.raw().to_string());
        }
        self.areas.push(child.name().to_string());
        self.matched.push(token.raw().to_string());
        tracing::debug!(segment = %token.raw(), area = %child.name(), depth = self.areas.len(), "Descended");
        self.node = child;
        self.visit(child.policy(), auth);
    }

    /// Apply a node's overrides and run its gate, if it declares one.
    fn visit(&mut self, overrides: &PolicyOverrides, auth: &dyn Authenticator) {
        self.policy.apply(overrides);

        let Some(tag) = &overrides.auth_tag else {
            return;
        };
        let gate = std::mem::take(&mut self.gate);
        self.gate = match tag.resolve(&self.captures) {
            Some(resolved) => gate.evaluate(resolved, auth),
            None => {
                tracing::warn!(tag = %tag, "Authentication tag names no captured segment");
                gate.unresolved()
            }
        };
    }

    /// Select the method at the current node.
    ///
    /// `remaining` are the tokens descent did not consume.
    pub fn terminal(&self, remaining: &[Segment]) -> Option<Terminal<'t>> {
        let node = self.node;
        if let Some(leaf) = remaining.first().and_then(|t| node.method(t.key())) {
            return Some(Terminal { leaf, consumed: 1 });
        }
        node.method(DEFAULT_METHOD).map(|leaf| Terminal { leaf, consumed: 0 })
    }

    /// Enter the selected method leaf; its declarations are merged last.
    pub fn enter_leaf(&mut self, leaf: &MethodLeaf, auth: &dyn Authenticator) {
        self.visit(leaf.policy(), auth);
    }

    pub fn node(&self) -> &'t AreaNode {
        self.node
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn captures(&self) -> &IndexMap<String, String> {
        &self.captures
    }

    pub fn gate(&self) -> &GateState {
        &self.gate
    }

    /// Names of the areas entered, root excluded.
    pub fn areas(&self) -> &[String] {
        &self.areas
    }

    /// Raw tokens consumed by areas.
    pub fn matched(&self) -> &[String] {
        &self.matched
    }

    /// Number of tokens consumed by descent.
    pub fn depth(&self) -> usize {
        self.matched.len()
    }

    /// Hand the accumulated state over to assembly.
    pub fn into_parts(self) -> (Policy, IndexMap<String, String>, GateState) {
        (self.policy, self.captures, self.gate)
    }
}
