//! Route configuration tree.
//!
//! # Responsibilities
//! - Turn the raw `[routes]` table into typed nodes
//! - Classify keys: `/name` area, `/?name` wildcard, `@name` method leaf,
//!   anything else an inheritable attribute
//! - Reject structural mistakes before any request is served
//!
//! # Design Decisions
//! - A node holds at most one wildcard child by construction
//!   (`Option<Box<AreaNode>>`); a second one in config is a build error
//! - Segment keys are case-folded once here, never per request
//! - Build collects every error instead of stopping at the first
//! - Immutable after build; shared read-only across requests

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::routing::policy::PolicyOverrides;

/// Method selected when a request names none.
pub const DEFAULT_METHOD: &str = "main";

/// Method leaf keys that describe the endpoint rather than its policy.
const METHOD_FIELDS: &[&str] = &["view", "controller", "title", "import", "base_folder", "parameters"];

/// Structural errors found while building the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("{path}: {count} wildcard children declared, at most one is allowed (ambiguous dynamic route)")]
    AmbiguousWildcard { path: String, count: usize },

    #[error("{path}: key `{key}` names an empty segment")]
    EmptySegment { path: String, key: String },

    #[error("{path}: keys `{first}` and `{second}` collide after case folding")]
    DuplicateKey { path: String, first: String, second: String },

    #[error("{path}: expected a table")]
    NotATable { path: String },

    #[error("{path}: invalid declaration: {message}")]
    InvalidAttributes { path: String, message: String },

    #[error("{path}: parameter `{label}` declared twice")]
    DuplicateParameter { path: String, label: String },

    #[error("{path}: required parameter `{label}` follows an optional one")]
    RequiredAfterOptional { path: String, label: String },

    #[error("{path}: wildcard `?{name}` is already captured by an ancestor")]
    DuplicateCapture { path: String, name: String },
}

/// Positional parameter declared by a method leaf.
///
/// Configured as `"orderId"` (required) or `"?name"` (optional).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParameterLabel {
    name: String,
    required: bool,
}

impl ParameterLabel {
    pub fn required(name: impl Into<String>) -> Self {
        Self { name: name.into(), required: true }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self { name: name.into(), required: false }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }
}

impl TryFrom<String> for ParameterLabel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let label = match value.strip_prefix('?') {
            Some(name) => Self::optional(name),
            None => Self::required(value.as_str()),
        };
        if label.name.is_empty() {
            return Err(format!("parameter label `{}` has no name", value));
        }
        Ok(label)
    }
}

impl From<ParameterLabel> for String {
    fn from(label: ParameterLabel) -> Self {
        label.to_string()
    }
}

impl fmt::Display for ParameterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.required {
            write!(f, "{}", self.name)
        } else {
            write!(f, "?{}", self.name)
        }
    }
}

/// Endpoint description carried by a method leaf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MethodSpec {
    /// View path override.
    pub view: Option<String>,
    /// Controller identifier override.
    pub controller: Option<String>,
    /// Page title.
    pub title: Option<String>,
    /// Asset paths to import, in order.
    pub import: Vec<String>,
    /// Base folder override (file renderer).
    pub base_folder: Option<String>,
    /// Positional parameter labels.
    pub parameters: Vec<ParameterLabel>,
}

/// A concrete, invocable endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodLeaf {
    name: String,
    spec: MethodSpec,
    policy: PolicyOverrides,
}

impl MethodLeaf {
    /// Method name as declared, case-folded.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &MethodSpec {
        &self.spec
    }

    /// Policy declared on the leaf itself, applied after all areas.
    pub fn policy(&self) -> &PolicyOverrides {
        &self.policy
    }
}

/// How an area is reached from its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaKind {
    Root,
    Literal,
    Wildcard,
}

/// A non-endpoint node of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaNode {
    kind: AreaKind,
    name: String,
    policy: PolicyOverrides,
    areas: BTreeMap<String, AreaNode>,
    wildcard: Option<Box<AreaNode>>,
    methods: BTreeMap<String, MethodLeaf>,
}

impl AreaNode {
    pub fn kind(&self) -> AreaKind {
        self.kind
    }

    /// Segment name (literal areas) or capture name (wildcards). Empty at root.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &PolicyOverrides {
        &self.policy
    }

    /// Literal child area for a case-folded segment key.
    pub fn area(&self, key: &str) -> Option<&AreaNode> {
        self.areas.get(key)
    }

    pub fn wildcard(&self) -> Option<&AreaNode> {
        self.wildcard.as_deref()
    }

    /// Method leaf for a case-folded name.
    pub fn method(&self, key: &str) -> Option<&MethodLeaf> {
        self.methods.get(key)
    }

    pub fn areas(&self) -> impl Iterator<Item = &AreaNode> {
        self.areas.values()
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodLeaf> {
        self.methods.values()
    }

    /// Name the matched segment is captured under, for wildcard areas.
    pub fn capture_name(&self) -> Option<&str> {
        match self.kind {
            AreaKind::Wildcard => Some(&self.name),
            AreaKind::Root | AreaKind::Literal => None,
        }
    }

    /// Children in a stable order: literal areas, then the wildcard.
    pub fn children(&self) -> impl Iterator<Item = &AreaNode> {
        self.areas.values().chain(self.wildcard.as_deref())
    }

    /// Config-style segment for diagnostics (`shop`, `?tenant`).
    pub fn display_segment(&self) -> String {
        match self.kind {
            AreaKind::Root => String::new(),
            AreaKind::Literal => self.name.clone(),
            AreaKind::Wildcard => format!("?{}", self.name),
        }
    }
}

/// Validated, immutable route configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTree {
    root: AreaNode,
}

impl RouteTree {
    /// Build the tree from the raw `[routes]` table.
    pub fn build(routes: &toml::Table) -> Result<Self, Vec<TreeError>> {
        let mut errors = Vec::new();
        let root = build_area(AreaKind::Root, String::new(), routes, "", &[], &mut errors);

        if errors.is_empty() {
            Ok(Self { root })
        } else {
            Err(errors)
        }
    }

    pub fn root(&self) -> &AreaNode {
        &self.root
    }

    /// Number of areas, root included.
    pub fn area_count(&self) -> usize {
        fn count(node: &AreaNode) -> usize {
            1 + node.children().map(count).sum::<usize>()
        }
        count(&self.root)
    }

    /// Number of method leaves.
    pub fn method_count(&self) -> usize {
        fn count(node: &AreaNode) -> usize {
            node.methods.len() + node.children().map(count).sum::<usize>()
        }
        count(&self.root)
    }

    /// Every endpoint as a URL pattern, e.g. `/shop/checkout/{orderId}`.
    pub fn endpoints(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_endpoints(&self.root, "", &mut out);
        out
    }
}

fn collect_endpoints(node: &AreaNode, prefix: &str, out: &mut Vec<String>) {
    for leaf in node.methods() {
        let mut pattern = prefix.to_string();
        if leaf.name != DEFAULT_METHOD {
            pattern.push('/');
            pattern.push_str(&leaf.name);
        }
        for label in &leaf.spec.parameters {
            if label.required {
                pattern.push_str(&format!("/{{{}}}", label.name));
            } else {
                pattern.push_str(&format!("/{{{}?}}", label.name));
            }
        }
        if pattern.is_empty() {
            pattern.push('/');
        }
        out.push(pattern);
    }
    for child in node.children() {
        let prefix = match child.kind {
            AreaKind::Wildcard => format!("{}/{{{}}}", prefix, child.name),
            AreaKind::Root | AreaKind::Literal => format!("{}/{}", prefix, child.name),
        };
        collect_endpoints(child, &prefix, out);
    }
}

/// Classified key of an area table.
enum NodeKey<'a> {
    Area(&'a str),
    Wildcard(&'a str),
    Method(&'a str),
    Attribute,
}

fn classify(key: &str) -> NodeKey<'_> {
    if let Some(name) = key.strip_prefix("/?") {
        NodeKey::Wildcard(name)
    } else if let Some(name) = key.strip_prefix('/') {
        NodeKey::Area(name)
    } else if let Some(name) = key.strip_prefix('@') {
        NodeKey::Method(name)
    } else {
        NodeKey::Attribute
    }
}

fn label(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

fn build_area(
    kind: AreaKind,
    name: String,
    table: &toml::Table,
    path: &str,
    captured: &[String],
    errors: &mut Vec<TreeError>,
) -> AreaNode {
    let mut attributes = toml::Table::new();
    let mut areas = BTreeMap::new();
    let mut wildcards = Vec::new();
    let mut methods = BTreeMap::new();
    let mut seen: HashMap<(char, String), &str> = HashMap::new();

    for (key, value) in table {
        let (marker, segment) = match classify(key) {
            NodeKey::Attribute => {
                attributes.insert(key.clone(), value.clone());
                continue;
            }
            NodeKey::Area(segment) => ('/', segment),
            NodeKey::Wildcard(segment) => ('?', segment),
            NodeKey::Method(segment) => ('@', segment),
        };

        if segment.is_empty() {
            errors.push(TreeError::EmptySegment { path: label(path), key: key.clone() });
            continue;
        }

        let folded = segment.to_lowercase();
        if let Some(first) = seen.insert((marker, folded.clone()), key.as_str()) {
            errors.push(TreeError::DuplicateKey {
                path: label(path),
                first: first.to_string(),
                second: key.clone(),
            });
            continue;
        }

        let child_path = match marker {
            '?' => format!("{}/?{}", path, folded),
            '@' => format!("{}/@{}", path, folded),
            _ => format!("{}/{}", path, folded),
        };
        let Some(child) = value.as_table() else {
            errors.push(TreeError::NotATable { path: child_path });
            continue;
        };

        match marker {
            '/' => {
                let area =
                    build_area(AreaKind::Literal, folded.clone(), child, &child_path, captured, errors);
                areas.insert(folded, area);
            }
            '?' => {
                if captured.contains(&folded) {
                    errors.push(TreeError::DuplicateCapture { path: child_path.clone(), name: folded.clone() });
                }
                let mut scope = captured.to_vec();
                scope.push(folded.clone());
                wildcards.push(build_area(AreaKind::Wildcard, folded, child, &child_path, &scope, errors));
            }
            _ => {
                if let Some(leaf) = build_method(folded.clone(), child, &child_path, errors) {
                    methods.insert(folded, leaf);
                }
            }
        }
    }

    if wildcards.len() > 1 {
        errors.push(TreeError::AmbiguousWildcard { path: label(path), count: wildcards.len() });
    }

    AreaNode {
        kind,
        name,
        policy: parse_overrides(attributes, path, errors),
        areas,
        wildcard: wildcards.into_iter().next().map(Box::new),
        methods,
    }
}

fn build_method(
    name: String,
    table: &toml::Table,
    path: &str,
    errors: &mut Vec<TreeError>,
) -> Option<MethodLeaf> {
    let mut spec_table = toml::Table::new();
    let mut policy_table = toml::Table::new();
    for (key, value) in table {
        if METHOD_FIELDS.contains(&key.as_str()) {
            spec_table.insert(key.clone(), value.clone());
        } else {
            policy_table.insert(key.clone(), value.clone());
        }
    }

    let policy = parse_overrides(policy_table, path, errors);
    let spec: MethodSpec = match toml::Value::Table(spec_table).try_into() {
        Ok(spec) => spec,
        Err(e) => {
            errors.push(TreeError::InvalidAttributes { path: path.to_string(), message: e.to_string() });
            return None;
        }
    };

    let mut optional_seen = false;
    let mut names: Vec<&str> = Vec::with_capacity(spec.parameters.len());
    for label in &spec.parameters {
        if names.contains(&label.name()) {
            errors.push(TreeError::DuplicateParameter {
                path: path.to_string(),
                label: label.name().to_string(),
            });
        }
        names.push(label.name());

        if label.is_required() && optional_seen {
            errors.push(TreeError::RequiredAfterOptional {
                path: path.to_string(),
                label: label.name().to_string(),
            });
        }
        optional_seen |= !label.is_required();
    }

    Some(MethodLeaf { name, spec, policy })
}

fn parse_overrides(attributes: toml::Table, path: &str, errors: &mut Vec<TreeError>) -> PolicyOverrides {
    if attributes.is_empty() {
        return PolicyOverrides::default();
    }
    match toml::Value::Table(attributes).try_into() {
        Ok(overrides) => overrides,
        Err(e) => {
            errors.push(TreeError::InvalidAttributes { path: label(path), message: e.to_string() });
            PolicyOverrides::default()
        }
    }
}
