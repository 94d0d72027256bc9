//! Route descriptor and resolution outcome.
//!
//! The descriptor is the only thing downstream layers see: the controller
//! layer reads `controller`, `method` and the captured parameters; renderers
//! read `view`, the policy and the gate state. It is built once per request
//! by [`assemble`] and never modified afterwards.

use heck::{ToLowerCamelCase, ToUpperCamelCase};
use indexmap::IndexMap;
use serde::Serialize;

use crate::config::schema::{EngineConfig, TitlePart};
use crate::routing::binder::{ArityViolation, BoundParameters};
use crate::routing::gate::GateState;
use crate::routing::policy::Policy;
use crate::routing::tree::MethodLeaf;

/// Controller used when no area was matched.
pub const INDEX_CONTROLLER: &str = "Index";

/// Values taken from the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapturedParameters {
    /// Wildcard name → captured segment, in descent order.
    pub dynamic_segments: IndexMap<String, String>,
    /// Declared label → bound value.
    pub trailing: BoundParameters,
    /// Every segment left after method selection, bound or not.
    pub raw_trailing: Vec<String>,
}

/// Authentication state handed to renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthGate {
    pub tag: Option<String>,
    pub passed: bool,
    pub blocked: bool,
    /// Tag of the first gate that failed.
    pub blocked_by: Option<String>,
    /// Alias-expanded fail URL, when one applies.
    pub fail_url: Option<String>,
}

/// Fully resolved route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDescriptor {
    controller: String,
    method: String,
    method_key: String,
    view: String,
    class_path: String,
    title: Option<String>,
    page_title: String,
    import: Vec<String>,
    base_folder: Option<String>,
    policy: Policy,
    parameters: CapturedParameters,
    gate: AuthGate,
    url_path: String,
    path: String,
}

impl RouteDescriptor {
    /// Controller identifier, e.g. `Shop` or `Admin::UserGroups`.
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Method identifier in lower camel case.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Method name as declared in config.
    pub fn method_key(&self) -> &str {
        &self.method_key
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    /// Matched areas in upper camel case, `/`-joined (`/Shop`). Empty at root.
    pub fn class_path(&self) -> &str {
        &self.class_path
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Title composed with the site name per `[title]` settings.
    pub fn page_title(&self) -> &str {
        &self.page_title
    }

    pub fn import(&self) -> &[String] {
        &self.import
    }

    pub fn base_folder(&self) -> Option<&str> {
        self.base_folder.as_deref()
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn parameters(&self) -> &CapturedParameters {
        &self.parameters
    }

    /// Shorthand for a bound trailing parameter value.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.trailing.get(name).and_then(|b| b.as_str())
    }

    /// Shorthand for a captured dynamic segment.
    pub fn segment(&self, name: &str) -> Option<&str> {
        self.parameters.dynamic_segments.get(name).map(String::as_str)
    }

    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    /// Where a blocked request should be sent, if anywhere.
    pub fn auth_redirect(&self) -> Option<&str> {
        if self.gate.blocked {
            self.gate.fail_url.as_deref()
        } else {
            None
        }
    }

    /// Matched URL prefix (areas only), e.g. `/shop`.
    pub fn url_path(&self) -> &str {
        &self.url_path
    }

    /// The request path as received.
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Outcome of resolving one request path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    Resolved(Box<RouteDescriptor>),
    /// No method leaf applies at the final tree position.
    NotFound { path: String, fallback: Option<String> },
    /// Parameter arity fallback.
    Redirect { target: String, cause: ArityViolation },
}

impl Resolution {
    /// Label used for logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            Resolution::Resolved(d) if d.gate.blocked => "blocked",
            Resolution::Resolved(_) => "resolved",
            Resolution::NotFound { .. } => "not_found",
            Resolution::Redirect { .. } => "redirect",
        }
    }

    pub fn descriptor(&self) -> Option<&RouteDescriptor> {
        match self {
            Resolution::Resolved(descriptor) => Some(descriptor),
            Resolution::NotFound { .. } | Resolution::Redirect { .. } => None,
        }
    }
}

/// Everything the walk produced, ready to be merged.
#[derive(Debug)]
pub(crate) struct Assembly<'a> {
    pub path: &'a str,
    pub areas: &'a [String],
    pub matched: &'a [String],
    pub leaf: &'a MethodLeaf,
    pub policy: Policy,
    pub dynamic_segments: IndexMap<String, String>,
    pub trailing: BoundParameters,
    pub raw_trailing: Vec<String>,
    pub gate: GateState,
    pub fail_url: Option<String>,
}

/// Merge walk results into a descriptor. Pure; no failure modes.
pub(crate) fn assemble(parts: Assembly<'_>, config: &EngineConfig) -> RouteDescriptor {
    let spec = parts.leaf.spec();
    let classes: Vec<String> = parts.areas.iter().map(|a| a.to_upper_camel_case()).collect();

    let class_path: String = classes.iter().map(|c| format!("/{}", c)).collect();
    let method = parts.leaf.name().to_lower_camel_case();

    let controller = spec.controller.clone().unwrap_or_else(|| {
        if classes.is_empty() {
            INDEX_CONTROLLER.to_string()
        } else {
            classes.join("::")
        }
    });
    let view = spec.view.clone().unwrap_or_else(|| {
        format!("{}/{}.{}", class_path, method, config.rendering.view_extension)
    });

    let page_title = compose_title(spec.title.as_deref(), &parts.policy.site_name, config);

    RouteDescriptor {
        controller,
        method,
        method_key: parts.leaf.name().to_string(),
        view,
        class_path,
        title: spec.title.clone(),
        page_title,
        import: spec.import.clone(),
        base_folder: spec.base_folder.clone(),
        policy: parts.policy,
        parameters: CapturedParameters {
            dynamic_segments: parts.dynamic_segments,
            trailing: parts.trailing,
            raw_trailing: parts.raw_trailing,
        },
        gate: AuthGate {
            tag: parts.gate.tag,
            passed: parts.gate.passed,
            blocked: parts.gate.blocked,
            blocked_by: parts.gate.blocked_by,
            fail_url: parts.fail_url,
        },
        url_path: format!("/{}", parts.matched.join("/")),
        path: parts.path.to_string(),
    }
}

fn compose_title(title: Option<&str>, site_name: &str, config: &EngineConfig) -> String {
    let title = title.filter(|t| !t.is_empty());
    config
        .title
        .template
        .iter()
        .filter_map(|part| match part {
            TitlePart::Title => title,
            TitlePart::Divisor => title.map(|_| config.title.divisor.as_str()),
            TitlePart::SiteName => Some(site_name),
        })
        .collect()
}
