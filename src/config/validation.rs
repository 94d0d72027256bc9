//! Configuration validation.
//!
//! # Responsibilities
//! - Build the route tree (structural checks live in the builder)
//! - Walk the built tree with inherited policy for semantic checks
//! - Validate settings values (addresses, redirect targets)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: EngineConfig → Result<RouteTree, Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::EngineConfig;
use crate::routing::policy::{AuthTag, Policy, PolicyOverrides};
use crate::routing::tree::{AreaKind, AreaNode, RouteTree, TreeError};

/// A configuration problem that prevents the engine from starting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("{path}: auth tag `?{name}` does not name a wildcard on its path")]
    UnboundAuthTag { path: String, name: String },

    #[error("{path}: auth fail url refers to `?{name}`, which is not captured on its path")]
    UnboundFailUrl { path: String, name: String },

    #[error("{path}: no renderer declared on the path and no default renderer configured")]
    MissingRenderer { path: String },

    #[error("{field}: invalid socket address `{value}`")]
    InvalidAddress { field: String, value: String },

    #[error("{field}: must not be empty")]
    EmptyValue { field: String },

    #[error("{field}: `{value}` is neither an absolute path, a URL, nor a known alias")]
    UnknownRedirect { field: String, value: String },
}

/// Validate the whole configuration and return the route tree it describes.
pub fn validate_config(config: &EngineConfig) -> Result<RouteTree, Vec<ValidationError>> {
    let mut errors = Vec::new();
    validate_settings(config, &mut errors);

    let tree = match RouteTree::build(&config.routes) {
        Ok(tree) => tree,
        Err(tree_errors) => {
            errors.extend(tree_errors.into_iter().map(ValidationError::from));
            return Err(errors);
        }
    };

    let mut captures = Vec::new();
    check_area(tree.root(), "", Policy::seeded(config), &mut captures, config, &mut errors);

    if errors.is_empty() {
        Ok(tree)
    } else {
        Err(errors)
    }
}

fn validate_settings(config: &EngineConfig, errors: &mut Vec<ValidationError>) {
    check_address("listener.bind_address", &config.listener.bind_address, errors);
    if config.observability.metrics_enabled {
        check_address("observability.metrics_address", &config.observability.metrics_address, errors);
    }

    if config.parameters.redirect_on_fail.is_empty() {
        errors.push(ValidationError::EmptyValue {
            field: "parameters.redirect_on_fail".to_string(),
        });
    } else {
        check_redirect("parameters.redirect_on_fail", &config.parameters.redirect_on_fail, config, errors);
    }
    if !config.error404_url.is_empty() {
        check_redirect("error404_url", &config.error404_url, config, errors);
    }
    if let Some(target) = &config.offline.redirect_to {
        check_redirect("offline.redirect_to", target, config, errors);
    }
}

fn check_address(field: &str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

fn check_redirect(field: &str, value: &str, config: &EngineConfig, errors: &mut Vec<ValidationError>) {
    let absolute = value.starts_with('/') || value.contains("://");
    if !absolute && !config.url_alias.contains_key(value) {
        errors.push(ValidationError::UnknownRedirect {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

fn check_area(
    node: &AreaNode,
    prefix: &str,
    mut policy: Policy,
    captures: &mut Vec<String>,
    config: &EngineConfig,
    errors: &mut Vec<ValidationError>,
) {
    let path = match node.kind() {
        AreaKind::Root => String::new(),
        AreaKind::Literal | AreaKind::Wildcard => format!("{}/{}", prefix, node.display_segment()),
    };
    let shown = if path.is_empty() { "/" } else { path.as_str() };

    if let Some(name) = node.capture_name() {
        captures.push(name.to_string());
    }
    policy.apply(node.policy());
    check_overrides(node.policy(), shown, captures, config, errors);

    for leaf in node.methods() {
        let leaf_path = format!("{}/@{}", path, leaf.name());
        let mut effective = policy.clone();
        effective.apply(leaf.policy());
        check_overrides(leaf.policy(), &leaf_path, captures, config, errors);

        if let Some(url) = &effective.auth_fail_url {
            for name in url.captured_names() {
                if !captures.iter().any(|c| c == name) {
                    errors.push(ValidationError::UnboundFailUrl {
                        path: leaf_path.clone(),
                        name: name.to_string(),
                    });
                }
            }
        }
        if effective.renderer.is_none() {
            errors.push(ValidationError::MissingRenderer { path: leaf_path });
        }
    }

    for child in node.children() {
        check_area(child, &path, policy.clone(), captures, config, errors);
    }

    if node.capture_name().is_some() {
        captures.pop();
    }
}

/// Checks on what a single node declares.
fn check_overrides(
    overrides: &PolicyOverrides,
    path: &str,
    captures: &[String],
    config: &EngineConfig,
    errors: &mut Vec<ValidationError>,
) {
    if let Some(AuthTag::Captured(name)) = &overrides.auth_tag {
        if !captures.iter().any(|c| c == name) {
            errors.push(ValidationError::UnboundAuthTag {
                path: path.to_string(),
                name: name.clone(),
            });
        }
    }
    if let Some(url) = &overrides.error404_url {
        check_redirect(&format!("{} error404_url", path), url, config, errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(src: &str) -> Result<RouteTree, Vec<ValidationError>> {
        let config: EngineConfig = toml::from_str(src).unwrap();
        validate_config(&config)
    }

    #[test]
    fn test_valid_config() {
        let tree = validate(
            r#"
            [routes]
            renderer = "view"
            "@main" = {}

            [routes."/?tenant"]
            auth_tag = "?tenant"
            auth_fail_url = "/?tenant/login"
            "@main" = {}
            "#,
        )
        .unwrap();
        assert_eq!(tree.method_count(), 2);
    }

    #[test]
    fn test_ambiguous_wildcard_is_fatal() {
        let errors = validate(
            r#"
            [routes]
            renderer = "view"
            "/?a" = { "@main" = {} }
            "/?b" = { "@main" = {} }
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::Tree(TreeError::AmbiguousWildcard { count: 2, .. })
        ));
    }

    #[test]
    fn test_unbound_captures() {
        let errors = validate(
            r#"
            [routes]
            renderer = "view"
            auth_fail_url = "/?tenant/login"
            "@main" = {}

            [routes."/shop"]
            auth_tag = "?tenant"
            "@main" = {}
            "#,
        )
        .unwrap_err();

        assert!(errors.contains(&ValidationError::UnboundAuthTag {
            path: "/shop".into(),
            name: "tenant".into(),
        }));
        assert!(errors.contains(&ValidationError::UnboundFailUrl {
            path: "/@main".into(),
            name: "tenant".into(),
        }));
    }

    #[test]
    fn test_missing_renderer() {
        let errors = validate(
            r#"
            [routes."/shop"]
            "@main" = {}
            "@feed" = { renderer = "json" }
            "#,
        )
        .unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingRenderer { path: "/shop/@main".into() }]);
    }

    #[test]
    fn test_settings_errors_are_collected() {
        let errors = validate(
            r#"
            [listener]
            bind_address = "not-an-address"

            [parameters]
            redirect_on_fail = "nowhere"

            [offline]
            redirect_to = "https://status.example.com"
            "#,
        )
        .unwrap_err();

        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], ValidationError::InvalidAddress { .. }));
        assert!(matches!(&errors[1], ValidationError::UnknownRedirect { value, .. } if value == "nowhere"));
    }
}
