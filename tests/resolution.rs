//! End-to-end resolution through a loaded configuration.

use rstest::rstest;

use route_dispatch::config::{parse_config, ConfigError, ValidationError};
use route_dispatch::routing::{ArityViolation, Bound, GrantedTags, Resolution, TreeError};

mod common;

#[test]
fn test_gated_checkout_resolves() {
    let dispatcher = common::shop();
    let resolution = dispatcher.resolve("/shop/checkout/998", &GrantedTags::new(["customer"]));

    let d = resolution.descriptor().expect("resolved");
    assert_eq!(d.controller(), "Shop");
    assert_eq!(d.method(), "checkout");
    assert_eq!(d.parameter("orderId"), Some("998"));
    assert!(d.gate().passed);
    assert!(!d.gate().blocked);
    assert_eq!(d.page_title(), "Checkout | Storefront");
    assert_eq!(d.view(), "/Shop/checkout.html");
}

#[test]
fn test_checkout_without_order_redirects() {
    let dispatcher = common::shop();
    let resolution = dispatcher.resolve("/shop/checkout", &GrantedTags::new(["customer"]));

    assert_eq!(
        resolution,
        Resolution::Redirect {
            target: "/not-found".into(),
            cause: ArityViolation::Missing { required: 1, given: 0 },
        }
    );
}

#[test]
fn test_tenant_gate_uses_captured_value() {
    let dispatcher = common::shop();

    let resolution = dispatcher.resolve("/acme", &GrantedTags::new(["acme"]));
    let d = resolution.descriptor().unwrap();
    assert_eq!(d.segment("tenant"), Some("acme"));
    assert_eq!(d.gate().tag.as_deref(), Some("acme"));
    assert!(d.gate().passed);

    // A grant for the literal wildcard name does not open the gate.
    let resolution = dispatcher.resolve("/acme", &GrantedTags::new(["tenant"]));
    let d = resolution.descriptor().unwrap();
    assert!(d.gate().blocked);
    assert_eq!(d.auth_redirect(), Some("/login/acme"));
}

#[test]
fn test_area_without_method_token_uses_main() {
    let dispatcher = common::shop();
    let grants = GrantedTags::new(["customer", "admin"]);

    let d = dispatcher.resolve("/shop", &grants).descriptor().cloned().unwrap();
    assert_eq!(d.method(), "main");
    assert_eq!(d.controller(), "Shop");

    let d = dispatcher.resolve("/ADMIN", &grants).descriptor().cloned().unwrap();
    assert_eq!(d.controller(), "Admin");
    assert_eq!(d.url_path(), "/ADMIN");
}

#[rstest]
#[case("/items/show", Err(ArityViolation::Missing { required: 1, given: 0 }))]
#[case("/items/show/42", Ok((Some("42"), Bound::Absent)))]
#[case("/items/show/42/Alice", Ok((Some("42"), Bound::Present("Alice".into()))))]
#[case("/items/show/42/x/y", Err(ArityViolation::Excess { declared: 2, given: 3 }))]
fn test_parameter_arity(
    #[case] path: &str,
    #[case] expected: Result<(Option<&str>, Bound), ArityViolation>,
) {
    let dispatcher = common::shop();
    let resolution = dispatcher.resolve(path, &GrantedTags::default());

    match (resolution, expected) {
        (Resolution::Resolved(d), Ok((id, name))) => {
            assert_eq!(d.parameter("id"), id);
            assert_eq!(d.parameters().trailing["name"], name);
        }
        (Resolution::Redirect { cause, .. }, Err(expected)) => assert_eq!(cause, expected),
        (other, expected) => panic!("{} resolved to {:?}, expected {:?}", path, other, expected),
    }
}

#[test]
fn test_cache_status_inherits_through_silent_levels() {
    let dispatcher = common::dispatcher(
        r#"
        [rendering]
        default_renderer = "view"

        [routes]
        cache = { status = true }

        [routes."/a"]
        cache = { expire_secs = 60 }

        [routes."/a"."/b"]
        "@main" = {}

        [routes."/a"."/b"."/c"]
        cache = { status = false }
        "@main" = {}
        "#,
    );
    let auth = GrantedTags::default();

    let b = dispatcher.resolve("/a/b", &auth);
    let b = b.descriptor().unwrap().policy().cache;
    assert!(b.status);
    assert_eq!(b.expire_secs, 60);

    let c = dispatcher.resolve("/a/b/c", &auth);
    let c = c.descriptor().unwrap().policy().cache;
    assert!(!c.status);
    assert_eq!(c.expire_secs, 60);
}

#[test]
fn test_unset_cache_fields_fall_back_to_global() {
    let dispatcher = common::shop();
    let resolution = dispatcher.resolve("/admin", &GrantedTags::new(["admin"]));
    let cache = resolution.descriptor().unwrap().policy().cache;
    assert!(!cache.status);
    assert_eq!(cache.expire_secs, dispatcher.config().cache.expire_secs);
}

#[test]
fn test_two_wildcards_fail_at_load() {
    let err = parse_config(
        r#"
        [rendering]
        default_renderer = "view"

        [routes."/?tenant"]
        "@main" = {}

        [routes."/?org"]
        "@main" = {}
        "#,
    )
    .unwrap_err();

    match err {
        ConfigError::Validation(errors) => assert_eq!(
            errors,
            vec![ValidationError::Tree(TreeError::AmbiguousWildcard { path: "/".into(), count: 2 })]
        ),
        other => panic!("expected validation error, got {}", other),
    }
}

#[rstest]
#[case(&["alpha"], true)]
#[case(&["member", "alpha"], false)]
#[case(&["member"], true)]
fn test_block_is_never_cleared(#[case] grants: &[&str], #[case] blocked: bool) {
    let dispatcher = common::dispatcher(
        r#"
        [rendering]
        default_renderer = "json"

        [routes."/org"]
        auth_tag = "member"

        [routes."/org"."/?team"]
        auth_tag = "?team"
        "@main" = {}
        "#,
    );

    let resolution = dispatcher.resolve("/org/alpha", &GrantedTags::new(grants.iter().copied()));
    let gate = resolution.descriptor().unwrap().gate().clone();
    assert_eq!(gate.blocked, blocked);
    assert_eq!(gate.tag.as_deref(), Some("alpha"));
    assert_eq!(gate.passed, grants.contains(&"alpha"));
}

#[test]
fn test_site_root() {
    let dispatcher = common::shop();
    let resolution = dispatcher.resolve("/", &GrantedTags::default());
    let d = resolution.descriptor().unwrap();

    assert_eq!(d.controller(), "Index");
    assert_eq!(d.method(), "main");
    assert_eq!(d.view(), "/main.html");
    assert_eq!(d.url_path(), "/");
    assert_eq!(d.page_title(), "Home | Storefront");
}

#[test]
fn test_case_folding_and_query_string() {
    let dispatcher = common::shop();
    let resolution = dispatcher.resolve("/SHOP/Checkout/AbC?ref=mail", &GrantedTags::new(["customer"]));
    let d = resolution.descriptor().unwrap();

    assert_eq!(d.method(), "checkout");
    assert_eq!(d.parameter("orderId"), Some("AbC"));
    assert_eq!(d.url_path(), "/SHOP");
}

#[test]
fn test_lenient_binding() {
    let dispatcher = common::dispatcher(
        r#"
        [rendering]
        default_renderer = "file"

        [parameters]
        force = false

        [routes."/files"]
        "@get" = { parameters = ["id", "?name"] }
        "#,
    );
    let auth = GrantedTags::default();

    let resolution = dispatcher.resolve("/files/get", &auth);
    let d = resolution.descriptor().unwrap();
    assert_eq!(d.parameters().trailing["id"], Bound::Missing);
    assert_eq!(d.parameters().trailing["name"], Bound::Absent);

    let resolution = dispatcher.resolve("/files/get/a/b/c", &auth);
    let d = resolution.descriptor().unwrap();
    assert_eq!(d.parameters().trailing.len(), 2);
    assert_eq!(d.parameters().raw_trailing, vec!["a", "b", "c"]);
}

#[test]
fn test_no_method_is_not_found() {
    let dispatcher = common::dispatcher(
        r#"
        [routes."/docs"]
        renderer = "text"
        error404_url = "/docs-missing"
        "@intro" = {}
        "#,
    );

    assert_eq!(
        dispatcher.resolve("/docs/chapter", &GrantedTags::default()),
        Resolution::NotFound {
            path: "/docs/chapter".into(),
            fallback: Some("/docs-missing".into()),
        }
    );
}

#[test]
fn test_route_offline_flag() {
    let dispatcher = common::shop();
    let resolution = dispatcher.resolve("/admin/maintenance", &GrantedTags::new(["admin"]));
    assert!(resolution.descriptor().unwrap().policy().offline);
}

#[test]
fn test_endpoint_listing() {
    let endpoints = common::shop().tree().endpoints();
    assert!(endpoints.contains(&"/".to_string()));
    assert!(endpoints.contains(&"/shop/checkout/{orderId}".to_string()));
    assert!(endpoints.contains(&"/items/show/{id}/{name?}".to_string()));
    assert!(endpoints.contains(&"/{tenant}/report/{year?}".to_string()));
}
