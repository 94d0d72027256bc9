//! Resolution to HTTP response mapping.
//!
//! # Responsibilities
//! - Turn a [`Resolution`] into a status, headers and a body
//! - Apply the route's offline, gate and cache policy
//! - Keep internals out of failure payloads when `debug` is off
//!
//! # Design Decisions
//! - Redirects are 302 with an alias-expanded `Location`
//! - A fallback that points at the request path itself answers 404
//! - Resolved routes answer with the descriptor as JSON; rendering views is
//!   left to the application behind this layer

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::config::schema::EngineConfig;
use crate::routing::{Dispatcher, Resolution, RouteDescriptor};

/// Body of every non-2xx JSON answer.
#[derive(Debug, Serialize)]
pub struct Failure<'a> {
    pub error: &'a str,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<&'a str>,
}

/// Map an outcome to a response.
pub fn render(dispatcher: &Dispatcher, path: &str, resolution: Resolution) -> Response {
    let config = dispatcher.config();
    match resolution {
        Resolution::Redirect { target, .. } if target != path => redirect(&target),
        Resolution::NotFound { fallback: Some(target), .. } if target != path => redirect(&target),
        Resolution::Redirect { .. } | Resolution::NotFound { .. } => failure(
            config,
            StatusCode::NOT_FOUND,
            "notFound",
            "No route matches the requested path.",
            path,
        ),
        Resolution::Resolved(descriptor) => resolved(config, &descriptor),
    }
}

fn resolved(config: &EngineConfig, descriptor: &RouteDescriptor) -> Response {
    let path = descriptor.path();
    if descriptor.policy().offline {
        return failure(config, StatusCode::SERVICE_UNAVAILABLE, "offline", &config.offline.message, path);
    }

    if descriptor.gate().blocked {
        return match descriptor.auth_redirect() {
            Some(target) => redirect(target),
            None => failure(
                config,
                StatusCode::UNAUTHORIZED,
                &config.authentication.exception_tag,
                &config.authentication.fail_message,
                path,
            ),
        };
    }

    let cache = descriptor.policy().cache;
    let cache_control = if cache.status {
        format!("public, max-age={}", cache.expire_secs)
    } else {
        "no-store".to_string()
    };
    let mut response = Json(descriptor).into_response();
    if let Ok(value) = HeaderValue::try_from(cache_control) {
        response.headers_mut().insert(header::CACHE_CONTROL, value);
    }
    response
}

/// Answer for the global `[offline]` switch, checked before resolution.
pub fn offline(dispatcher: &Dispatcher, path: &str) -> Response {
    let config = dispatcher.config();
    match &config.offline.redirect_to {
        Some(target) if !config.offline.force_message => {
            let target = dispatcher.expand_alias(target);
            if target == path {
                failure(config, StatusCode::SERVICE_UNAVAILABLE, "offline", &config.offline.message, path)
            } else {
                redirect(&target)
            }
        }
        _ => failure(config, StatusCode::SERVICE_UNAVAILABLE, "offline", &config.offline.message, path),
    }
}

/// 302 to `target`.
pub fn redirect(target: &str) -> Response {
    match HeaderValue::try_from(target) {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(e) => {
            tracing::error!(location = %target, error = %e, "Redirect target is not a valid header value");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn failure(config: &EngineConfig, status: StatusCode, error: &str, message: &str, path: &str) -> Response {
    let body = Failure {
        error,
        message,
        path: config.debug.then_some(path),
    };
    (status, Json(body)).into_response()
}
