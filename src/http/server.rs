//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router answering every path
//! - Wire up middleware (request ID, tracing, timeout)
//! - Hand each request path to the current route snapshot
//! - Swap in reloaded snapshots without dropping requests
//! - Bind server to listener and stop on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{body::Body, extract::State, http::Request, response::Response, routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::SessionStore;
use crate::http::{request, response};
use crate::observability::metrics;
use crate::routing::Dispatcher;

/// Interval between sweeps of expired session grants.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Current configuration snapshot; replaced whole on reload.
    pub inner: Arc<ArcSwap<Dispatcher>>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        let sessions = SessionStore::new(&dispatcher.config().authentication);
        Self {
            inner: Arc::new(ArcSwap::from_pointee(dispatcher)),
            sessions,
        }
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn app(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.inner.load().config().listener.request_timeout_secs);

    Router::new()
        .route("/{*path}", any(dispatch_handler))
        .route("/", any(dispatch_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::new(timeout)),
        )
}

/// HTTP entry point for the dispatch engine.
pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            state: AppState::new(dispatcher),
        }
    }

    /// Shared state, e.g. for granting sessions from application code.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Snapshots received on `config_updates` replace the current one.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<Dispatcher>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let inner = self.state.inner.clone();
        let sessions = self.state.sessions.clone();
        tokio::spawn(async move {
            while let Some(dispatcher) = config_updates.recv().await {
                tracing::info!(
                    areas = dispatcher.tree().area_count(),
                    methods = dispatcher.tree().method_count(),
                    "Route tree reloaded"
                );
                sessions.apply(&dispatcher.config().authentication);
                inner.store(Arc::new(dispatcher));
            }
        });

        let purge = tokio::spawn(purge_sessions(
            self.state.sessions.clone(),
            SESSION_PURGE_INTERVAL,
            shutdown.resubscribe(),
        ));

        let app = app(self.state).into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        if let Err(e) = purge.await {
            tracing::error!(error = %e, "Session purge task failed");
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Sweep expired grants every `interval` until shutdown.
async fn purge_sessions(sessions: SessionStore, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = sessions.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, "Expired session grants purged");
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

/// Resolve the request path against the current snapshot.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let dispatcher = state.inner.load_full();
    let path = request.uri().path().to_string();
    let request_id = request::request_id(&request).to_string();

    let response = if dispatcher.config().offline.status {
        tracing::debug!(request_id = %request_id, path = %path, "Site offline");
        response::offline(&dispatcher, &path)
    } else {
        let cookies = request::parse_cookies(request.headers());
        let ip = request::client_ip(&request);
        let session = cookies
            .get(&dispatcher.config().authentication.session_cookie)
            .map(String::as_str);

        let credentials = state.sessions.credentials(session, &cookies, ip);
        let resolution = dispatcher.resolve(&path, &credentials);
        tracing::debug!(
            request_id = %request_id,
            path = %path,
            outcome = resolution.outcome(),
            "Dispatching request"
        );
        response::render(&dispatcher, &path, resolution)
    };

    metrics::record_response(response.status().as_u16());
    response
}
