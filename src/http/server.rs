//! HTTP server setup for one listener.
//!
//! # Responsibilities
//! - Build the Axum app for one `ListenerDefinition`
//! - Bind plaintext or TLS depending on the definition
//! - Dispatch every request through the listener's route table
//! - Serve static assets and the test page (GET and HEAD only; upgrades
//!   must be GET)

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ws::rejection::WebSocketUpgradeRejection, ConnectInfo, State, WebSocketUpgrade},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::bridge::ConsumerFactory;
use crate::http::assets::{content_type, AssetSource, TestPageCache};
use crate::http::websocket;
use crate::net::listener::{resolve_bind_address, ListenerError};
use crate::net::tls::load_tls_config;
use crate::net::ConnectionTracker;
use crate::routing::{ListenerDefinition, RouteMatch};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct ListenerState {
    pub definition: Arc<ListenerDefinition>,
    pub factory: Arc<dyn ConsumerFactory>,
    pub pages: Arc<TestPageCache>,
    pub tracker: ConnectionTracker,
}

/// HTTP(S) server for one listener address.
pub struct ListenerServer {
    router: Router,
    definition: Arc<ListenerDefinition>,
    tracker: ConnectionTracker,
}

impl ListenerServer {
    /// Create a server for `definition`; every websocket connection gets a
    /// consumer from `factory`.
    pub fn new(
        definition: ListenerDefinition,
        factory: Arc<dyn ConsumerFactory>,
        assets: AssetSource,
    ) -> Self {
        let definition = Arc::new(definition);
        let tracker = ConnectionTracker::new();
        let state = ListenerState {
            definition: Arc::clone(&definition),
            factory,
            pages: Arc::new(TestPageCache::new(assets)),
            tracker: tracker.clone(),
        };

        Self {
            router: Self::build_router(state),
            definition,
            tracker,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: ListenerState) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and serve until the listener fails.
    pub async fn run(self) -> Result<(), ListenerError> {
        let address = self.definition.address.clone();
        let addr = resolve_bind_address(&address).await?;

        match self.definition.tls.clone() {
            Some(material) => {
                let tls = load_tls_config(&material).await.map_err(ListenerError::Tls)?;
                tracing::info!(address = %addr, "HTTPS listener starting");
                let app = self
                    .router
                    .into_make_service_with_connect_info::<SocketAddr>();
                axum_server::bind_rustls(addr, tls)
                    .serve(app)
                    .await
                    .map_err(|source| ListenerError::Serve { address, source })
            }
            None => {
                let listener = TcpListener::bind(addr)
                    .await
                    .map_err(|source| ListenerError::Bind {
                        address: address.clone(),
                        source,
                    })?;
                self.serve(listener).await
            }
        }
    }

    /// Serve plaintext HTTP on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ListenerError> {
        let address = self.definition.address.clone();
        let local = listener.local_addr().map_err(|source| ListenerError::Bind {
            address: address.clone(),
            source,
        })?;
        tracing::info!(
            address = %local,
            test_pages = self.definition.test_pages.len(),
            websockets = self.definition.websockets.len(),
            "HTTP listener starting"
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .await
            .map_err(|source| ListenerError::Serve { address, source })
    }

    /// Live websocket connections on this listener.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }
}

/// Single entry point: resolve the path and hand off to the matching rule.
async fn dispatch(
    State(state): State<ListenerState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    method: Method,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let path = uri.path();
    match state.definition.resolve(path) {
        RouteMatch::StaticAsset { .. } | RouteMatch::TestPage { .. }
            if method != Method::GET && method != Method::HEAD =>
        {
            (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "GET, HEAD")]).into_response()
        }
        RouteMatch::StaticAsset { asset, extension } => {
            match state.pages.source().load(asset).await {
                Some(bytes) => {
                    ([(header::CONTENT_TYPE, content_type(extension))], bytes).into_response()
                }
                None => StatusCode::NOT_FOUND.into_response(),
            }
        }
        RouteMatch::TestPage { websocket_path } => {
            test_page(&state, path, websocket_path, &headers).await
        }
        RouteMatch::WebSocket { endpoint } => {
            websocket::upgrade(&state, Arc::clone(endpoint), upgrade, &uri, &headers, peer)
        }
        RouteMatch::NotFound => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn test_page(
    state: &ListenerState,
    path: &str,
    websocket_path: &str,
    headers: &HeaderMap,
) -> Response {
    let Some(template) = state.pages.template().await else {
        tracing::error!(path, "Test page template is missing");
        return StatusCode::NOT_FOUND.into_response();
    };

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or(state.definition.address.as_str());
    let scheme = if state.definition.is_tls() { "wss" } else { "ws" };
    let ws_url = format!("{}://{}{}", scheme, host, websocket_path);

    Html(template.render(path.trim_end_matches('/'), &ws_url)).into_response()
}
