//! WebSocket upgrade handling.
//!
//! # Responsibilities
//! - Complete the upgrade handshake for a known websocket path
//! - Read consumer overrides from the query string
//! - Hand the upgraded socket to a new bridge
//!
//! # Design Decisions
//! - Handshake failures are answered with the rejection, nothing else
//! - Topic problems are not handshake failures: the socket is upgraded
//!   and then closed by the bridge
//! - With compression enabled, a `permessage-deflate` offer is accepted in
//!   the handshake but frames still go out uncompressed (RFC 7692 lets the
//!   server leave RSV1 unset on any message)
//! - A repeated query key keeps its first value

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ws::rejection::WebSocketUpgradeRejection, Query, WebSocketUpgrade},
    http::{header, HeaderMap, HeaderValue, Uri},
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;

use crate::bridge::{run_bridge, BridgeContext, ConnectionParams};
use crate::http::server::ListenerState;
use crate::routing::EndpointConfig;

const DEFLATE_EXTENSION: &str = "permessage-deflate";

/// Upgrade the request and spawn a bridge for `endpoint`.
pub fn upgrade(
    state: &ListenerState,
    endpoint: Arc<EndpointConfig>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    uri: &Uri,
    headers: &HeaderMap,
    peer: SocketAddr,
) -> Response {
    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            tracing::warn!(path = %uri.path(), error = %rejection, "Websocket http upgrade failed");
            return rejection.into_response();
        }
    };

    let extension = if endpoint.compression {
        negotiate_deflate(headers)
    } else {
        None
    };

    let params = match Query::<Vec<(String, String)>>::try_from_uri(uri) {
        Ok(Query(pairs)) => ConnectionParams::from_pairs(pairs),
        Err(e) => {
            tracing::debug!(query = ?uri.query(), error = %e, "Ignoring malformed query string");
            ConnectionParams::default()
        }
    };

    let guard = state.tracker.track(peer);
    let ctx = BridgeContext {
        id: guard.id(),
        peer: guard.peer().to_string(),
        endpoint,
        params,
    };
    let factory = Arc::clone(&state.factory);

    let mut response = upgrade
        .on_failed_upgrade(|e| tracing::warn!(error = %e, "Websocket upgrade failed"))
        .on_upgrade(move |socket| async move {
            let (writer, reader) = socket.split();
            run_bridge(ctx, factory.as_ref(), reader, writer).await;
            drop(guard);
        });

    if let Some(extension) = extension {
        tracing::debug!(path = %uri.path(), ?extension, "Accepted {} offer", DEFLATE_EXTENSION);
        response.headers_mut().insert(header::SEC_WEBSOCKET_EXTENSIONS, extension);
    }
    response
}

/// Accept the first usable `permessage-deflate` offer in the client's
/// `Sec-WebSocket-Extensions` and build the matching response value.
fn negotiate_deflate(headers: &HeaderMap) -> Option<HeaderValue> {
    headers
        .get_all(header::SEC_WEBSOCKET_EXTENSIONS)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .find_map(accept_offer)
        .and_then(|reply| HeaderValue::from_str(&reply).ok())
}

/// Response for one offer, or `None` if it is not a valid deflate offer.
///
/// Server parameters must be echoed back. Client parameters only describe
/// what the client may send and need no answer.
fn accept_offer(offer: &str) -> Option<String> {
    let mut params = offer.split(';').map(str::trim);
    if !params.next()?.eq_ignore_ascii_case(DEFLATE_EXTENSION) {
        return None;
    }

    let mut reply = DEFLATE_EXTENSION.to_string();
    let mut seen = HashSet::new();
    for param in params {
        let (name, value) = match param.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim().trim_matches('"'))),
            None => (param, None),
        };
        let name = name.to_ascii_lowercase();
        if !seen.insert(name.clone()) {
            return None;
        }
        match (name.as_str(), value) {
            ("server_no_context_takeover", None) => reply.push_str("; server_no_context_takeover"),
            ("server_max_window_bits", Some(bits)) => {
                let bits = window_bits(bits)?;
                reply.push_str(&format!("; server_max_window_bits={}", bits));
            }
            ("client_no_context_takeover", None) | ("client_max_window_bits", None) => {}
            ("client_max_window_bits", Some(bits)) => {
                window_bits(bits)?;
            }
            _ => return None,
        }
    }
    Some(reply)
}

fn window_bits(raw: &str) -> Option<u8> {
    raw.parse().ok().filter(|bits| (8..=15).contains(bits))
}
