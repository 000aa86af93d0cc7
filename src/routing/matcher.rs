//! Request path dispatch.
//!
//! # Responsibilities
//! - Classify a request path against one listener's routing table
//! - Recognise `<test path>/static/<asset>.<ext>` asset requests
//!
//! # Design Decisions
//! - Ordered rules: static asset, test page, websocket, not found
//! - A path shaped like a static asset never falls through to later rules
//! - No regex; the asset rule is a right-to-left scan for `/static/`

use std::sync::Arc;

use crate::routing::table::{EndpointConfig, ListenerDefinition};

const STATIC_SEGMENT: &str = "/static/";

/// Outcome of resolving a request path.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteMatch<'a> {
    /// Embedded asset under a known test page.
    StaticAsset {
        /// Asset path relative to the asset root, e.g. `static/app.js`.
        asset: &'a str,
        /// File extension including the dot, e.g. `.js`.
        extension: &'a str,
    },
    TestPage {
        websocket_path: &'a str,
    },
    WebSocket {
        endpoint: &'a Arc<EndpointConfig>,
    },
    NotFound,
}

/// A path split into the test page root and the asset beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticRef<'a> {
    pub root: &'a str,
    pub asset: &'a str,
    pub extension: &'a str,
}

/// Split `path` into `(root, static/…, .ext)` if it has the asset shape.
///
/// The rightmost `/static/` whose remainder is `<something>.<ext>` wins,
/// with `ext` made of lowercase ASCII letters and digits. An empty root
/// means the test page is mounted at `/`.
pub fn parse_static(path: &str) -> Option<StaticRef<'_>> {
    let bytes = path.as_bytes();
    (0..bytes.len())
        .rev()
        .filter(|&i| bytes[i..].starts_with(STATIC_SEGMENT.as_bytes()))
        .find_map(|i| {
            let rest = &path[i + STATIC_SEGMENT.len()..];
            let dot = rest.rfind('.')?;
            let ext = &rest[dot + 1..];
            let valid = dot >= 1
                && !ext.is_empty()
                && ext
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
            valid.then(|| StaticRef {
                root: if i == 0 { "/" } else { &path[..i] },
                asset: &path[i + 1..],
                extension: &rest[dot..],
            })
        })
}

impl ListenerDefinition {
    /// Resolve a request path against this listener's routes.
    pub fn resolve<'a>(&'a self, path: &'a str) -> RouteMatch<'a> {
        if let Some(found) = parse_static(path) {
            return if self.test_pages.contains_key(found.root) {
                RouteMatch::StaticAsset {
                    asset: found.asset,
                    extension: found.extension,
                }
            } else {
                RouteMatch::NotFound
            };
        }
        if let Some(websocket_path) = self.test_pages.get(path) {
            return RouteMatch::TestPage { websocket_path };
        }
        if let Some(endpoint) = self.websockets.get(path) {
            return RouteMatch::WebSocket { endpoint };
        }
        RouteMatch::NotFound
    }
}
