//! Listener address handling.
//!
//! # Responsibilities
//! - Accept the `:port` shorthand for "all interfaces"
//! - Resolve host names to a socket address
//! - Describe bind and serve failures

use std::net::SocketAddr;

use thiserror::Error;

/// Error type for listener operations. All of them are fatal to the process.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Failed to resolve address {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load TLS material: {0}")]
    Tls(#[source] std::io::Error),

    #[error("Listener {address} failed: {source}")]
    Serve {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// `":9999"` → `"0.0.0.0:9999"`, `""` → `"0.0.0.0:80"`, anything else unchanged.
pub fn normalize_bind_address(address: &str) -> String {
    if address.is_empty() {
        "0.0.0.0:80".to_string()
    } else if address.starts_with(':') {
        format!("0.0.0.0{}", address)
    } else {
        address.to_string()
    }
}

/// Resolve a configured listen address to the first matching socket address.
pub async fn resolve_bind_address(address: &str) -> Result<SocketAddr, ListenerError> {
    let normalized = normalize_bind_address(address);
    let resolve_err = |source| ListenerError::Resolve {
        address: address.to_string(),
        source,
    };

    let found = tokio::net::lookup_host(&normalized)
        .await
        .map_err(resolve_err)?
        .next();
    found.ok_or_else(|| {
        resolve_err(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "no addresses found",
        ))
    })
}
