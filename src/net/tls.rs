//! TLS configuration and certificate loading.

use axum_server::tls_rustls::RustlsConfig;

use crate::routing::TlsMaterial;

/// Load the rustls server configuration for a listener.
pub async fn load_tls_config(material: &TlsMaterial) -> Result<RustlsConfig, std::io::Error> {
    // Existence was checked when the routing table was built, but the files
    // may have moved since.
    for (kind, path) in [
        ("Certificate", &material.cert_file),
        ("Private key", &material.key_file),
    ] {
        if !path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} file not found: {:?}", kind, path),
            ));
        }
    }

    RustlsConfig::from_pem_file(&material.cert_file, &material.key_file).await
}
