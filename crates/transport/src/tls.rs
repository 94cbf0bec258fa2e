//! Shared `rustls` client configuration.
//!
//! One `ClientConfig` is built lazily and shared by every TLS connection the
//! pool opens — building the root store per-connection would be wasteful.

use std::sync::{Arc, OnceLock};

static CLIENT_CONFIG: OnceLock<Arc<rustls::ClientConfig>> = OnceLock::new();

/// The process-wide rustls client configuration, using the Mozilla root
/// store bundled by `webpki-roots`.
pub fn shared_client_config() -> Arc<rustls::ClientConfig> {
    CLIENT_CONFIG
        .get_or_init(|| {
            let root_store = rustls::RootCertStore {
                roots: webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect(),
            };
            let config = rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth();
            Arc::new(config)
        })
        .clone()
}
