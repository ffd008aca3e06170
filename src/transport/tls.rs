//! TLS client configuration.

use tracing::warn;

use crate::Result;

/// Build a TLS connector.
///
/// With `verify` disabled, certificate chain and host name checks are
/// skipped. This is an explicit trust downgrade for hypervisors running
/// with self-signed certificates.
pub fn connector(verify: bool) -> Result<tokio_native_tls::TlsConnector> {
    let mut builder = native_tls::TlsConnector::builder();
    if !verify {
        warn!("TLS certificate verification disabled");
        builder
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true);
    }
    Ok(builder.build()?.into())
}
