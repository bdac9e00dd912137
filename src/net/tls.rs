//! TLS listener: certificate loading and the secure accept loop.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tokio::sync::broadcast;

use crate::config::TlsConfig;

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(config: &TlsConfig) -> Result<RustlsConfig, std::io::Error> {
    let cert_path = Path::new(&config.cert_path);
    let key_path = Path::new(&config.key_path);

    if !cert_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Certificate file not found: {:?}", cert_path),
        ));
    }
    if !key_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Private key file not found: {:?}", key_path),
        ));
    }

    RustlsConfig::from_pem_file(cert_path, key_path).await
}

/// Serve `app` over TLS on `addr` until shutdown is signalled.
pub async fn serve_tls(
    addr: SocketAddr,
    tls: RustlsConfig,
    app: Router,
    mut shutdown: broadcast::Receiver<()>,
    grace: Duration,
) -> Result<(), std::io::Error> {
    let handle = Handle::new();

    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        let _ = shutdown.recv().await;
        shutdown_handle.graceful_shutdown(Some(grace));
    });

    tracing::info!(address = %addr, "TLS listener starting");
    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    tracing::info!("TLS listener stopped");
    Ok(())
}
