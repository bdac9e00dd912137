//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use request_guard::{GuardConfig, HttpServer, Shutdown};
use tokio::net::TcpListener;

/// A guard server running on an ephemeral port.
pub struct RunningGuard {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl RunningGuard {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the guard with `config` on 127.0.0.1:0.
pub async fn start_guard(config: GuardConfig) -> RunningGuard {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    RunningGuard { addr, shutdown }
}

/// Config for a plain-HTTP test server sitting behind a trusted proxy, so
/// tests can mark requests secure with `X-Forwarded-Proto`.
pub fn proxied_config() -> GuardConfig {
    let mut config = GuardConfig::default();
    config.listener.trust_proxy = true;
    config.session.secure_cookie = false;
    config
}

/// A client that neither follows redirects nor uses system proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
