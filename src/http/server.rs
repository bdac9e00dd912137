//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with guarded and unguarded handlers
//! - Wire up middleware (tracing, timeout, request ID, guard)
//! - Serve the plain listener, and the TLS listener when configured
//! - Run the sweeper and admin API alongside

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    middleware,
    routing::{get, post},
    Extension, Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::{setup_admin_router, AdminState};
use crate::config::GuardConfig;
use crate::http::handlers;
use crate::http::middleware::{guard_middleware, GuardState};
use crate::http::request::{make_request_span, propagate_request_id_layer, set_request_id_layer};
use crate::net::tls::{load_tls_config, serve_tls};
use crate::security::sweeper::Sweeper;
use crate::security::{RequestGuard, SessionStore, Transport};

/// HTTP front end for the request guard.
pub struct HttpServer {
    config: GuardConfig,
    guard: Arc<RequestGuard>,
    sessions: SessionStore,
}

impl HttpServer {
    pub fn new(config: GuardConfig) -> Self {
        let guard = Arc::new(RequestGuard::new(&config));
        let sessions = SessionStore::from_config(&config.session);
        Self {
            config,
            guard,
            sessions,
        }
    }

    /// Router for one listener; every request it serves is tagged with
    /// `transport`.
    #[allow(deprecated)]
    pub fn app(&self, transport: Transport) -> Router {
        let state = GuardState::new(&self.config, self.guard.clone(), self.sessions.clone());

        let guarded = Router::new()
            .route("/", get(handlers::index))
            .route("/submit", post(handlers::submit))
            .route("/csrf-token", get(handlers::csrf_token))
            .fallback(handlers::not_found)
            .layer(middleware::from_fn_with_state(state.clone(), guard_middleware))
            .with_state(state);

        Router::new()
            .route("/health", get(handlers::health))
            .merge(guarded)
            .layer(TimeoutLayer::new(Duration::from_secs(self.config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<Body>))
            .layer(set_request_id_layer())
            .layer(Extension(transport))
    }

    pub fn admin_app(&self) -> Router {
        setup_admin_router(AdminState {
            guard: self.guard.clone(),
            sessions: self.sessions.clone(),
            api_key: Arc::from(self.config.admin.api_key.as_str()),
        })
    }

    /// Run the server, accepting plain connections on `listener`, until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = Sweeper::new(
            self.guard.clone(),
            self.sessions.clone(),
            Duration::from_secs(self.config.rate_limit.sweep_interval_secs),
        );
        tokio::spawn(sweeper.run(shutdown.resubscribe()));

        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");
            let admin = self.admin_app();
            let mut admin_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                let result = axum::serve(admin_listener, admin)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = result {
                    tracing::error!(error = %e, "Admin API failed");
                }
            });
        }

        if let Some(tls) = &self.config.listener.tls {
            let rustls = load_tls_config(tls).await?;
            let tls_addr: SocketAddr = tls
                .bind_address
                .parse()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
            let app = self.app(Transport::Secure);
            let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
            let tls_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                if let Err(e) = serve_tls(tls_addr, rustls, app, tls_shutdown, grace).await {
                    tracing::error!(error = %e, "TLS listener failed");
                }
            });
        }

        let app = self
            .app(Transport::Plain)
            .into_make_service_with_connect_info::<SocketAddr>();

        let mut shutdown = shutdown;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn guard(&self) -> &Arc<RequestGuard> {
        &self.guard
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}
