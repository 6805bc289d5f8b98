//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the redirect middleware in front
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind the server to a listener and run until shutdown
//!
//! # Design Decisions
//! - The redirect engine runs as middleware ahead of every route, so
//!   rules can shadow even the standalone endpoints
//! - A request no rule claims falls through to the inner router; the
//!   engine itself never produces an error response

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::http::handlers;
use crate::http::request::{
    propagate_request_id_layer, request_context, set_request_id_layer,
};
use crate::redirects::RedirectEngine;

/// Application state injected into the redirect middleware.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RedirectEngine>,
}

/// HTTP server for the site edge.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server around a compiled redirect engine.
    pub fn new(config: ServerConfig, engine: Arc<RedirectEngine>) -> Self {
        let state = AppState { engine };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .route("/img/social", get(handlers::legacy_social_image))
            .route("/rr", get(handlers::reflect_redirect))
            .fallback(handlers::site_fallback)
            .layer(middleware::from_fn_with_state(state, redirects_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server, accepting connections on the given listener
    /// until ctrl-c or the shutdown channel fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = shutdown.recv() => {}
                }
                tracing::info!("shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Redirect middleware: first matching rule issues a 307, anything
/// else (including any internal fault) passes through unchanged.
async fn redirects_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(ctx) = request_context(&req) else {
        tracing::warn!(uri = %req.uri(), "request host missing or unreadable, skipping redirect rules");
        return next.run(req).await;
    };

    let Some(dest) = state.engine.match_request(&ctx) else {
        return next.run(req).await;
    };

    match HeaderValue::from_str(dest.as_str()) {
        Ok(location) => {
            (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, location)]).into_response()
        }
        Err(error) => {
            // Fail open: a destination we cannot express as a header
            // must not take the request down with it.
            tracing::error!(destination = %dest, %error, "rendered destination is not a valid Location header");
            next.run(req).await
        }
    }
}
