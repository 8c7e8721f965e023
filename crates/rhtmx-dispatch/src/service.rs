//! axum adapter
//!
//! The dispatcher works on `Request<String>`/`Response<String>`; this module
//! converts to and from axum bodies so a [`Dispatcher`] can be served as the
//! fallback of an `axum::Router`.

use std::sync::Arc;

use anyhow::Context as _;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::handler::text_response;

impl Dispatcher {
    /// Wraps the dispatcher in an `axum::Router` that sends every request to it
    pub fn into_axum_router(self) -> axum::Router {
        let dispatcher = Arc::new(self);
        axum::Router::new().fallback(move |req: Request<Body>| {
            let dispatcher = Arc::clone(&dispatcher);
            async move { dispatcher.handle_axum(req).await }
        })
    }

    /// Handles an axum request, buffering its body up to the configured limit
    pub async fn handle_axum(&self, req: Request<Body>) -> axum::response::Response {
        let (parts, body) = req.into_parts();

        let bytes = match to_bytes(body, self.config().body_limit).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!("Rejected request body: {}", err);
                return text_response(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
                    .map(Body::from);
            }
        };

        let body = String::from_utf8_lossy(&bytes).into_owned();
        self.handle(Request::from_parts(parts, body))
            .await
            .map(Body::from)
    }
}

/// Binds `host:port` and serves the dispatcher until the server stops
pub async fn serve(dispatcher: Dispatcher, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server running at http://{}", addr);
    axum::serve(listener, dispatcher.into_axum_router()).await?;

    Ok(())
}
