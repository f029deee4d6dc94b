//! HTTP surface.
//!
//! Layers, outermost first: trace, security headers, request id, session,
//! behavior capture. Storage work from handlers runs on the blocking pool
//! through [`run_blocking`].

mod capture;
mod handlers;
mod session;

pub use capture::{
    CaptureRoute, CaptureRules, TEMPLATE_LIST_ID, capture_middleware, classify,
};
pub use session::{
    Claims, JWT_ISSUER_ENV, JWT_SECRET_ENV, JwtAuthenticator, JwtConfig, SessionResolver,
    SessionUser, USER_ID_HEADER, session_middleware, validate_secret,
};

use crate::engine::Engine;
use crate::observability::{
    REQUEST_ID_HEADER, RequestContext, current_request_context, enter_request_context,
    scope_request_context,
};
use crate::{Error, Result};
use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderValue, Request, StatusCode, header};
use axum::middleware::{Next, from_fn, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

/// Shared state for handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    /// Engine services.
    pub engine: Engine,
    /// Session source.
    pub session: Arc<SessionResolver>,
    /// Capture rules; `None` when behavior capture is disabled.
    pub capture: Option<Arc<CaptureRules>>,
}

impl AppState {
    /// Builds state from an engine and a session resolver.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured capture pattern does not compile.
    pub fn new(engine: Engine, session: SessionResolver) -> Result<Self> {
        let config = engine.config();
        let capture = if config.features.behavior_capture {
            Some(Arc::new(CaptureRules::compile(
                &config.capture,
                config.server.max_body_bytes,
            )?))
        } else {
            tracing::info!("Behavior capture disabled");
            None
        };

        Ok(Self {
            engine,
            session: Arc::new(session),
            capture,
        })
    }
}

/// Error response wrapper.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            Error::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Error::OperationFailed { .. } => {
                tracing::error!(error = %self.0, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            },
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Runs blocking work on the blocking pool, keeping the request context.
///
/// # Errors
///
/// Returns `OperationFailed` if the task panics or is cancelled.
pub async fn run_blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let context = current_request_context();
    tokio::task::spawn_blocking(move || {
        let _guard = context.map(enter_request_context);
        f()
    })
    .await
    .map_err(|e| Error::OperationFailed {
        operation: "blocking_task".to_string(),
        cause: e.to_string(),
    })
}

/// Assigns or propagates `x-request-id` and scopes it over the request.
pub async fn request_id_middleware(request: Request<Body>, next: Next) -> Response {
    let context = RequestContext::from_headers(request.headers());
    let request_id = context.request_id().to_string();
    let span = tracing::info_span!(
        "http.request",
        request_id = %request_id,
        method = %request.method(),
        route = %request.uri().path(),
    );

    let mut response = scope_request_context(context, next.run(request))
        .instrument(span)
        .await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/suggestions", get(handlers::get_suggestions))
        .route("/api/preferences", get(handlers::get_preferences))
        .route(
            "/api/preferences/recompute",
            post(handlers::recompute_preferences),
        )
        .route(
            "/api/behavior",
            get(handlers::list_behavior).post(handlers::record_behavior),
        )
        .route("/api/templates", get(handlers::list_templates))
        .route("/api/templates/implement", post(handlers::implement_template))
        .route("/api/templates/favorite", post(handlers::favorite_template))
        .route("/api/search", get(handlers::search_templates))
        .layer(from_fn_with_state(state.clone(), capture_middleware))
        .layer(from_fn_with_state(state.clone(), session_middleware))
        .layer(from_fn(request_id_middleware))
        // Security headers (OWASP recommendations)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the API until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address is invalid, the port cannot be bound,
/// or the server stops abnormally.
pub async fn serve(state: AppState) -> Result<()> {
    let server = &state.engine.config().server;
    let addr: SocketAddr = format!("{}:{}", server.bind, server.port)
        .parse()
        .map_err(|e| Error::InvalidInput(format!("bind address: {e}")))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::OperationFailed {
            operation: "bind".to_string(),
            cause: format!("{addr}: {e}"),
        })?;
    tracing::info!(%addr, "Starting stencil HTTP server");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::OperationFailed {
            operation: "serve".to_string(),
            cause: e.to_string(),
        })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (Error::InvalidInput("x".to_string()), StatusCode::BAD_REQUEST),
            (Error::Unauthorized("x".to_string()), StatusCode::UNAUTHORIZED),
            (Error::NotFound("x".to_string()), StatusCode::NOT_FOUND),
            (
                Error::OperationFailed {
                    operation: "op".to_string(),
                    cause: "boom".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError(error).into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_run_blocking_keeps_request_context() {
        let observed = scope_request_context(RequestContext::from_id("blocking-test"), async {
            run_blocking(crate::observability::current_request_id).await
        })
        .await
        .unwrap();
        assert_eq!(observed.as_deref(), Some("blocking-test"));
    }
}
