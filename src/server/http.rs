//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo, one task per connection. Bodies are
//! collected up front (bounded by `MAX_BODY_BYTES`) so the router and every
//! handler work on `Request<Bytes>`.

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::{AuthGate, TokenCodec};
use crate::config::Args;
use crate::routes::{self, error_response, not_found_response, preflight_response, HttpResponse};
use crate::store::{CredentialStore, Store};
use crate::types::LecternError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub store: Arc<dyn Store>,
    pub gate: AuthGate,
    pub started_at: Instant,
}

impl AppState {
    pub fn new<S: Store + 'static>(args: Args, store: Arc<S>, codec: TokenCodec) -> Self {
        let credentials: Arc<dyn CredentialStore> = store.clone();
        let gate = AuthGate::new(Arc::new(codec), credentials);

        Self {
            args,
            store,
            gate,
            started_at: Instant::now(),
        }
    }
}

pub async fn run(state: Arc<AppState>) -> Result<(), LecternError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Lectern listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Collect the body under the size limit and hand off to the router
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<HttpResponse, hyper::Error> {
    info!("[{}] {} {}", addr, req.method(), req.uri().path());

    let (parts, body) = req.into_parts();
    let bytes = match collect_body(body, state.args.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("[{}] Rejected request body: {}", addr, err);
            return Ok(error_response(&err));
        }
    };

    Ok(route(&state, Request::from_parts(parts, bytes)).await)
}

/// Read a whole body, failing once it grows past `limit` bytes
pub async fn collect_body<B>(body: B, limit: usize) -> Result<Bytes, LecternError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(
            LecternError::PayloadTooLarge(format!("Request body exceeds {} bytes", limit)),
        ),
        Err(e) => {
            debug!("Failed to read body: {}", e);
            Err(LecternError::BadRequest("Failed to read request body".into()))
        }
    }
}

/// Dispatch a fully-read request
pub async fn route(state: &AppState, req: Request<Bytes>) -> HttpResponse {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if method == Method::OPTIONS {
        return preflight_response();
    }

    let result = match (method, path.as_str()) {
        (Method::GET, "/health") => Ok(routes::health_check(state)),
        (Method::GET, "/tags") => routes::handle_list_tags(state).await,
        (Method::GET, "/search") => routes::handle_search(req, state).await,
        (Method::GET, "/sitemap.xml") => routes::handle_sitemap(state).await,
        (Method::GET, "/robots.txt") => Ok(routes::handle_robots(state)),

        (_, p) if p.starts_with("/auth/") => {
            routes::handle_auth_request(req, state, p)
                .await
                .unwrap_or_else(|| Ok(not_found_response(p)))
        }
        (_, p) if p.starts_with("/api-keys") => {
            routes::handle_api_keys_request(req, state, p)
                .await
                .unwrap_or_else(|| Ok(not_found_response(p)))
        }
        (_, p) if p.starts_with("/admin/users") => {
            routes::handle_admin_users_request(req, state, p)
                .await
                .unwrap_or_else(|| Ok(not_found_response(p)))
        }
        (_, p) if p.starts_with("/content") => {
            routes::handle_content_request(req, state, p)
                .await
                .unwrap_or_else(|| Ok(not_found_response(p)))
        }

        (_, p) => Ok(not_found_response(p)),
    };

    result.unwrap_or_else(|err| error_response(&err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use hyper::StatusCode;

    const LIMIT: usize = 16;

    #[tokio::test]
    async fn test_body_at_limit_is_accepted() {
        let body = Full::new(Bytes::from(vec![b'a'; LIMIT]));
        let bytes = collect_body(body, LIMIT).await.unwrap();
        assert_eq!(bytes.len(), LIMIT);
    }

    #[tokio::test]
    async fn test_body_over_limit_is_rejected() {
        let body = Full::new(Bytes::from(vec![b'a'; LIMIT + 1]));
        let err = collect_body(body, LIMIT).await.unwrap_err();
        assert!(matches!(err, LecternError::PayloadTooLarge(_)));

        let response = error_response(&err);
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_empty_body() {
        let bytes = collect_body(Full::new(Bytes::new()), LIMIT).await.unwrap();
        assert!(bytes.is_empty());
    }
}
