//! `/api/*` pass-through to the auth backend.
//!
//! The gateway never inspects or stores what goes through here; bearer
//! tokens are forwarded as-is and not logged.

use std::time::Duration;

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
};
use reqwest::Client;
use tracing::{debug, warn};

use super::{GatewayState, json_error};
use crate::error::AppError;
use crate::session::backend::api_url;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Hop-by-hop headers and ones reqwest/hyper recompute.
const SKIPPED_HEADERS: [HeaderName; 5] = [
    header::HOST,
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

#[derive(Debug, Clone)]
pub struct Upstream {
    client: Client,
    base_url: String,
}

impl Upstream {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| AppError::Server(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// ANY /api/{*path}
pub(super) async fn forward(State(state): State<GatewayState>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let path_and_query = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
    let target = api_url(state.upstream.base_url(), path_and_query);

    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return (StatusCode::PAYLOAD_TOO_LARGE, json_error("payload_too_large", e))
                .into_response();
        }
    };

    debug!(method = %parts.method, path = parts.uri.path(), "forwarding to auth backend");

    let upstream = state
        .upstream
        .client
        .request(parts.method, &target)
        .headers(forwardable(&parts.headers))
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(resp) => resp,
        Err(e) if e.is_timeout() => {
            warn!(path = parts.uri.path(), "auth backend timed out");
            return (StatusCode::GATEWAY_TIMEOUT, json_error("timeout", "auth backend timed out"))
                .into_response();
        }
        Err(e) => {
            warn!(path = parts.uri.path(), "auth backend unreachable: {e}");
            return (StatusCode::BAD_GATEWAY, json_error("upstream", "auth backend unreachable"))
                .into_response();
        }
    };

    let status = upstream.status();
    let headers = forwardable(upstream.headers());
    match upstream.bytes().await {
        Ok(bytes) => {
            let mut response = Response::new(Body::from(bytes));
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            response
        }
        Err(e) => {
            warn!(path = parts.uri.path(), "auth backend body read failed: {e}");
            (StatusCode::BAD_GATEWAY, json_error("upstream", "auth backend response truncated"))
                .into_response()
        }
    }
}

fn forwardable(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !SKIPPED_HEADERS.contains(name) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use axum::http::Request as HttpRequest;
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{header as header_is, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::gateway::build_router;
    use crate::gateway::tests::test_state;

    #[test]
    fn hop_by_hop_headers_are_dropped() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "gateway.local".parse().unwrap());
        headers.insert(header::AUTHORIZATION, "Bearer jwt".parse().unwrap());
        let out = forwardable(&headers);
        assert!(out.get(header::HOST).is_none());
        assert_eq!(out.get(header::AUTHORIZATION).unwrap(), "Bearer jwt");
    }

    #[tokio::test]
    async fn api_requests_reach_backend_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/verify"))
            .and(query_param("probe", "1"))
            .and(header_is("authorization", "Bearer jwt-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "username": "ada" } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let req = HttpRequest::builder()
            .uri("/api/auth/verify?probe=1")
            .header(header::AUTHORIZATION, "Bearer jwt-1")
            .body(Body::empty())
            .unwrap();
        let resp = build_router(test_state(&server.uri())).oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get(header::LOCATION).is_none());
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["data"]["username"], "ada");
    }

    #[tokio::test]
    async fn backend_errors_pass_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "bad" })))
            .mount(&server)
            .await;

        let req = HttpRequest::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("username=ada&password=x"))
            .unwrap();
        let resp = build_router(test_state(&server.uri())).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unreachable_backend_is_bad_gateway() {
        let req = HttpRequest::builder().uri("/api/auth/verify").body(Body::empty()).unwrap();
        let resp = build_router(test_state("http://127.0.0.1:1")).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
