use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Logging middleware for request/response tracking
pub async fn logging_middleware(mut request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let peer = peer_ip(&request).unwrap_or_else(|| "unknown".to_string());

    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        request.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    info!(
        target: "catalog::middleware",
        request_id = %request_id,
        method = %method,
        uri = %uri,
        peer = %peer,
        "Incoming request"
    );

    let mut response = next.run(request).await;

    let status = response.status();
    info!(
        target: "catalog::middleware",
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %status,
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Admit or reject a request by its client's token bucket.
pub async fn admission_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = get_client_ip(&request, state.trust_forwarded_headers);

    if !state.admission.allow(&client) {
        let retry_after_secs = state.admission.retry_after(&client);
        debug!(
            target: "catalog::middleware",
            client = %client,
            retry_after_secs,
            "Request rejected by admission control"
        );
        return Err(ApiError::RateLimitExceeded { retry_after_secs });
    }

    Ok(next.run(request).await)
}

/// Key used to identify the client behind a request.
///
/// Forwarding headers are client-controlled, so they are only honoured when
/// the service runs behind a proxy that sets them.
pub fn get_client_ip(request: &Request, trust_forwarded: bool) -> String {
    if trust_forwarded {
        if let Some(forwarded) = request.headers().get("x-forwarded-for") {
            if let Ok(forwarded_str) = forwarded.to_str() {
                if let Some(first_ip) = forwarded_str.split(',').next() {
                    let first_ip = first_ip.trim();
                    if !first_ip.is_empty() {
                        return first_ip.to_string();
                    }
                }
            }
        }

        if let Some(real_ip) = request.headers().get("x-real-ip") {
            if let Ok(ip_str) = real_ip.to_str() {
                let ip_str = ip_str.trim();
                if !ip_str.is_empty() {
                    return ip_str.to_string();
                }
            }
        }
    }

    peer_ip(request).unwrap_or_else(|| "unknown".to_string())
}

fn peer_ip(request: &Request) -> Option<String> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}
