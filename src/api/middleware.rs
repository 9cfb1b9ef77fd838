//! API Middleware
//!
//! Bearer authentication and request logging.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::extract_bearer_token;
use crate::error::AppError;
use crate::state::AppState;

/// Correlation id header, read from the caller or generated
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Correlation id of the current request
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

// =========================================================================
// Bearer Authentication Middleware
// =========================================================================

/// Resolve `Authorization: Bearer <token>` into a `Principal` extension
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or_else(|| AppError::Unauthenticated("Missing bearer token".to_string()))?;

    let mut principal = state.auth.authenticate(token).await?;

    if let Some(CorrelationId(id)) = request.extensions().get::<CorrelationId>().copied() {
        principal = principal.with_correlation_id(id);
    }

    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

// =========================================================================
// mask_headers_for_logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie"];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let masked_value = if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

/// Request logging middleware
pub async fn logging_middleware(mut request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let version = request.version();

    let headers = mask_headers_for_logging(request.headers());

    let correlation_id = request
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    request.extensions_mut().insert(CorrelationId(correlation_id));

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        version = ?version,
        correlation_id = %correlation_id,
        headers = ?headers,
        "Incoming request"
    );

    let mut response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        correlation_id = %correlation_id,
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_headers_for_logging() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());
        headers.insert("authorization", "Bearer abc.def.ghi".parse().unwrap());
        headers.insert("cookie", "session=1".parse().unwrap());
        headers.insert(CORRELATION_HEADER, "req-123".parse().unwrap());

        let masked = mask_headers_for_logging(&headers);

        let find = |key: &str| masked.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());
        assert_eq!(find("authorization"), Some("[REDACTED]"));
        assert_eq!(find("cookie"), Some("[REDACTED]"));
        assert_eq!(find("content-type"), Some("application/json"));
        assert_eq!(find(CORRELATION_HEADER), Some("req-123"));
    }

    #[test]
    fn test_sensitive_headers_list() {
        assert!(SENSITIVE_HEADERS.contains(&"authorization"));
        assert!(SENSITIVE_HEADERS.contains(&"set-cookie"));
        assert!(!SENSITIVE_HEADERS.contains(&"content-type"));
    }
}
