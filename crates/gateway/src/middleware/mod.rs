//! Middleware for request handling
//!
//! Includes:
//! - Rate limiting
//! - Payload size limiting
//! - Request metrics

mod rate_limit;

pub use rate_limit::{rate_limit, RateLimit};

use axum::{
    extract::{MatchedPath, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use gazette_common::{errors::AppError, metrics::RequestMetrics};

use crate::AppState;

/// Reject bodies whose declared length exceeds `extraction.max_document_bytes`
pub async fn content_length_limit(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let limit = state.config.extraction.max_document_bytes;

    if let Some(content_length) = declared_length(&headers) {
        if content_length > limit {
            tracing::warn!(
                content_length = content_length,
                max_size = limit,
                "Request payload too large"
            );
            return Err(AppError::PayloadTooLarge {
                size: content_length,
                limit,
            });
        }
    }

    Ok(next.run(request).await)
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<usize>().ok())
}

/// Count requests and record latency per matched route
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let metrics = RequestMetrics::start(request.method().as_str(), &endpoint);
    let response = next.run(request).await;
    metrics.finish(response.status().as_u16());

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_declared_length() {
        let mut headers = HeaderMap::new();
        assert_eq!(declared_length(&headers), None);

        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("1024"));
        assert_eq!(declared_length(&headers), Some(1024));

        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("lots"));
        assert_eq!(declared_length(&headers), None);
    }
}
