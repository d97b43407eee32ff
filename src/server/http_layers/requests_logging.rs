//! Request logging middleware

use super::super::state::ServerState;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::{
    http::{header::HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::{error, info};

#[derive(PartialEq, PartialOrd, Clone, Debug, clap::ValueEnum)]
pub enum RequestsLoggingLevel {
    None,
    Path,
    Headers,
    Body,
}

impl Default for RequestsLoggingLevel {
    fn default() -> Self {
        Self::Path
    }
}

impl std::fmt::Display for RequestsLoggingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Multipart uploads are mostly images, only short bodies are printed.
const MAX_LOGGABLE_BODY_LENGTH: usize = 1024;

fn content_length(headers: &HeaderMap) -> Result<usize, &'static str> {
    let value = headers
        .get("content-length")
        .ok_or("Content-length not set.")?;
    let str_value = value
        .to_str()
        .map_err(|_| "Could not get Content-length string value.")?;
    str_value
        .parse::<usize>()
        .map_err(|_| "Could not parse Content-length numeric value.")
}

fn log_headers(title: &str, headers: &HeaderMap) {
    info!("  {}:", title);
    for (name, value) in headers.iter() {
        info!("    {:?}: {:?}", name, value);
    }
}

/// Buffers a short body so it can be logged and handed back.
async fn read_loggable_body(title: &str, headers: &HeaderMap, body: Body) -> Result<Body, Body> {
    let size = match content_length(headers) {
        Ok(size) => size,
        Err(reason) => {
            info!("  {}: {}", title, reason);
            return Ok(body);
        }
    };
    if size >= MAX_LOGGABLE_BODY_LENGTH {
        info!(
            "  {}: Too big to log ({:#})",
            title,
            byte_unit::Byte::from(size)
        );
        return Ok(body);
    }
    match axum::body::to_bytes(body, size).await {
        Ok(bytes) => {
            info!("  {}:\n{}", title, String::from_utf8_lossy(&bytes));
            Ok(Body::from(bytes))
        }
        Err(err) => {
            error!("Failed to read {}: {:?}", title, err);
            Err(Body::from(Bytes::from_static(b"Internal Server Error")))
        }
    }
}

pub async fn log_requests(
    State(state): State<ServerState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let level = state.config.requests_logging_level.clone();
    let start = Instant::now();

    if level > RequestsLoggingLevel::None {
        info!(">>> {} {}", request.method(), request.uri());
    }

    if level >= RequestsLoggingLevel::Headers {
        log_headers("Req Headers", request.headers());
    }

    let request = if level >= RequestsLoggingLevel::Body {
        let (parts, body) = request.into_parts();
        match read_loggable_body("Req Body", &parts.headers, body).await {
            Ok(body) => Request::from_parts(parts, body),
            Err(body) => return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response(),
        }
    } else {
        request
    };

    let response = next.run(request).await;

    if level >= RequestsLoggingLevel::Headers {
        log_headers("Resp Headers", response.headers());
    }

    let response = if level >= RequestsLoggingLevel::Body {
        let (parts, body) = response.into_parts();
        match read_loggable_body("Resp Body", &parts.headers, body).await {
            Ok(body) => Response::from_parts(parts, body),
            Err(body) => return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response(),
        }
    } else {
        response
    };

    if level > RequestsLoggingLevel::None {
        info!(
            "<<< {} ({}ms)",
            response.status().as_u16(),
            start.elapsed().as_millis()
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn level_ordering() {
        let none = RequestsLoggingLevel::None;

        assert!(none < RequestsLoggingLevel::Headers);
        assert!(RequestsLoggingLevel::Body > RequestsLoggingLevel::None);
        assert_eq!(RequestsLoggingLevel::default(), RequestsLoggingLevel::Path);
    }

    #[test]
    fn reads_content_length() {
        let mut headers = HeaderMap::new();
        assert!(content_length(&headers).is_err());

        headers.insert("content-length", HeaderValue::from_static("42"));
        assert_eq!(content_length(&headers), Ok(42));

        headers.insert("content-length", HeaderValue::from_static("lots"));
        assert!(content_length(&headers).is_err());
    }
}
