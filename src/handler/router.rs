//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for method
//! validation, health endpoints, query extraction, and dispatching into the
//! file-serving pipeline.

use std::convert::Infallible;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{HeaderMap, Method, Request, Response, Version};
use url::form_urlencoded;

use crate::config::AppState;
use crate::handler::textfile::{self, ServeError};
use crate::http;
use crate::logger::{self, AccessLogEntry};

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let client = client_identifier(req.headers());
    logger::log_request_received(&client, &req.uri().to_string());

    let response = process(&req, &state, &client).await;

    if state.cached_access_log.load(Ordering::Relaxed) {
        let entry = access_entry(&req, &client, &response, started.elapsed());
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Run the boundary checks and dispatch to the file-serving pipeline
async fn process(
    req: &Request<hyper::body::Incoming>,
    state: &Arc<AppState>,
    client: &str,
) -> Response<Full<Bytes>> {
    // 1. Check HTTP method
    if let Some(resp) = check_http_method(req.method(), state.config.http.enable_cors) {
        return resp;
    }

    // 2. Check body size
    if let Some(resp) = check_body_size(req, state.config.http.max_body_size) {
        return resp;
    }

    // 3. Log headers if enabled
    logger::log_headers_count(req.headers().len(), state.config.logging.show_headers);

    // 4. Health check endpoints
    let path = req.uri().path();
    let health = &state.config.health;
    if health.enabled && (path == health.liveness_path || path == health.readiness_path) {
        return http::build_health_response();
    }

    // 5. Serve the requested file
    let is_head = *req.method() == Method::HEAD;
    let filename = query_param(req.uri().query(), "filename");
    match textfile::serve(state.base_dir(), filename.as_deref()).await {
        Ok(file) => {
            logger::log_file_served(client, filename.as_deref().unwrap_or(""), file.content.len());
            http::build_file_response(file.content, file.content_type, is_head)
        }
        Err(err) => {
            log_refusal(client, filename.as_deref(), err);
            http::build_text_response(err.status(), err.message())
        }
    }
}

/// Client identifier for diagnostics, taken from forwarding headers.
///
/// Never used for authorization, only for log lines.
fn client_identifier(headers: &HeaderMap) -> String {
    for name in ["x-forwarded-for", "x-client-ip"] {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }
    "Unknown IP".to_string()
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method, enable_cors: bool) -> Option<Response<Full<Bytes>>> {
    match method {
        &Method::GET | &Method::HEAD => None,
        &Method::OPTIONS => Some(http::build_options_response(enable_cors)),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(
    req: &Request<hyper::body::Incoming>,
    max_body_size: u64,
) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get("content-length")?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

/// First value for `name` in the query string, percent-decoded
fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    let query = query?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Emit the diagnostic line for a refused request, severity by status
fn log_refusal(client: &str, filename: Option<&str>, err: ServeError) {
    let name = filename.unwrap_or("<missing>");
    let message = format!(
        "[{}] Refused request from {client} for '{name}': {}",
        err.status(),
        err.message()
    );
    match err {
        ServeError::Internal => logger::log_error(&message),
        _ => logger::log_warning(&message),
    }
}

/// Build the access log entry for a completed request
fn access_entry(
    req: &Request<hyper::body::Incoming>,
    client: &str,
    response: &Response<Full<Bytes>>,
    elapsed: Duration,
) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        client.to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_str(req.version()).to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    entry.referer = header_value(req.headers(), "referer");
    entry.user_agent = header_value(req.headers(), "user-agent");
    entry.request_time_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
    entry
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2.0",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    #[test]
    fn test_query_param_basic() {
        assert_eq!(
            query_param(Some("filename=report.txt"), "filename"),
            Some("report.txt".to_string())
        );
        assert_eq!(query_param(Some("other=1"), "filename"), None);
        assert_eq!(query_param(None, "filename"), None);
    }

    #[test]
    fn test_query_param_percent_decoding() {
        assert_eq!(
            query_param(Some("filename=..%2F..%2Fsecret.txt"), "filename"),
            Some("../../secret.txt".to_string())
        );
        assert_eq!(
            query_param(Some("filename=my%20notes.txt"), "filename"),
            Some("my notes.txt".to_string())
        );
    }

    #[test]
    fn test_query_param_first_value_wins() {
        assert_eq!(
            query_param(Some("filename=a.txt&filename=b.txt"), "filename"),
            Some("a.txt".to_string())
        );
    }

    #[test]
    fn test_query_param_empty_value() {
        assert_eq!(
            query_param(Some("filename="), "filename"),
            Some(String::new())
        );
    }

    #[test]
    fn test_client_identifier_fallback_chain() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_identifier(&headers), "Unknown IP");

        headers.insert("x-client-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_identifier(&headers), "10.0.0.2");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7"));
        assert_eq!(client_identifier(&headers), "203.0.113.7");
    }

    #[test]
    fn test_method_gate() {
        assert!(check_http_method(&Method::GET, false).is_none());
        assert!(check_http_method(&Method::HEAD, false).is_none());

        let options = check_http_method(&Method::OPTIONS, false).unwrap();
        assert_eq!(options.status(), 204);

        let post = check_http_method(&Method::POST, false).unwrap();
        assert_eq!(post.status(), 405);
        let delete = check_http_method(&Method::DELETE, false).unwrap();
        assert_eq!(delete.status(), 405);
    }

    #[test]
    fn test_version_str() {
        assert_eq!(version_str(Version::HTTP_10), "1.0");
        assert_eq!(version_str(Version::HTTP_11), "1.1");
        assert_eq!(version_str(Version::HTTP_2), "2.0");
    }
}
