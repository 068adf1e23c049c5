//! HTTP response building module
//!
//! Provides builders for the response shapes this server produces,
//! decoupled from specific business logic.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

/// Build a plain-text response for a fixed status/message pair
pub fn build_text_response(status: u16, body: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .header("Content-Length", body.len())
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            Response::new(Full::new(Bytes::from_static(body.as_bytes())))
        })
}

/// Build a 200 response carrying file content
pub fn build_file_response(
    content: String,
    content_type: &'static str,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let content_length = content.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(content)
    };

    Response::builder()
        .status(200)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(200, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(405)
        .header("Content-Type", "text/plain")
        .header("Allow", "GET, HEAD, OPTIONS")
        .body(Full::new(Bytes::from("405 Method Not Allowed")))
        .unwrap_or_else(|e| {
            log_build_error(405, &e);
            Response::new(Full::new(Bytes::from("405 Method Not Allowed")))
        })
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response(enable_cors: bool) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(204)
        .header("Allow", "GET, HEAD, OPTIONS");

    if enable_cors {
        builder = builder
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", "GET, HEAD, OPTIONS")
            .header("Access-Control-Allow-Headers", "Content-Type")
            .header("Access-Control-Max-Age", "86400");
    }

    builder.body(Full::new(Bytes::new())).unwrap_or_else(|e| {
        log_build_error(204, &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(413)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from("413 Payload Too Large")))
        .unwrap_or_else(|e| {
            log_build_error(413, &e);
            Response::new(Full::new(Bytes::from("413 Payload Too Large")))
        })
}

/// Build health check response
pub fn build_health_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(200)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from("ok")))
        .unwrap_or_else(|e| {
            log_build_error(200, &e);
            Response::new(Full::new(Bytes::from("ok")))
        })
}

/// Log response build error
fn log_build_error(status: u16, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_response_carries_status_and_body() {
        let response = build_text_response(403, "Access denied.");
        assert_eq!(response.status(), 403);
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "text/plain"
        );
    }

    #[test]
    fn test_file_response_head_has_empty_body_with_length() {
        let response = build_file_response("hello".to_string(), "text/plain", true);
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers().get("Content-Length").unwrap(), "5");
    }

    #[test]
    fn test_options_response_cors_headers() {
        let plain = build_options_response(false);
        assert!(plain.headers().get("Access-Control-Allow-Origin").is_none());

        let cors = build_options_response(true);
        assert_eq!(
            cors.headers().get("Access-Control-Allow-Origin").unwrap(),
            "*"
        );
    }

    #[test]
    fn test_405_lists_allowed_methods() {
        let response = build_405_response();
        assert_eq!(response.status(), 405);
        assert_eq!(
            response.headers().get("Allow").unwrap(),
            "GET, HEAD, OPTIONS"
        );
    }
}
