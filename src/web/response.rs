// Response helper utilities for HTTP responses with CORS headers

use hyper::header::{HeaderValue, SET_COOKIE};
use hyper::http::response::Builder;
use hyper::{Body, Response, StatusCode};

use super::session::{session_cookie, SessionToken};
use crate::sys_error;

const CORS_ORIGIN: &str = "*";
const CORS_METHODS: &str = "GET, POST, OPTIONS";
const CORS_HEADERS: &str = "content-type";

/// Finish a builder, degrading to a bare 500 if a header value was rejected.
fn finish(builder: Builder, body: Body) -> Response<Body> {
    builder.body(body).unwrap_or_else(|e| {
        sys_error!("[HTTP] Failed to build response: {}", e);
        let mut fallback = Response::new(Body::empty());
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

/// Create an HTML response with CORS headers
pub fn html_response(status: StatusCode, body: impl Into<Body>) -> Response<Body> {
    finish(
        Response::builder()
            .status(status)
            .header("content-type", "text/html; charset=utf-8")
            .header("access-control-allow-origin", CORS_ORIGIN),
        body.into(),
    )
}

/// Create a text/plain response with CORS headers
pub fn text_response(status: StatusCode, body: impl Into<Body>) -> Response<Body> {
    finish(
        Response::builder()
            .status(status)
            .header("content-type", "text/plain; charset=utf-8")
            .header("access-control-allow-origin", CORS_ORIGIN),
        body.into(),
    )
}

/// Build a raw JSON string response
pub fn json_raw(status: StatusCode, json: String) -> Response<Body> {
    finish(
        Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .header("access-control-allow-origin", CORS_ORIGIN),
        Body::from(json),
    )
}

/// Build an empty response with CORS headers
pub fn empty_response(status: StatusCode) -> Response<Body> {
    finish(
        Response::builder()
            .status(status)
            .header("access-control-allow-origin", CORS_ORIGIN)
            .header("access-control-allow-methods", CORS_METHODS)
            .header("access-control-allow-headers", CORS_HEADERS),
        Body::empty(),
    )
}

/// CORS preflight response
pub fn cors_preflight() -> Response<Body> {
    empty_response(StatusCode::OK)
}

/// 303 redirect, so the browser follows a POST with a GET
pub fn redirect(location: &str) -> Response<Body> {
    finish(
        Response::builder()
            .status(StatusCode::SEE_OTHER)
            .header("location", location),
        Body::empty(),
    )
}

/// Serve bytes inline with the given content type
pub fn file_response(body: Body, content_type: &str, cache_control: &str) -> Response<Body> {
    finish(
        Response::builder()
            .status(StatusCode::OK)
            .header("content-type", content_type)
            .header("cache-control", cache_control),
        body,
    )
}

/// Stream a file as a download
pub fn attachment_response(
    body: Body,
    filename: &str,
    content_type: &str,
    content_length: u64,
) -> Response<Body> {
    finish(
        Response::builder()
            .status(StatusCode::OK)
            .header("content-type", content_type)
            .header("content-length", content_length)
            .header(
                "content-disposition",
                format!("attachment; filename=\"{filename}\""),
            ),
        body,
    )
}

/// Hand a freshly issued session token to the browser.
pub fn attach_session_cookie(response: &mut Response<Body>, token: &SessionToken) {
    match HeaderValue::from_str(&session_cookie(token)) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => sys_error!("[SESSION] Unusable cookie value: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect() {
        let response = redirect("/result/photo_out.jpg?original=photo.jpg");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()["location"],
            "/result/photo_out.jpg?original=photo.jpg"
        );
    }

    #[test]
    fn test_attachment_headers() {
        let response = attachment_response(Body::empty(), "photo_out.jpg", "image/jpeg", 12);
        assert_eq!(
            response.headers()["content-disposition"],
            "attachment; filename=\"photo_out.jpg\""
        );
        assert_eq!(response.headers()["content-length"], "12");
    }

    #[test]
    fn test_invalid_header_degrades_to_500() {
        let response = file_response(Body::empty(), "bad\nvalue", "no-store");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_session_cookie_attached() {
        let token = SessionToken::generate();
        let mut response = empty_response(StatusCode::NO_CONTENT);
        attach_session_cookie(&mut response, &token);
        let cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with(&format!("upscale_session={token}")));
        assert!(cookie.contains("HttpOnly"));
    }
}
