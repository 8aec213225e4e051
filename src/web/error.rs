// Error taxonomy for the request path and its mapping onto HTTP responses

use std::io;
use std::time::Duration;

use hyper::{Body, Response, StatusCode};
use thiserror::Error;

use super::response::text_response;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing file, empty filename, unknown model/resolution, path-like names
    #[error("{0}")]
    InvalidInput(String),

    #[error("upload exceeds the {0} byte limit")]
    PayloadTooLarge(u64),

    #[error("{0}")]
    NotFound(String),

    #[error("upscaling timed out after {}s", .0.as_secs_f32())]
    ToolTimeout(Duration),

    #[error("upscaler {}: {diagnostics}", exit_label(.code))]
    ToolFailed {
        code: Option<i32>,
        diagnostics: String,
    },

    #[error("failed to start upscaler: {0}")]
    ToolSpawn(#[source] io::Error),

    #[error("upscaler finished but {expected} was not produced; output folder contains: {}", listing_label(.listing))]
    OutputMissing {
        expected: String,
        listing: Vec<String>,
    },

    #[error("upscale queue is not accepting jobs")]
    QueueClosed,

    #[error("invalid multipart body: {0}")]
    Multipart(#[source] multer::Error),

    #[error("template rendering failed: {0}")]
    Template(#[from] minijinja::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {code}"),
        None => "was terminated by a signal".to_string(),
    }
}

fn listing_label(listing: &[String]) -> String {
    if listing.is_empty() {
        "None".to_string()
    } else {
        listing.join(", ")
    }
}

impl From<multer::Error> for AppError {
    fn from(err: multer::Error) -> Self {
        match err {
            multer::Error::StreamSizeExceeded { limit }
            | multer::Error::FieldSizeExceeded { limit, .. } => AppError::PayloadTooLarge(limit),
            other => AppError::Multipart(other),
        }
    }
}

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::InvalidInput(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::Multipart(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ToolTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::QueueClosed => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ToolFailed { .. }
            | AppError::ToolSpawn(_)
            | AppError::OutputMissing { .. }
            | AppError::Template(_)
            | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable tag sent as `x-error-kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) | AppError::Multipart(_) => "invalid_input",
            AppError::PayloadTooLarge(_) => "payload_too_large",
            AppError::NotFound(_) => "not_found",
            AppError::ToolTimeout(_) => "timeout",
            AppError::ToolFailed { .. } => "tool_failed",
            AppError::ToolSpawn(_) => "tool_spawn",
            AppError::OutputMissing { .. } => "output_missing",
            AppError::QueueClosed => "queue_closed",
            AppError::Template(_) | AppError::Io(_) => "internal",
        }
    }

    /// Every error leaves the server as `text/plain` `error: <message>`.
    pub fn into_response(self) -> Response<Body> {
        let mut response = text_response(self.status(), format!("error: {self}"));
        response.headers_mut().insert(
            "x-error-kind",
            hyper::header::HeaderValue::from_static(self.kind()),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::invalid("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::ToolTimeout(Duration::from_secs(120)).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AppError::ToolFailed { code: Some(1), diagnostics: String::new() }.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::QueueClosed.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(AppError::PayloadTooLarge(10).status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_messages() {
        let err = AppError::ToolFailed {
            code: Some(3),
            diagnostics: "CUDA out of memory".into(),
        };
        assert_eq!(err.to_string(), "upscaler exited with status 3: CUDA out of memory");

        let err = AppError::OutputMissing {
            expected: "photo_out.jpg".into(),
            listing: vec![],
        };
        assert!(err.to_string().ends_with("output folder contains: None"));
    }

    #[tokio::test]
    async fn test_into_response_shape() {
        let response = AppError::invalid("No file uploaded.").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["x-error-kind"], "invalid_input");
        assert_eq!(response.headers()["content-type"], "text/plain; charset=utf-8");
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], b"error: No file uploaded.");
    }
}
