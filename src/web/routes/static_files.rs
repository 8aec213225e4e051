// Static file serving: /static/uploads, /static/outputs and the rest of the static dir

use std::path::{Component, Path, PathBuf};

use hyper::{Body, Response};

use crate::web::error::AppError;
use crate::web::response::file_response;
use crate::web::state::AppState;

pub fn content_type_for(path: &str) -> &'static str {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else if lower.ends_with(".bmp") {
        "image/bmp"
    } else if lower.ends_with(".svg") {
        "image/svg+xml"
    } else if lower.ends_with(".js") {
        "application/javascript"
    } else if lower.ends_with(".css") {
        "text/css"
    } else if lower.ends_with(".json") {
        "application/json"
    } else if lower.ends_with(".html") || lower.ends_with(".htm") {
        "text/html"
    } else if lower.ends_with(".txt") {
        "text/plain"
    } else {
        "application/octet-stream"
    }
}

/// Relative path made only of normal components, or `None` (`..`, absolute, empty).
fn confined(relative: &str) -> Option<PathBuf> {
    let path = Path::new(relative);
    let mut components = path.components().peekable();
    components.peek()?;
    components
        .all(|c| matches!(c, Component::Normal(_)))
        .then(|| path.to_path_buf())
}

pub async fn handle(path: &str, state: &AppState) -> Result<Response<Body>, AppError> {
    let not_found = || AppError::NotFound(format!("{path} not found"));

    let rest = path.strip_prefix("/static/").ok_or_else(not_found)?;
    let decoded = urlencoding::decode(rest).map_err(|_| not_found())?;

    // Uploads and outputs may be configured outside the static dir.
    let (root, relative, cache_control) = if let Some(name) = decoded.strip_prefix("uploads/") {
        (state.upload_dir.as_path(), name, "no-store")
    } else if let Some(name) = decoded.strip_prefix("outputs/") {
        (state.output_dir.as_path(), name, "no-store")
    } else {
        (state.config.static_dir.as_path(), &*decoded, "public, max-age=3600")
    };

    let relative = confined(relative).ok_or_else(not_found)?;
    let content = match tokio::fs::read(root.join(&relative)).await {
        Ok(content) => content,
        Err(_) => return Err(not_found()),
    };

    Ok(file_response(
        Body::from(content),
        content_type_for(&relative.to_string_lossy()),
        cache_control,
    ))
}
