// Health check route handler

use hyper::{Body, Response, StatusCode};

use crate::web::error::AppError;
use crate::web::response::json_raw;
use crate::web::state::AppState;

pub async fn handle(state: &AppState) -> Result<Response<Body>, AppError> {
    let body = serde_json::json!({
        "status": "ok",
        "service": "upscale-web",
        "queue_capacity": state.queue.capacity(),
        "active_sessions": state.sessions.len(),
    });
    Ok(json_raw(StatusCode::OK, body.to_string()))
}
