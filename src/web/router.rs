// Request dispatch: method + path -> route handler, errors -> uniform responses

use std::convert::Infallible;

use hyper::{Body, Method, Request, Response, StatusCode};

use super::error::AppError;
use super::response::cors_preflight;
use super::routes;
use super::state::SharedAppState;
use crate::{sys_debug, sys_error, sys_warn};

pub async fn handle_request(
    req: Request<Body>,
    state: SharedAppState,
) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    sys_debug!("[HTTP] {} {}", method, path);

    let result = match (&method, path.as_str()) {
        (&Method::GET, "/") => routes::index::handle(&req, &state).await,
        (&Method::POST, "/upload") => routes::upload::handle(req, &state).await,
        (&Method::GET | &Method::POST, "/cleanup") => routes::cleanup::handle(&req, &state).await,
        (&Method::GET, "/health") => routes::health::handle(&state).await,
        (&Method::GET, p) if p.starts_with("/result/") => routes::result::handle(&req, &state).await,
        (&Method::GET, p) if p.starts_with("/download/") => {
            routes::download::handle(&req, &state).await
        }
        (&Method::GET, p) if p.starts_with("/static/") => {
            routes::static_files::handle(p, &state).await
        }
        (&Method::OPTIONS, _) => Ok(cors_preflight()),
        _ => Err(AppError::NotFound(format!("no route for {method} {path}"))),
    };

    let response = result.unwrap_or_else(|err| {
        if err.status().is_server_error() {
            sys_error!("[HTTP] {} {} failed: {}", method, path, err);
        } else if err.status() != StatusCode::NOT_FOUND {
            sys_warn!("[HTTP] {} {} rejected: {}", method, path, err);
        }
        err.into_response()
    });
    Ok(response)
}
