// Explicit cleanup, fired by the result page's unload beacon

use hyper::{Body, Request, Response, StatusCode};

use crate::web::error::AppError;
use crate::web::housekeeping::apply_policy;
use crate::web::response::empty_response;
use crate::web::session::{token_from_headers, SessionToken};
use crate::web::state::AppState;

pub async fn handle(req: &Request<Body>, state: &AppState) -> Result<Response<Body>, AppError> {
    // No cookie means nothing session-scoped to delete; the eager policy still wipes everything.
    let token = token_from_headers(req.headers()).unwrap_or_else(SessionToken::generate);
    apply_policy(state, &token).await;
    Ok(empty_response(StatusCode::NO_CONTENT))
}
