// Upload form; visiting it also runs housekeeping

use hyper::{Body, Request, Response, StatusCode};
use minijinja::context;

use crate::web::error::AppError;
use crate::web::housekeeping::apply_policy;
use crate::web::models::{model_options, Resolution, UpscaleModel};
use crate::web::response::{attach_session_cookie, html_response};
use crate::web::session::resolve_session;
use crate::web::state::AppState;

pub async fn handle(req: &Request<Body>, state: &AppState) -> Result<Response<Body>, AppError> {
    let (token, is_new) = resolve_session(req.headers());
    apply_policy(state, &token).await;

    let resolutions: Vec<u8> = Resolution::ALL.into_iter().map(Resolution::factor).collect();
    let html = state.templates.render(
        "index.html",
        context! {
            models => model_options(),
            default_model => UpscaleModel::DEFAULT.id(),
            resolutions => resolutions,
        },
    )?;

    let mut response = html_response(StatusCode::OK, html);
    if is_new {
        attach_session_cookie(&mut response, &token);
    }
    Ok(response)
}
