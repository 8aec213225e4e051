// Comparison page for an upscaled image

use hyper::{Body, Request, Response, StatusCode};
use minijinja::context;

use crate::web::discovery::list_dir;
use crate::web::error::AppError;
use crate::web::filename::is_safe_name;
use crate::web::models::{Resolution, UpscaleModel};
use crate::web::presenter::describe;
use crate::web::request_parsing::{file_name_param, get_query_param};
use crate::web::response::html_response;
use crate::web::state::AppState;

pub async fn handle(req: &Request<Body>, state: &AppState) -> Result<Response<Body>, AppError> {
    let filename = file_name_param(req.uri().path(), "/result/")?;
    let original = get_query_param(req.uri(), "original").filter(|name| !name.is_empty());
    if let Some(name) = &original {
        if !is_safe_name(name) {
            return Err(AppError::invalid(format!("Invalid file name: {name}")));
        }
    }
    // Display-only hints; unknown values are simply not shown.
    let model = get_query_param(req.uri(), "model").and_then(|m| UpscaleModel::parse(&m));
    let resolution = get_query_param(req.uri(), "resolution").and_then(|r| Resolution::parse(&r));

    let Some(output) = describe(&state.output_dir, &filename).await else {
        let available = list_dir(&state.output_dir).await.unwrap_or_default();
        let html = state.templates.render(
            "not_found.html",
            context! { filename => filename, available => available },
        )?;
        return Ok(html_response(StatusCode::NOT_FOUND, html));
    };

    let original = match original {
        Some(name) => describe(&state.upload_dir, &name).await,
        None => None,
    };

    let html = state.templates.render(
        "result.html",
        context! {
            output => output,
            original => original,
            model_label => model.map(UpscaleModel::label),
            resolution => resolution.map(Resolution::factor),
        },
    )?;
    Ok(html_response(StatusCode::OK, html))
}
