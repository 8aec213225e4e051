// Upload route handler: validate, store, upscale, redirect to the result page

use hyper::{Body, Request, Response};
use urlencoding::encode;

use crate::web::discovery::{discover_output, Discovery};
use crate::web::error::AppError;
use crate::web::filename::sanitize_filename;
use crate::web::housekeeping::apply_policy;
use crate::web::models::UpscaleOptions;
use crate::web::request_parsing::parse_upload_form;
use crate::web::response::{attach_session_cookie, redirect};
use crate::web::session::{resolve_session, SessionToken};
use crate::web::state::AppState;
use crate::web::upscaler::UpscaleJob;
use crate::{sys_error, sys_info, sys_warn};

/// A new session token goes back with the response whether or not the upload
/// succeeded, since files may already be recorded under it.
pub async fn handle(req: Request<Body>, state: &AppState) -> Result<Response<Body>, AppError> {
    let (token, is_new) = resolve_session(req.headers());

    let mut response = match process(req, state, &token).await {
        Ok(response) => response,
        Err(err) => {
            if err.status().is_server_error() {
                sys_error!("[UPLOAD] Failed: {}", err);
            } else {
                sys_warn!("[UPLOAD] Rejected: {}", err);
            }
            err.into_response()
        }
    };
    if is_new {
        attach_session_cookie(&mut response, &token);
    }
    Ok(response)
}

async fn process(
    req: Request<Body>,
    state: &AppState,
    token: &SessionToken,
) -> Result<Response<Body>, AppError> {
    let form = parse_upload_form(req, state.config.max_upload_bytes).await?;

    let data = form
        .data
        .ok_or_else(|| AppError::invalid("No file uploaded."))?;
    let raw_name = form
        .filename
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| AppError::invalid("No file selected."))?;
    let filename = sanitize_filename(&raw_name)
        .ok_or_else(|| AppError::invalid(format!("Unusable file name: {raw_name}")))?;
    if data.is_empty() {
        return Err(AppError::invalid("Uploaded file is empty."));
    }
    let options = UpscaleOptions::from_form(form.model.as_deref(), form.resolution.as_deref())?;

    apply_policy(state, token).await;

    let input_path = state.upload_dir.join(&filename);
    let expected_output = state.output_dir.join(state.naming.output_name(&filename));
    let _in_flight = state
        .in_flight
        .hold(vec![input_path.clone(), expected_output]);

    tokio::fs::write(&input_path, &data).await?;
    state.sessions.record(token, input_path.clone());
    sys_info!(
        "[UPLOAD] Stored {} ({} bytes) model={} scale={}",
        filename,
        data.len(),
        options.model,
        options.resolution
    );

    let job = UpscaleJob {
        input_path,
        output_dir: state.output_dir.clone(),
        options,
    };
    state.queue.run(job).await?;

    let output_path = match discover_output(&state.output_dir, &state.naming, &filename).await? {
        Discovery::Exact(path) | Discovery::Fallback(path) => path,
        Discovery::Missing { listing } => {
            let expected = state.naming.output_name(&filename);
            sys_warn!("[UPLOAD] Tool exited cleanly but {} is missing", expected);
            return Err(AppError::OutputMissing { expected, listing });
        }
    };
    state.sessions.record(token, output_path.clone());

    let output_name = output_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let location = format!(
        "/result/{}?original={}&model={}&resolution={}",
        encode(&output_name),
        encode(&filename),
        encode(options.model.id()),
        options.resolution
    );

    Ok(redirect(&location))
}
