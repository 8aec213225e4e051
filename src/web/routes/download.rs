// Download route: stream a generated image as an attachment

use hyper::{Body, Request, Response};
use tokio_util::io::ReaderStream;

use super::static_files::content_type_for;
use crate::web::error::AppError;
use crate::web::request_parsing::file_name_param;
use crate::web::response::attachment_response;
use crate::web::state::AppState;
use crate::sys_info;

pub async fn handle(req: &Request<Body>, state: &AppState) -> Result<Response<Body>, AppError> {
    let filename = file_name_param(req.uri().path(), "/download/")?;
    let path = state.output_dir.join(&filename);

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("{filename} is not available")));
        }
        Err(e) => return Err(e.into()),
    };
    let length = file.metadata().await?.len();
    sys_info!("[DOWNLOAD] Sending {} ({} bytes)", filename, length);

    Ok(attachment_response(
        Body::wrap_stream(ReaderStream::new(file)),
        &filename,
        content_type_for(&filename),
        length,
    ))
}
