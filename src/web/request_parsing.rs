// Request parsing utilities for HTTP handlers

use hyper::body::Bytes;
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Body, Request, Uri};

use super::error::AppError;
use super::filename::is_safe_name;
use crate::sys_debug;

/// Extract a query parameter from URI.
///
/// Returns `Some(value)` if the parameter exists, `None` otherwise.
/// The value is URL-decoded automatically (`+` is treated as a space).
///
/// # Example
/// ```
/// # use upscale_web::web::request_parsing::get_query_param;
/// let uri: hyper::Uri = "/result/a_out.png?original=a.png".parse().unwrap();
/// assert_eq!(get_query_param(&uri, "original").as_deref(), Some("a.png"));
/// ```
pub fn get_query_param(uri: &Uri, key: &str) -> Option<String> {
    let query = uri.query()?;

    for param in query.split('&') {
        let (param_key, param_value) = param.split_once('=').unwrap_or((param, ""));
        if param_key == key {
            return urlencoding::decode(&param_value.replace('+', " "))
                .ok()
                .map(|s| s.into_owned());
        }
    }

    None
}

/// Decode the file name that follows `prefix` in a path such as `/result/<name>`.
///
/// Anything that is not already a sanitized single component is rejected, so
/// callers can join the result onto a storage directory.
pub fn file_name_param(path: &str, prefix: &str) -> Result<String, AppError> {
    let raw = path
        .strip_prefix(prefix)
        .ok_or_else(|| AppError::NotFound(format!("no route for {path}")))?;
    let decoded = urlencoding::decode(raw)
        .map_err(|_| AppError::invalid("File name is not valid UTF-8"))?;
    if !is_safe_name(&decoded) {
        return Err(AppError::invalid(format!("Invalid file name: {decoded}")));
    }
    Ok(decoded.into_owned())
}

/// Fields of the upload form. Everything is optional here; validation happens in the handler.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub filename: Option<String>,
    pub data: Option<Bytes>,
    pub model: Option<String>,
    pub resolution: Option<String>,
}

/// Parse a `multipart/form-data` upload, enforcing `limit` on the whole body.
pub async fn parse_upload_form(req: Request<Body>, limit: u64) -> Result<UploadForm, AppError> {
    let boundary = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| multer::parse_boundary(value).ok())
        .ok_or_else(|| AppError::invalid("Expected a multipart/form-data upload"))?;

    let declared = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(AppError::PayloadTooLarge(limit));
    }

    let constraints =
        multer::Constraints::new().size_limit(multer::SizeLimit::new().whole_stream(limit));
    let mut multipart = multer::Multipart::with_constraints(req.into_body(), boundary, constraints);

    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("image") => {
                form.filename = field.file_name().map(str::to_owned);
                form.data = Some(field.bytes().await?);
            }
            Some("model") => form.model = Some(field.text().await?),
            Some("resolution") => form.resolution = Some(field.text().await?),
            other => sys_debug!("[UPLOAD] Ignoring form field {:?}", other),
        }
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::StatusCode;

    #[test]
    fn test_get_query_param_basic() {
        let uri: Uri = "/result/x?model=RealESRGAN_x4plus".parse().unwrap();
        assert_eq!(get_query_param(&uri, "model"), Some("RealESRGAN_x4plus".to_string()));
    }

    #[test]
    fn test_get_query_param_url_encoded() {
        let uri: Uri = "/result/x?original=my%20photo.jpg".parse().unwrap();
        assert_eq!(get_query_param(&uri, "original"), Some("my photo.jpg".to_string()));
    }

    #[test]
    fn test_get_query_param_multiple_params() {
        let uri: Uri = "/result/x?original=a.jpg&model=m&resolution=2".parse().unwrap();
        assert_eq!(get_query_param(&uri, "original"), Some("a.jpg".to_string()));
        assert_eq!(get_query_param(&uri, "model"), Some("m".to_string()));
        assert_eq!(get_query_param(&uri, "resolution"), Some("2".to_string()));
    }

    #[test]
    fn test_get_query_param_not_found() {
        let uri: Uri = "/result/x?foo=bar".parse().unwrap();
        assert_eq!(get_query_param(&uri, "missing"), None);
        let uri: Uri = "/result/x".parse().unwrap();
        assert_eq!(get_query_param(&uri, "foo"), None);
    }

    #[test]
    fn test_get_query_param_empty_value() {
        let uri: Uri = "/result/x?original=&flag".parse().unwrap();
        assert_eq!(get_query_param(&uri, "original"), Some(String::new()));
        assert_eq!(get_query_param(&uri, "flag"), Some(String::new()));
    }

    #[test]
    fn test_file_name_param() {
        assert_eq!(
            file_name_param("/download/photo_out.jpg", "/download/").unwrap(),
            "photo_out.jpg"
        );
        for bad in ["/download/..%2Fsecret", "/download/", "/download/a%2Fb.jpg", "/download/.."] {
            let err = file_name_param(bad, "/download/").unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{bad}");
        }
    }

    fn multipart_request(body: &'static str, content_type: &str) -> Request<Body> {
        Request::post("/upload")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_parse_upload_form() {
        let body = "--XyZ\r\n\
            Content-Disposition: form-data; name=\"model\"\r\n\r\n\
            RealESRGAN_x2plus\r\n\
            --XyZ\r\n\
            Content-Disposition: form-data; name=\"image\"; filename=\"cat.png\"\r\n\
            Content-Type: image/png\r\n\r\n\
            PNGDATA\r\n\
            --XyZ--\r\n";
        let form = parse_upload_form(multipart_request(body, "multipart/form-data; boundary=XyZ"), 1024)
            .await
            .unwrap();
        assert_eq!(form.filename.as_deref(), Some("cat.png"));
        assert_eq!(form.data.as_deref(), Some(&b"PNGDATA"[..]));
        assert_eq!(form.model.as_deref(), Some("RealESRGAN_x2plus"));
        assert_eq!(form.resolution, None);
    }

    #[tokio::test]
    async fn test_non_multipart_rejected() {
        let err = parse_upload_form(multipart_request("{}", "application/json"), 1024)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_body_limit() {
        let body = "--XyZ\r\n\
            Content-Disposition: form-data; name=\"image\"; filename=\"big.png\"\r\n\r\n\
            0123456789012345678901234567890123456789\r\n\
            --XyZ--\r\n";
        let err = parse_upload_form(multipart_request(body, "multipart/form-data; boundary=XyZ"), 16)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
