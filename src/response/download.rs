//! File downloads rendered through the response envelope.
use actix_web::HttpResponse;
use actix_web::http::header;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::response::{self, HttpError};
use crate::services::download::{DownloadError, DownloadService};

/// Bytes escaped in the `Content-Disposition` filename. The unreserved
/// characters stay literal.
const FILE_NAME_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Sends the file at `requested` to the client, reporting every failure
/// through the standard envelope with code 200 and HTTP status 400.
///
/// A pre-existing error from an earlier stage (typically validation) is
/// rendered immediately without touching the filesystem.
pub fn send_download(
    service: &DownloadService,
    requested: &str,
    err: Option<HttpError>,
) -> HttpResponse {
    if let Some(err) = err {
        return response::error(&err);
    }

    match file_response(service, requested) {
        Ok(response) => response,
        Err(err) => {
            log::warn!("download request failed: {err}");
            response::error(&err)
        }
    }
}

fn file_response(service: &DownloadService, requested: &str) -> Result<HttpResponse, HttpError> {
    let wrap = |source: DownloadError| HttpError::download(requested, source);

    let resolved = service.resolve(requested).map_err(wrap)?;
    let mut download = service.open(&resolved).map_err(wrap)?;

    let mut body = Vec::with_capacity(download.size() as usize);
    download.write_to(&mut body).map_err(wrap)?;

    let disposition = format!(
        "attachment; filename={}",
        utf8_percent_encode(download.file_name(), &FILE_NAME_SET)
    );

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "application/octet-stream"))
        .insert_header((header::CONTENT_DISPOSITION, disposition))
        .insert_header((header::ACCESS_CONTROL_EXPOSE_HEADERS, "Content-Disposition"))
        .insert_header((header::CONTENT_LENGTH, download.size().to_string()))
        .body(body))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;
    use serde_json::Value;
    use tempfile::tempdir;

    use crate::services::download::DownloadRoot;

    use super::*;

    fn configured_service(root: &Path) -> DownloadService {
        let download_root = DownloadRoot::new();
        download_root.set(root.to_str().unwrap()).unwrap();
        DownloadService::new(download_root)
    }

    async fn body_json(response: HttpResponse) -> Value {
        let bytes = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn header_value(response: &HttpResponse, name: header::HeaderName) -> String {
        response
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    #[actix_web::test]
    async fn sends_the_file_with_transfer_headers() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("reports")).unwrap();
        fs::write(dir.path().join("reports/report.txt"), b"download content").unwrap();
        let service = configured_service(dir.path());

        let response = send_download(&service, "reports/report.txt", None);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            header_value(&response, header::CONTENT_TYPE),
            "application/octet-stream"
        );
        assert_eq!(
            header_value(&response, header::CONTENT_DISPOSITION),
            "attachment; filename=report.txt"
        );
        assert_eq!(
            header_value(&response, header::ACCESS_CONTROL_EXPOSE_HEADERS),
            "Content-Disposition"
        );
        assert_eq!(header_value(&response, header::CONTENT_LENGTH), "16");

        let bytes = to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&bytes[..], b"download content");
    }

    #[actix_web::test]
    async fn percent_encodes_the_disposition_filename() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("my report.txt"), b"x").unwrap();
        let service = configured_service(dir.path());

        let response = send_download(&service, "my report.txt", None);
        assert_eq!(
            header_value(&response, header::CONTENT_DISPOSITION),
            "attachment; filename=my%20report.txt"
        );
    }

    #[actix_web::test]
    async fn a_pre_existing_error_short_circuits_resolution() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("present.txt"), b"x").unwrap();
        let service = configured_service(dir.path());

        let err = HttpError::Validation {
            messages: vec!["path must not be empty".to_string()],
        };
        let response = send_download(&service, "present.txt", Some(err));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["code"], 100);
        assert_eq!(body["msg"], "path must not be empty");
    }

    #[actix_web::test]
    async fn an_escaping_request_renders_the_envelope() {
        let dir = tempdir().unwrap();
        let service = configured_service(dir.path());

        let response = send_download(&service, "../etc/passwd", None);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["code"], 200);
        assert_eq!(
            body["msg"],
            "download ../etc/passwd: path escapes download root"
        );
    }

    #[actix_web::test]
    async fn a_missing_root_renders_the_envelope() {
        let service = DownloadService::new(DownloadRoot::new());

        let response = send_download(&service, "file.txt", None);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["code"], 200);
        assert_eq!(
            body["msg"],
            "download file.txt: download root is not configured"
        );
    }

    #[actix_web::test]
    async fn a_directory_renders_the_envelope() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        let service = configured_service(dir.path());

        let response = send_download(&service, "nested", None);
        let body = body_json(response).await;
        assert_eq!(body["code"], 200);
        assert_eq!(body["msg"], "download nested: not a regular file");
    }
}
