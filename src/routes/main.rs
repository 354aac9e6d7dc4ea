use actix_web::{HttpResponse, Responder, get, web};
use validator::Validate;

use crate::forms::main::DownloadForm;
use crate::response::download::send_download;
use crate::response::{self, HttpError, Payload};
use crate::services::download::DownloadService;

/// Serves a file from the configured download root.
///
/// The request enters with a path and, when validation failed, a
/// pre-existing error; either way the outcome is rendered through the
/// standard envelope.
#[get("/download")]
pub async fn download_file(
    params: web::Query<DownloadForm>,
    service: web::Data<DownloadService>,
) -> impl Responder {
    let err = params
        .validate()
        .err()
        .map(|failures| HttpError::validation(&failures));

    send_download(&service, &params.path, err)
}

#[get("/health")]
pub async fn health() -> HttpResponse {
    response::success(Payload::empty())
}
