use serde::Deserialize;
use validator::Validate;

/// Query parameters accepted by the download endpoint.
#[derive(Debug, Deserialize, Validate)]
pub struct DownloadForm {
    #[validate(length(min = 1, message = "path must not be empty"))]
    pub path: String,
}
