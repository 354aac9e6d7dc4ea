//! Uniform `{code, msg, data}` response envelope.
//!
//! Every outcome of every handler is rendered through [`write_envelope`]:
//! success and error responses differ only in which fields the error
//! overrides.
use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use validator::ValidationErrors;

use crate::services::download::DownloadError;

pub mod download;

/// Wire-level error: a closed set of kinds, each with a fixed numeric code
/// and a rendered message.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Any failure while locating, opening, or streaming a download.
    #[error("download {path}: {source}")]
    Download {
        path: String,
        #[source]
        source: DownloadError,
    },
    /// One or more field-validation failures.
    #[error("{}", .messages.join("\n").trim())]
    Validation { messages: Vec<String> },
    /// Anything without a dedicated code.
    #[error("{0}")]
    Other(String),
}

impl HttpError {
    /// Wraps a download failure together with the originally requested path.
    pub fn download(path: impl Into<String>, source: DownloadError) -> Self {
        Self::Download {
            path: path.into(),
            source,
        }
    }

    /// Flattens validator output into an ordered message list.
    ///
    /// Messages are sorted by field so the rendered aggregate is stable
    /// regardless of hash ordering.
    pub fn validation(errors: &ValidationErrors) -> Self {
        let mut fields: Vec<(String, Vec<String>)> = errors
            .field_errors()
            .iter()
            .map(|(field, failures)| {
                let messages = failures
                    .iter()
                    .map(|failure| match &failure.message {
                        Some(message) => message.to_string(),
                        None => format!("{field}: {}", failure.code),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        fields.sort();

        Self::Validation {
            messages: fields.into_iter().flat_map(|(_, m)| m).collect(),
        }
    }

    /// Numeric code carried in the envelope body.
    pub fn code(&self) -> i32 {
        match self {
            Self::Download { .. } => 200,
            Self::Validation { .. } => 100,
            Self::Other(_) => 0,
        }
    }
}

/// Envelope payload. Always renders as a JSON array so callers never see
/// an absent `data` field: `Empty` is `[]`, `One` wraps its value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Payload {
    #[default]
    Empty,
    One(Value),
    Many(Vec<Value>),
}

impl Payload {
    pub fn empty() -> Self {
        Self::Empty
    }

    pub fn one(value: Value) -> Self {
        Self::One(value)
    }

    pub fn many(values: Vec<Value>) -> Self {
        Self::Many(values)
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_seq(Some(0))?.end(),
            Self::One(value) => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element(value)?;
                seq.end()
            }
            Self::Many(values) => values.serialize(serializer),
        }
    }
}

impl From<Value> for Payload {
    /// `Value::Null` is absence-of-value and normalizes to `Empty`.
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            value => Self::One(value),
        }
    }
}

impl From<Vec<Value>> for Payload {
    fn from(values: Vec<Value>) -> Self {
        Self::Many(values)
    }
}

impl From<Option<Value>> for Payload {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Self::Empty, Self::from)
    }
}

impl From<()> for Payload {
    fn from(_: ()) -> Self {
        Self::Empty
    }
}

/// Envelope body shared by every response.
#[derive(Debug, Serialize)]
pub struct ResponseBody {
    pub code: i32,
    pub msg: String,
    pub data: Payload,
}

/// HTTP 200, code 0, msg `"success"`.
pub fn success(data: impl Into<Payload>) -> HttpResponse {
    write_envelope(StatusCode::OK, 0, data.into(), None)
}

/// HTTP 400 with the error's code and message.
pub fn error(err: &HttpError) -> HttpResponse {
    write_envelope(StatusCode::BAD_REQUEST, 0, Payload::Empty, Some(err))
}

/// Fully explicit response. A present error overrides code and msg but the
/// caller-chosen status is preserved.
pub fn respond(
    status: StatusCode,
    code: i32,
    data: Payload,
    err: Option<&HttpError>,
) -> HttpResponse {
    write_envelope(status, code, data, err)
}

fn write_envelope(
    status: StatusCode,
    code: i32,
    data: Payload,
    err: Option<&HttpError>,
) -> HttpResponse {
    let mut body = ResponseBody {
        code,
        msg: "success".to_string(),
        data,
    };

    if let Some(err) = err {
        body.code = err.code();
        body.msg = err.to_string();
    }

    HttpResponse::build(status).json(body)
}
