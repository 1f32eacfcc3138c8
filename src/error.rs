use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::ocr::recognizer::RecognizeError;

// Taken from https://github.com/tokio-rs/axum/blob/main/examples/anyhow-error-response/src/main.rs
#[derive(Debug)]
pub struct RelayError {
    pub status: StatusCode,
    pub message: HttpErrorResponse,
}

#[derive(Debug, Serialize)]
pub struct HttpErrorResponse {
    error: String,
}

impl From<String> for HttpErrorResponse {
    fn from(message: String) -> Self {
        HttpErrorResponse { error: message }
    }
}

impl From<&str> for HttpErrorResponse {
    fn from(message: &str) -> Self {
        HttpErrorResponse {
            error: message.to_string(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let mut res = Json(self.message).into_response();
        *res.status_mut() = self.status;
        res
    }
}

/// Bad uploads are the caller's fault, provider trouble is not. The
/// provider detail stays in the log, the caller gets the generic message.
impl From<RecognizeError> for RelayError {
    fn from(err: RecognizeError) -> Self {
        let status = match &err {
            RecognizeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RecognizeError::Provider(source) => {
                error!("provider call failed: {source:#}");
                StatusCode::BAD_GATEWAY
            }
        };
        RelayError {
            status,
            message: HttpErrorResponse::from(err.user_message()),
        }
    }
}

impl From<minijinja::Error> for RelayError {
    fn from(err: minijinja::Error) -> Self {
        error!("template rendering failed: {err}");
        RelayError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: HttpErrorResponse::from("Internal server error"),
        }
    }
}

pub type RelayResult<T, E = RelayError> = Result<T, E>;
