use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};
use tracing::error;

use crate::api::response;

pub const NO_URL_MESSAGE: &str = "No URL provided";
pub const EMPTY_CONTENT_MESSAGE: &str = "No visible content found for the landing page.";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{}", NO_URL_MESSAGE)]
    MissingInput,

    #[error("{}", EMPTY_CONTENT_MESSAGE)]
    EmptyContent,

    #[error("Error fetching the URL: {0}")]
    Fetch(String),

    #[error("Error fetching the URL: origin returned HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Completion request failed: {0}")]
    CompletionCall(String),

    #[error("Model returned invalid JSON")]
    InvalidModelOutput { message: String, raw: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingInput | AppError::EmptyContent => StatusCode::BAD_REQUEST,
            AppError::Fetch(_)
            | AppError::HttpStatus { .. }
            | AppError::CompletionCall(_)
            | AppError::InvalidModelOutput { .. }
            | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Extra diagnostics for the caller, if the error carries any.
    pub fn details(&self) -> Option<String> {
        match self {
            AppError::InvalidModelOutput { message, .. } => Some(message.clone()),
            AppError::CompletionCall(msg) => Some(msg.clone()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let AppError::InvalidModelOutput { message, raw } = &self {
            error!(parse_error = %message, raw_output = %raw, "model output rejected");
        }

        response::error(status, self.to_string(), self.details()).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Fetch(err.to_string())
    }
}

impl From<std::env::VarError> for AppError {
    fn from(err: std::env::VarError) -> Self {
        AppError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
