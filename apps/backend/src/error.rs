//! HTTP-facing error type.
//!
//! Gameplay failures never reach this layer; they travel over the
//! WebSocket as protocol error frames. `AppError` covers the plain
//! HTTP endpoints and startup configuration.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {detail}")]
    Config { detail: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Store(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: &'static str,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        error!(error = %self, code = self.code(), "request failed");
        HttpResponse::build(self.status_code()).json(ErrorBody {
            message: "an internal error occurred".to_string(),
            code: self.code(),
        })
    }
}
