//! Error types for the membership bot

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Malformed data file: {0}")]
  Malformed(json::Error),

  #[error("Failed to encode data file: {0}")]
  Encode(json::Error),

  #[error("Store worker is gone")]
  StoreClosed,

  #[error("Telegram request failed: {0}")]
  Request(#[from] teloxide::RequestError),

  #[error("User not found")]
  UserNotFound,

  #[error("Invalid arguments: {0}")]
  InvalidArgs(String),

  #[error("Unauthorized")]
  Unauthorized,
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      Error::UserNotFound => (StatusCode::NOT_FOUND, "User not found"),
      Error::InvalidArgs(_) => (StatusCode::BAD_REQUEST, "Invalid arguments"),
      Error::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
      Error::Malformed(_) | Error::Encode(_) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "Data file error")
      }
      Error::Io(_) | Error::StoreClosed | Error::Request(_) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
      }
    };

    let body = json::json!({
      "success": false,
      "error": message
    });

    (status, axum::Json(body)).into_response()
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
