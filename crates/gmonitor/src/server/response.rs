use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;
use crate::tracker::TrackError;

/// JSON body shared by every API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }
}

impl Envelope<()> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// The upstream service failed.
    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }
        (status, Json(Envelope::error(self.to_string()))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => Self::NotFound(e.to_string()),
            StoreError::Duplicate { .. } => Self::Conflict(e.to_string()),
            StoreError::InvalidInput { .. } => Self::BadRequest(e.to_string()),
            StoreError::Database(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<TrackError> for ApiError {
    fn from(e: TrackError) -> Self {
        match e {
            TrackError::InvalidName { .. } => Self::BadRequest(e.to_string()),
            TrackError::AlreadyTracked { .. } => Self::Conflict(e.to_string()),
            TrackError::NotTracked { .. } => Self::NotFound(e.to_string()),
            TrackError::Fetch(_) => Self::BadGateway(e.to_string()),
            TrackError::Store(inner) => inner.into(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::FetchError;

    #[test]
    fn track_errors_map_to_status() {
        let cases = [
            (
                TrackError::InvalidName {
                    name: "x".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                TrackError::AlreadyTracked {
                    name: "a/b".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                TrackError::Fetch(FetchError::transport("connection reset")),
                StatusCode::BAD_GATEWAY,
            ),
            (
                TrackError::Store(StoreError::Database(sea_orm::DbErr::Custom("boom".into()))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn error_envelope_omits_data() {
        let json = serde_json::to_value(Envelope::error("nope")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "nope");
        assert!(json.get("data").is_none());
    }
}
