/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - 認証 gate の失敗は reason 文字列だけを返す (検証失敗の詳細はログのみ)
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing bearer token")]
    MissingBearerToken,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("identity provider unavailable")]
    IdentityProviderUnavailable,
    #[error("request timed out")]
    RequestTimeout,
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingBearerToken | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::IdentityProviderUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingBearerToken => "MISSING_BEARER_TOKEN",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::IdentityProviderUnavailable => "IDENTITY_PROVIDER_UNAVAILABLE",
            AppError::RequestTimeout => "REQUEST_TIMEOUT",
            AppError::Internal => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
            },
        };

        (self.status(), Json(body)).into_response()
    }
}
