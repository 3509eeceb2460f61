use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::models::ErrorBody;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Code generation failed: {0}")]
    GenerationFailed(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// 把唯一索引冲突翻译成 Conflict，其余存储错误原样返回
    pub fn from_write_error(err: DbErr, code: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict(format!("Promotion code {code} already exists"))
            }
            _ => AppError::DatabaseError(err),
        }
    }

    /// 存储层唯一索引冲突
    pub fn is_unique_violation(err: &DbErr) -> bool {
        matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let body = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                ErrorBody::new("VALIDATION_ERROR", msg)
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                ErrorBody::new("AUTH_ERROR", msg)
            }
            AppError::JwtError(err) => {
                log::warn!("Invalid token: {err}");
                ErrorBody::new("AUTH_ERROR", "Invalid access token")
            }
            AppError::Forbidden => {
                log::warn!("Forbidden access");
                ErrorBody::new("FORBIDDEN", "Admin access required")
            }
            AppError::NotFound(msg) => ErrorBody::new("NOT_FOUND", msg),
            AppError::Conflict(msg) => {
                log::warn!("Conflict: {msg}");
                ErrorBody::new("CONFLICT", msg)
            }
            AppError::GenerationFailed(msg) => {
                log::error!("Code generation failed: {msg}");
                ErrorBody::new("GENERATION_FAILED", msg)
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                ErrorBody::new("DATABASE_ERROR", "Database error").with_details(err.to_string())
            }
            _ => {
                log::error!("Internal error: {self}");
                ErrorBody::new("INTERNAL_ERROR", "Internal server error")
            }
        };

        HttpResponse::build(status_code).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::ValidationError("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::DatabaseError(DbErr::Custom("down".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::GenerationFailed("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_non_unique_write_error_stays_database_error() {
        let err = AppError::from_write_error(DbErr::Custom("boom".into()), "SUMMER10");
        assert!(matches!(err, AppError::DatabaseError(_)));
    }
}
