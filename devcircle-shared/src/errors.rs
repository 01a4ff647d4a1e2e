use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: User errors
/// - E2xxx: Content errors
/// - E3xxx: Group errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    BadRequest,
    Conflict,

    // User (E1xxx)
    UserNotFound,
    EmailAlreadyExists,
    WrongPassword,
    PasswordMissing,
    CannotFollowSelf,
    AlreadyFollowing,
    NotFollowing,

    // Content (E2xxx)
    ContentNotFound,
    InvalidContentKind,
    InvalidReference,
    AlreadyLiked,
    NotLiked,
    CommentNotFound,
    ReplyDepthExceeded,
    NotContentAuthor,

    // Group (E3xxx)
    GroupNotFound,
    AlreadyGroupMember,
    GroupMemberNotFound,
    NotGroupAdmin,
    NotGroupOwner,
    AlreadyGroupAdmin,
    NotAnAdmin,
    LastAdmin,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::BadRequest => "E0006",
            Self::Conflict => "E0007",

            // User
            Self::UserNotFound => "E1001",
            Self::EmailAlreadyExists => "E1002",
            Self::WrongPassword => "E1003",
            Self::PasswordMissing => "E1004",
            Self::CannotFollowSelf => "E1005",
            Self::AlreadyFollowing => "E1006",
            Self::NotFollowing => "E1007",

            // Content
            Self::ContentNotFound => "E2001",
            Self::InvalidContentKind => "E2002",
            Self::InvalidReference => "E2003",
            Self::AlreadyLiked => "E2004",
            Self::NotLiked => "E2005",
            Self::CommentNotFound => "E2006",
            Self::ReplyDepthExceeded => "E2007",
            Self::NotContentAuthor => "E2008",

            // Group
            Self::GroupNotFound => "E3001",
            Self::AlreadyGroupMember => "E3002",
            Self::GroupMemberNotFound => "E3003",
            Self::NotGroupAdmin => "E3004",
            Self::NotGroupOwner => "E3005",
            Self::AlreadyGroupAdmin => "E3006",
            Self::NotAnAdmin => "E3007",
            Self::LastAdmin => "E3008",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::WrongPassword
            | Self::PasswordMissing | Self::InvalidContentKind | Self::InvalidReference
            | Self::ReplyDepthExceeded => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::UserNotFound | Self::ContentNotFound
            | Self::CommentNotFound | Self::GroupNotFound | Self::GroupMemberNotFound
            | Self::NotFollowing | Self::NotLiked => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::NotGroupOwner => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::NotGroupAdmin | Self::CannotFollowSelf
            | Self::NotContentAuthor => StatusCode::FORBIDDEN,
            Self::Conflict | Self::EmailAlreadyExists | Self::AlreadyFollowing
            | Self::AlreadyLiked | Self::AlreadyGroupMember | Self::AlreadyGroupAdmin
            | Self::NotAnAdmin | Self::LastAdmin => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    diesel::result::Error::DatabaseError(
                        diesel::result::DatabaseErrorKind::ForeignKeyViolation,
                        _,
                    ) => (
                        StatusCode::BAD_REQUEST,
                        ApiErrorResponse::new("E2003", "referenced entity does not exist"),
                    ),
                    diesel::result::Error::DatabaseError(
                        diesel::result::DatabaseErrorKind::UniqueViolation,
                        _,
                    ) => (
                        StatusCode::CONFLICT,
                        ApiErrorResponse::new("E0007", "resource already exists"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ErrorCode::NotGroupAdmin.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::NotGroupOwner.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::AlreadyLiked.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::NotLiked.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::ReplyDepthExceeded.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn codes_are_unique() {
        let all = [
            ErrorCode::InternalError, ErrorCode::ValidationError, ErrorCode::NotFound,
            ErrorCode::Unauthorized, ErrorCode::Forbidden, ErrorCode::BadRequest,
            ErrorCode::Conflict, ErrorCode::UserNotFound, ErrorCode::EmailAlreadyExists,
            ErrorCode::WrongPassword, ErrorCode::PasswordMissing, ErrorCode::CannotFollowSelf,
            ErrorCode::AlreadyFollowing, ErrorCode::NotFollowing, ErrorCode::ContentNotFound,
            ErrorCode::InvalidContentKind, ErrorCode::InvalidReference, ErrorCode::AlreadyLiked,
            ErrorCode::NotLiked, ErrorCode::CommentNotFound, ErrorCode::ReplyDepthExceeded,
            ErrorCode::NotContentAuthor, ErrorCode::GroupNotFound, ErrorCode::AlreadyGroupMember,
            ErrorCode::GroupMemberNotFound, ErrorCode::NotGroupAdmin, ErrorCode::NotGroupOwner,
            ErrorCode::AlreadyGroupAdmin, ErrorCode::NotAnAdmin, ErrorCode::LastAdmin,
        ];
        let mut codes: Vec<&str> = all.iter().map(|c| c.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }
}
