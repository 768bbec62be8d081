use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Persistence failure. Any open transaction has been rolled back.
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors a webhook sender should retry. Everything else is a permanent
    /// rejection of that payload.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Database(_) | AppError::Internal(_) => true,
            AppError::InvalidInput(_)
            | AppError::Conflict(_)
            | AppError::InvalidSignature
            | AppError::InvalidCredentials
            | AppError::Forbidden
            | AppError::NotFound => false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    DatabaseError,
    InvalidInput,
    Conflict,
    InvalidSignature,
    InvalidCredentials,
    Forbidden,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
