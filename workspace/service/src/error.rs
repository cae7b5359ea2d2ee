use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error taxonomy for the service layer. The handler layer translates
/// these to HTTP status codes; no service function retries anything,
/// every failure is terminal for the request.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Entity absent (or not visible to the requesting user) -> 404.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Malformed or out-of-range input -> 400.
    #[error("validation error: {0}")]
    Validation(String),

    /// Bad, expired or missing signature/token -> 401.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Authenticated but not allowed (e.g. deactivated user) -> 403.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Domain-rule violation (negative deposit, wallet/user mismatch,
    /// paying a settled installment) -> 400 with message.
    #[error("{0}")]
    Domain(String),

    /// Receipt image extraction failed -> 502.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Unexpected database failure -> 500.
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn domain(msg: impl Into<String>) -> Self {
        Self::Domain(msg.into())
    }
}
