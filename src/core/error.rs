use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

/// Application-wide Result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Reason an appointment or invoice transition was refused.
///
/// Each variant names the precondition that failed, so callers can render
/// an appropriate message without string-matching error text.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// The actor is not the assigned doctor / owning patient for this action
    #[error("actor may not perform this action on this appointment")]
    WrongActor,

    /// Action requires a pending appointment
    #[error("appointment is not pending")]
    NotPending,

    /// Action requires a confirmed appointment
    #[error("appointment is not confirmed")]
    NotConfirmed,

    /// Appointment is already completed, cancelled, or marked no-show
    #[error("appointment is already in a terminal state")]
    AlreadyTerminal,

    /// Patient cancellation window has closed (confirmed, or start time passed)
    #[error("appointment can no longer be cancelled")]
    NotCancellable,

    /// Payment has already been recorded
    #[error("appointment is already paid")]
    AlreadyPaid,

    /// Cancelled appointments cannot take payments
    #[error("appointment is cancelled")]
    Cancelled,

    /// Refunds apply to paid invoices only
    #[error("invoice is not paid")]
    NotPaid,
}

/// Main application error type
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Validation errors for business rules (slot unavailable, past date,
    /// incomplete profile)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A state-machine precondition failed
    #[error("Invalid transition: {0}")]
    Transition(#[from] TransitionError),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Actor is authenticated but not allowed to touch this resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Payment signature did not verify; treated as a security event
    #[error("Payment signature verification failed")]
    SignatureVerification,

    /// Payment gateway errors (order creation, timeouts)
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Database operation errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();

        // Gateway and infrastructure detail stays in server logs; the
        // client only ever sees a generic message for those classes.
        let message = match self {
            AppError::Validation(_)
            | AppError::Transition(_)
            | AppError::NotFound(_)
            | AppError::Forbidden(_) => self.to_string(),
            AppError::SignatureVerification => "Payment verification failed".to_string(),
            AppError::Gateway(_) | AppError::HttpClient(_) => {
                "Payment gateway unavailable, please try again".to_string()
            }
            AppError::Json(_) => "Malformed request body".to_string(),
            AppError::Database(_) | AppError::Configuration(_) | AppError::Internal(_) => {
                "Internal server error".to_string()
            }
        };

        HttpResponse::build(status_code).json(serde_json::json!({
            "error": {
                "message": message,
                "code": status_code.as_u16(),
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Transition(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::SignatureVerification => StatusCode::BAD_REQUEST,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Helper functions for common error scenarios
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound(resource.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn gateway(msg: impl Into<String>) -> Self {
        AppError::Gateway(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_errors_map_to_conflict() {
        let err = AppError::from(TransitionError::NotCancellable);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_gateway_detail_is_not_leaked() {
        let err = AppError::gateway("razorpay returned 500: internal key k_live_abc");
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        // Display keeps the detail for logs
        assert!(err.to_string().contains("razorpay"));
    }

    #[test]
    fn test_signature_failure_is_bad_request() {
        assert_eq!(
            AppError::SignatureVerification.status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
