use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use course_payment_engine::{CourseApiError, PaymentFlowError};
use gateway_tools::GatewayApiError;
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("The payment gateway is unavailable. {0}")]
    GatewayUnavailable(String),
    #[error("Payment could not be verified. {0}")]
    SignatureMismatch(String),
    #[error("Conflict. {0}")]
    Conflict(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::SignatureMismatch(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<PaymentFlowError> for ServerError {
    fn from(e: PaymentFlowError) -> Self {
        match e {
            PaymentFlowError::InvalidRequest(s) => Self::InvalidRequest(s),
            PaymentFlowError::GatewayUnavailable(s) => Self::GatewayUnavailable(s),
            PaymentFlowError::SignatureMismatch(_) => Self::SignatureMismatch(e.to_string()),
            PaymentFlowError::IllegalTransition { .. } => Self::Conflict(e.to_string()),
            PaymentFlowError::TransactionNotFound(_) => Self::NoRecordFound(e.to_string()),
            PaymentFlowError::CheckoutInFlight(_) => Self::Conflict(e.to_string()),
            PaymentFlowError::DatabaseError(_) => {
                error!("💻️ {e}");
                Self::BackendError("A storage error occurred. Please try again later.".into())
            },
        }
    }
}

impl From<CourseApiError> for ServerError {
    fn from(e: CourseApiError) -> Self {
        match e {
            CourseApiError::InvalidCourse(s) => Self::InvalidRequest(s),
            CourseApiError::DatabaseError(_) => {
                error!("💻️ {e}");
                Self::BackendError("A storage error occurred. Please try again later.".into())
            },
        }
    }
}

impl From<GatewayApiError> for ServerError {
    fn from(e: GatewayApiError) -> Self {
        Self::InitializeError(format!("Could not create the payment gateway client. {e}"))
    }
}
