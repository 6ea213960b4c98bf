use thiserror::Error;

use crate::{
    db_types::{TransactionId, TransactionStatus},
    traits::{GatewayError, StoreError},
};

/// Everything that can go wrong in the payment lifecycle. Storage and gateway errors are converted into one of these
/// before they leave the engine.
#[derive(Debug, Clone, Error)]
pub enum PaymentFlowError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("The payment gateway is unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("The payment signature for transaction {0} is not authentic")]
    SignatureMismatch(TransactionId),
    #[error("Transaction {id} cannot move from {from} to {to}")]
    IllegalTransition { id: TransactionId, from: TransactionStatus, to: TransactionStatus },
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("A checkout is already in progress for {0}")]
    CheckoutInFlight(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StoreError> for PaymentFlowError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DatabaseError(s) => Self::DatabaseError(s),
            StoreError::PendingTransactionExists => Self::CheckoutInFlight("this student and course".into()),
            StoreError::DuplicateGatewayOrder => {
                Self::GatewayUnavailable("The gateway issued an order id that is already in use".into())
            },
            e @ StoreError::DuplicateRecord => Self::DatabaseError(e.to_string()),
        }
    }
}

impl From<GatewayError> for PaymentFlowError {
    fn from(e: GatewayError) -> Self {
        Self::GatewayUnavailable(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum CourseApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid course: {0}")]
    InvalidCourse(String),
}

impl From<StoreError> for CourseApiError {
    fn from(e: StoreError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}
