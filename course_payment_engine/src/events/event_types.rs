use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::db_types::{Enrollment, PaymentTransaction};

/// A student gained access to a course. Only fired when the enrollment is actually created; repeated grants for the
/// same pair are silent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentGrantedEvent {
    pub enrollment: Enrollment,
    /// The completed payment that paid for the course. `None` for free courses.
    pub transaction: Option<PaymentTransaction>,
}

impl EnrollmentGrantedEvent {
    pub fn new(enrollment: Enrollment, transaction: Option<PaymentTransaction>) -> Self {
        Self { enrollment, transaction }
    }
}

/// Why a transaction ended up `failed`. The stored status does not distinguish these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    SignatureMismatch,
    Cancelled,
    Superseded,
    Expired,
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::SignatureMismatch => write!(f, "signature mismatch"),
            FailureReason::Cancelled => write!(f, "cancelled by the student"),
            FailureReason::Superseded => write!(f, "superseded by a newer checkout attempt"),
            FailureReason::Expired => write!(f, "expired"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailedEvent {
    pub transaction: PaymentTransaction,
    pub reason: FailureReason,
}

impl PaymentFailedEvent {
    pub fn new(transaction: PaymentTransaction, reason: FailureReason) -> Self {
        Self { transaction, reason }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRefundedEvent {
    pub transaction: PaymentTransaction,
}

impl TransactionRefundedEvent {
    pub fn new(transaction: PaymentTransaction) -> Self {
        Self { transaction }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventType {
    EnrollmentGranted(EnrollmentGrantedEvent),
    PaymentFailed(PaymentFailedEvent),
    TransactionRefunded(TransactionRefundedEvent),
}

impl From<EnrollmentGrantedEvent> for EventType {
    fn from(ev: EnrollmentGrantedEvent) -> Self {
        Self::EnrollmentGranted(ev)
    }
}

impl From<PaymentFailedEvent> for EventType {
    fn from(ev: PaymentFailedEvent) -> Self {
        Self::PaymentFailed(ev)
    }
}

impl From<TransactionRefundedEvent> for EventType {
    fn from(ev: TransactionRefundedEvent) -> Self {
        Self::TransactionRefunded(ev)
    }
}
