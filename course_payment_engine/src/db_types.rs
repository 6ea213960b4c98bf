use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use cpg_common::MinorUnits;
use log::error;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------    TransactionId      ---------------------------------------------------------
/// Opaque identifier of a payment transaction. Generated locally when the order is created, and sent to the gateway
/// as the order receipt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let bytes: [u8; 10] = rng.gen();
        Self(format!("txn_{}", hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TransactionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TransactionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------   TransactionStatus   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// An order exists at the gateway and the student has not finished (or abandoned) checkout yet.
    Pending,
    /// The gateway confirmed the payment and the confirmation signature checked out.
    Completed,
    /// Verification failed, the student dismissed the checkout, or the attempt expired or was superseded.
    Failed,
    /// An administrator refunded a completed payment.
    Refunded,
}

impl TransactionStatus {
    /// The transition table. Self-transitions are not transitions, and are handled by the caller.
    ///
    /// | From \ To | Pending | Completed | Failed | Refunded |
    /// |-----------|---------|-----------|--------|----------|
    /// | Pending   |         | Yes       | Yes    |          |
    /// | Completed |         |           |        | Yes      |
    /// | Failed    |         |           |        |          |
    /// | Refunded  |         |           |        |          |
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!((self, next), (Pending, Completed) | (Pending, Failed) | (Completed, Refunded))
    }

    /// Whether a gateway payment id must be present on a transaction with this status.
    pub fn carries_payment_id(self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Refunded)
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Completed => write!(f, "completed"),
            TransactionStatus::Failed => write!(f, "failed"),
            TransactionStatus::Refunded => write!(f, "refunded"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid transaction status: {0}")]
pub struct ConversionError(String);

impl FromStr for TransactionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            _ => Err(ConversionError(s.to_string())),
        }
    }
}

impl From<String> for TransactionStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid transaction status: {value}. But this conversion cannot fail. Defaulting to Failed");
            TransactionStatus::Failed
        })
    }
}

//--------------------------------------   PaymentTransaction  ---------------------------------------------------------
/// One checkout attempt by a student for a course.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: TransactionId,
    pub student_id: String,
    pub course_id: String,
    pub amount: MinorUnits,
    pub currency: String,
    /// Issued by the gateway when the order was created.
    pub gateway_order_id: String,
    /// Issued by the gateway once checkout completes. Only present for completed and refunded transactions.
    pub gateway_payment_id: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentTransaction {
    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }
}

//--------------------------------------  NewPaymentTransaction ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewPaymentTransaction {
    pub id: TransactionId,
    pub student_id: String,
    pub course_id: String,
    pub amount: MinorUnits,
    pub currency: String,
    pub gateway_order_id: String,
    pub created_at: DateTime<Utc>,
}

impl NewPaymentTransaction {
    pub fn new(
        id: TransactionId,
        student_id: String,
        course_id: String,
        amount: MinorUnits,
        currency: String,
        gateway_order_id: String,
    ) -> Self {
        Self { id, student_id, course_id, amount, currency, gateway_order_id, created_at: Utc::now() }
    }
}

//--------------------------------------   TransactionUpdate   ---------------------------------------------------------
/// The fields a status transition may write. A `None` payment id leaves the stored value as it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionUpdate {
    pub status: TransactionStatus,
    pub gateway_payment_id: Option<String>,
}

impl TransactionUpdate {
    pub fn new(status: TransactionStatus) -> Self {
        Self { status, gateway_payment_id: None }
    }

    pub fn with_payment_id<S: Into<String>>(mut self, payment_id: S) -> Self {
        self.gateway_payment_id = Some(payment_id.into());
        self
    }
}

//--------------------------------------       Enrollment      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: String,
    pub course_id: String,
    pub enrollment_date: DateTime<Utc>,
    /// Percentage, 0-100. Maintained by progress tracking, not by this engine.
    pub progress: i64,
    pub completed: bool,
}

//--------------------------------------         Course        ---------------------------------------------------------
/// The part of the course catalog the payment flow cares about.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub price: MinorUnits,
    pub currency: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    /// Published, and costs money.
    pub fn is_purchasable(&self) -> bool {
        self.published && self.price.is_positive()
    }

    /// Published, and costs nothing. Students enroll directly.
    pub fn is_free(&self) -> bool {
        self.published && self.price.value() == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourse {
    pub id: String,
    pub title: String,
    pub price: MinorUnits,
    pub currency: String,
    #[serde(default = "default_published")]
    pub published: bool,
}

fn default_published() -> bool {
    true
}

impl NewCourse {
    pub fn new<S: Into<String>>(id: S, title: S, price: MinorUnits, currency: S) -> Self {
        Self { id: id.into(), title: title.into(), price, currency: currency.into(), published: true }
    }

    pub fn unpublished(mut self) -> Self {
        self.published = false;
        self
    }
}
