use chrono::{DateTime, Utc};
use log::debug;
use thiserror::Error;

use crate::db_types::{NewPaymentTransaction, PaymentTransaction, TransactionId, TransactionStatus, TransactionUpdate};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("A pending transaction already exists for this student and course")]
    PendingTransactionExists,
    #[error("The gateway order id is already in use")]
    DuplicateGatewayOrder,
    #[error("The record conflicts with an existing one")]
    DuplicateRecord,
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                let message = db.message();
                debug!("🗃️ Unique constraint violation: {message}");
                if message.contains("payment_transactions.gateway_order_id") {
                    Self::DuplicateGatewayOrder
                } else if message.contains("payment_transactions.student_id") {
                    Self::PendingTransactionExists
                } else {
                    Self::DuplicateRecord
                }
            },
            _ => Self::DatabaseError(e.to_string()),
        }
    }
}

/// The result of storing a new pending transaction.
#[derive(Debug, Clone)]
pub struct CreatedTransaction {
    pub transaction: PaymentTransaction,
    /// Older pending attempts for the same student and course. They are `failed` now.
    pub superseded: Vec<PaymentTransaction>,
}

/// Storage for [`PaymentTransaction`] records.
///
/// Transactions are never deleted. Once stored, the only field that may change besides `updated_at` is the status
/// (and the gateway payment id, when the transaction completes).
#[allow(async_fn_in_trait)]
pub trait TransactionManagement: Clone {
    /// Stores a new transaction with status `pending`.
    ///
    /// At most one pending transaction may exist per (student, course) pair. Any pending transaction for the pair is
    /// failed in the same atomic write, so if the insert fails, the older attempt stays pending. A gateway order id
    /// that is already stored fails with [`StoreError::DuplicateGatewayOrder`].
    async fn create_transaction(&self, transaction: NewPaymentTransaction) -> Result<CreatedTransaction, StoreError>;

    async fn fetch_transaction(&self, id: &TransactionId) -> Result<Option<PaymentTransaction>, StoreError>;

    async fn fetch_transaction_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<PaymentTransaction>, StoreError>;

    /// Every transaction the student ever started, newest first.
    async fn fetch_transactions_for_student(&self, student_id: &str) -> Result<Vec<PaymentTransaction>, StoreError>;

    /// Pending transactions created before `cutoff`.
    async fn fetch_stale_pending_transactions(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<PaymentTransaction>, StoreError>;

    /// Applies `update` to the transaction if, and only if, its current status is `expected`.
    ///
    /// Returns the updated record, or `None` if the transaction was not in the expected status (or does not exist).
    /// Callers are responsible for checking the transition table before calling this method.
    async fn conditional_update(
        &self,
        id: &TransactionId,
        expected: TransactionStatus,
        update: TransactionUpdate,
    ) -> Result<Option<PaymentTransaction>, StoreError>;
}
