use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPaymentTransaction, PaymentTransaction, TransactionId, TransactionStatus, TransactionUpdate},
    traits::StoreError,
};

/// Inserts a new pending transaction. This is not atomic. Embed the call in a transaction and pass `&mut *tx` as the
/// connection argument if you need it to be.
pub async fn insert_transaction(
    transaction: NewPaymentTransaction,
    conn: &mut SqliteConnection,
) -> Result<PaymentTransaction, StoreError> {
    // `fetch_all` steps the statement to completion, so the write is finished before the row is handed back
    let mut rows: Vec<PaymentTransaction> = sqlx::query_as(
        r#"
            INSERT INTO payment_transactions (
                id,
                student_id,
                course_id,
                amount,
                currency,
                gateway_order_id,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $7)
            RETURNING *;
        "#,
    )
    .bind(transaction.id)
    .bind(transaction.student_id)
    .bind(transaction.course_id)
    .bind(transaction.amount.value())
    .bind(transaction.currency)
    .bind(transaction.gateway_order_id)
    .bind(transaction.created_at)
    .fetch_all(conn)
    .await?;
    let transaction = rows.pop().ok_or(sqlx::Error::RowNotFound)?;
    debug!("🗃️ Transaction {} inserted for gateway order {}", transaction.id, transaction.gateway_order_id);
    Ok(transaction)
}

/// Fails every pending transaction for the student and course, and returns the records that changed.
pub async fn fail_pending_for(
    student_id: &str,
    course_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentTransaction>, sqlx::Error> {
    let failed: Vec<PaymentTransaction> = sqlx::query_as(
        r#"
            UPDATE payment_transactions
            SET status = 'failed',
                updated_at = $1
            WHERE student_id = $2 AND course_id = $3 AND status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(Utc::now())
    .bind(student_id)
    .bind(course_id)
    .fetch_all(conn)
    .await?;
    for tx in &failed {
        trace!("🗃️ Pending transaction {} for {student_id}/{course_id} was failed", tx.id);
    }
    Ok(failed)
}

pub async fn fetch_transaction(
    id: &TransactionId,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_transactions WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await
}

pub async fn fetch_transaction_by_gateway_order_id(
    gateway_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_transactions WHERE gateway_order_id = $1")
        .bind(gateway_order_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_transactions_for_student(
    student_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentTransaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_transactions WHERE student_id = $1 ORDER BY created_at DESC, id")
        .bind(student_id)
        .fetch_all(conn)
        .await
}

/// Pending transactions that were created before `cutoff`, oldest first.
pub async fn fetch_pending_created_before(
    cutoff: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentTransaction>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM payment_transactions WHERE status = 'pending' AND created_at < $1 ORDER BY created_at ASC",
    )
    .bind(cutoff)
    .fetch_all(conn)
    .await
}

/// Writes `update` only if the stored status still equals `expected`. `None` means that nothing was written.
///
/// A `None` payment id in the update keeps the stored one, so a refund retains the original payment id.
pub async fn update_if_status(
    id: &TransactionId,
    expected: TransactionStatus,
    update: TransactionUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, sqlx::Error> {
    let TransactionUpdate { status, gateway_payment_id } = update;
    let mut rows: Vec<PaymentTransaction> = sqlx::query_as(
        r#"
            UPDATE payment_transactions
            SET status = $1,
                gateway_payment_id = COALESCE($2, gateway_payment_id),
                updated_at = $3
            WHERE id = $4 AND status = $5
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(gateway_payment_id)
    .bind(Utc::now())
    .bind(id.as_str())
    .bind(expected)
    .fetch_all(conn)
    .await?;
    let result = rows.pop();
    match &result {
        Some(tx) => trace!("🗃️ Transaction {id} moved from {expected} to {}", tx.status),
        None => trace!("🗃️ Transaction {id} was not {expected}. Nothing was updated"),
    }
    Ok(result)
}
