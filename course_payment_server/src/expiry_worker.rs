use chrono::Duration;
use course_payment_engine::{db_types::PaymentTransaction, PaymentFlowApi, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

use crate::integrations::gateway::HostedGateway;

const EXPIRY_JOB_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Starts the expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every minute, pending transactions older than `pending_timeout` are failed. These are checkouts the student never
/// finished and the gateway never confirmed.
pub fn start_expiry_worker(api: PaymentFlowApi<SqliteDatabase, HostedGateway>, pending_timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(EXPIRY_JOB_INTERVAL);
        info!("🕰️ Pending transaction expiry worker started");
        loop {
            timer.tick().await;
            trace!("🕰️ Running pending transaction expiry job");
            match api.expire_stale_transactions(pending_timeout).await {
                Ok(expired) if expired.is_empty() => trace!("🕰️ No transactions expired"),
                Ok(expired) => {
                    info!("🕰️ {} transactions expired", expired.len());
                    debug!("🕰️ Expired transactions: {}", transaction_list(&expired));
                },
                Err(e) => {
                    error!("🕰️ Error running pending transaction expiry job: {e}");
                },
            }
        }
    })
}

fn transaction_list(transactions: &[PaymentTransaction]) -> String {
    transactions
        .iter()
        .map(|tx| format!("[{}] order: {} student: {} course: {}", tx.id, tx.gateway_order_id, tx.student_id, tx.course_id))
        .collect::<Vec<String>>()
        .join(", ")
}
