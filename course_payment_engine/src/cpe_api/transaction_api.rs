use std::fmt::Debug;

use log::*;

use crate::{
    cpe_api::errors::PaymentFlowError,
    db_types::{PaymentTransaction, TransactionId, TransactionStatus, TransactionUpdate},
    traits::TransactionManagement,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// This call changed the status.
    Applied(PaymentTransaction),
    /// The transaction was already in the requested state. Nothing was written.
    Unchanged(PaymentTransaction),
}

impl TransitionResult {
    pub fn transaction(&self) -> &PaymentTransaction {
        match self {
            Self::Applied(tx) | Self::Unchanged(tx) => tx,
        }
    }

    pub fn into_transaction(self) -> PaymentTransaction {
        match self {
            Self::Applied(tx) | Self::Unchanged(tx) => tx,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// `TransactionStateApi` owns the payment transaction state machine.
///
/// | From \ To | Pending   | Completed | Failed    | Refunded  |
/// |-----------|-----------|-----------|-----------|-----------|
/// | Pending   | Unchanged | Applied   | Applied   | Err       |
/// | Completed | Err       | (1)       | Err       | Applied   |
/// | Failed    | Err       | Err       | Unchanged | Err       |
/// | Refunded  | Err       | Err       | Err       | Unchanged |
///
/// (1) `Unchanged` if the payment id matches the stored one, `Err` otherwise.
///
/// Every write is conditional on the status that was read, so when two callers race, exactly one of them applies the
/// transition and the other one re-reads the record and resolves against it.
#[derive(Clone)]
pub struct TransactionStateApi<B> {
    db: B,
}

impl<B> Debug for TransactionStateApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TransactionStateApi")
    }
}

impl<B> TransactionStateApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> TransactionStateApi<B>
where B: TransactionManagement
{
    pub async fn fetch_transaction(&self, id: &TransactionId) -> Result<Option<PaymentTransaction>, PaymentFlowError> {
        let tx = self.db.fetch_transaction(id).await?;
        Ok(tx)
    }

    async fn fetch_existing(&self, id: &TransactionId) -> Result<PaymentTransaction, PaymentFlowError> {
        self.db.fetch_transaction(id).await?.ok_or_else(|| PaymentFlowError::TransactionNotFound(id.to_string()))
    }

    /// Moves the transaction to `new_status`. `gateway_payment_id` is required when completing a transaction, and
    /// ignored otherwise.
    pub async fn transition(
        &self,
        id: &TransactionId,
        new_status: TransactionStatus,
        gateway_payment_id: Option<String>,
    ) -> Result<TransitionResult, PaymentFlowError> {
        let current = self.fetch_existing(id).await?;
        self.transition_from(current, new_status, gateway_payment_id).await
    }

    /// As [`Self::transition`], for a record the caller has already read. The write only goes through if the stored
    /// status still matches `current.status`.
    pub async fn transition_from(
        &self,
        current: PaymentTransaction,
        new_status: TransactionStatus,
        gateway_payment_id: Option<String>,
    ) -> Result<TransitionResult, PaymentFlowError> {
        let payment_id = gateway_payment_id.filter(|p| !p.trim().is_empty());
        if new_status == TransactionStatus::Completed && payment_id.is_none() {
            return Err(PaymentFlowError::InvalidRequest(format!(
                "Transaction {} cannot be completed without a gateway payment id",
                current.id
            )));
        }
        if current.status == new_status {
            return same_status(current, payment_id.as_deref());
        }
        check_transition(&current, new_status)?;
        let mut update = TransactionUpdate::new(new_status);
        if new_status == TransactionStatus::Completed {
            update.gateway_payment_id = payment_id.clone();
        }
        let id = current.id.clone();
        match self.db.conditional_update(&id, current.status, update).await? {
            Some(tx) => {
                info!("🧾️ Transaction {id}: {} -> {}", current.status, tx.status);
                Ok(TransitionResult::Applied(tx))
            },
            None => {
                let latest = self.fetch_existing(&id).await?;
                debug!(
                    "🧾️ Transaction {id} changed from {} to {} while moving it to {new_status}",
                    current.status, latest.status
                );
                if latest.status == current.status {
                    // Monotonic statuses cannot return to where they were
                    error!("🧾️ Conditional update of transaction {id} did not apply, but the status is unchanged");
                    return Err(PaymentFlowError::DatabaseError(format!("Could not update transaction {id}")));
                }
                if latest.status == new_status {
                    same_status(latest, payment_id.as_deref())
                } else {
                    Err(PaymentFlowError::IllegalTransition { id, from: latest.status, to: new_status })
                }
            },
        }
    }
}

fn check_transition(current: &PaymentTransaction, new_status: TransactionStatus) -> Result<(), PaymentFlowError> {
    if current.status.can_transition_to(new_status) {
        Ok(())
    } else {
        debug!("🧾️ Rejecting transition of {} from {} to {new_status}", current.id, current.status);
        Err(PaymentFlowError::IllegalTransition { id: current.id.clone(), from: current.status, to: new_status })
    }
}

fn same_status(current: PaymentTransaction, payment_id: Option<&str>) -> Result<TransitionResult, PaymentFlowError> {
    if current.status == TransactionStatus::Completed && current.gateway_payment_id.as_deref() != payment_id {
        warn!(
            "🧾️ Transaction {} is already completed with payment {:?}. Refusing to complete it again with {:?}",
            current.id, current.gateway_payment_id, payment_id
        );
        return Err(PaymentFlowError::IllegalTransition {
            id: current.id,
            from: TransactionStatus::Completed,
            to: TransactionStatus::Completed,
        });
    }
    trace!("🧾️ Transaction {} is already {}", current.id, current.status);
    Ok(TransitionResult::Unchanged(current))
}
