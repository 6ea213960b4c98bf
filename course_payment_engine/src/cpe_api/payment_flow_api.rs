use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    cpe_api::{
        checkout_objects::{CheckoutOutcome, CheckoutParams, CheckoutResult, CheckoutTracker},
        enrollment_api::EnrollmentApi,
        errors::PaymentFlowError,
        order_objects::{NewOrderRequest, OrderCreated},
        transaction_api::{TransactionStateApi, TransitionResult},
    },
    db_types::{Enrollment, NewPaymentTransaction, PaymentTransaction, TransactionId, TransactionStatus},
    events::{EventProducers, FailureReason, PaymentFailedEvent, TransactionRefundedEvent},
    helpers::SignatureVerifier,
    traits::{CourseManagement, CreatedTransaction, EnrollmentManagement, PaymentGateway, TransactionManagement},
};

/// `PaymentFlowApi` is the primary API for the payment lifecycle:
///
/// 1. [`Self::create_order`] creates a hosted order at the gateway and stores a `pending` transaction for it.
/// 2. [`Self::begin_checkout`] hands the checkout widget its parameters.
/// 3. [`Self::handle_checkout_outcome`] takes the widget's result. A success is authenticated with the
///    [`SignatureVerifier`]; if it is authentic, the transaction completes and the student is enrolled. Tampered
///    signatures and dismissals leave the transaction `failed`.
///
/// The gateway webhook takes the same path as a client-side success through
/// [`Self::process_payment_confirmation`]. The two can race; the conditional transaction update and the idempotent
/// enrollment insert make sure that the student is enrolled exactly once.
///
/// The API is cheap to clone. Clones share the checkout tracker.
#[derive(Clone)]
pub struct PaymentFlowApi<B, G> {
    db: B,
    gateway: G,
    verifier: SignatureVerifier,
    currency: String,
    checkouts: CheckoutTracker,
    transactions: TransactionStateApi<B>,
    enrollments: EnrollmentApi<B>,
    producers: EventProducers,
}

impl<B, G> Debug for PaymentFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi ({})", self.currency)
    }
}

impl<B: Clone, G> PaymentFlowApi<B, G> {
    pub fn new<S: Into<String>>(
        db: B,
        gateway: G,
        verifier: SignatureVerifier,
        currency: S,
        producers: EventProducers,
    ) -> Self {
        let transactions = TransactionStateApi::new(db.clone());
        let enrollments = EnrollmentApi::new(db.clone(), producers.clone());
        let currency = currency.into().to_uppercase();
        Self { db, gateway, verifier, currency, checkouts: CheckoutTracker::default(), transactions, enrollments, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn currency(&self) -> &str {
        self.currency.as_str()
    }

    pub fn transactions(&self) -> &TransactionStateApi<B> {
        &self.transactions
    }

    pub fn enrollments(&self) -> &EnrollmentApi<B> {
        &self.enrollments
    }

    pub fn checkouts(&self) -> &CheckoutTracker {
        &self.checkouts
    }
}

impl<B, G> PaymentFlowApi<B, G>
where
    B: TransactionManagement + EnrollmentManagement + CourseManagement,
    G: PaymentGateway,
{
    /// Creates a gateway order for the course and stores a `pending` transaction for it.
    ///
    /// The request must be for a purchasable course, in the deployment currency, for exactly the course price.
    /// Older pending attempts by the same student for the same course are failed (superseded) in the same write that
    /// stores the new transaction, so that only the newest attempt can complete. If storing fails, they stay pending.
    ///
    /// If the process dies after the gateway created the order but before the transaction is stored, the gateway
    /// order is orphaned. It is never retried.
    pub async fn create_order(&self, request: NewOrderRequest) -> Result<OrderCreated, PaymentFlowError> {
        self.validate_order(&request).await?;
        let NewOrderRequest { student_id, course_id, amount, .. } = request;
        let id = TransactionId::random();
        debug!("💳️ Requesting gateway order for {student_id}/{course_id}: {amount} {}", self.currency);
        let gateway_order_id = self.gateway.create_order(amount, &self.currency, id.as_str()).await.map_err(|e| {
            warn!("💳️ Could not create a gateway order for {student_id}/{course_id}: {e}");
            PaymentFlowError::from(e)
        })?;
        if gateway_order_id.trim().is_empty() {
            return Err(PaymentFlowError::GatewayUnavailable("The gateway returned an empty order id".into()));
        }
        let new_tx = NewPaymentTransaction::new(
            id,
            student_id,
            course_id,
            amount,
            self.currency.clone(),
            gateway_order_id,
        );
        let CreatedTransaction { transaction: tx, superseded } = self.db.create_transaction(new_tx).await?;
        for old in superseded {
            self.checkouts.finish(&old.id);
            debug!("💳️ Transaction {} was superseded by {}", old.id, tx.id);
            self.publish_failure(old, FailureReason::Superseded).await;
        }
        info!(
            "💳️ Order {} created for {}/{}. Transaction {} is pending",
            tx.gateway_order_id, tx.student_id, tx.course_id, tx.id
        );
        Ok(OrderCreated { transaction_id: tx.id, gateway_order_id: tx.gateway_order_id })
    }

    async fn validate_order(&self, request: &NewOrderRequest) -> Result<(), PaymentFlowError> {
        let invalid = |msg: String| Err(PaymentFlowError::InvalidRequest(msg));
        if request.student_id.trim().is_empty() {
            return invalid("A student id is required".into());
        }
        if !request.amount.is_positive() {
            return invalid(format!("The amount must be positive, but was {}", request.amount));
        }
        if !request.currency.eq_ignore_ascii_case(&self.currency) {
            return invalid(format!("Payments are accepted in {} only, not {}", self.currency, request.currency));
        }
        let Some(course) = self.db.fetch_course(&request.course_id).await? else {
            return invalid(format!("Course {} does not exist", request.course_id));
        };
        if !course.is_purchasable() {
            return invalid(format!("Course {} cannot be purchased", course.id));
        }
        if !course.currency.eq_ignore_ascii_case(&self.currency) {
            return invalid(format!("Course {} is priced in {}", course.id, course.currency));
        }
        if course.price != request.amount {
            return invalid(format!("Course {} costs {}, not {}", course.id, course.price, request.amount));
        }
        if self.db.fetch_enrollment(&request.student_id, &course.id).await?.is_some() {
            return invalid(format!("{} is already enrolled in {}", request.student_id, course.id));
        }
        Ok(())
    }

    /// Returns the checkout widget parameters for a pending transaction, and marks its checkout as in flight.
    pub async fn begin_checkout(&self, id: &TransactionId) -> Result<CheckoutParams, PaymentFlowError> {
        let tx = self
            .transactions
            .fetch_transaction(id)
            .await?
            .ok_or_else(|| PaymentFlowError::TransactionNotFound(id.to_string()))?;
        if !tx.is_pending() {
            return Err(PaymentFlowError::IllegalTransition {
                id: tx.id,
                from: tx.status,
                to: TransactionStatus::Completed,
            });
        }
        if !self.checkouts.begin(&tx.id) {
            debug!("💳️ Checkout for {id} is already in progress");
            return Err(PaymentFlowError::CheckoutInFlight(id.to_string()));
        }
        debug!("💳️ Checkout started for transaction {id} (order {})", tx.gateway_order_id);
        Ok(CheckoutParams {
            gateway_key_id: self.gateway.key_id(),
            gateway_order_id: tx.gateway_order_id,
            amount: tx.amount,
            currency: tx.currency,
            transaction_id: tx.id,
        })
    }

    /// Handles the result the checkout widget reported.
    pub async fn handle_checkout_outcome(&self, outcome: CheckoutOutcome) -> Result<CheckoutResult, PaymentFlowError> {
        match outcome {
            CheckoutOutcome::Success { gateway_order_id, gateway_payment_id, signature } => {
                let (transaction, enrollment) =
                    self.process_payment_confirmation(&gateway_order_id, &gateway_payment_id, &signature).await?;
                Ok(CheckoutResult::Paid { transaction, enrollment })
            },
            CheckoutOutcome::Cancelled { gateway_order_id } => {
                let transaction = self.cancel_checkout(&gateway_order_id).await?;
                Ok(CheckoutResult::Dismissed { transaction })
            },
        }
    }

    /// Authenticates a payment confirmation and, if it is authentic, completes the transaction and grants access.
    ///
    /// Both the client callback and the gateway webhook end up here. Repeating a confirmation is harmless: the
    /// completed (or since refunded) transaction and the existing enrollment are returned.
    ///
    /// A signature that does not verify fails the transaction (if it is still pending) and returns
    /// [`PaymentFlowError::SignatureMismatch`].
    pub async fn process_payment_confirmation(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<(PaymentTransaction, Enrollment), PaymentFlowError> {
        let tx = self.transaction_for_order(gateway_order_id).await?;
        self.checkouts.finish(&tx.id);
        let verification = self.verifier.verify(gateway_order_id, gateway_payment_id, signature);
        if !verification.authentic {
            warn!(
                "🔐️ SECURITY: payment confirmation for order {gateway_order_id} (transaction {}, payment \
                 '{gateway_payment_id}') carries an invalid signature",
                tx.id
            );
            let id = tx.id.clone();
            match self.transactions.transition_from(tx, TransactionStatus::Failed, None).await {
                Ok(TransitionResult::Applied(tx)) => self.publish_failure(tx, FailureReason::SignatureMismatch).await,
                Ok(TransitionResult::Unchanged(_)) => {},
                Err(PaymentFlowError::IllegalTransition { from, .. }) => {
                    debug!("🔐️ Transaction {id} is {from}. The forged confirmation leaves it untouched");
                },
                Err(e) => return Err(e),
            }
            return Err(PaymentFlowError::SignatureMismatch(id));
        }
        let id = tx.id.clone();
        let payment_id = Some(gateway_payment_id.to_string());
        let result = match self.transactions.transition_from(tx, TransactionStatus::Completed, payment_id).await {
            Ok(result) => result,
            Err(PaymentFlowError::IllegalTransition { from: TransactionStatus::Refunded, .. }) => {
                return self.acknowledge_refunded_payment(&id, gateway_payment_id).await;
            },
            Err(e) => {
                if let PaymentFlowError::IllegalTransition { from: TransactionStatus::Failed, .. } = e {
                    error!(
                        "💳️ Payment {gateway_payment_id} for order {gateway_order_id} is authentic, but transaction \
                         {id} has already failed. The payment needs to be reconciled manually."
                    );
                }
                return Err(e);
            },
        };
        if result.is_applied() {
            info!("💳️ Payment {gateway_payment_id} confirmed. Transaction {id} is complete");
        } else {
            debug!("💳️ Payment {gateway_payment_id} for transaction {id} was already confirmed");
        }
        let tx = result.into_transaction();
        let enrollment = self.enrollments.grant_access_for_payment(&tx).await?;
        Ok((tx, enrollment))
    }

    /// A repeated confirmation of a payment that has since been refunded. The stored records are returned for the
    /// same payment id. Any other payment id is an illegal transition.
    async fn acknowledge_refunded_payment(
        &self,
        id: &TransactionId,
        gateway_payment_id: &str,
    ) -> Result<(PaymentTransaction, Enrollment), PaymentFlowError> {
        let tx = self
            .transactions
            .fetch_transaction(id)
            .await?
            .ok_or_else(|| PaymentFlowError::TransactionNotFound(id.to_string()))?;
        let status = tx.status;
        let illegal =
            || PaymentFlowError::IllegalTransition { id: id.clone(), from: status, to: TransactionStatus::Completed };
        if tx.gateway_payment_id.as_deref() != Some(gateway_payment_id) {
            warn!(
                "💸️ Transaction {id} was refunded for payment {:?}. Refusing confirmation of payment {gateway_payment_id}",
                tx.gateway_payment_id
            );
            return Err(illegal());
        }
        let enrollment = self.enrollments.enrollment(&tx.student_id, &tx.course_id).await?.ok_or_else(illegal)?;
        debug!("💸️ Payment {gateway_payment_id} for transaction {id} was refunded already. Returning the stored records");
        Ok((tx, enrollment))
    }

    /// The student dismissed the checkout widget. The transaction fails. Cancelling a transaction that has already
    /// left `pending` is not an error; the transaction is returned as it is.
    pub async fn cancel_checkout(&self, gateway_order_id: &str) -> Result<PaymentTransaction, PaymentFlowError> {
        let tx = self.transaction_for_order(gateway_order_id).await?;
        self.checkouts.finish(&tx.id);
        let id = tx.id.clone();
        match self.transactions.transition_from(tx, TransactionStatus::Failed, None).await {
            Ok(TransitionResult::Applied(tx)) => {
                info!("💳️ Checkout for transaction {id} was dismissed");
                self.publish_failure(tx.clone(), FailureReason::Cancelled).await;
                Ok(tx)
            },
            Ok(TransitionResult::Unchanged(tx)) => Ok(tx),
            Err(PaymentFlowError::IllegalTransition { from, .. }) => {
                debug!("💳️ Ignoring dismissal of transaction {id}, which is already {from}");
                self.transactions
                    .fetch_transaction(&id)
                    .await?
                    .ok_or_else(|| PaymentFlowError::TransactionNotFound(id.to_string()))
            },
            Err(e) => Err(e),
        }
    }

    /// Refunds a completed payment. Enrollments are not touched.
    pub async fn refund(&self, id: &TransactionId) -> Result<PaymentTransaction, PaymentFlowError> {
        let result = self.transactions.transition(id, TransactionStatus::Refunded, None).await?;
        if let TransitionResult::Applied(tx) = &result {
            info!("💸️ Transaction {id} ({} {}) was refunded", tx.amount, tx.currency);
            let event = TransactionRefundedEvent::new(tx.clone());
            for producer in &self.producers.transaction_refunded_producer {
                producer.publish_event(event.clone()).await;
            }
        }
        Ok(result.into_transaction())
    }

    /// Fails every pending transaction older than `max_age`, and returns the ones that this call expired.
    pub async fn expire_stale_transactions(
        &self,
        max_age: Duration,
    ) -> Result<Vec<PaymentTransaction>, PaymentFlowError> {
        let cutoff = Utc::now() - max_age;
        let stale = self.db.fetch_stale_pending_transactions(cutoff).await?;
        let mut expired = Vec::with_capacity(stale.len());
        for tx in stale {
            let id = tx.id.clone();
            match self.transactions.transition_from(tx, TransactionStatus::Failed, None).await {
                Ok(TransitionResult::Applied(tx)) => {
                    self.checkouts.finish(&tx.id);
                    self.publish_failure(tx.clone(), FailureReason::Expired).await;
                    expired.push(tx);
                },
                Ok(TransitionResult::Unchanged(_)) | Err(PaymentFlowError::IllegalTransition { .. }) => {
                    trace!("🕰️ Transaction {id} left pending before it could expire");
                },
                Err(e) => return Err(e),
            }
        }
        if !expired.is_empty() {
            info!("🕰️ {} pending transactions created before {cutoff} have expired", expired.len());
        }
        Ok(expired)
    }

    pub async fn fetch_transaction(&self, id: &TransactionId) -> Result<Option<PaymentTransaction>, PaymentFlowError> {
        self.transactions.fetch_transaction(id).await
    }

    pub async fn transactions_for_student(&self, student_id: &str) -> Result<Vec<PaymentTransaction>, PaymentFlowError> {
        let transactions = self.db.fetch_transactions_for_student(student_id).await?;
        Ok(transactions)
    }

    async fn transaction_for_order(&self, gateway_order_id: &str) -> Result<PaymentTransaction, PaymentFlowError> {
        self.db
            .fetch_transaction_by_gateway_order_id(gateway_order_id)
            .await?
            .ok_or_else(|| PaymentFlowError::TransactionNotFound(format!("gateway order {gateway_order_id}")))
    }

    async fn publish_failure(&self, tx: PaymentTransaction, reason: FailureReason) {
        let event = PaymentFailedEvent::new(tx, reason);
        for producer in &self.producers.payment_failed_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}
