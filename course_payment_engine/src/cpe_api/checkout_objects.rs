use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};

use cpg_common::MinorUnits;
use serde::{Deserialize, Serialize};

use crate::db_types::{Enrollment, PaymentTransaction, TransactionId};

/// Everything the hosted checkout widget needs to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutParams {
    pub gateway_key_id: String,
    pub gateway_order_id: String,
    pub amount: MinorUnits,
    pub currency: String,
    pub transaction_id: TransactionId,
}

/// What the checkout widget reported back.
///
/// The gateway's own field names (`razorpay_order_id` etc.) are accepted as aliases, so the widget's success payload
/// can be forwarded verbatim once a `kind` is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CheckoutOutcome {
    Success {
        #[serde(alias = "razorpay_order_id")]
        gateway_order_id: String,
        #[serde(alias = "razorpay_payment_id")]
        gateway_payment_id: String,
        #[serde(alias = "razorpay_signature")]
        signature: String,
    },
    Cancelled {
        #[serde(alias = "razorpay_order_id")]
        gateway_order_id: String,
    },
}

impl CheckoutOutcome {
    pub fn gateway_order_id(&self) -> &str {
        match self {
            Self::Success { gateway_order_id, .. } | Self::Cancelled { gateway_order_id } => gateway_order_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum CheckoutResult {
    /// The payment was verified and the student is enrolled.
    Paid { transaction: PaymentTransaction, enrollment: Enrollment },
    /// The student closed the widget. The transaction is no longer pending.
    Dismissed { transaction: PaymentTransaction },
}

impl CheckoutResult {
    pub fn transaction(&self) -> &PaymentTransaction {
        match self {
            Self::Paid { transaction, .. } | Self::Dismissed { transaction } => transaction,
        }
    }
}

/// The set of transactions whose checkout widget is currently open. Process-local.
#[derive(Debug, Clone, Default)]
pub struct CheckoutTracker {
    in_flight: Arc<Mutex<HashSet<TransactionId>>>,
}

impl CheckoutTracker {
    /// Marks a checkout as started. Returns `false` if it was already in flight.
    pub fn begin(&self, id: &TransactionId) -> bool {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).insert(id.clone())
    }

    /// Clears the in-flight flag. Returns `false` if it was not set.
    pub fn finish(&self, id: &TransactionId) -> bool {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).remove(id)
    }

    pub fn is_in_flight(&self, id: &TransactionId) -> bool {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).contains(id)
    }
}
