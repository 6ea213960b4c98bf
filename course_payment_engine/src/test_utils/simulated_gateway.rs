use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use cpg_common::{MinorUnits, Secret};
use log::*;

use crate::{
    helpers::SignatureVerifier,
    traits::{GatewayError, PaymentGateway},
};

pub const SIMULATED_KEY_ID: &str = "rzp_test_simulated";
pub const SIMULATED_KEY_SECRET: &str = "simulated_key_secret";

/// An in-process stand-in for the hosted-checkout provider. It issues order ids, and signs payments the way the real
/// gateway does.
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    signer: SignatureVerifier,
    orders: Arc<AtomicU64>,
    payments: Arc<AtomicU64>,
    unavailable: Arc<AtomicBool>,
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new(SIMULATED_KEY_SECRET)
    }
}

impl SimulatedGateway {
    pub fn new(key_secret: &str) -> Self {
        Self {
            signer: SignatureVerifier::new(Secret::new(key_secret.to_string())),
            orders: Arc::new(AtomicU64::new(0)),
            payments: Arc::new(AtomicU64::new(0)),
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A verifier sharing this gateway's key secret.
    pub fn verifier(&self) -> SignatureVerifier {
        self.signer.clone()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn orders_created(&self) -> u64 {
        self.orders.load(Ordering::SeqCst)
    }

    /// Simulates a successful checkout for the order, returning the payment id and its signature.
    pub fn pay(&self, gateway_order_id: &str) -> (String, String) {
        let n = self.payments.fetch_add(1, Ordering::SeqCst) + 1;
        let payment_id = format!("pay_sim{n:06}");
        let signature = self.sign(gateway_order_id, &payment_id);
        (payment_id, signature)
    }

    pub fn sign(&self, gateway_order_id: &str, payment_id: &str) -> String {
        self.signer.sign(gateway_order_id, payment_id).expect("The simulated gateway always has a secret")
    }
}

impl PaymentGateway for SimulatedGateway {
    fn key_id(&self) -> String {
        SIMULATED_KEY_ID.to_string()
    }

    async fn create_order(&self, amount: MinorUnits, currency: &str, receipt: &str) -> Result<String, GatewayError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("simulated outage".into()));
        }
        let n = self.orders.fetch_add(1, Ordering::SeqCst) + 1;
        let order_id = format!("order_sim{n:06}");
        debug!("💳️ Simulated gateway created {order_id} for {amount} {currency} (receipt {receipt})");
        Ok(order_id)
    }
}
