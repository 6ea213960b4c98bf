use cpg_common::MinorUnits;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("The payment gateway could not be reached: {0}")]
    Unavailable(String),
    #[error("The payment gateway rejected the request: {0}")]
    Rejected(String),
}

/// The hosted-checkout payment provider.
///
/// Only order creation happens server-side. Checkout itself happens in the provider's widget, and its outcome comes
/// back as a signed callback.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Clone {
    /// The public key id the checkout widget is opened with.
    fn key_id(&self) -> String;

    /// Creates a hosted order for `amount` minor units and returns the gateway's order id. `receipt` is our own
    /// transaction id, so that orders can be matched up in the provider's dashboard.
    async fn create_order(&self, amount: MinorUnits, currency: &str, receipt: &str) -> Result<String, GatewayError>;
}
