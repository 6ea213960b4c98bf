use course_payment_engine::traits::{GatewayError, PaymentGateway};
use cpg_common::MinorUnits;
use gateway_tools::{GatewayApi, GatewayApiError, GatewayConfig, NewGatewayOrder};
use log::*;

/// The production [`PaymentGateway`]: hosted orders are created over the provider's REST API.
#[derive(Clone)]
pub struct HostedGateway {
    api: GatewayApi,
}

impl HostedGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let api = GatewayApi::new(config)?;
        Ok(Self { api })
    }
}

impl PaymentGateway for HostedGateway {
    fn key_id(&self) -> String {
        self.api.key_id().to_string()
    }

    async fn create_order(&self, amount: MinorUnits, currency: &str, receipt: &str) -> Result<String, GatewayError> {
        let order = NewGatewayOrder { amount, currency: currency.to_string(), receipt: receipt.to_string() };
        let created = self.api.create_order(order).await.map_err(|e| {
            warn!("💳️ Could not create a gateway order for {receipt}. {e}");
            gateway_error(e)
        })?;
        if created.amount != amount || !created.currency.eq_ignore_ascii_case(currency) {
            error!(
                "💳️ Gateway order {} for {receipt} is for {} {}, but {amount} {currency} was requested",
                created.id, created.amount, created.currency
            );
            return Err(GatewayError::Rejected(format!("Gateway order {} does not match the request", created.id)));
        }
        Ok(created.id)
    }
}

fn gateway_error(e: GatewayApiError) -> GatewayError {
    match e {
        GatewayApiError::QueryError { status, message } if (400..500).contains(&status) => {
            GatewayError::Rejected(format!("{status}: {message}"))
        },
        e => GatewayError::Unavailable(e.to_string()),
    }
}
