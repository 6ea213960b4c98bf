use cpg_common::MinorUnits;
use serde::{Deserialize, Serialize};

/// The request body for creating a hosted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGatewayOrder {
    /// Amount in the minor unit of `currency`.
    pub amount: MinorUnits,
    pub currency: String,
    /// Merchant-side reference. We use the local transaction id.
    pub receipt: String,
}

/// A hosted order as returned by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: MinorUnits,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: String,
}
