use std::sync::Arc;

use log::*;
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::GatewayConfig,
    data_objects::{GatewayOrder, NewGatewayOrder},
    GatewayApiError,
};

#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl GatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn key_id(&self) -> &str {
        self.config.key_id.as_str()
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, GatewayApiError> {
        let url = self.url(path);
        trace!("💳️ Sending REST query: {method} {url}");
        let mut req = self
            .client
            .request(method, url)
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.reveal()));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await?;
        if response.status().is_success() {
            trace!("💳️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await?;
            Err(GatewayApiError::QueryError { status, message })
        }
    }

    /// Creates a hosted order that the checkout widget can be opened against.
    pub async fn create_order(&self, order: NewGatewayOrder) -> Result<GatewayOrder, GatewayApiError> {
        debug!("💳️ Creating gateway order for {} {} (receipt {})", order.amount, order.currency, order.receipt);
        let result: GatewayOrder = self.rest_query(Method::POST, "/v1/orders", Some(order)).await?;
        debug!("💳️ Gateway order {} created", result.id);
        Ok(result)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }
}
