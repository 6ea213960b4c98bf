use course_payment_engine::traits::{GatewayError, PaymentGateway};
use cpg_common::MinorUnits;
use mockall::mock;

mock! {
    pub Gateway {}
    impl Clone for Gateway {
        fn clone(&self) -> Self;
    }
    impl PaymentGateway for Gateway {
        fn key_id(&self) -> String;
        async fn create_order(&self, amount: MinorUnits, currency: &str, receipt: &str) -> Result<String, GatewayError>;
    }
}

/// A gateway that hands out `order_mock0001`, `order_mock0002`, ... and is never asked for anything else.
pub fn issuing_gateway(expected_orders: usize) -> MockGateway {
    let mut gateway = MockGateway::new();
    let mut n = 0;
    gateway.expect_create_order().times(expected_orders).returning(move |_, _, _| {
        n += 1;
        Ok(format!("order_mock{n:04}"))
    });
    gateway.expect_key_id().returning(|| "rzp_test_mock".to_string());
    gateway
}
