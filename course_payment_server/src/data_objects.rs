use course_payment_engine::db_types::{Enrollment, PaymentTransaction};
use serde::{Deserialize, Serialize};

/// A payment confirmation delivered by the gateway's webhook. The body signature has already been checked by the
/// HMAC middleware by the time this is deserialized; the payment signature is checked again by the payment flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentWebhook {
    #[serde(alias = "razorpay_order_id")]
    pub gateway_order_id: String,
    #[serde(alias = "razorpay_payment_id")]
    pub gateway_payment_id: String,
    #[serde(alias = "razorpay_signature")]
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeEnrollmentRequest {
    pub student_id: String,
    pub course_id: String,
}

/// The response to a verified payment, from either the client callback or the webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmed {
    pub transaction: PaymentTransaction,
    pub enrollment: Enrollment,
}
