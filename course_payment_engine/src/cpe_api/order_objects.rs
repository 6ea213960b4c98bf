use cpg_common::MinorUnits;
use serde::{Deserialize, Serialize};

use crate::db_types::TransactionId;

/// A student's request to buy a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub student_id: String,
    pub course_id: String,
    /// In minor units. Must equal the course price.
    pub amount: MinorUnits,
    pub currency: String,
}

impl NewOrderRequest {
    pub fn new<S: Into<String>>(student_id: S, course_id: S, amount: MinorUnits, currency: S) -> Self {
        Self { student_id: student_id.into(), course_id: course_id.into(), amount, currency: currency.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub transaction_id: TransactionId,
    pub gateway_order_id: String,
}
