//! Course Payment Engine
//!
//! The course payment engine takes a student from "I want to buy this course" to "I have access to this course":
//! order creation at a hosted-checkout payment gateway, checkout, signature verification of the gateway's
//! confirmation, and enrollment.
//!
//! The library is divided into these sections:
//! 1. Backend contracts ([`mod@traits`]) and the SQLite backend ([`SqliteDatabase`]). You should never need to access
//!    the database directly. Instead, use the public API provided by the engine. The exception is the data types used
//!    in the database. These are defined in the [`mod@db_types`] module and are public.
//! 2. The public API ([`mod@cpe_api`]). [`PaymentFlowApi`] drives the payment lifecycle. [`TransactionStateApi`]
//!    owns the transaction state machine, and [`EnrollmentApi`] and [`CourseApi`] manage enrollments and the course
//!    read model.
//!
//! The engine also emits events when enrollments are granted, payments fail and transactions are refunded. See
//! [`mod@events`] for how to hook into them.
pub mod cpe_api;
pub mod db_types;
pub mod events;
pub mod helpers;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use cpe_api::{
    checkout_objects::{CheckoutOutcome, CheckoutParams, CheckoutResult},
    course_api::CourseApi,
    enrollment_api::EnrollmentApi,
    errors::{CourseApiError, PaymentFlowError},
    order_objects::{NewOrderRequest, OrderCreated},
    payment_flow_api::PaymentFlowApi,
    transaction_api::{TransactionStateApi, TransitionResult},
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{CourseManagement, EnrollmentManagement, PaymentBackend, PaymentGateway, TransactionManagement};
