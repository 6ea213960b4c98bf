//! # Course payment engine public API
//!
//! The `cpe_api` module exposes the programmatic API for the payment lifecycle. Every API is generic over the backend
//! traits it needs, so the SQLite backend can be swapped for mocks in tests.
//!
//! * [`payment_flow_api`] is the primary API. It creates orders, drives checkout, verifies gateway confirmations and
//!   grants access to the course once a payment is confirmed.
//! * [`transaction_api`] owns the transaction state machine. All status changes go through it.
//! * [`enrollment_api`] grants course access (idempotently) and enrolls students in free courses.
//! * [`course_api`] maintains the course read model.
//!
//! # API usage
//!
//! ```rust,ignore
//! use course_payment_engine::{PaymentFlowApi, SqliteDatabase, helpers::SignatureVerifier};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = PaymentFlowApi::new(db, gateway, verifier, "INR", producers);
//! let order = api.create_order(NewOrderRequest::new("alice", "rust-101", MinorUnits::from(50_000), "INR")).await?;
//! ```

pub mod checkout_objects;
pub mod course_api;
pub mod enrollment_api;
pub mod errors;
pub mod order_objects;
pub mod payment_flow_api;
pub mod transaction_api;
