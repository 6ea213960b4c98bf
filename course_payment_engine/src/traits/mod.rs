//! # Backend contracts
//!
//! The payment engine never talks to storage or to the payment provider directly. Instead, the APIs in
//! [`crate::cpe_api`] are generic over backends that implement the traits in this module.
//!
//! * [`TransactionManagement`] stores payment transactions. Every status change goes through
//!   [`TransactionManagement::conditional_update`], so that two writers racing on the same record cannot both win.
//! * [`EnrollmentManagement`] stores enrollments. Granting access is idempotent.
//! * [`CourseManagement`] is the read model of the course catalog.
//! * [`PaymentGateway`] creates hosted orders at the payment provider.
//!
//! [`PaymentBackend`] bundles the three storage traits. Anything that implements all of them is a payment backend.
mod course_management;
mod enrollment_management;
mod payment_gateway;
mod transaction_management;

pub use course_management::CourseManagement;
pub use enrollment_management::{EnrollmentManagement, InsertEnrollmentResult};
pub use payment_gateway::{GatewayError, PaymentGateway};
pub use transaction_management::{CreatedTransaction, StoreError, TransactionManagement};

pub trait PaymentBackend: TransactionManagement + EnrollmentManagement + CourseManagement {}

impl<T> PaymentBackend for T where T: TransactionManagement + EnrollmentManagement + CourseManagement {}
