//! # Course payment server
//! This crate hosts the HTTP server for the course payment engine. It is responsible for:
//! * Creating gateway orders for course purchases and handing the checkout widget its parameters.
//! * Receiving checkout results from the client, and payment confirmations from the gateway's webhook, and passing
//!   them on to the payment flow, which verifies them and enrolls the student.
//! * Admin operations: refunds and the course read model.
//! * Expiring checkouts that were never finished.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/courses/{id}`, `/orders`, `/checkout/{transaction_id}`, `/checkout/callback`: the purchase flow.
//! * `/enrollments/free`, `/enrollments/{student_id}`: free enrollment and enrollment queries.
//! * `/transactions/{id}`, `/students/{student_id}/transactions`: transaction queries.
//! * `/webhook/payment`: the gateway's payment webhook. Authenticated with an HMAC of the request body.
//! * `/admin/courses`, `/admin/transactions/{id}/refund`: admin routes. Require the `cpg_admin_token` header.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
