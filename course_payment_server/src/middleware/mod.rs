mod admin;
mod hmac;

pub use admin::{AdminMiddlewareFactory, AdminMiddlewareService, AdminToken, ADMIN_TOKEN_HEADER};
pub use hmac::{HmacMiddlewareFactory, HmacMiddlewareService, GATEWAY_SIGNATURE_HEADER};
