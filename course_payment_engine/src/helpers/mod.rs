mod payment_signature;

pub use payment_signature::{hmac_hex, verify_hmac_hex, SignatureVerifier, Verification};
