//! Authentication of checkout confirmations.
//!
//! When checkout succeeds, the gateway hands the client an order id, a payment id and a signature. The signature is
//! `hex(HMAC-SHA256(key_secret, "{order_id}|{payment_id}"))`. Since the client relays it, the server must recompute it
//! before believing that the payment happened.
use cpg_common::Secret;
use hmac::{Hmac, Mac};
use log::*;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `data`.
pub fn hmac_hex(secret: &[u8], data: &[u8]) -> Option<String> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret).ok()?;
    mac.update(data);
    Some(hex::encode(mac.finalize().into_bytes()))
}

const HMAC_SHA256_HEX_LEN: usize = 64;

/// Checks a hex-encoded HMAC-SHA256 signature in constant time.
///
/// Only the exact form [`hmac_hex`] produces is accepted: 64 lowercase hex digits, with no surrounding whitespace.
pub fn verify_hmac_hex(secret: &[u8], data: &[u8], signature: &str) -> bool {
    if !is_lowercase_hex_digest(signature) {
        return false;
    }
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = <HmacSha256 as Mac>::new_from_slice(secret) else {
        return false;
    };
    mac.update(data);
    mac.verify_slice(&expected).is_ok()
}

fn is_lowercase_hex_digest(signature: &str) -> bool {
    signature.len() == HMAC_SHA256_HEX_LEN && signature.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub authentic: bool,
}

impl Verification {
    pub fn authentic() -> Self {
        Self { authentic: true }
    }

    pub fn rejected() -> Self {
        Self { authentic: false }
    }
}

/// Verifies gateway payment signatures with the gateway key secret.
///
/// The verifier fails closed. A missing secret, empty identifiers or a malformed signature all produce
/// `authentic: false`, never an error.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secret: Secret<String>,
}

impl SignatureVerifier {
    pub fn new(secret: Secret<String>) -> Self {
        if secret.is_empty() {
            warn!("🔐️ No gateway key secret is configured. Every payment confirmation will be rejected.");
        }
        Self { secret }
    }

    fn message(order_id: &str, payment_id: &str) -> String {
        format!("{order_id}|{payment_id}")
    }

    /// Produces the signature the gateway would send for this order and payment. Returns `None` if no secret is
    /// configured.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> Option<String> {
        if self.secret.is_empty() {
            return None;
        }
        let message = Self::message(order_id, payment_id);
        hmac_hex(self.secret.reveal().as_bytes(), message.as_bytes())
    }

    pub fn verify(&self, order_id: &str, payment_id: &str, signature: &str) -> Verification {
        if self.secret.is_empty() {
            warn!("🔐️ Rejecting signature for order {order_id}: no gateway key secret is configured");
            return Verification::rejected();
        }
        if order_id.is_empty() || payment_id.is_empty() || signature.is_empty() {
            debug!("🔐️ Rejecting signature for order '{order_id}': empty identifiers or signature");
            return Verification::rejected();
        }
        let message = Self::message(order_id, payment_id);
        if verify_hmac_hex(self.secret.reveal().as_bytes(), message.as_bytes(), signature) {
            trace!("🔐️ Signature for order {order_id}, payment {payment_id} is authentic");
            Verification::authentic()
        } else {
            Verification::rejected()
        }
    }
}
