use actix_web::HttpRequest;
use course_payment_engine::helpers::{hmac_hex, verify_hmac_hex};

const TOKEN_COMPARISON_KEY: &[u8] = b"cpg-token-comparison";

/// Constant-time equality check for shared secrets supplied in request headers.
///
/// Both values are MACed under a fixed key, so the comparison always runs over two equal-length digests regardless
/// of the token lengths. An empty `expected` value never matches.
pub fn tokens_match(expected: &str, provided: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    let Some(expected_mac) = hmac_hex(TOKEN_COMPARISON_KEY, expected.as_bytes()) else {
        return false;
    };
    verify_hmac_hex(TOKEN_COMPARISON_KEY, provided.as_bytes(), &expected_mac)
}

/// The value of `header` as a string, if it is present and valid UTF-8.
pub fn header_value<'r>(req: &'r HttpRequest, header: &str) -> Option<&'r str> {
    req.headers().get(header).and_then(|v| v.to_str().ok())
}
