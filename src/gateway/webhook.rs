//! Webhook delivery authentication.
//!
//! The gateway signs each delivery with `t=<unix ts>,v1=<hex hmac>` where
//! the HMAC-SHA256 is computed over `"{timestamp}.{raw body}"`. Deliveries
//! older than the tolerance window are rejected to block replays.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "gateway-signature";

const TOLERANCE_SECS: i64 = 300;

#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("malformed signature header")]
    Malformed,
}

/// Verifies a webhook delivery against the shared secret. Returns
/// `Ok(false)` for a well-formed but wrong/stale signature and `Err` only
/// when the header cannot be parsed at all.
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
) -> Result<bool, SignatureError> {
    let mut timestamp: Option<&str> = None;
    let mut signature: Option<&str> = None;

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signature = Some(value),
            _ => {}
        }
    }

    let (timestamp, signature) = match (timestamp, signature) {
        (Some(t), Some(s)) => (t, s),
        _ => return Err(SignatureError::Malformed),
    };

    let ts: i64 = timestamp.parse().map_err(|_| SignatureError::Malformed)?;
    if (chrono::Utc::now().timestamp() - ts).abs() > TOLERANCE_SECS {
        return Ok(false);
    }

    let expected = match hex::decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => return Ok(false),
    };

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::Malformed)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    Ok(mac.verify_slice(&expected).is_ok())
}
