//! Webhook signature verification.
//!
//! The processor signs every delivery with HMAC-SHA256 over
//! `"<timestamp>.<raw body>"` and sends the result in a header of the form
//! `t=<unix seconds>,v1=<hex digest>[,v1=<hex digest>...]`.

use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Default accepted clock skew between signing and verification
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Webhook secret is not configured")]
    MissingSecret,

    #[error("Webhook secret cannot be used as an HMAC key")]
    InvalidSecret,

    #[error("Invalid signature header format")]
    MalformedHeader,

    #[error("Timestamp outside tolerance window")]
    TimestampOutOfTolerance,

    #[error("No signature matches the payload")]
    NoMatchingSignature,
}

/// Parsed signature header
#[derive(Debug, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    /// The `t=` value exactly as received; this is the text that was signed
    pub raw_timestamp: String,
    pub signatures: Vec<Vec<u8>>,
}

/// Parse a `t=...,v1=...` header. Unknown schemes are skipped; entries
/// that are not valid hex are dropped.
pub fn parse_signature_header(header: &str) -> Result<SignatureHeader, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                let parsed = value
                    .parse::<i64>()
                    .map_err(|_| SignatureError::MalformedHeader)?;
                timestamp = Some((parsed, value.to_string()));
            }
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    match timestamp {
        Some((timestamp, raw_timestamp)) if !signatures.is_empty() => Ok(SignatureHeader {
            timestamp,
            raw_timestamp,
            signatures,
        }),
        _ => Err(SignatureError::MalformedHeader),
    }
}

fn mac_for(secret: &str, timestamp: &str, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Verify a delivery against the current time
pub fn verify(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
) -> Result<(), SignatureError> {
    verify_at(payload, header, secret, tolerance, Utc::now().timestamp())
}

/// Verify a delivery as if the current time were `now` (unix seconds).
pub fn verify_at(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
    now: i64,
) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::MissingSecret);
    }

    let parsed = parse_signature_header(header)?;

    if now.abs_diff(parsed.timestamp) > tolerance.as_secs() {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    let mac = mac_for(secret, &parsed.raw_timestamp, payload)?;
    let matched = parsed
        .signatures
        .iter()
        .any(|candidate| mac.clone().verify_slice(candidate).is_ok());

    if matched {
        Ok(())
    } else {
        Err(SignatureError::NoMatchingSignature)
    }
}

/// Produce a header value for `payload`, as the processor would.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, SignatureError> {
    let digest = mac_for(secret, &timestamp.to_string(), payload)?
        .finalize()
        .into_bytes();
    Ok(format!("t={timestamp},v1={}", hex::encode(digest)))
}
