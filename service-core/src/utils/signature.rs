use crate::error::AppError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Generate an HMAC-SHA256 signature for an object retrieval URL.
///
/// Format: HMAC-SHA256(object_key|expires, secret), hex encoded.
pub fn generate_url_signature(
    secret: &str,
    object_key: &str,
    expires: i64,
) -> Result<String, anyhow::Error> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;

    mac.update(format!("{}|{}", object_key, expires).as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a retrieval URL signature using constant-time comparison.
pub fn verify_url_signature(
    secret: &str,
    object_key: &str,
    expires: i64,
    signature: &str,
) -> Result<bool, anyhow::Error> {
    let expected_signature = generate_url_signature(secret, object_key, expires)?;

    let expected_bytes = expected_signature.as_bytes();
    let signature_bytes = signature.as_bytes();

    if expected_bytes.len() != signature_bytes.len() {
        return Ok(false);
    }

    Ok(expected_bytes.ct_eq(signature_bytes).into())
}

/// Reject expired or forged retrieval URLs. `now` is a unix timestamp in seconds.
pub fn validate_url_signature(
    secret: &str,
    object_key: &str,
    expires: i64,
    signature: &str,
    now: i64,
) -> Result<(), AppError> {
    if expires < now {
        return Err(AppError::Unauthorized(anyhow::anyhow!("URL has expired")));
    }

    let valid = verify_url_signature(secret, object_key, expires, signature)
        .map_err(AppError::InternalError)?;

    if !valid {
        return Err(AppError::Unauthorized(anyhow::anyhow!("Invalid URL signature")));
    }

    Ok(())
}
