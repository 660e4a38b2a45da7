//! Phone number normalization and hashing.

use sha2::{Digest, Sha256};

use crate::verification::error::VerificationError;

/// Longest E.164 number, country code included, not counting `+`.
const MAX_DIGITS: usize = 15;

/// Normalize `input` to E.164 (`+` followed by 2 to 15 digits, no leading zero).
///
/// Spaces, dashes, dots and parentheses are stripped; a missing `+` is added.
pub fn normalize_e164(input: &str) -> Result<String, VerificationError> {
    let trimmed = input.trim();
    let (has_plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let mut digits = String::with_capacity(rest.len());
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => {
                return Err(VerificationError::InvalidInput(
                    "phone number contains invalid characters".to_string(),
                ))
            }
        }
    }

    if digits.starts_with('0') {
        return Err(VerificationError::InvalidInput(
            "phone number must start with a country code".to_string(),
        ));
    }
    if !(2..=MAX_DIGITS).contains(&digits.len()) {
        return Err(VerificationError::InvalidInput(format!(
            "phone number must have between 2 and {MAX_DIGITS} digits"
        )));
    }

    if !has_plus {
        tracing::debug!("Added missing '+' to phone number");
    }
    Ok(format!("+{digits}"))
}

/// Lower-case hex SHA-256 of the UTF-8 bytes of `value`.
pub fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Check that `hash` looks like a SHA-256 hex digest and lower-case it.
pub fn normalize_hash(hash: &str) -> Result<String, VerificationError> {
    let hash = hash.trim();
    if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(VerificationError::InvalidInput(
            "hashed phone number must be 64 hex characters".to_string(),
        ));
    }
    Ok(hash.to_ascii_lowercase())
}
