//! Verification code generation.

use anyhow::{Context, Result};
use rand::{rngs::OsRng, RngCore};

pub const CODE_LENGTH: usize = 6;

// Largest multiple of 10 below 256; bytes at or above it are rejected so every
// digit stays equally likely.
const REJECTION_BOUND: u8 = 250;

/// Draw a six-digit numeric code from the OS CSPRNG.
///
/// # Errors
/// Returns an error if the OS random source fails; callers must not retry.
pub fn generate_code() -> Result<String> {
    let mut code = String::with_capacity(CODE_LENGTH);
    let mut buf = [0u8; 16];

    while code.len() < CODE_LENGTH {
        OsRng
            .try_fill_bytes(&mut buf)
            .context("failed to generate verification code")?;
        for byte in buf.iter().copied().filter(|b| *b < REJECTION_BOUND) {
            if code.len() == CODE_LENGTH {
                break;
            }
            code.push(char::from(b'0' + byte % 10));
        }
    }

    Ok(code)
}

/// Shape check for submitted codes before they reach the store.
pub(crate) fn valid_code_format(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}
