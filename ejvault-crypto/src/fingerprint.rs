//! Salted, deliberately slow fingerprints of secret values.
//!
//! Two fingerprints are equal exactly when the value and the salt are equal,
//! which lets callers correlate secrets across documents without learning them.

use crate::error::{CryptoError, CryptoResult};
use serde::{Deserialize, Serialize};

/// scrypt cost parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintParams {
    /// log2 of the CPU/memory cost `N`.
    pub log_n: u8,
    /// Block size.
    pub r: u32,
    /// Parallelism.
    pub p: u32,
    /// Output length in bytes.
    pub len: usize,
}

impl Default for FingerprintParams {
    fn default() -> Self {
        Self {
            log_n: 14, // N = 16384
            r: 8,
            p: 1,
            len: 32,
        }
    }
}

/// Computes `scrypt(value, salt)` with the given parameters.
pub fn fingerprint(value: &[u8], salt: &[u8], params: &FingerprintParams) -> CryptoResult<Vec<u8>> {
    let scrypt_params = scrypt::Params::new(params.log_n, params.r, params.p, params.len)
        .map_err(|e| CryptoError::KeyDerivation(format!("invalid scrypt parameters: {e}")))?;

    let mut output = vec![0u8; params.len];
    scrypt::scrypt(value, salt, &scrypt_params, &mut output)
        .map_err(|e| CryptoError::KeyDerivation(format!("scrypt failed: {e}")))?;
    Ok(output)
}

/// Lowercase hex rendering of [`fingerprint`].
pub fn fingerprint_hex(value: &[u8], salt: &[u8], params: &FingerprintParams) -> CryptoResult<String> {
    fingerprint(value, salt, params).map(hex::encode)
}
