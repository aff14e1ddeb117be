//! X25519 keypairs in the fixed-length hex form used as keyring addresses.

use crate::error::{CryptoError, CryptoResult};
use crypto_box::SecretKey;
use crypto_box::aead::OsRng;
use std::fmt;
use zeroize::Zeroizing;

/// Length in bytes of both halves of a keypair.
pub const KEY_SIZE: usize = 32;

/// Length of the hex encoding of a key half.
pub const KEY_HEX_LEN: usize = KEY_SIZE * 2;

/// Hex-encoded X25519 keypair.
///
/// The private half lives in a zeroizing buffer and is never printed by `Debug`.
#[derive(Clone)]
pub struct Keypair {
    public: String,
    private: Zeroizing<String>,
}

impl Keypair {
    /// Reconstructs a keypair from its private half, deriving the public half.
    pub fn from_private_hex(private: &str) -> CryptoResult<Self> {
        let secret = SecretKey::from(parse_key_hex(private)?);
        Ok(Self::from_secret(&secret))
    }

    fn from_secret(secret: &SecretKey) -> Self {
        Self {
            public: hex::encode(secret.public_key().as_bytes()),
            private: Zeroizing::new(hex::encode(secret.to_bytes())),
        }
    }

    /// Public half, 64 lowercase hex characters.
    pub fn public(&self) -> &str {
        &self.public
    }

    /// Private half, 64 lowercase hex characters.
    pub fn private(&self) -> &str {
        &self.private
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public", &self.public)
            .field("private", &"[REDACTED]")
            .finish()
    }
}

/// Generates a new random keypair.
pub fn generate_keypair() -> Keypair {
    let secret = SecretKey::generate(&mut OsRng);
    Keypair::from_secret(&secret)
}

/// Parses a 64-character hex key into its 32 raw bytes.
pub fn parse_key_hex(key: &str) -> CryptoResult<[u8; KEY_SIZE]> {
    if key.len() != KEY_HEX_LEN {
        return Err(CryptoError::InvalidKey(format!(
            "expected {KEY_HEX_LEN} hex characters, got {}",
            key.len()
        )));
    }

    let mut bytes = [0u8; KEY_SIZE];
    hex::decode_to_slice(key, &mut bytes)
        .map_err(|e| CryptoError::InvalidKey(format!("not valid hex: {e}")))?;
    Ok(bytes)
}
