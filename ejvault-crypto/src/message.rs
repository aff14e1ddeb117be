//! Boxed messages: single encrypted values inside an EJSON document.
//!
//! Wire form is `EJ[1:<encrypter public key>:<nonce>:<box>]` where every
//! segment is standard, padded base64. The box is an X25519 +
//! XSalsa20-Poly1305 NaCl box (Poly1305 tag followed by the ciphertext),
//! sealed from a per-document ephemeral keypair to the recipient.

use crate::error::{CryptoError, CryptoResult};
use crate::keypair::KEY_SIZE;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use crypto_box::aead::{Aead, AeadCore, OsRng};
use crypto_box::{PublicKey, SalsaBox, SecretKey};

/// Size of the XSalsa20 nonce.
pub const NONCE_SIZE: usize = 24;

const PREFIX: &str = "EJ[";
const SCHEMA_VERSION: &str = "1";

/// Parsed form of a single encrypted value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoxedMessage {
    /// Public half of the ephemeral keypair that sealed the box.
    pub encrypter_public: [u8; KEY_SIZE],
    pub nonce: [u8; NONCE_SIZE],
    /// Poly1305 tag + ciphertext.
    pub boxed: Vec<u8>,
}

impl BoxedMessage {
    /// Parses the `EJ[1:...]` wire form.
    pub fn parse(message: &str) -> CryptoResult<Self> {
        let inner = message
            .strip_prefix(PREFIX)
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| CryptoError::InvalidMessage("not a boxed message".to_string()))?;

        let mut parts = inner.split(':');
        let (Some(version), Some(public), Some(nonce), Some(boxed), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(CryptoError::InvalidMessage(
                "expected four ':'-separated segments".to_string(),
            ));
        };

        if version != SCHEMA_VERSION {
            return Err(CryptoError::InvalidMessage(format!(
                "unsupported schema version {version}"
            )));
        }

        Ok(Self {
            encrypter_public: decode_fixed(public, "encrypter public key")?,
            nonce: decode_fixed(nonce, "nonce")?,
            boxed: STANDARD
                .decode(boxed)
                .map_err(|e| CryptoError::InvalidMessage(format!("box is not base64: {e}")))?,
        })
    }

    /// Renders the `EJ[1:...]` wire form.
    pub fn dump(&self) -> String {
        format!(
            "{PREFIX}{SCHEMA_VERSION}:{}:{}:{}]",
            STANDARD.encode(self.encrypter_public),
            STANDARD.encode(self.nonce),
            STANDARD.encode(&self.boxed),
        )
    }
}

fn decode_fixed<const N: usize>(segment: &str, what: &str) -> CryptoResult<[u8; N]> {
    let bytes = STANDARD
        .decode(segment)
        .map_err(|e| CryptoError::InvalidMessage(format!("{what} is not base64: {e}")))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        CryptoError::InvalidMessage(format!("{what} must be {N} bytes, got {}", bytes.len()))
    })
}

/// Whether `value` is already in boxed-message form.
pub fn is_boxed_message(value: &str) -> bool {
    BoxedMessage::parse(value).is_ok()
}

/// Seals values to one recipient with a single ephemeral keypair.
pub struct Encrypter {
    encrypter_public: [u8; KEY_SIZE],
    salsa_box: SalsaBox,
}

impl Encrypter {
    /// Generates the ephemeral keypair and precomputes the shared box.
    pub fn new(recipient_public: &[u8; KEY_SIZE]) -> Self {
        let ephemeral = SecretKey::generate(&mut OsRng);
        let recipient = PublicKey::from(*recipient_public);
        Self {
            encrypter_public: *ephemeral.public_key().as_bytes(),
            salsa_box: SalsaBox::new(&recipient, &ephemeral),
        }
    }

    /// Encrypts `plaintext`. Values that are already boxed are returned unchanged.
    pub fn encrypt(&self, plaintext: &str) -> CryptoResult<String> {
        if is_boxed_message(plaintext) {
            return Ok(plaintext.to_string());
        }

        let nonce = SalsaBox::generate_nonce(&mut OsRng);
        let boxed = self
            .salsa_box
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::Encryption(format!("box seal failed: {e}")))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        nonce_bytes.copy_from_slice(nonce.as_slice());

        Ok(BoxedMessage {
            encrypter_public: self.encrypter_public,
            nonce: nonce_bytes,
            boxed,
        }
        .dump())
    }
}

/// Opens boxed messages addressed to one private key.
pub struct Decrypter {
    secret: SecretKey,
}

impl Decrypter {
    pub fn new(private: &[u8; KEY_SIZE]) -> Self {
        Self {
            secret: SecretKey::from(*private),
        }
    }

    /// Decrypts a boxed message back to its plaintext.
    pub fn decrypt(&self, message: &str) -> CryptoResult<String> {
        let parsed = BoxedMessage::parse(message)?;
        let encrypter = PublicKey::from(parsed.encrypter_public);
        let salsa_box = SalsaBox::new(&encrypter, &self.secret);

        let plaintext = salsa_box
            .decrypt(
                crypto_box::Nonce::from_slice(&parsed.nonce),
                parsed.boxed.as_ref(),
            )
            .map_err(|_| {
                CryptoError::Decryption("box open failed (wrong key or tampered data)".to_string())
            })?;

        String::from_utf8(plaintext)
            .map_err(|_| CryptoError::Decryption("plaintext is not valid UTF-8".to_string()))
    }
}
