//! Encryption primitive for ejvault.
//!
//! Provides the EJSON document format on top of NaCl boxes:
//! - X25519 keypairs addressed by their hex public half
//! - per-value XSalsa20-Poly1305 boxes sealed from a per-document ephemeral key
//! - document walks that encrypt/decrypt every non-`_` string value
//! - scrypt fingerprints for comparing secrets without revealing them
//!
//! # Format
//!
//! Encrypted values look like `EJ[1:<encrypter pk>:<nonce>:<box>]` and are
//! interchangeable with documents produced by the `ejson` tool.

mod document;
mod error;
mod fingerprint;
mod keypair;
pub mod message;

pub use document::{
    COMMENT_PREFIX, PUBLIC_KEY_FIELD, decrypt_document, encrypt_document, extract_public_key,
};
pub use error::{CryptoError, CryptoResult};
pub use fingerprint::{FingerprintParams, fingerprint, fingerprint_hex};
pub use keypair::{KEY_HEX_LEN, KEY_SIZE, Keypair, generate_keypair, parse_key_hex};
pub use message::{BoxedMessage, Decrypter, Encrypter, is_boxed_message};
