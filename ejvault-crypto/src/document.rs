//! Whole-document encryption.
//!
//! A document is a JSON object whose top-level `_public_key` field names the
//! recipient. Every string value is encrypted individually, except values
//! whose own key starts with `_`; those stay in plaintext. Objects nested
//! under a `_`-key are still walked, and strings inside arrays are always
//! encrypted.

use crate::error::{CryptoError, CryptoResult};
use crate::keypair::{KEY_SIZE, parse_key_hex};
use crate::message::{Decrypter, Encrypter};
use serde_json::{Map, Value};

/// Reserved field carrying the recipient public key in plaintext.
pub const PUBLIC_KEY_FIELD: &str = "_public_key";

/// Leading character that keeps a field's string value in plaintext.
pub const COMMENT_PREFIX: char = '_';

/// Encrypts every actionable string in `plaintext` for the recipient named by
/// its `_public_key` field.
pub fn encrypt_document(plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let mut doc = parse_object(plaintext)?;
    let recipient = public_key_of(&doc)?;
    let encrypter = Encrypter::new(&recipient);

    walk_object(&mut doc, &mut |value: &str| encrypter.encrypt(value))?;
    Ok(serde_json::to_vec(&doc)?)
}

/// Decrypts every actionable string in `ciphertext` with `private_key` (hex).
pub fn decrypt_document(ciphertext: &[u8], private_key: &str) -> CryptoResult<Vec<u8>> {
    let mut doc = parse_object(ciphertext)?;
    let decrypter = Decrypter::new(&parse_key_hex(private_key)?);

    walk_object(&mut doc, &mut |value: &str| decrypter.decrypt(value))?;
    Ok(serde_json::to_vec(&doc)?)
}

/// Reads the recipient public key out of an encoded document.
pub fn extract_public_key(document: &[u8]) -> CryptoResult<[u8; KEY_SIZE]> {
    public_key_of(&parse_object(document)?)
}

fn parse_object(bytes: &[u8]) -> CryptoResult<Map<String, Value>> {
    match serde_json::from_slice(bytes)? {
        Value::Object(map) => Ok(map),
        _ => Err(CryptoError::InvalidDocument(
            "document root must be a JSON object".to_string(),
        )),
    }
}

fn public_key_of(doc: &Map<String, Value>) -> CryptoResult<[u8; KEY_SIZE]> {
    match doc.get(PUBLIC_KEY_FIELD) {
        Some(Value::String(key)) => parse_key_hex(key),
        Some(_) => Err(CryptoError::InvalidKey(
            "public key must be a string".to_string(),
        )),
        None => Err(CryptoError::MissingPublicKey),
    }
}

type Action<'a> = dyn FnMut(&str) -> CryptoResult<String> + 'a;

fn walk_object(map: &mut Map<String, Value>, action: &mut Action<'_>) -> CryptoResult<()> {
    for (key, value) in map.iter_mut() {
        match value {
            Value::String(_) if key.starts_with(COMMENT_PREFIX) => {}
            _ => walk_value(value, action)?,
        }
    }
    Ok(())
}

fn walk_value(value: &mut Value, action: &mut Action<'_>) -> CryptoResult<()> {
    match value {
        Value::String(s) => *s = action(s)?,
        Value::Array(items) => {
            for item in items {
                walk_value(item, action)?;
            }
        }
        Value::Object(map) => walk_object(map, action)?,
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
    Ok(())
}
