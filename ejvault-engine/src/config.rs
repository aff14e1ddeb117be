//! Engine configuration.

use ejvault_crypto::FingerprintParams;
use serde::{Deserialize, Serialize};

/// Well-known identity salt used when the operator has not set one.
///
/// Fingerprints keyed by it can be precomputed by anyone; every use is
/// logged as a warning.
pub const DEFAULT_IDENTITY_SALT: &[u8] = b"ejson";

/// Where the identity salt for fingerprints comes from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SaltSource {
    /// Read `keys/__secret_salt`, falling back to the default salt.
    #[default]
    Stored,
    /// Operator-provided salt.
    Explicit { salt: Vec<u8> },
    /// Always use [`DEFAULT_IDENTITY_SALT`].
    UseDefault,
}

/// Configuration for the document engine.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Identity salt resolution for analysis and identity lookups.
    #[serde(default)]
    pub identity_salt: SaltSource,

    /// scrypt cost parameters for fingerprints.
    #[serde(default)]
    pub fingerprint: FingerprintParams,
}

impl EngineConfig {
    /// Creates a config with cheap scrypt parameters for testing.
    pub fn test() -> Self {
        Self {
            identity_salt: SaltSource::Stored,
            fingerprint: FingerprintParams {
                log_n: 10,
                ..FingerprintParams::default()
            },
        }
    }

    /// Returns a copy using the given explicit identity salt.
    pub fn with_identity_salt(mut self, salt: impl Into<Vec<u8>>) -> Self {
        self.identity_salt = SaltSource::Explicit { salt: salt.into() };
        self
    }
}
