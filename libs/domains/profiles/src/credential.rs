//! Self-describing salted password hash records.
//!
//! Wire form: `base64(u32be(salt_len) || u32be(iterations) || salt || hash)`
//! where the hash is a PBKDF2 HMAC-SHA-512 derivation of the password. The
//! salt length and iteration count travel inside each record, so the
//! configured iteration count can be raised for new records without
//! invalidating anything already stored.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::Hmac;
use rand::TryRng;
use rand::rngs::SysRng;
use sha2::Sha512;
use subtle::ConstantTimeEq;

use core_config::{ConfigError, FromEnv, env_parse_or_default};

use crate::error::CredentialError;

/// Length in bytes of the derived key written into new records.
const HASH_LENGTH: usize = 512;
/// Record header: salt length and iteration count, both big-endian u32.
const HEADER_LENGTH: usize = 8;

const DEFAULT_SALT_LENGTH: u32 = 128;
const DEFAULT_ITERATIONS: u32 = 9973;

/// Tunable inputs to credential hashing.
///
/// Applies to newly written records only; verification always uses the
/// parameters embedded in the record being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialParams {
    pub salt_length: u32,
    pub iterations: u32,
}

impl Default for CredentialParams {
    fn default() -> Self {
        Self {
            salt_length: DEFAULT_SALT_LENGTH,
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl FromEnv for CredentialParams {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            salt_length: env_parse_or_default("CREDENTIAL_SALT_LENGTH", DEFAULT_SALT_LENGTH)?,
            iterations: env_parse_or_default("CREDENTIAL_ITERATIONS", DEFAULT_ITERATIONS)?,
        })
    }
}

/// A decoded credential record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub salt_length: u32,
    pub iterations: u32,
    pub salt: Vec<u8>,
    pub hash: Vec<u8>,
}

impl CredentialRecord {
    /// Serialize to the base64 wire form.
    pub fn encode(&self) -> String {
        let mut combined =
            Vec::with_capacity(HEADER_LENGTH + self.salt.len() + self.hash.len());
        combined.extend_from_slice(&self.salt_length.to_be_bytes());
        combined.extend_from_slice(&self.iterations.to_be_bytes());
        combined.extend_from_slice(&self.salt);
        combined.extend_from_slice(&self.hash);
        BASE64.encode(&combined)
    }

    /// Recover a record from its wire form.
    ///
    /// The salt and hash boundaries come solely from the buffer structure:
    /// the salt spans `salt_length` bytes after the header and the hash is
    /// whatever follows it. Corrupt base64, a truncated buffer, or a salt
    /// length that leaves no room for a hash all return `None`.
    pub fn decode(encoded: &str) -> Option<Self> {
        let combined = BASE64.decode(encoded).ok()?;
        if combined.len() <= HEADER_LENGTH {
            return None;
        }

        let salt_length = u32::from_be_bytes(combined[0..4].try_into().ok()?);
        let iterations = u32::from_be_bytes(combined[4..8].try_into().ok()?);
        let salt_end = HEADER_LENGTH.checked_add(salt_length as usize)?;
        if salt_end >= combined.len() {
            return None;
        }

        Some(Self {
            salt_length,
            iterations,
            salt: combined[HEADER_LENGTH..salt_end].to_vec(),
            hash: combined[salt_end..].to_vec(),
        })
    }
}

/// Hash a plaintext password into a fresh credential record string.
///
/// Every call draws a new salt. Salt generation and key derivation
/// failures indicate a broken runtime and are returned as errors rather
/// than swallowed.
pub fn hash_password(
    plaintext: &str,
    params: &CredentialParams,
) -> Result<String, CredentialError> {
    let mut salt = vec![0u8; params.salt_length as usize];
    SysRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| CredentialError::Rng(e.to_string()))?;

    let hash = derive(plaintext.as_bytes(), &salt, params.iterations, HASH_LENGTH)?;

    let record = CredentialRecord {
        salt_length: params.salt_length,
        iterations: params.iterations,
        salt,
        hash,
    };
    Ok(record.encode())
}

/// Verify a plaintext candidate against an encoded record.
///
/// Re-derives with the salt, iteration count, and hash length stored in the
/// record and compares in constant time. Malformed records fail closed to
/// `Ok(false)`; only a broken derivation primitive is an error.
pub fn verify_password(plaintext: &str, encoded: &str) -> Result<bool, CredentialError> {
    let Some(record) = CredentialRecord::decode(encoded) else {
        return Ok(false);
    };

    let candidate = derive(
        plaintext.as_bytes(),
        &record.salt,
        record.iterations,
        record.hash.len(),
    )?;

    Ok(bool::from(
        candidate.as_slice().ct_eq(record.hash.as_slice()),
    ))
}

fn derive(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    length: usize,
) -> Result<Vec<u8>, CredentialError> {
    let mut output = vec![0u8; length];
    pbkdf2::pbkdf2::<Hmac<Sha512>>(password, salt, iterations, &mut output)
        .map_err(|e| CredentialError::Derivation(e.to_string()))?;
    Ok(output)
}
