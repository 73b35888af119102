//! Emergency credential verification.
//!
//! The shared emergency secret is never stored; operator config carries its
//! SHA-256 digest and verification compares digests in constant time.
//! Supplied secrets are zeroized on drop.

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A caller-supplied emergency secret (zeroized on drop).
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SuppliedSecret(String);

impl SuppliedSecret {
    pub fn new(secret: String) -> Self {
        Self(secret)
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

/// Digest of the externally managed emergency credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyCredential {
    digest: [u8; 32],
}

impl EmergencyCredential {
    /// Load from the hex digest held in operator config.
    pub fn from_digest_hex(digest_hex: &str) -> Result<Self, String> {
        let bytes = hex::decode(digest_hex.trim())
            .map_err(|e| format!("invalid emergency digest hex: {}", e))?;
        let digest: [u8; 32] = bytes
            .try_into()
            .map_err(|_| "emergency digest must be 32 bytes".to_string())?;
        Ok(Self { digest })
    }

    /// Derive the credential from a plain secret (config generation, tests).
    pub fn from_secret(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        Self {
            digest: digest.into(),
        }
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Constant-time check of a supplied secret against the stored digest.
    pub fn verify(&self, supplied: &SuppliedSecret) -> bool {
        let supplied_digest = Sha256::digest(supplied.expose().as_bytes());
        ring::constant_time::verify_slices_are_equal(&self.digest, supplied_digest.as_ref())
            .is_ok()
    }
}
