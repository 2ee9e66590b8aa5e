//! Cryptographic primitives for credential issuance and verification.
//!
//! Wraps Ed25519 signing with strong types. The issuer keypair lives with
//! the (out-of-scope) login flow; verifiers only ever hold the public key.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use std::fmt;

use crate::error::AuthError;

/// A 32-byte Ed25519 public key identifying the credential issuer.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct IssuerPublicKey(pub [u8; 32]);

impl IssuerPublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &CredentialSignature) -> Result<(), AuthError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| AuthError::InvalidSignature)?;
        let sig = Signature::from_bytes(&signature.0);
        verifying_key
            .verify(message, &sig)
            .map_err(|_| AuthError::InvalidSignature)
    }
}

impl fmt::Debug for IssuerPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IssuerPublicKey({})", &self.to_hex()[..16])
    }
}

/// A 64-byte Ed25519 signature over a credential's signing bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CredentialSignature(pub [u8; 64]);

impl CredentialSignature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 64 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 64];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for CredentialSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialSignature({})", &self.to_hex()[..16])
    }
}

/// An Ed25519 keypair used to mint credentials.
pub struct IssuerKeypair {
    signing_key: SigningKey,
}

impl IssuerKeypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: SigningKey::generate(&mut csprng),
        }
    }

    /// Create a deterministic keypair from a seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Get the public key.
    pub fn public_key(&self) -> IssuerPublicKey {
        IssuerPublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> CredentialSignature {
        let sig = self.signing_key.sign(message);
        CredentialSignature(sig.to_bytes())
    }
}

impl fmt::Debug for IssuerKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IssuerKeypair({})", &self.public_key().to_hex()[..16])
    }
}
