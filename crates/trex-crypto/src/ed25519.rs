//! # Ed25519 Signing and Envelope Verification
//!
//! Claim scheme `4`. Ed25519 has no public-key recovery, so the signature
//! travels as a 96-byte envelope `signature (64) ‖ public_key (32)`. The
//! envelope's key is verified against the signed digest, then identified
//! the same way as an ECDSA signer: `keccak256(public_key)[12..]`.
//!
//! ## Security Invariant
//!
//! - Verification uses `verify_strict`, rejecting small-order keys and
//!   non-canonical signature encodings.
//! - A verified envelope yields the address of the key it carries. The
//!   caller decides whether that address is an authorized signer.
//! - `Ed25519KeyPair` does not implement `Serialize` and its `Debug` output
//!   never includes the private key.
//!
//! ## Serde
//!
//! Public keys serialize as hex strings.

use ed25519_dalek::Signer;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use trex_core::encoding::{from_hex_fixed, to_hex};
use trex_core::Address;
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::hash::address_of;

/// Byte length of an Ed25519 signature envelope.
pub const ENVELOPE_LEN: usize = 96;

/// An Ed25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey(pub [u8; 32]);

/// A signature bundled with the key that produced it.
#[derive(Clone, PartialEq, Eq)]
pub struct Ed25519Envelope {
    /// The 64-byte signature.
    pub signature: [u8; 64],
    /// The signer's public key.
    pub public_key: Ed25519PublicKey,
}

/// An Ed25519 key pair for signing claims.
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

// ---------------------------------------------------------------------------
// Ed25519PublicKey impls
// ---------------------------------------------------------------------------

impl Ed25519PublicKey {
    /// Return the raw 32-byte public key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the public key as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }

    /// Parse a public key from hex.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        from_hex_fixed::<32>(hex)
            .map(Self)
            .map_err(CryptoError::InvalidPublicKey)
    }

    /// The address this key signs as.
    pub fn address(&self) -> Address {
        address_of(&self.0)
    }

    fn to_verifying_key(self) -> Result<ed25519_dalek::VerifyingKey, CryptoError> {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
    }
}

impl Serialize for Ed25519PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519PublicKey({}...)", &self.to_hex()[..8])
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

impl Ed25519Envelope {
    /// Parse a 96-byte envelope.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != ENVELOPE_LEN {
            return Err(CryptoError::InvalidSignatureLength {
                expected: "96",
                got: bytes.len(),
            });
        }
        let mut signature = [0u8; 64];
        signature.copy_from_slice(&bytes[..64]);
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes[64..]);
        Ok(Self {
            signature,
            public_key: Ed25519PublicKey(key),
        })
    }

    /// Serialize to the 96-byte wire form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENVELOPE_LEN);
        out.extend_from_slice(&self.signature);
        out.extend_from_slice(self.public_key.as_bytes());
        out
    }

    /// Verify the envelope over `digest` and return the signer address.
    pub fn verify(&self, digest: &[u8; 32]) -> Result<Address, CryptoError> {
        let key = self.public_key.to_verifying_key()?;
        let sig = ed25519_dalek::Signature::from_bytes(&self.signature);
        key.verify_strict(digest, &sig)
            .map_err(|e| CryptoError::VerificationFailed(format!("Ed25519: {e}")))?;
        Ok(self.public_key.address())
    }
}

impl std::fmt::Debug for Ed25519Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Envelope(signer={:?})", self.public_key)
    }
}

/// Verify a 96-byte envelope over `digest`, returning the signer address.
pub fn verify_envelope(bytes: &[u8], digest: &[u8; 32]) -> Result<Address, CryptoError> {
    Ed25519Envelope::from_slice(bytes)?.verify(digest)
}

// ---------------------------------------------------------------------------
// Ed25519KeyPair impls
// ---------------------------------------------------------------------------

impl Ed25519KeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut rand_core::OsRng),
        }
    }

    /// Create a key pair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Load from a seed slice, rejecting any length but 32.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let seed: [u8; 32] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidSecretKey(format!("seed must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self::from_seed(&seed))
    }

    /// The seed, zeroized on drop.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing_key.to_bytes())
    }

    /// The public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// The address this key signs as.
    pub fn address(&self) -> Address {
        self.public_key().address()
    }

    /// Sign a 32-byte digest and wrap the result in an envelope.
    pub fn sign_envelope(&self, digest: &[u8; 32]) -> Ed25519Envelope {
        Ed25519Envelope {
            signature: self.signing_key.sign(digest).to_bytes(),
            public_key: self.public_key(),
        }
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519KeyPair(<private>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_envelope() {
        let kp = Ed25519KeyPair::generate();
        let digest = [3u8; 32];
        let env = kp.sign_envelope(&digest);
        let bytes = env.to_bytes();
        assert_eq!(bytes.len(), ENVELOPE_LEN);
        assert_eq!(verify_envelope(&bytes, &digest).unwrap(), kp.address());
    }

    #[test]
    fn wrong_digest_fails() {
        let kp = Ed25519KeyPair::from_seed(&[1u8; 32]);
        let env = kp.sign_envelope(&[1u8; 32]);
        assert!(matches!(
            env.verify(&[2u8; 32]),
            Err(CryptoError::VerificationFailed(_))
        ));
    }

    #[test]
    fn swapped_key_fails() {
        let signer = Ed25519KeyPair::from_seed(&[1u8; 32]);
        let impostor = Ed25519KeyPair::from_seed(&[2u8; 32]);
        let digest = [9u8; 32];
        let mut env = signer.sign_envelope(&digest);
        env.public_key = impostor.public_key();
        assert!(env.verify(&digest).is_err());
    }

    #[test]
    fn wrong_length_rejected() {
        assert!(matches!(
            verify_envelope(&[0u8; 64], &[0u8; 32]),
            Err(CryptoError::InvalidSignatureLength { got: 64, .. })
        ));
    }

    #[test]
    fn deterministic_from_seed() {
        let a = Ed25519KeyPair::from_seed(&[42u8; 32]);
        let b = Ed25519KeyPair::from_secret_bytes(&*a.secret_bytes()).unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.sign_envelope(&[0u8; 32]), b.sign_envelope(&[0u8; 32]));
    }

    #[test]
    fn public_key_serde_is_hex() {
        let pk = Ed25519KeyPair::generate().public_key();
        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(json.len(), 64 + 2);
        let back: Ed25519PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pk);
    }

    #[test]
    fn debug_does_not_leak_private_key() {
        let kp = Ed25519KeyPair::generate();
        assert_eq!(format!("{kp:?}"), "Ed25519KeyPair(<private>)");
    }
}
