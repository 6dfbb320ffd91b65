//! # secp256k1 ECDSA Signing and Recovery
//!
//! Claim scheme `1`. Signatures are 65 bytes, `r ‖ s ‖ v`, with `v` in
//! `{0, 1}` or `{27, 28}`. The signer is not carried in the claim; it is
//! recovered from the signature and the signed digest, and identified by
//! its Ethereum address (`keccak256(uncompressed_pubkey[1..])[12..]`).
//!
//! ## Security Invariant
//!
//! - High-S signatures are rejected before recovery, so each (message,
//!   signer) pair has exactly one accepted encoding.
//! - Recovery failures are errors, never the zero address.
//! - `Secp256k1KeyPair` does not implement `Serialize` and its `Debug`
//!   output never includes key material.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::scalar::IsHigh;
use trex_core::encoding::{from_hex, to_prefixed_hex};
use trex_core::Address;
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::hash::address_of;

/// Byte length of a recoverable signature.
pub const SIGNATURE_LEN: usize = 65;

/// A 65-byte recoverable ECDSA signature, `r ‖ s ‖ v` with `v` in `{27, 28}`.
#[derive(Clone, PartialEq, Eq)]
pub struct RecoverableSignature(pub [u8; SIGNATURE_LEN]);

impl RecoverableSignature {
    /// Parse from raw bytes, checking only the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; SIGNATURE_LEN] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidSignatureLength {
                    expected: "65",
                    got: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    /// Parse from hex, with or without `0x`.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = from_hex(hex).map_err(CryptoError::MalformedSignature)?;
        Self::from_slice(&bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        to_prefixed_hex(&self.0)
    }
}

impl std::fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecoverableSignature({}...)", &self.to_hex()[..10])
    }
}

/// A secp256k1 key pair.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate a random key pair from the OS CSPRNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut rand_core::OsRng),
        }
    }

    /// Load from a 32-byte big-endian secret scalar.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let signing_key = SigningKey::from_slice(bytes)
            .map_err(|e| CryptoError::InvalidSecretKey(e.to_string()))?;
        Ok(Self { signing_key })
    }

    /// The secret scalar, zeroized on drop.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        let mut out = Zeroizing::new([0u8; 32]);
        out.copy_from_slice(&self.signing_key.to_bytes());
        out
    }

    /// Uncompressed SEC1 public key (65 bytes, leading `0x04`).
    pub fn public_key_uncompressed(&self) -> Vec<u8> {
        self.signing_key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    /// Ethereum address of this key.
    pub fn address(&self) -> Address {
        verifying_key_address(self.signing_key.verifying_key())
    }

    /// Sign a 32-byte digest (no further hashing).
    pub fn sign_prehash(&self, digest: &[u8; 32]) -> Result<RecoverableSignature, CryptoError> {
        let (sig, recid) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| CryptoError::VerificationFailed(format!("signing failed: {e}")))?;
        let mut bytes = [0u8; SIGNATURE_LEN];
        bytes[..64].copy_from_slice(&sig.to_bytes());
        bytes[64] = 27 + recid.to_byte();
        Ok(RecoverableSignature(bytes))
    }
}

impl std::fmt::Debug for Secp256k1KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secp256k1KeyPair({})", self.address())
    }
}

/// Recover the signer address of a 65-byte signature over `digest`.
pub fn recover_address(signature: &[u8], digest: &[u8; 32]) -> Result<Address, CryptoError> {
    let sig = RecoverableSignature::from_slice(signature)?;
    let rs = Signature::from_slice(&sig.0[..64])
        .map_err(|e| CryptoError::MalformedSignature(format!("r/s: {e}")))?;
    if bool::from(rs.s().is_high()) {
        return Err(CryptoError::MalformedSignature("high-S signature".into()));
    }
    let v = match sig.0[64] {
        0 | 27 => 0,
        1 | 28 => 1,
        other => {
            return Err(CryptoError::MalformedSignature(format!(
                "recovery byte {other} not in {{0, 1, 27, 28}}"
            )))
        }
    };
    let recid = RecoveryId::from_byte(v)
        .ok_or_else(|| CryptoError::MalformedSignature(format!("recovery id {v}")))?;
    let key = VerifyingKey::recover_from_prehash(digest, &rs, recid)
        .map_err(|e| CryptoError::VerificationFailed(format!("recovery failed: {e}")))?;
    Ok(verifying_key_address(&key))
}

fn verifying_key_address(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    address_of(&point.as_bytes()[1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_from_u8(n: u8) -> Secp256k1KeyPair {
        let mut secret = [0u8; 32];
        secret[31] = n;
        Secp256k1KeyPair::from_secret_bytes(&secret).unwrap()
    }

    /// secp256k1 group order, big-endian.
    const ORDER: [u8; 32] = [
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xfe, 0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36,
        0x41, 0x41,
    ];

    fn order_minus(s: &[u8]) -> [u8; 32] {
        let mut out = [0u8; 32];
        let mut borrow = 0i16;
        for i in (0..32).rev() {
            let mut d = ORDER[i] as i16 - s[i] as i16 - borrow;
            borrow = if d < 0 {
                d += 256;
                1
            } else {
                0
            };
            out[i] = d as u8;
        }
        out
    }

    #[test]
    fn known_addresses() {
        assert_eq!(
            key_from_u8(1).address(),
            Address::from_hex("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf").unwrap()
        );
        assert_eq!(
            key_from_u8(2).address(),
            Address::from_hex("0x2B5AD5c4795c026514f8317c7a215E218DcCD6cF").unwrap()
        );
    }

    #[test]
    fn sign_then_recover() {
        let kp = Secp256k1KeyPair::generate();
        let digest = [0x42u8; 32];
        let sig = kp.sign_prehash(&digest).unwrap();
        assert!(sig.0[64] == 27 || sig.0[64] == 28);
        assert_eq!(recover_address(sig.as_bytes(), &digest).unwrap(), kp.address());
    }

    #[test]
    fn zero_one_recovery_byte_accepted() {
        let kp = key_from_u8(5);
        let digest = [1u8; 32];
        let mut sig = kp.sign_prehash(&digest).unwrap();
        sig.0[64] -= 27;
        assert_eq!(recover_address(sig.as_bytes(), &digest).unwrap(), kp.address());
    }

    #[test]
    fn different_digest_recovers_different_signer() {
        let kp = key_from_u8(3);
        let sig = kp.sign_prehash(&[1u8; 32]).unwrap();
        match recover_address(sig.as_bytes(), &[2u8; 32]) {
            Ok(addr) => assert_ne!(addr, kp.address()),
            Err(CryptoError::VerificationFailed(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn high_s_rejected() {
        let kp = key_from_u8(4);
        let digest = [7u8; 32];
        let mut sig = kp.sign_prehash(&digest).unwrap();
        let high = order_minus(&sig.0[32..64]);
        sig.0[32..64].copy_from_slice(&high);
        sig.0[64] ^= 1;
        assert!(matches!(
            recover_address(sig.as_bytes(), &digest),
            Err(CryptoError::MalformedSignature(_))
        ));
    }

    #[test]
    fn malformed_inputs_rejected() {
        let digest = [0u8; 32];
        assert!(matches!(
            recover_address(&[0u8; 64], &digest),
            Err(CryptoError::InvalidSignatureLength { got: 64, .. })
        ));
        assert!(matches!(
            recover_address(&[0u8; 65], &digest),
            Err(CryptoError::MalformedSignature(_))
        ));
        let kp = key_from_u8(6);
        let mut sig = kp.sign_prehash(&digest).unwrap();
        sig.0[64] = 29;
        assert!(matches!(
            recover_address(sig.as_bytes(), &digest),
            Err(CryptoError::MalformedSignature(_))
        ));
    }

    #[test]
    fn secret_roundtrip_and_debug() {
        let kp = Secp256k1KeyPair::generate();
        let again = Secp256k1KeyPair::from_secret_bytes(&*kp.secret_bytes()).unwrap();
        assert_eq!(kp.address(), again.address());
        let debug = format!("{kp:?}");
        assert!(debug.starts_with("Secp256k1KeyPair(0x"));
        assert_eq!(kp.public_key_uncompressed().len(), 65);
    }

    #[test]
    fn zero_secret_rejected() {
        assert!(Secp256k1KeyPair::from_secret_bytes(&[0u8; 32]).is_err());
    }
}
