//! # Signature Scheme Dispatch
//!
//! A claim's `scheme` code selects how its signature is turned into a
//! signer address:
//!
//! | Code | Scheme | Support |
//! |------|--------|---------|
//! | 1 | ECDSA secp256k1 | recovered from 65-byte `r ‖ s ‖ v` |
//! | 2 | RSA | recognized, unsupported |
//! | 3 | Contract call | recognized, unsupported |
//! | 4 | Ed25519 | verified from 96-byte envelope |
//!
//! All schemes sign `eth_signed_message_hash(data_hash)`.

use serde::{Deserialize, Serialize};
use trex_core::{Address, Topic};

use crate::ecdsa::{self, Secp256k1KeyPair};
use crate::ed25519::{self, Ed25519KeyPair};
use crate::error::CryptoError;
use crate::hash::{claim_data_hash, eth_signed_message_hash};

/// A claim signature scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureScheme {
    /// secp256k1 ECDSA with public-key recovery.
    Ecdsa,
    /// RSA. Recognized only.
    Rsa,
    /// Signer is a contract. Recognized only.
    Contract,
    /// Ed25519 envelope.
    Ed25519,
}

impl SignatureScheme {
    /// Numeric scheme code.
    pub fn code(&self) -> u64 {
        match self {
            Self::Ecdsa => 1,
            Self::Rsa => 2,
            Self::Contract => 3,
            Self::Ed25519 => 4,
        }
    }

    /// Decode a numeric scheme code. Unknown codes are `UnsupportedScheme`.
    pub fn from_code(code: u64) -> Result<Self, CryptoError> {
        match code {
            1 => Ok(Self::Ecdsa),
            2 => Ok(Self::Rsa),
            3 => Ok(Self::Contract),
            4 => Ok(Self::Ed25519),
            other => Err(CryptoError::UnsupportedScheme(other)),
        }
    }

    /// Whether this build can derive a signer for the scheme.
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Ecdsa | Self::Ed25519)
    }
}

impl std::str::FromStr for SignatureScheme {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ecdsa" | "secp256k1" => Ok(Self::Ecdsa),
            "ed25519" => Ok(Self::Ed25519),
            "rsa" => Ok(Self::Rsa),
            "contract" => Ok(Self::Contract),
            other => match other.parse::<u64>() {
                Ok(code) => Self::from_code(code),
                Err(_) => Err(CryptoError::UnknownScheme(s.to_string())),
            },
        }
    }
}

/// Derive the signer address for `signature` over `data_hash` under `scheme`.
///
/// The signed message is `eth_signed_message_hash(data_hash)`.
pub fn recover_signer(
    scheme: SignatureScheme,
    signature: &[u8],
    data_hash: &[u8; 32],
) -> Result<Address, CryptoError> {
    let digest = eth_signed_message_hash(data_hash);
    match scheme {
        SignatureScheme::Ecdsa => ecdsa::recover_address(signature, &digest),
        SignatureScheme::Ed25519 => ed25519::verify_envelope(signature, &digest),
        SignatureScheme::Rsa | SignatureScheme::Contract => {
            Err(CryptoError::UnsupportedScheme(scheme.code()))
        }
    }
}

/// Recover the signer address, detecting the scheme from the signature length.
///
/// 65 bytes is ECDSA, 96 bytes an Ed25519 envelope. Anything else is
/// `InvalidSignatureLength`. Never returns the zero address.
pub fn get_recovered_address(signature: &[u8], data_hash: &[u8; 32]) -> Result<Address, CryptoError> {
    let scheme = match signature.len() {
        ecdsa::SIGNATURE_LEN => SignatureScheme::Ecdsa,
        ed25519::ENVELOPE_LEN => SignatureScheme::Ed25519,
        got => {
            return Err(CryptoError::InvalidSignatureLength {
                expected: "65 or 96",
                got,
            })
        }
    };
    let signer = recover_signer(scheme, signature, data_hash)?;
    if signer.is_zero() {
        return Err(CryptoError::VerificationFailed("recovered zero address".into()));
    }
    Ok(signer)
}

/// A key able to sign claims under one of the supported schemes.
#[derive(Debug)]
pub enum ClaimSigner {
    /// secp256k1 key.
    Ecdsa(Secp256k1KeyPair),
    /// Ed25519 key.
    Ed25519(Ed25519KeyPair),
}

impl ClaimSigner {
    /// The scheme this signer produces.
    pub fn scheme(&self) -> SignatureScheme {
        match self {
            Self::Ecdsa(_) => SignatureScheme::Ecdsa,
            Self::Ed25519(_) => SignatureScheme::Ed25519,
        }
    }

    /// Fresh random key for `scheme`.
    pub fn generate(scheme: SignatureScheme) -> Result<Self, CryptoError> {
        match scheme {
            SignatureScheme::Ecdsa => Ok(Self::Ecdsa(Secp256k1KeyPair::generate())),
            SignatureScheme::Ed25519 => Ok(Self::Ed25519(Ed25519KeyPair::generate())),
            other => Err(CryptoError::UnsupportedScheme(other.code())),
        }
    }

    /// Load a signer from its 32-byte secret.
    pub fn from_secret_bytes(scheme: SignatureScheme, secret: &[u8]) -> Result<Self, CryptoError> {
        match scheme {
            SignatureScheme::Ecdsa => Ok(Self::Ecdsa(Secp256k1KeyPair::from_secret_bytes(secret)?)),
            SignatureScheme::Ed25519 => {
                Ok(Self::Ed25519(Ed25519KeyPair::from_secret_bytes(secret)?))
            }
            other => Err(CryptoError::UnsupportedScheme(other.code())),
        }
    }

    /// The secret bytes, zeroized on drop.
    pub fn secret_bytes(&self) -> zeroize::Zeroizing<[u8; 32]> {
        match self {
            Self::Ecdsa(kp) => kp.secret_bytes(),
            Self::Ed25519(kp) => kp.secret_bytes(),
        }
    }

    /// The address signatures from this key recover to.
    pub fn address(&self) -> Address {
        match self {
            Self::Ecdsa(kp) => kp.address(),
            Self::Ed25519(kp) => kp.address(),
        }
    }

    /// Sign an arbitrary 32-byte data hash (personal-message prefixed).
    pub fn sign_hash(&self, data_hash: &[u8; 32]) -> Result<Vec<u8>, CryptoError> {
        let digest = eth_signed_message_hash(data_hash);
        match self {
            Self::Ecdsa(kp) => Ok(kp.sign_prehash(&digest)?.as_bytes().to_vec()),
            Self::Ed25519(kp) => Ok(kp.sign_envelope(&digest).to_bytes()),
        }
    }

    /// Sign the claim `(identity, topic, data)` as an issuer.
    pub fn sign_claim(
        &self,
        identity: &Address,
        topic: Topic,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        self.sign_hash(&claim_data_hash(identity, topic, data))
    }
}
