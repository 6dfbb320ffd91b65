//! # Cryptographic Error Types
//!
//! Structured errors for signature parsing, recovery, and verification.
//! Converted into `TrexError` at the crate boundary: an unsupported scheme
//! code stays distinguishable, an unparseable scheme name is invalid input,
//! and every other failure becomes `InvalidSignature`.

use thiserror::Error;
use trex_core::TrexError;

/// Errors from cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Signature byte length does not match any accepted layout.
    #[error("invalid signature length: expected {expected}, got {got}")]
    InvalidSignatureLength {
        /// Accepted length(s), human readable.
        expected: &'static str,
        /// Actual length.
        got: usize,
    },

    /// Signature bytes parse but are not a valid signature (zero scalar,
    /// high-S, bad recovery byte).
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// Recovery or verification did not succeed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Public key bytes are not a valid curve point.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Secret key bytes are not a valid scalar/seed.
    #[error("invalid secret key: {0}")]
    InvalidSecretKey(String),

    /// Scheme code is unknown, or recognized but not supported.
    #[error("unsupported signature scheme {0}")]
    UnsupportedScheme(u64),

    /// Scheme name is neither a known name nor a numeric code.
    #[error("unknown signature scheme {0:?}")]
    UnknownScheme(String),
}

impl From<CryptoError> for TrexError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::UnsupportedScheme(scheme) => TrexError::UnsupportedScheme { scheme },
            CryptoError::UnknownScheme(name) => {
                TrexError::InvalidInput(format!("unknown signature scheme {name:?}"))
            }
            other => TrexError::InvalidSignature(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_scheme_keeps_its_kind() {
        let err: TrexError = CryptoError::UnsupportedScheme(2).into();
        assert!(matches!(err, TrexError::UnsupportedScheme { scheme: 2 }));
    }

    #[test]
    fn unknown_scheme_name_is_reported_verbatim() {
        let err: TrexError = CryptoError::UnknownScheme("dsa".into()).into();
        match err {
            TrexError::InvalidInput(msg) => assert!(msg.contains("\"dsa\"")),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn other_failures_become_invalid_signature() {
        let err: TrexError = CryptoError::InvalidSignatureLength {
            expected: "65",
            got: 3,
        }
        .into();
        match err {
            TrexError::InvalidSignature(msg) => assert!(msg.contains("got 3")),
            other => panic!("expected InvalidSignature, got {other:?}"),
        }
    }
}
