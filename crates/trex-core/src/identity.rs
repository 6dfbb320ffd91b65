//! # Identifier Newtypes
//!
//! Fixed-width identifiers for the core: 20-byte account addresses and
//! 32-byte key and claim identifiers. These prevent accidental identifier
//! confusion: a `ClaimId` cannot be passed where a `KeyId` is expected.
//!
//! ## Derivations
//!
//! - `KeyId::from_address(a)` = `keccak256(abi.encode(a))`, the identifier
//!   under which an account's key is stored in an identity's key store.
//! - `ClaimId::derive(issuer, topic)` = `keccak256(abi.encode(issuer, topic))`,
//!   so a subject holds at most one claim per (issuer, topic).
//!
//! All three serialize as `0x`-prefixed lowercase hex strings.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::abi::{self, Token};
use crate::digest::keccak256;
use crate::encoding::{from_hex_fixed, hex_prefix, to_prefixed_hex};
use crate::error::TrexError;

/// A 20-byte account address (wallet, identity, token, or module).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address. Never a valid recovery result.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Create an address from raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Take the low 20 bytes of a 32-byte word (Ethereum address derivation).
    pub fn from_word(word: &[u8; 32]) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word[12..]);
        Self(bytes)
    }

    /// Return the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Whether this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Render as `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        to_prefixed_hex(&self.0)
    }

    /// Parse from hex, with or without `0x`.
    pub fn from_hex(hex: &str) -> Result<Self, TrexError> {
        from_hex_fixed::<20>(hex)
            .map(Self)
            .map_err(|e| TrexError::InvalidInput(format!("address: {e}")))
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address(0x{}...)", hex_prefix(&self.0))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Address {
    type Err = TrexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// Implements the shared surface of the 32-byte hash identifiers.
macro_rules! hash_id {
    ($name:ident, $label:literal) => {
        impl $name {
            /// Wrap raw 32 bytes.
            pub fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Return the raw bytes.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Render as `0x`-prefixed lowercase hex.
            pub fn to_hex(&self) -> String {
                to_prefixed_hex(&self.0)
            }

            /// Parse from hex, with or without `0x`.
            pub fn from_hex(hex: &str) -> Result<Self, TrexError> {
                from_hex_fixed::<32>(hex)
                    .map(Self)
                    .map_err(|e| TrexError::InvalidInput(format!("{}: {e}", $label)))
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}(0x{}...)", stringify!($name), hex_prefix(&self.0))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = TrexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let hex = String::deserialize(deserializer)?;
                Self::from_hex(&hex).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Identifier of a key inside an identity's key store: a 32-byte hash of
/// the public credential.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(pub [u8; 32]);

hash_id!(KeyId, "key id");

impl KeyId {
    /// The key identifier an account's address is stored under.
    pub fn from_address(address: &Address) -> Self {
        Self(keccak256(&abi::encode(&[Token::Address(address)])))
    }
}

/// Identifier of a claim on a subject identity: `hash(issuer, topic)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClaimId(pub [u8; 32]);

hash_id!(ClaimId, "claim id");

impl ClaimId {
    /// Derive the claim identifier for an (issuer, topic) pair.
    pub fn derive(issuer: &Address, topic: Topic) -> Self {
        Self(keccak256(&abi::encode(&[
            Token::Address(issuer),
            Token::Uint(topic.0),
        ])))
    }
}

/// A claim topic: an integer naming a category of attestation
/// (e.g. "KYC passed").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(pub u64);

impl Topic {
    /// Access the numeric topic.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "topic:{}", self.0)
    }
}

impl From<u64> for Topic {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    #[test]
    fn address_hex_roundtrip() {
        let a = addr(0xab);
        let hex = a.to_hex();
        assert_eq!(hex.len(), 42);
        assert!(hex.starts_with("0x"));
        assert_eq!(Address::from_hex(&hex).unwrap(), a);
        assert_eq!(hex.parse::<Address>().unwrap(), a);
    }

    #[test]
    fn address_rejects_wrong_width() {
        assert!(Address::from_hex("0x1234").is_err());
        assert!(Address::from_hex(&"11".repeat(32)).is_err());
    }

    #[test]
    fn address_from_word_takes_low_bytes() {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&[7u8; 20]);
        word[0] = 0xff;
        assert_eq!(Address::from_word(&word), addr(7));
    }

    #[test]
    fn zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!addr(1).is_zero());
    }

    #[test]
    fn claim_id_depends_on_issuer_and_topic() {
        let a = ClaimId::derive(&addr(1), Topic(7));
        assert_eq!(a, ClaimId::derive(&addr(1), Topic(7)));
        assert_ne!(a, ClaimId::derive(&addr(2), Topic(7)));
        assert_ne!(a, ClaimId::derive(&addr(1), Topic(8)));
    }

    #[test]
    fn key_id_from_address_is_hash_of_padded_word() {
        let a = addr(9);
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(a.as_bytes());
        assert_eq!(KeyId::from_address(&a).0, keccak256(&word));
    }

    #[test]
    fn ids_serialize_as_hex_strings() {
        let id = KeyId([0x11; 32]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json.len(), 2 + 2 + 64);
        let back: KeyId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        let a = addr(3);
        let back: Address = serde_json::from_str(&serde_json::to_string(&a).unwrap()).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn debug_shows_prefix_only() {
        let debug = format!("{:?}", ClaimId([0xcd; 32]));
        assert_eq!(debug, "ClaimId(0xcdcdcdcd...)");
    }

    #[test]
    fn topic_is_transparent_in_json() {
        assert_eq!(serde_json::to_string(&Topic(7)).unwrap(), "7");
    }
}
