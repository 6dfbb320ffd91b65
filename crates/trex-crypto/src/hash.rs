//! # Claim Digests
//!
//! The two digests a claim signature covers:
//!
//! 1. `claim_data_hash = keccak256(abi.encode(identity, topic, data))`
//! 2. `eth_signed_message_hash(h) = keccak256("\x19Ethereum Signed Message:\n32" ‖ h)`
//!
//! Every scheme signs (2) applied to (1), matching what Ethereum wallets
//! produce for `personal_sign` over a 32-byte hash.

use trex_core::abi::{self, Token};
use trex_core::{keccak256, Address, Topic};

const PERSONAL_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Hash of the claim payload an issuer signs for a subject.
pub fn claim_data_hash(identity: &Address, topic: Topic, data: &[u8]) -> [u8; 32] {
    keccak256(&abi::encode(&[
        Token::Address(identity),
        Token::Uint(topic.value()),
        Token::Bytes(data),
    ]))
}

/// Ethereum personal-message digest of a 32-byte hash.
pub fn eth_signed_message_hash(hash: &[u8; 32]) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(PERSONAL_MESSAGE_PREFIX.len() + 32);
    preimage.extend_from_slice(PERSONAL_MESSAGE_PREFIX);
    preimage.extend_from_slice(hash);
    keccak256(&preimage)
}

/// Address of a public credential: the low 20 bytes of its Keccak-256.
pub fn address_of(public_key_material: &[u8]) -> Address {
    Address::from_word(&keccak256(public_key_material))
}
