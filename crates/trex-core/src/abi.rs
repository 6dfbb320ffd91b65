//! # ABI Word Encoding
//!
//! Minimal Solidity ABI encoding (`abi.encode`) for the three value kinds
//! the core hashes: addresses, unsigned integers, and dynamic byte strings.
//!
//! Static values occupy one 32-byte head word each. A dynamic `bytes` value
//! puts its offset in the head and `len ‖ data ‖ zero-padding` in the tail,
//! so the claim digest `keccak256(abi.encode(identity, topic, data))` is the
//! same digest an EVM issuer signs.

use crate::identity::Address;
use crate::Amount;

const WORD: usize = 32;

/// A value to ABI-encode.
#[derive(Debug, Clone, Copy)]
pub enum Token<'a> {
    /// 20-byte address, left-padded to a word.
    Address(&'a Address),
    /// Unsigned integer, big-endian in a word.
    Uint(u64),
    /// Unsigned 256-bit integer.
    Uint256(Amount),
    /// Dynamic byte string.
    Bytes(&'a [u8]),
}

/// Encode a 20-byte address as a left-padded 32-byte word.
pub fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// Encode a `u64` as a big-endian 32-byte word.
pub fn uint_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; WORD];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Encode a 256-bit amount as a big-endian 32-byte word.
pub fn uint256_word(value: Amount) -> [u8; 32] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

/// ABI-encode a tuple of tokens (`abi.encode(t0, t1, ...)`).
pub fn encode(tokens: &[Token<'_>]) -> Vec<u8> {
    let head_len = WORD * tokens.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            Token::Address(a) => head.extend_from_slice(&address_word(a)),
            Token::Uint(v) => head.extend_from_slice(&uint_word(*v)),
            Token::Uint256(v) => head.extend_from_slice(&uint256_word(*v)),
            Token::Bytes(data) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u64));
                tail.extend_from_slice(&uint_word(data.len() as u64));
                tail.extend_from_slice(data);
                let pad = (WORD - data.len() % WORD) % WORD;
                tail.resize(tail.len() + pad, 0);
            }
        }
    }

    head.extend_from_slice(&tail);
    head
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_tokens_are_one_word_each() {
        let a = Address([1u8; 20]);
        let out = encode(&[Token::Address(&a), Token::Uint(7)]);
        assert_eq!(out.len(), 64);
        assert_eq!(&out[..12], &[0u8; 12]);
        assert_eq!(&out[12..32], a.as_bytes());
        assert_eq!(out[63], 7);
    }

    #[test]
    fn dynamic_bytes_have_offset_length_and_padding() {
        let a = Address([2u8; 20]);
        let out = encode(&[Token::Address(&a), Token::Uint(7), Token::Bytes(b"abc")]);
        // head (3 words) + length word + one padded data word
        assert_eq!(out.len(), 5 * 32);
        assert_eq!(out[95], 0x60, "offset points past the three head words");
        assert_eq!(out[127], 3, "length word");
        assert_eq!(&out[128..131], b"abc");
        assert!(out[131..].iter().all(|b| *b == 0));
    }

    #[test]
    fn empty_bytes_encode_only_length() {
        let a = Address([3u8; 20]);
        let out = encode(&[Token::Address(&a), Token::Uint(1), Token::Bytes(&[])]);
        assert_eq!(out.len(), 4 * 32);
    }

    #[test]
    fn exact_word_data_needs_no_padding() {
        let out = encode(&[Token::Bytes(&[9u8; 32])]);
        assert_eq!(out.len(), 3 * 32);
    }

    #[test]
    fn uint256_is_big_endian() {
        let w = uint256_word(Amount::from(258u64));
        assert_eq!(w[30], 1);
        assert_eq!(w[31], 2);
    }
}
