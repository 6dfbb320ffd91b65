//! Hex encoding helpers shared by the identifier newtypes and the CLI.
//!
//! No external hex crate: identifiers render as lowercase `0x`-prefixed hex
//! and parse with or without the prefix.

/// Render bytes as lowercase hex without a prefix.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Render bytes as lowercase `0x`-prefixed hex.
pub fn to_prefixed_hex(bytes: &[u8]) -> String {
    format!("0x{}", to_hex(bytes))
}

/// Parse a hex string, with or without `0x`, into bytes.
pub fn from_hex(hex: &str) -> Result<Vec<u8>, String> {
    let hex = hex.trim();
    let hex = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    if hex.len() % 2 != 0 {
        return Err("hex string must have even length".to_string());
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .ok_or_else(|| format!("invalid hex at position {i}"))
                .and_then(|pair| {
                    u8::from_str_radix(pair, 16)
                        .map_err(|e| format!("invalid hex at position {i}: {e}"))
                })
        })
        .collect()
}

/// Parse hex into a fixed-width array, rejecting any other length.
pub fn from_hex_fixed<const N: usize>(hex: &str) -> Result<[u8; N], String> {
    let bytes = from_hex(hex)?;
    if bytes.len() != N {
        return Err(format!("expected {N} bytes, got {}", bytes.len()));
    }
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

/// Serde adapter rendering `Vec<u8>` fields as `0x`-prefixed hex strings.
///
/// Use with `#[serde(with = "trex_core::encoding::serde_hex")]`.
pub mod serde_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_prefixed_hex(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let hex = String::deserialize(deserializer)?;
        super::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// First four bytes as hex, for `Debug` output.
pub(crate) fn hex_prefix(bytes: &[u8]) -> String {
    bytes.iter().take(4).map(|b| format!("{b:02x}")).collect()
}
