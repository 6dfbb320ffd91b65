//! # Mutation Receipts
//!
//! Every successful mutation returns a `Receipt`. Each mutable object owns
//! a `ReceiptBook` holding its address and a nonce that advances once per
//! issued receipt.
//!
//! ## Security Invariant
//!
//! `tx_hash` is `sha256(JCS({contract, nonce, operation, details}))`. It is
//! computed through `CanonicalBytes`, so any auditor replaying the same
//! mutation record obtains the same hash. The timestamp is metadata and is
//! not part of the hashed payload.
//!
//! Callers validate first, then issue the receipt, then apply the
//! mutation. Issuing is the last fallible step, so a canonicalization
//! failure leaves both the nonce and the object untouched.

use serde::{Deserialize, Serialize};

use crate::canonical::CanonicalBytes;
use crate::digest::{sha256_digest, ContentDigest};
use crate::error::TrexError;
use crate::identity::Address;
use crate::temporal::Timestamp;

/// Confirmation state of a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Finality {
    /// Recorded but awaiting host confirmation.
    Pending,
    /// Irreversible. In-process mutations are final immediately.
    Finalized,
}

/// Proof that one mutation was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// The mutated object.
    pub contract: Address,
    /// Per-object sequence number (0-indexed).
    pub nonce: u64,
    /// Operation name, e.g. `add_key`.
    pub operation: String,
    /// Content digest of the canonical mutation record.
    pub tx_hash: ContentDigest,
    /// When the receipt was issued.
    pub issued_at: Timestamp,
    /// Confirmation state.
    pub finality: Finality,
}

#[derive(Serialize)]
struct MutationRecord<'a, D: Serialize> {
    contract: &'a Address,
    nonce: u64,
    operation: &'a str,
    details: &'a D,
}

/// Receipt issuer owned by one mutable object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptBook {
    contract: Address,
    nonce: u64,
}

impl ReceiptBook {
    /// A fresh book for the object at `contract`.
    pub fn new(contract: Address) -> Self {
        Self { contract, nonce: 0 }
    }

    /// The owning object's address.
    pub fn contract(&self) -> Address {
        self.contract
    }

    /// The nonce the next receipt will carry.
    pub fn next_nonce(&self) -> u64 {
        self.nonce
    }

    /// Issue a receipt for `operation` with serializable `details`.
    ///
    /// The nonce advances only on success.
    pub fn issue<D: Serialize>(
        &mut self,
        operation: &str,
        details: &D,
    ) -> Result<Receipt, TrexError> {
        let record = MutationRecord {
            contract: &self.contract,
            nonce: self.nonce,
            operation,
            details,
        };
        let tx_hash = sha256_digest(&CanonicalBytes::new(&record)?);
        let receipt = Receipt {
            contract: self.contract,
            nonce: self.nonce,
            operation: operation.to_string(),
            tx_hash,
            issued_at: Timestamp::now(),
            finality: Finality::Finalized,
        };
        self.nonce += 1;
        Ok(receipt)
    }
}
