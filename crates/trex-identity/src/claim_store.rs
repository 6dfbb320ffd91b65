//! # Claim Store
//!
//! Signed attestations held by a subject identity. A claim is keyed by
//! `ClaimId::derive(issuer, topic)`, so a subject holds at most one claim
//! per (issuer, topic); storing again replaces the previous claim.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use trex_core::encoding::serde_hex;
use trex_core::{Address, ClaimId, Topic, TrexError};

/// A signed attestation about the subject identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Category of the attestation.
    pub topic: Topic,
    /// Signature scheme code (1 ECDSA, 2 RSA, 3 contract, 4 Ed25519).
    pub scheme: u64,
    /// Identity address of the issuer.
    pub issuer: Address,
    /// Issuer's signature over `claim_data_hash(subject, topic, data)`.
    #[serde(with = "serde_hex")]
    pub signature: Vec<u8>,
    /// Claim payload, opaque to the core.
    #[serde(with = "serde_hex")]
    pub data: Vec<u8>,
    /// Off-chain reference.
    #[serde(default)]
    pub uri: String,
}

impl Claim {
    /// The identifier this claim is stored under.
    pub fn id(&self) -> ClaimId {
        ClaimId::derive(&self.issuer, self.topic)
    }
}

/// Claims of one subject, indexed by id and by topic.
#[derive(Debug, Clone, Default)]
pub struct ClaimStore {
    claims: HashMap<ClaimId, Claim>,
    by_topic: BTreeMap<Topic, Vec<ClaimId>>,
}

impl ClaimStore {
    /// Store a claim, replacing any claim with the same id.
    /// Returns the id and whether a previous claim was replaced.
    pub fn insert(&mut self, claim: Claim) -> (ClaimId, bool) {
        let id = claim.id();
        let topic = claim.topic;
        let replaced = self.claims.insert(id, claim).is_some();
        if !replaced {
            self.by_topic.entry(topic).or_default().push(id);
        }
        (id, replaced)
    }

    /// Validate removing a claim.
    pub fn check_remove(&self, id: &ClaimId) -> Result<(), TrexError> {
        if self.claims.contains_key(id) {
            Ok(())
        } else {
            Err(TrexError::not_found(format!("claim {id}")))
        }
    }

    /// Remove a claim. Call `check_remove` first.
    pub fn remove(&mut self, id: &ClaimId) -> Option<Claim> {
        let claim = self.claims.remove(id)?;
        if let Some(ids) = self.by_topic.get_mut(&claim.topic) {
            ids.retain(|c| c != id);
            if ids.is_empty() {
                self.by_topic.remove(&claim.topic);
            }
        }
        Some(claim)
    }

    /// The claim, if present.
    pub fn get(&self, id: &ClaimId) -> Option<&Claim> {
        self.claims.get(id)
    }

    /// Claim ids for `topic`, in insertion order.
    pub fn ids_by_topic(&self, topic: Topic) -> Vec<ClaimId> {
        self.by_topic.get(&topic).cloned().unwrap_or_default()
    }

    /// The stored claim for `topic` carrying exactly `signature` and `data`.
    pub fn find(&self, topic: Topic, signature: &[u8], data: &[u8]) -> Option<&Claim> {
        self.by_topic
            .get(&topic)?
            .iter()
            .filter_map(|id| self.claims.get(id))
            .find(|c| c.signature == signature && c.data == data)
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(issuer: u8, topic: u64, sig: u8) -> Claim {
        Claim {
            topic: Topic(topic),
            scheme: 1,
            issuer: Address([issuer; 20]),
            signature: vec![sig; 65],
            data: b"payload".to_vec(),
            uri: String::new(),
        }
    }

    #[test]
    fn readding_replaces() {
        let mut store = ClaimStore::default();
        let (id, replaced) = store.insert(claim(1, 7, 0xaa));
        assert!(!replaced);
        let (id2, replaced) = store.insert(claim(1, 7, 0xbb));
        assert_eq!(id, id2);
        assert!(replaced);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().signature, vec![0xbb; 65]);
        assert_eq!(store.ids_by_topic(Topic(7)), vec![id]);
    }

    #[test]
    fn one_claim_per_issuer_per_topic() {
        let mut store = ClaimStore::default();
        store.insert(claim(1, 7, 1));
        store.insert(claim(2, 7, 2));
        store.insert(claim(1, 8, 3));
        assert_eq!(store.ids_by_topic(Topic(7)).len(), 2);
        assert_eq!(store.ids_by_topic(Topic(8)).len(), 1);
    }

    #[test]
    fn remove_and_not_found() {
        let mut store = ClaimStore::default();
        let (id, _) = store.insert(claim(1, 7, 1));
        store.check_remove(&id).unwrap();
        assert!(store.remove(&id).is_some());
        assert!(store.ids_by_topic(Topic(7)).is_empty());
        assert!(matches!(store.check_remove(&id), Err(TrexError::NotFound { .. })));
    }

    #[test]
    fn find_matches_signature_and_data() {
        let mut store = ClaimStore::default();
        store.insert(claim(1, 7, 0xaa));
        assert!(store.find(Topic(7), &[0xaa; 65], b"payload").is_some());
        assert!(store.find(Topic(7), &[0xab; 65], b"payload").is_none());
        assert!(store.find(Topic(7), &[0xaa; 65], b"other").is_none());
        assert!(store.find(Topic(9), &[0xaa; 65], b"payload").is_none());
    }

    #[test]
    fn claim_json_uses_hex() {
        let json = serde_json::to_value(claim(1, 7, 0xaa)).unwrap();
        assert!(json["signature"].as_str().unwrap().starts_with("0xaaaa"));
        assert_eq!(json["topic"], 7);
    }
}
