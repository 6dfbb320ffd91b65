//! # Trusted Issuers Registry
//!
//! Issuer identities trusted to attest claim topics. Each issuer appears
//! once with a non-empty topic set; adding an issuer that is already
//! present replaces its topic set.
//!
//! ## Limits
//!
//! At most [`MAX_TRUSTED_ISSUERS`] issuers and [`MAX_TOPICS_PER_ISSUER`]
//! topics per issuer. Violations fail `LimitExceeded`.

use serde::{Deserialize, Serialize};
use serde_json::json;
use trex_core::{AccessControl, Address, Receipt, ReceiptBook, Topic, TrexError};

/// Upper bound on trusted issuers.
pub const MAX_TRUSTED_ISSUERS: usize = 50;

/// Upper bound on topics per issuer.
pub const MAX_TOPICS_PER_ISSUER: usize = 15;

/// One trusted issuer and the topics it may attest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedIssuer {
    /// Issuer identity address.
    pub issuer: Address,
    /// Topics in the order they were given.
    pub topics: Vec<Topic>,
}

/// Trusted issuers in insertion order.
#[derive(Debug, Clone)]
pub struct TrustedIssuersRegistry {
    access: AccessControl,
    issuers: Vec<TrustedIssuer>,
    receipts: ReceiptBook,
}

impl TrustedIssuersRegistry {
    /// An empty registry at `address`, owned by `owner`.
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            access: AccessControl::new(owner),
            issuers: Vec::new(),
            receipts: ReceiptBook::new(address),
        }
    }

    pub fn address(&self) -> Address {
        self.receipts.contract()
    }

    pub fn owner(&self) -> Address {
        self.access.owner()
    }

    fn position(&self, issuer: &Address) -> Option<usize> {
        self.issuers.iter().position(|t| t.issuer == *issuer)
    }

    fn check_topics(topics: &[Topic]) -> Result<(), TrexError> {
        if topics.is_empty() {
            return Err(TrexError::InvalidInput(
                "trusted issuer needs at least one claim topic".into(),
            ));
        }
        if topics.len() > MAX_TOPICS_PER_ISSUER {
            return Err(TrexError::LimitExceeded {
                what: "claim topics per issuer".into(),
                limit: MAX_TOPICS_PER_ISSUER,
            });
        }
        for (i, topic) in topics.iter().enumerate() {
            if topics[..i].contains(topic) {
                return Err(TrexError::InvalidInput(format!(
                    "claim topic {topic} listed twice"
                )));
            }
        }
        Ok(())
    }

    /// Trust `issuer` for `topics`. An issuer already present keeps its
    /// position and has its topic set replaced.
    pub fn add_trusted_issuer(
        &mut self,
        caller: &Address,
        issuer: Address,
        topics: Vec<Topic>,
    ) -> Result<Receipt, TrexError> {
        self.access.require_owner(caller)?;
        if issuer.is_zero() {
            return Err(TrexError::InvalidInput("issuer cannot be the zero address".into()));
        }
        Self::check_topics(&topics)?;
        let existing = self.position(&issuer);
        if existing.is_none() && self.issuers.len() >= MAX_TRUSTED_ISSUERS {
            return Err(TrexError::LimitExceeded {
                what: "trusted issuers".into(),
                limit: MAX_TRUSTED_ISSUERS,
            });
        }
        let receipt = self.receipts.issue(
            "add_trusted_issuer",
            &json!({ "issuer": issuer, "topics": topics }),
        )?;
        match existing {
            Some(pos) => {
                tracing::info!(registry = %self.address(), issuer = %issuer, topics = topics.len(), "trusted issuer topics replaced");
                self.issuers[pos].topics = topics;
            }
            None => {
                tracing::info!(registry = %self.address(), issuer = %issuer, topics = topics.len(), "issuer trusted");
                self.issuers.push(TrustedIssuer { issuer, topics });
            }
        }
        Ok(receipt)
    }

    /// Stop trusting `issuer`.
    pub fn remove_trusted_issuer(
        &mut self,
        caller: &Address,
        issuer: &Address,
    ) -> Result<Receipt, TrexError> {
        self.access.require_owner(caller)?;
        let pos = self
            .position(issuer)
            .ok_or_else(|| TrexError::not_found(format!("trusted issuer {issuer}")))?;
        let receipt = self
            .receipts
            .issue("remove_trusted_issuer", &json!({ "issuer": issuer }))?;
        self.issuers.remove(pos);
        tracing::info!(registry = %self.address(), issuer = %issuer, "issuer no longer trusted");
        Ok(receipt)
    }

    /// Replace the topic set of an issuer already present.
    pub fn update_issuer_claim_topics(
        &mut self,
        caller: &Address,
        issuer: &Address,
        topics: Vec<Topic>,
    ) -> Result<Receipt, TrexError> {
        self.access.require_owner(caller)?;
        let pos = self
            .position(issuer)
            .ok_or_else(|| TrexError::not_found(format!("trusted issuer {issuer}")))?;
        Self::check_topics(&topics)?;
        let receipt = self.receipts.issue(
            "update_issuer_claim_topics",
            &json!({ "issuer": issuer, "topics": topics }),
        )?;
        tracing::info!(registry = %self.address(), issuer = %issuer, topics = topics.len(), "issuer topics updated");
        self.issuers[pos].topics = topics;
        Ok(receipt)
    }

    /// All trusted issuers in insertion order.
    pub fn get_trusted_issuers(&self) -> Vec<Address> {
        self.issuers.iter().map(|t| t.issuer).collect()
    }

    /// Issuers trusted for `topic`, in insertion order.
    pub fn get_trusted_issuers_for_claim_topic(&self, topic: Topic) -> Vec<Address> {
        self.issuers
            .iter()
            .filter(|t| t.topics.contains(&topic))
            .map(|t| t.issuer)
            .collect()
    }

    pub fn is_trusted_issuer(&self, issuer: &Address) -> bool {
        self.position(issuer).is_some()
    }

    /// Topics `issuer` is trusted for; empty if not trusted.
    pub fn get_trusted_issuer_claim_topics(&self, issuer: &Address) -> Vec<Topic> {
        self.position(issuer)
            .map(|pos| self.issuers[pos].topics.clone())
            .unwrap_or_default()
    }

    /// Whether `issuer` is trusted for `topic`.
    pub fn has_claim_topic(&self, issuer: &Address, topic: Topic) -> bool {
        self.issuers
            .iter()
            .any(|t| t.issuer == *issuer && t.topics.contains(&topic))
    }

    /// Full entries, for inspection.
    pub fn entries(&self) -> &[TrustedIssuer] {
        &self.issuers
    }

    /// Hand the registry to `new_owner`.
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<Receipt, TrexError> {
        self.access.check_transfer_ownership(caller, &new_owner)?;
        let receipt = self
            .receipts
            .issue("transfer_ownership", &json!({ "new_owner": new_owner }))?;
        self.access.transfer_ownership(caller, new_owner)?;
        tracing::info!(registry = %self.address(), owner = %new_owner, "ownership transferred");
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: Address = Address([0x71; 20]);
    const OWNER: Address = Address([1; 20]);

    fn issuer(n: u8) -> Address {
        Address([n; 20])
    }

    fn topics(ts: &[u64]) -> Vec<Topic> {
        ts.iter().copied().map(Topic).collect()
    }

    fn registry() -> TrustedIssuersRegistry {
        TrustedIssuersRegistry::new(REGISTRY, OWNER)
    }

    #[test]
    fn add_overwrites_topics_in_place() {
        let mut reg = registry();
        reg.add_trusted_issuer(&OWNER, issuer(10), topics(&[1, 2])).unwrap();
        reg.add_trusted_issuer(&OWNER, issuer(11), topics(&[2])).unwrap();
        reg.add_trusted_issuer(&OWNER, issuer(10), topics(&[3])).unwrap();
        assert_eq!(reg.get_trusted_issuers(), vec![issuer(10), issuer(11)]);
        assert_eq!(reg.get_trusted_issuer_claim_topics(&issuer(10)), topics(&[3]));
        assert!(!reg.has_claim_topic(&issuer(10), Topic(1)));
    }

    #[test]
    fn issuers_for_topic_in_insertion_order() {
        let mut reg = registry();
        reg.add_trusted_issuer(&OWNER, issuer(12), topics(&[7])).unwrap();
        reg.add_trusted_issuer(&OWNER, issuer(10), topics(&[8])).unwrap();
        reg.add_trusted_issuer(&OWNER, issuer(11), topics(&[8, 7])).unwrap();
        assert_eq!(
            reg.get_trusted_issuers_for_claim_topic(Topic(7)),
            vec![issuer(12), issuer(11)]
        );
        assert!(reg.get_trusted_issuers_for_claim_topic(Topic(9)).is_empty());
    }

    #[test]
    fn invalid_topic_sets_rejected() {
        let mut reg = registry();
        assert!(matches!(
            reg.add_trusted_issuer(&OWNER, issuer(10), vec![]),
            Err(TrexError::InvalidInput(_))
        ));
        assert!(matches!(
            reg.add_trusted_issuer(&OWNER, issuer(10), topics(&[1, 1])),
            Err(TrexError::InvalidInput(_))
        ));
        let too_many: Vec<Topic> = (0..16).map(Topic).collect();
        assert!(matches!(
            reg.add_trusted_issuer(&OWNER, issuer(10), too_many),
            Err(TrexError::LimitExceeded { limit: 15, .. })
        ));
        assert!(matches!(
            reg.add_trusted_issuer(&OWNER, Address::ZERO, topics(&[1])),
            Err(TrexError::InvalidInput(_))
        ));
        assert!(reg.get_trusted_issuers().is_empty());
    }

    #[test]
    fn issuer_limit_allows_overwrite_when_full() {
        let mut reg = registry();
        for n in 0..MAX_TRUSTED_ISSUERS as u8 {
            reg.add_trusted_issuer(&OWNER, issuer(n + 1), topics(&[1])).unwrap();
        }
        assert!(matches!(
            reg.add_trusted_issuer(&OWNER, issuer(200), topics(&[1])),
            Err(TrexError::LimitExceeded { limit: 50, .. })
        ));
        reg.add_trusted_issuer(&OWNER, issuer(1), topics(&[2])).unwrap();
    }

    #[test]
    fn remove_and_update_require_presence() {
        let mut reg = registry();
        assert!(matches!(
            reg.remove_trusted_issuer(&OWNER, &issuer(10)),
            Err(TrexError::NotFound { .. })
        ));
        assert!(matches!(
            reg.update_issuer_claim_topics(&OWNER, &issuer(10), topics(&[1])),
            Err(TrexError::NotFound { .. })
        ));
        reg.add_trusted_issuer(&OWNER, issuer(10), topics(&[1])).unwrap();
        reg.update_issuer_claim_topics(&OWNER, &issuer(10), topics(&[4, 5])).unwrap();
        assert!(reg.has_claim_topic(&issuer(10), Topic(5)));
        reg.remove_trusted_issuer(&OWNER, &issuer(10)).unwrap();
        assert!(!reg.is_trusted_issuer(&issuer(10)));
        assert!(reg.get_trusted_issuer_claim_topics(&issuer(10)).is_empty());
    }

    #[test]
    fn owner_gated() {
        let mut reg = registry();
        assert!(matches!(
            reg.add_trusted_issuer(&issuer(3), issuer(10), topics(&[1])),
            Err(TrexError::Unauthorized { .. })
        ));
    }
}
