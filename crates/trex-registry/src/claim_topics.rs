//! # Claim Topics Registry
//!
//! The ordered set of claim topics an investor identity must satisfy to be
//! verified. Owner-mutable; at most [`MAX_CLAIM_TOPICS`] entries.

use serde_json::json;
use trex_core::{AccessControl, Address, Receipt, ReceiptBook, Topic, TrexError};

/// Upper bound on required topics.
pub const MAX_CLAIM_TOPICS: usize = 15;

/// Required claim topics, in insertion order.
#[derive(Debug, Clone)]
pub struct ClaimTopicsRegistry {
    access: AccessControl,
    topics: Vec<Topic>,
    receipts: ReceiptBook,
}

impl ClaimTopicsRegistry {
    /// An empty registry at `address`, owned by `owner`.
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            access: AccessControl::new(owner),
            topics: Vec::new(),
            receipts: ReceiptBook::new(address),
        }
    }

    /// The registry's address.
    pub fn address(&self) -> Address {
        self.receipts.contract()
    }

    pub fn owner(&self) -> Address {
        self.access.owner()
    }

    /// Require `topic` for verification.
    pub fn add_claim_topic(&mut self, caller: &Address, topic: Topic) -> Result<Receipt, TrexError> {
        self.access.require_owner(caller)?;
        if self.topics.contains(&topic) {
            return Err(TrexError::already_exists(format!("claim topic {topic}")));
        }
        if self.topics.len() >= MAX_CLAIM_TOPICS {
            return Err(TrexError::LimitExceeded {
                what: "claim topics".into(),
                limit: MAX_CLAIM_TOPICS,
            });
        }
        let receipt = self
            .receipts
            .issue("add_claim_topic", &json!({ "topic": topic }))?;
        self.topics.push(topic);
        tracing::info!(registry = %self.address(), topic = topic.value(), "claim topic required");
        Ok(receipt)
    }

    /// Stop requiring `topic`.
    pub fn remove_claim_topic(
        &mut self,
        caller: &Address,
        topic: Topic,
    ) -> Result<Receipt, TrexError> {
        self.access.require_owner(caller)?;
        let Some(pos) = self.topics.iter().position(|t| *t == topic) else {
            return Err(TrexError::not_found(format!("claim topic {topic}")));
        };
        let receipt = self
            .receipts
            .issue("remove_claim_topic", &json!({ "topic": topic }))?;
        self.topics.remove(pos);
        tracing::info!(registry = %self.address(), topic = topic.value(), "claim topic dropped");
        Ok(receipt)
    }

    /// Required topics in insertion order.
    pub fn get_claim_topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn contains(&self, topic: Topic) -> bool {
        self.topics.contains(&topic)
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
