//! Shared fixture: an identity directory wired to the three registries.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::RwLock;
use trex_core::{Address, CountryCode, IdentityPolicy, KeyId, KeyPurpose, KeyType, Topic};
use trex_crypto::ClaimSigner;
use trex_identity::{Claim, IdentityDirectory, NullDispatcher};
use trex_registry::{
    ClaimTopicsRegistry, IdentityRegistry, SharedClaimTopics, SharedIdentityRegistry,
    SharedTrustedIssuers, TrustedIssuersRegistry,
};

pub const OWNER: Address = Address([0x01; 20]);
pub const AGENT: Address = Address([0x02; 20]);

pub struct Stack {
    pub directory: Arc<IdentityDirectory>,
    pub topics: SharedClaimTopics,
    pub issuers: SharedTrustedIssuers,
    pub registry: SharedIdentityRegistry,
}

impl Stack {
    pub fn new() -> Self {
        Self::with_policy(IdentityPolicy::default())
    }

    pub fn with_policy(policy: IdentityPolicy) -> Self {
        let directory = Arc::new(IdentityDirectory::new(policy, Arc::new(NullDispatcher)).unwrap());
        let topics = Arc::new(RwLock::new(ClaimTopicsRegistry::new(Address([0xa0; 20]), OWNER)));
        let issuers = Arc::new(RwLock::new(TrustedIssuersRegistry::new(Address([0xa1; 20]), OWNER)));
        let mut registry = IdentityRegistry::new(
            Address([0xa2; 20]),
            OWNER,
            Arc::clone(&topics),
            Arc::clone(&issuers),
            Arc::clone(&directory),
        );
        registry.add_agent(&OWNER, AGENT).unwrap();
        Self {
            directory,
            topics,
            issuers,
            registry: SharedIdentityRegistry::new(registry),
        }
    }

    /// Deploy an issuer identity managed by `management` whose CLAIM key is
    /// `signer`. Not yet trusted.
    pub fn deploy_issuer(&self, management: Address, signer: &ClaimSigner) -> Address {
        let issuer = self.directory.deploy_identity(&management).unwrap();
        self.directory
            .require(&issuer)
            .unwrap()
            .write()
            .add_key(
                &management,
                KeyId::from_address(&signer.address()),
                [KeyPurpose::Claim].into_iter().collect(),
                KeyType::Ecdsa,
            )
            .unwrap();
        issuer
    }

    pub fn require_topic(&self, topic: u64) {
        self.topics.write().add_claim_topic(&OWNER, Topic(topic)).unwrap();
    }

    pub fn trust(&self, issuer: Address, topics: &[u64]) {
        self.issuers
            .write()
            .add_trusted_issuer(&OWNER, issuer, topics.iter().copied().map(Topic).collect())
            .unwrap();
    }

    /// Deploy an identity managed by `wallet` and register it.
    pub fn onboard(&self, wallet: Address, country: u16) -> Address {
        let identity = self.directory.deploy_identity(&wallet).unwrap();
        self.registry
            .write()
            .register_identity(&AGENT, wallet, identity, CountryCode(country))
            .unwrap();
        identity
    }

    /// Sign `(identity, topic, data)` with `signer` and store it on the
    /// identity as a claim from `issuer`, acting as `wallet`.
    pub fn attach_claim(
        &self,
        wallet: Address,
        identity: Address,
        issuer: Address,
        signer: &ClaimSigner,
        topic: u64,
        data: &[u8],
    ) -> Claim {
        let claim = Claim {
            topic: Topic(topic),
            scheme: signer.scheme().code(),
            issuer,
            signature: signer.sign_claim(&identity, Topic(topic), data).unwrap(),
            data: data.to_vec(),
            uri: String::new(),
        };
        self.store_claim(wallet, identity, claim.clone());
        claim
    }

    pub fn store_claim(&self, wallet: Address, identity: Address, claim: Claim) {
        self.directory
            .require(&identity)
            .unwrap()
            .write()
            .add_claim(&wallet, claim)
            .unwrap();
    }

    pub fn is_verified(&self, wallet: &Address) -> bool {
        self.registry.is_verified(wallet)
    }
}
