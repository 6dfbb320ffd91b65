//! # Token Gate Over the Full Stack
//!
//! A KYC-gated token: investors need a topic-7 claim from the trusted
//! issuer, receivers must be in an allowed country, and no wallet may hold
//! more than 100 units. Exercises verification, module vetoes, module
//! bookkeeping through notifications, and agent overrides together.

mod common;

use std::sync::Arc;

use common::{Stack, AGENT, OWNER};
use parking_lot::RwLock;
use serde_json::json;
use trex_compliance::{
    ComplianceEngine, CountryAllowModule, MaxBalanceModule, SharedComplianceEngine,
};
use trex_core::{Address, Amount, ComplianceConfig, CountryCode, EvaluationMode, TrexError};
use trex_crypto::{ClaimSigner, Secp256k1KeyPair};
use trex_identity::Claim;
use trex_token::{Token, TokenInfo};

const TOKEN: Address = Address([0x70; 20]);
const ENGINE: Address = Address([0xe0; 20]);
const COUNTRY_MODULE: Address = Address([0xc1; 20]);
const BALANCE_MODULE: Address = Address([0xc2; 20]);
const ISSUER_MGMT: Address = Address([0x1e; 20]);

const ALICE: Address = Address([0xa5; 20]); // US
const BOB: Address = Address([0xb0; 20]); // FR
const CAROL: Address = Address([0xc0; 20]); // DE, no claim yet

struct Fixture {
    stack: Stack,
    signer: ClaimSigner,
    issuer: Address,
    alice_claim: Claim,
    token: Token,
}

fn amt(n: u64) -> Amount {
    Amount::from(n)
}

fn fixture(mode: EvaluationMode) -> Fixture {
    let stack = Stack::new();
    let signer = ClaimSigner::Ecdsa(Secp256k1KeyPair::generate());
    let issuer = stack.deploy_issuer(ISSUER_MGMT, &signer);
    stack.require_topic(7);
    stack.trust(issuer, &[7]);

    let alice_id = stack.onboard(ALICE, 840);
    let alice_claim = stack.attach_claim(ALICE, alice_id, issuer, &signer, 7, b"kyc");
    let bob_id = stack.onboard(BOB, 250);
    stack.attach_claim(BOB, bob_id, issuer, &signer, 7, b"kyc");
    stack.onboard(CAROL, 276);

    let mut engine = ComplianceEngine::new(ENGINE, OWNER, ComplianceConfig { mode });
    engine
        .bind_token(&OWNER, TOKEN, Arc::new(stack.registry.clone()))
        .unwrap();
    engine
        .add_module(
            &OWNER,
            COUNTRY_MODULE,
            Box::new(CountryAllowModule::new([CountryCode(840), CountryCode(250)])),
        )
        .unwrap();
    engine
        .add_module(&OWNER, BALANCE_MODULE, Box::new(MaxBalanceModule::new(amt(100))))
        .unwrap();
    let engine: SharedComplianceEngine = Arc::new(RwLock::new(engine));

    let info = TokenInfo {
        name: "Gated Fund Share".into(),
        symbol: "GFS".into(),
        decimals: 0,
    };
    let mut token = Token::new(TOKEN, OWNER, info, stack.registry.clone(), engine);
    token.add_agent(&OWNER, AGENT).unwrap();

    Fixture {
        stack,
        signer,
        issuer,
        alice_claim,
        token,
    }
}

#[test]
fn verified_investors_trade_within_limits() {
    for mode in [EvaluationMode::Eager, EvaluationMode::ShortCircuit] {
        let mut f = fixture(mode);
        assert!(matches!(
            f.token.mint(&AGENT, &ALICE, amt(150)),
            Err(TrexError::TransferNotCompliant)
        ));
        f.token.mint(&AGENT, &ALICE, amt(80)).unwrap();
        f.token.transfer(&ALICE, &BOB, amt(30)).unwrap();
        assert_eq!(f.token.balance_of(&ALICE), amt(50));
        assert_eq!(f.token.balance_of(&BOB), amt(30));

        // The balance module learned Bob's 30 from the notification.
        assert!(matches!(
            f.token.mint(&AGENT, &BOB, amt(71)),
            Err(TrexError::TransferNotCompliant)
        ));
        f.token.mint(&AGENT, &BOB, amt(70)).unwrap();
        assert_eq!(f.token.total_supply(), amt(150));
    }
}

#[test]
fn unverified_then_disallowed_then_allowed_receiver() {
    let mut f = fixture(EvaluationMode::Eager);
    f.token.mint(&AGENT, &ALICE, amt(50)).unwrap();

    assert!(matches!(
        f.token.transfer(&ALICE, &CAROL, amt(10)),
        Err(TrexError::NotVerified { .. })
    ));

    let carol_id = f.stack.registry.read().identity(&CAROL).unwrap();
    f.stack
        .attach_claim(CAROL, carol_id, f.issuer, &f.signer, 7, b"kyc");
    assert!(matches!(
        f.token.transfer(&ALICE, &CAROL, amt(10)),
        Err(TrexError::TransferNotCompliant)
    ));

    let (out, _) = f
        .token
        .compliance()
        .write()
        .call_module_function(
            &OWNER,
            &json!({ "action": "add_allowed_country", "country": 276 }),
            &COUNTRY_MODULE,
        )
        .unwrap();
    assert_eq!(out, serde_json::Value::Null);
    f.token.transfer(&ALICE, &CAROL, amt(10)).unwrap();
    assert_eq!(f.token.balance_of(&CAROL), amt(10));
}

#[test]
fn revoked_claim_freezes_trading_but_not_agent_recovery() {
    let mut f = fixture(EvaluationMode::Eager);
    f.token.mint(&AGENT, &ALICE, amt(40)).unwrap();

    f.stack
        .directory
        .require(&f.issuer)
        .unwrap()
        .write()
        .revoke_claim_signature(&ISSUER_MGMT, &f.alice_claim.signature)
        .unwrap();

    assert!(matches!(
        f.token.transfer(&ALICE, &BOB, amt(1)),
        Err(TrexError::NotVerified { .. })
    ));
    f.token.forced_transfer(&AGENT, &ALICE, &BOB, amt(40)).unwrap();
    assert_eq!(f.token.balance_of(&BOB), amt(40));
    assert_eq!(f.token.balance_of(&ALICE), Amount::zero());
}

#[test]
fn removing_a_module_lifts_its_veto() {
    let mut f = fixture(EvaluationMode::ShortCircuit);
    assert!(matches!(
        f.token.mint(&AGENT, &ALICE, amt(101)),
        Err(TrexError::TransferNotCompliant)
    ));
    f.token
        .compliance()
        .write()
        .remove_module(&OWNER, &BALANCE_MODULE)
        .unwrap();
    assert_eq!(f.token.compliance().read().get_modules(), vec![COUNTRY_MODULE]);
    f.token.mint(&AGENT, &ALICE, amt(101)).unwrap();
}

#[test]
fn failed_operations_leave_state_untouched() {
    let mut f = fixture(EvaluationMode::Eager);
    f.token.mint(&AGENT, &ALICE, amt(20)).unwrap();
    f.token.freeze_partial_tokens(&AGENT, &ALICE, amt(15)).unwrap();

    assert!(f.token.transfer(&ALICE, &BOB, amt(6)).is_err());
    assert!(f.token.transfer(&ALICE, &CAROL, amt(1)).is_err());
    assert!(f.token.mint(&ALICE, &ALICE, amt(1)).is_err());
    assert!(f.token.burn(&AGENT, &BOB, amt(1)).is_err());

    assert_eq!(f.token.balance_of(&ALICE), amt(20));
    assert_eq!(f.token.frozen_tokens(&ALICE), amt(15));
    assert_eq!(f.token.balance_of(&BOB), Amount::zero());
    assert_eq!(f.token.total_supply(), amt(20));
}
