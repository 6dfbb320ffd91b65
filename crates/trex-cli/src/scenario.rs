//! # Verify Subcommand
//!
//! Builds an in-memory identity directory and registry set from a YAML
//! scenario and reports `is_verified` for every investor wallet.
//!
//! ```yaml
//! config:
//!   compliance: { mode: short_circuit }
//! required_topics: [7]
//! issuers:
//!   - name: kyc
//!     scheme: ecdsa
//!     secret: 0x4c0883a6...   # claim-signing key, also the issuer's management key
//!     topics: [7]
//! investors:
//!   - wallet: 0x1111111111111111111111111111111111111111
//!     country: 840
//!     claims:
//!       - { issuer: kyc, topic: 7, data: 0x6b7963 }
//! ```
//!
//! A claim without an explicit `signature` is signed by its issuer's key.
//! Issuers with `trusted: false` get an identity but no registry entry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use parking_lot::RwLock;
use serde::Deserialize;
use zeroize::Zeroizing;

use trex_core::encoding::{from_hex, from_hex_fixed};
use trex_core::{keccak256, Address, CountryCode, StackConfig, Topic};
use trex_crypto::{ClaimSigner, SignatureScheme};
use trex_identity::{Claim, IdentityDirectory, NullDispatcher};
use trex_registry::{
    ClaimTopicsRegistry, IdentityRegistry, SharedIdentityRegistry, TrustedIssuersRegistry,
};

/// Arguments for `trex verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Scenario file (YAML or JSON).
    #[arg(long)]
    pub config: PathBuf,
    /// Print results as JSON.
    #[arg(long)]
    pub json: bool,
    /// Exit with status 1 unless every investor is verified.
    #[arg(long)]
    pub require_all: bool,
}

/// A verification scenario.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub config: StackConfig,
    #[serde(default)]
    pub required_topics: Vec<Topic>,
    #[serde(default)]
    pub issuers: Vec<IssuerSpec>,
    #[serde(default)]
    pub investors: Vec<InvestorSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssuerSpec {
    pub name: String,
    #[serde(default = "default_scheme")]
    pub scheme: SignatureScheme,
    /// Hex secret of the claim-signing key.
    pub secret: String,
    pub topics: Vec<Topic>,
    #[serde(default = "default_true")]
    pub trusted: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvestorSpec {
    pub wallet: Address,
    pub country: CountryCode,
    #[serde(default)]
    pub claims: Vec<ClaimSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClaimSpec {
    /// Issuer name from the `issuers` list.
    pub issuer: String,
    pub topic: Topic,
    #[serde(default)]
    pub data: String,
    /// Explicit signature; signed by the issuer's key when absent.
    #[serde(default)]
    pub signature: Option<String>,
}

fn default_scheme() -> SignatureScheme {
    SignatureScheme::Ecdsa
}

fn default_true() -> bool {
    true
}

/// One wallet's verification outcome.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Verdict {
    pub wallet: Address,
    pub identity: Address,
    pub verified: bool,
}

/// Address the CLI acts as when owning and operating registries.
fn operator() -> Address {
    Address::from_word(&keccak256(b"trex.cli.operator"))
}

fn derived_address(label: &str) -> Address {
    Address::from_word(&keccak256(format!("trex.cli.{label}").as_bytes()))
}

/// Parse a scenario from YAML (JSON is valid YAML).
pub fn parse_scenario(text: &str) -> Result<Scenario> {
    let scenario: Scenario = serde_yaml::from_str(text).context("failed to parse scenario")?;
    Ok(scenario)
}

/// Build the scenario and evaluate every investor.
pub fn evaluate(scenario: Scenario) -> Result<Vec<Verdict>> {
    let config = scenario
        .config
        .with_overrides(|var| std::env::var(var).ok())
        .context("invalid stack configuration")?;
    let op = operator();
    let directory = Arc::new(IdentityDirectory::new(config.identity, Arc::new(NullDispatcher))?);

    let mut topics = ClaimTopicsRegistry::new(derived_address("claim-topics"), op);
    for topic in &scenario.required_topics {
        topics.add_claim_topic(&op, *topic)?;
    }
    let mut trusted = TrustedIssuersRegistry::new(derived_address("trusted-issuers"), op);

    let mut issuers: BTreeMap<&str, (ClaimSigner, Address)> = BTreeMap::new();
    for spec in &scenario.issuers {
        if issuers.contains_key(spec.name.as_str()) {
            bail!("issuer {:?} defined twice", spec.name);
        }
        let secret = Zeroizing::new(
            from_hex_fixed::<32>(&spec.secret)
                .map_err(|e| anyhow::anyhow!("issuer {:?}: invalid secret: {e}", spec.name))?,
        );
        let signer = ClaimSigner::from_secret_bytes(spec.scheme, secret.as_slice())
            .with_context(|| format!("issuer {:?}", spec.name))?;
        let identity = directory.deploy_identity(&signer.address())?;
        if spec.trusted {
            trusted.add_trusted_issuer(&op, identity, spec.topics.clone())?;
        }
        tracing::info!(issuer = %spec.name, identity = %identity, signer = %signer.address(), "issuer deployed");
        issuers.insert(spec.name.as_str(), (signer, identity));
    }

    let mut registry = IdentityRegistry::new(
        derived_address("identity-registry"),
        op,
        Arc::new(RwLock::new(topics)),
        Arc::new(RwLock::new(trusted)),
        Arc::clone(&directory),
    );
    registry.add_agent(&op, op)?;

    for investor in &scenario.investors {
        let identity = directory.deploy_identity(&investor.wallet)?;
        let handle = directory.require(&identity)?;
        for spec in &investor.claims {
            let (signer, issuer) = issuers
                .get(spec.issuer.as_str())
                .with_context(|| format!("unknown issuer {:?}", spec.issuer))?;
            let data = from_hex(&spec.data).map_err(|e| anyhow::anyhow!("invalid claim data: {e}"))?;
            let signature = match &spec.signature {
                Some(sig) => from_hex(sig).map_err(|e| anyhow::anyhow!("invalid signature: {e}"))?,
                None => signer.sign_claim(&identity, spec.topic, &data)?,
            };
            let claim = Claim {
                topic: spec.topic,
                scheme: signer.scheme().code(),
                issuer: *issuer,
                signature,
                data,
                uri: String::new(),
            };
            handle.write().add_claim(&investor.wallet, claim)?;
        }
        registry.register_identity(&op, investor.wallet, identity, investor.country)?;
    }

    let registry = SharedIdentityRegistry::new(registry);
    let verdicts = scenario
        .investors
        .iter()
        .map(|investor| {
            let identity = registry.read().identity(&investor.wallet).unwrap_or_default();
            Verdict {
                wallet: investor.wallet,
                identity,
                verified: registry.is_verified(&investor.wallet),
            }
        })
        .collect();
    Ok(verdicts)
}

/// Execute `trex verify`.
pub fn run_verify(args: &VerifyArgs) -> Result<u8> {
    let path: &Path = &args.config;
    if !path.exists() {
        bail!("scenario file not found: {}", path.display());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario: {}", path.display()))?;
    let verdicts = evaluate(parse_scenario(&text)?)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&verdicts)?);
    } else {
        for v in &verdicts {
            let status = if v.verified { "verified" } else { "NOT verified" };
            println!("{}  {status}", v.wallet);
        }
    }
    let all = verdicts.iter().all(|v| v.verified);
    Ok(if args.require_all && !all { 1 } else { 0 })
}
