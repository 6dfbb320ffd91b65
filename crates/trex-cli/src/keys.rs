//! # Key Subcommands
//!
//! Claim-signing key generation, claim signing, and signer recovery.
//!
//! ## Security Invariant
//!
//! Secret key material is held in `Zeroizing` buffers from the moment it is
//! read or generated until it is written out, and is never logged.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use zeroize::Zeroizing;

use trex_core::encoding::{from_hex, from_hex_fixed, to_hex, to_prefixed_hex};
use trex_core::{Address, Topic};
use trex_crypto::{claim_data_hash, get_recovered_address, recover_signer, ClaimSigner, SignatureScheme};
use trex_identity::Claim;

/// Arguments for `trex keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Signature scheme: `ecdsa` or `ed25519`.
    #[arg(long, default_value = "ecdsa")]
    pub scheme: SignatureScheme,
    /// Output directory for the key files.
    #[arg(long, short, default_value = ".")]
    pub output: PathBuf,
    /// File name prefix (writes `<prefix>.key` and `<prefix>.addr`).
    #[arg(long, default_value = "trex")]
    pub prefix: String,
}

/// Arguments for `trex sign-claim`.
#[derive(Args, Debug)]
pub struct SignClaimArgs {
    /// Path to the secret key file (hex-encoded 32 bytes).
    #[arg(long)]
    pub key: PathBuf,
    /// Signature scheme of the key.
    #[arg(long, default_value = "ecdsa")]
    pub scheme: SignatureScheme,
    /// Subject identity address the claim is about.
    #[arg(long)]
    pub identity: Address,
    /// Claim topic.
    #[arg(long)]
    pub topic: u64,
    /// Claim data, hex-encoded.
    #[arg(long, default_value = "")]
    pub data: String,
    /// Issuer identity address. When given, prints the full claim as JSON.
    #[arg(long)]
    pub issuer: Option<Address>,
    /// Off-chain reference stored with the claim.
    #[arg(long, default_value = "")]
    pub uri: String,
}

/// Arguments for `trex recover`.
#[derive(Args, Debug)]
pub struct RecoverArgs {
    /// Signature, hex-encoded.
    #[arg(long)]
    pub signature: String,
    /// Claim data hash the signature covers (32 bytes, hex).
    #[arg(long)]
    pub digest: String,
    /// Force a scheme instead of detecting it from the signature length.
    #[arg(long)]
    pub scheme: Option<SignatureScheme>,
}

/// Generate a claim-signing key and write it to `<prefix>.key` and
/// `<prefix>.addr`.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let (key_path, addr_path, address) = keygen(args.scheme, &args.output, &args.prefix)?;
    println!("OK: generated {:?} claim key", args.scheme);
    println!("  Secret key: {}", key_path.display());
    println!("  Address:    {}", addr_path.display());
    println!("  Signer address: {address}");
    Ok(0)
}

fn keygen(scheme: SignatureScheme, output_dir: &Path, prefix: &str) -> Result<(PathBuf, PathBuf, Address)> {
    std::fs::create_dir_all(output_dir).with_context(|| {
        format!("failed to create output directory: {}", output_dir.display())
    })?;
    let signer = ClaimSigner::generate(scheme)?;
    let secret_hex = Zeroizing::new(to_hex(signer.secret_bytes().as_slice()));
    let address = signer.address();

    let key_path = output_dir.join(format!("{prefix}.key"));
    let addr_path = output_dir.join(format!("{prefix}.addr"));
    std::fs::write(&key_path, secret_hex.as_bytes())
        .with_context(|| format!("failed to write secret key: {}", key_path.display()))?;
    std::fs::write(&addr_path, address.to_hex())
        .with_context(|| format!("failed to write address: {}", addr_path.display()))?;
    tracing::info!(scheme = scheme.code(), signer = %address, "claim key generated");
    Ok((key_path, addr_path, address))
}

/// Load a signer from a hex secret key file.
pub fn load_signer(path: &Path, scheme: SignatureScheme) -> Result<ClaimSigner> {
    if !path.exists() {
        bail!("secret key file not found: {}", path.display());
    }
    let raw = Zeroizing::new(
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read secret key: {}", path.display()))?,
    );
    let secret = Zeroizing::new(
        from_hex_fixed::<32>(raw.trim()).map_err(|e| anyhow::anyhow!("invalid secret key: {e}"))?,
    );
    Ok(ClaimSigner::from_secret_bytes(scheme, secret.as_slice())?)
}

/// Sign a claim and print the signature (or the claim as JSON).
pub fn run_sign_claim(args: &SignClaimArgs) -> Result<u8> {
    let signer = load_signer(&args.key, args.scheme)?;
    let data = from_hex(&args.data).map_err(|e| anyhow::anyhow!("invalid claim data: {e}"))?;
    let topic = Topic(args.topic);
    let signature = signer.sign_claim(&args.identity, topic, &data)?;
    tracing::debug!(subject = %args.identity, topic = args.topic, signer = %signer.address(), "claim signed");

    match args.issuer {
        Some(issuer) => {
            let claim = Claim {
                topic,
                scheme: args.scheme.code(),
                issuer,
                signature,
                data,
                uri: args.uri.clone(),
            };
            println!("{}", serde_json::to_string_pretty(&claim)?);
        }
        None => println!("{}", to_prefixed_hex(&signature)),
    }
    Ok(0)
}

/// Print the address a signature recovers to.
pub fn run_recover(args: &RecoverArgs) -> Result<u8> {
    let address = recover(&args.signature, &args.digest, args.scheme)?;
    println!("{address}");
    Ok(0)
}

fn recover(signature: &str, digest: &str, scheme: Option<SignatureScheme>) -> Result<Address> {
    let signature = from_hex(signature).map_err(|e| anyhow::anyhow!("invalid signature: {e}"))?;
    let digest = from_hex_fixed::<32>(digest).map_err(|e| anyhow::anyhow!("invalid digest: {e}"))?;
    let address = match scheme {
        Some(scheme) => recover_signer(scheme, &signature, &digest)?,
        None => get_recovered_address(&signature, &digest)?,
    };
    Ok(address)
}

/// The data hash `sign-claim` signs, for use with `recover`.
pub fn claim_digest_hex(identity: &Address, topic: u64, data: &[u8]) -> String {
    to_prefixed_hex(&claim_data_hash(identity, Topic(topic), data))
}
