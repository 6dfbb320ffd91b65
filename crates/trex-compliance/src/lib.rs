//! # trex-compliance — Modular Transfer Compliance
//!
//! A [`ComplianceEngine`] holds an ordered list of [`ComplianceModule`]
//! trait objects and answers `can_transfer` as the AND of their checks.
//! After a token commits a transfer, mint, or burn, the engine forwards
//! the event so modules can keep their counters current.
//!
//! Built-in modules live in [`modules`]: country allow and restrict lists,
//! per-wallet balance cap, supply limit, and a sender/receiver allow list.
//!
//! ## Crate Policy
//!
//! - Depends on `trex-core` only. Investor countries arrive through the
//!   `InvestorCountry` trait supplied at token binding.
//! - `can_transfer` has no side effects in either evaluation mode.

pub mod engine;
pub mod module;
pub mod modules;

pub use engine::{ComplianceEngine, SharedComplianceEngine, MAX_MODULES};
pub use module::{decode_call, ComplianceModule, ModuleContext, NoCountries};
pub use modules::{
    CountryAllowModule, CountryRestrictModule, MaxBalanceModule, SupplyLimitModule,
    TransferRestrictModule,
};
