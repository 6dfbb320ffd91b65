//! Built-in compliance modules.
//!
//! Each module is configured through JSON payloads forwarded by
//! `ComplianceEngine::call_module_function`. Payloads are tagged by
//! `action`, e.g. `{"action": "add_allowed_country", "country": 840}`.
//! Amounts are `0x`-prefixed hex strings.

mod country_allow;
mod country_restrict;
mod max_balance;
mod supply_limit;
mod transfer_restrict;

pub use country_allow::CountryAllowModule;
pub use country_restrict::CountryRestrictModule;
pub use max_balance::MaxBalanceModule;
pub use supply_limit::SupplyLimitModule;
pub use transfer_restrict::TransferRestrictModule;
