//! # Compliance Module Interface
//!
//! A compliance module answers one question per transfer ("may this move
//! happen?") and may keep counters updated by post-commit notifications.
//! Modules are trait objects held by the [`ComplianceEngine`] in
//! registration order.
//!
//! Mints are presented to `module_check` as transfers from the zero
//! address.
//!
//! [`ComplianceEngine`]: crate::engine::ComplianceEngine

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use trex_core::{Address, Amount, CountryCode, InvestorCountry, TrexError};

/// What a module can see while checking or being notified.
pub struct ModuleContext<'a> {
    /// The bound token, if any.
    pub token: Option<Address>,
    /// Country lookup supplied when the token was bound.
    pub countries: &'a dyn InvestorCountry,
}

impl ModuleContext<'_> {
    /// Country of `wallet`, if registered.
    pub fn country_of(&self, wallet: &Address) -> Option<CountryCode> {
        self.countries.investor_country(wallet)
    }
}

impl fmt::Debug for ModuleContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// Country lookup used before any token is bound: every wallet is unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCountries;

impl InvestorCountry for NoCountries {
    fn investor_country(&self, _: &Address) -> Option<CountryCode> {
        None
    }
}

/// A pluggable transfer rule.
///
/// Implementations must be `Send + Sync` so the engine can sit behind a
/// shared lock. The trait is object-safe.
pub trait ComplianceModule: Send + Sync + fmt::Debug {
    /// Stable module name, for logs.
    fn name(&self) -> &'static str;

    /// Whether moving `amount` from `from` to `to` is allowed.
    fn module_check(
        &self,
        ctx: &ModuleContext<'_>,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> bool;

    /// Called after a transfer was committed.
    fn module_transfer_action(
        &mut self,
        _ctx: &ModuleContext<'_>,
        _from: &Address,
        _to: &Address,
        _amount: Amount,
    ) -> Result<(), TrexError> {
        Ok(())
    }

    /// Called after a mint was committed.
    fn module_mint_action(
        &mut self,
        _ctx: &ModuleContext<'_>,
        _to: &Address,
        _amount: Amount,
    ) -> Result<(), TrexError> {
        Ok(())
    }

    /// Called after a burn was committed.
    fn module_burn_action(
        &mut self,
        _ctx: &ModuleContext<'_>,
        _from: &Address,
        _amount: Amount,
    ) -> Result<(), TrexError> {
        Ok(())
    }

    /// Handle an owner-forwarded configuration call. Returns the call's
    /// result, `null` for pure setters.
    fn call(&mut self, payload: &Value) -> Result<Value, TrexError>;
}

/// Decode a module call payload into the module's call enum.
pub fn decode_call<T: DeserializeOwned>(module: &str, payload: &Value) -> Result<T, TrexError> {
    T::deserialize(payload)
        .map_err(|e| TrexError::ModuleCall(format!("{module}: {e}")))
}
