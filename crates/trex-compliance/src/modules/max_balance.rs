//! Receiver's balance after a transfer or mint must stay within a cap.
//!
//! Balances are tracked from post-commit notifications, so the module must
//! be added before the first mint or preset with `preset_balance`.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{json, Value};
use trex_core::{Address, Amount, TrexError};

use crate::module::{decode_call, ComplianceModule, ModuleContext};

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum MaxBalanceCall {
    SetMaxBalance { max: Amount },
    PresetBalance { wallet: Address, balance: Amount },
    GetBalance { wallet: Address },
    GetMaxBalance,
}

/// Caps the balance any single wallet may hold.
#[derive(Debug, Clone)]
pub struct MaxBalanceModule {
    max: Amount,
    balances: HashMap<Address, Amount>,
}

impl MaxBalanceModule {
    pub fn new(max: Amount) -> Self {
        Self {
            max,
            balances: HashMap::new(),
        }
    }

    pub fn max_balance(&self) -> Amount {
        self.max
    }

    /// Tracked balance of `wallet`.
    pub fn balance(&self, wallet: &Address) -> Amount {
        self.balances.get(wallet).copied().unwrap_or_default()
    }

    fn credit(&mut self, wallet: &Address, amount: Amount) {
        let entry = self.balances.entry(*wallet).or_default();
        *entry = entry.saturating_add(amount);
    }

    fn debit(&mut self, wallet: &Address, amount: Amount) {
        if let Some(entry) = self.balances.get_mut(wallet) {
            *entry = entry.saturating_sub(amount);
            if entry.is_zero() {
                self.balances.remove(wallet);
            }
        }
    }
}

impl ComplianceModule for MaxBalanceModule {
    fn name(&self) -> &'static str {
        "max_balance"
    }

    fn module_check(
        &self,
        _ctx: &ModuleContext<'_>,
        _from: &Address,
        to: &Address,
        amount: Amount,
    ) -> bool {
        self.balance(to)
            .checked_add(amount)
            .is_some_and(|after| after <= self.max)
    }

    fn module_transfer_action(
        &mut self,
        _ctx: &ModuleContext<'_>,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TrexError> {
        self.debit(from, amount);
        self.credit(to, amount);
        Ok(())
    }

    fn module_mint_action(
        &mut self,
        _ctx: &ModuleContext<'_>,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TrexError> {
        self.credit(to, amount);
        Ok(())
    }

    fn module_burn_action(
        &mut self,
        _ctx: &ModuleContext<'_>,
        from: &Address,
        amount: Amount,
    ) -> Result<(), TrexError> {
        self.debit(from, amount);
        Ok(())
    }

    fn call(&mut self, payload: &Value) -> Result<Value, TrexError> {
        match decode_call(self.name(), payload)? {
            MaxBalanceCall::SetMaxBalance { max } => {
                self.max = max;
                tracing::info!(max = %max, "max balance set");
            }
            MaxBalanceCall::PresetBalance { wallet, balance } => {
                if balance.is_zero() {
                    self.balances.remove(&wallet);
                } else {
                    self.balances.insert(wallet, balance);
                }
                tracing::info!(wallet = %wallet, balance = %balance, "balance preset");
            }
            MaxBalanceCall::GetBalance { wallet } => {
                return Ok(json!({ "balance": self.balance(&wallet) }));
            }
            MaxBalanceCall::GetMaxBalance => {
                return Ok(json!({ "max": self.max }));
            }
        }
        Ok(Value::Null)
    }
}
