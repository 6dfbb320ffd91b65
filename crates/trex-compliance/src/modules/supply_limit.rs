//! Minting must not push total supply past a limit.

use serde::Deserialize;
use serde_json::{json, Value};
use trex_core::{Address, Amount, TrexError};

use crate::module::{decode_call, ComplianceModule, ModuleContext};

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum SupplyLimitCall {
    SetSupplyLimit { limit: Amount },
    PresetSupply { supply: Amount },
    GetSupplyLimit,
}

/// Caps total supply. Supply is tracked from mint and burn notifications.
#[derive(Debug, Clone)]
pub struct SupplyLimitModule {
    limit: Amount,
    supply: Amount,
}

impl SupplyLimitModule {
    pub fn new(limit: Amount) -> Self {
        Self {
            limit,
            supply: Amount::zero(),
        }
    }

    pub fn limit(&self) -> Amount {
        self.limit
    }

    pub fn supply(&self) -> Amount {
        self.supply
    }
}

impl ComplianceModule for SupplyLimitModule {
    fn name(&self) -> &'static str {
        "supply_limit"
    }

    fn module_check(
        &self,
        _ctx: &ModuleContext<'_>,
        from: &Address,
        _to: &Address,
        amount: Amount,
    ) -> bool {
        if !from.is_zero() {
            return true;
        }
        self.supply
            .checked_add(amount)
            .is_some_and(|after| after <= self.limit)
    }

    fn module_mint_action(
        &mut self,
        _ctx: &ModuleContext<'_>,
        _to: &Address,
        amount: Amount,
    ) -> Result<(), TrexError> {
        self.supply = self.supply.saturating_add(amount);
        Ok(())
    }

    fn module_burn_action(
        &mut self,
        _ctx: &ModuleContext<'_>,
        _from: &Address,
        amount: Amount,
    ) -> Result<(), TrexError> {
        self.supply = self.supply.saturating_sub(amount);
        Ok(())
    }

    fn call(&mut self, payload: &Value) -> Result<Value, TrexError> {
        match decode_call(self.name(), payload)? {
            SupplyLimitCall::SetSupplyLimit { limit } => {
                self.limit = limit;
                tracing::info!(limit = %limit, "supply limit set");
            }
            SupplyLimitCall::PresetSupply { supply } => {
                self.supply = supply;
                tracing::info!(supply = %supply, "supply preset");
            }
            SupplyLimitCall::GetSupplyLimit => {
                return Ok(json!({ "limit": self.limit, "supply": self.supply }));
            }
        }
        Ok(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::NoCountries;

    fn ctx() -> ModuleContext<'static> {
        ModuleContext {
            token: None,
            countries: &NoCountries,
        }
    }

    #[test]
    fn only_mints_are_limited() {
        let mut m = SupplyLimitModule::new(Amount::from(100u64));
        m.module_mint_action(&ctx(), &Address([1; 20]), Amount::from(90u64)).unwrap();
        assert!(m.module_check(&ctx(), &Address::ZERO, &Address([1; 20]), Amount::from(10u64)));
        assert!(!m.module_check(&ctx(), &Address::ZERO, &Address([1; 20]), Amount::from(11u64)));
        assert!(m.module_check(&ctx(), &Address([1; 20]), &Address([2; 20]), Amount::from(500u64)));
    }

    #[test]
    fn burn_frees_headroom() {
        let mut m = SupplyLimitModule::new(Amount::from(100u64));
        m.module_mint_action(&ctx(), &Address([1; 20]), Amount::from(100u64)).unwrap();
        m.module_burn_action(&ctx(), &Address([1; 20]), Amount::from(40u64)).unwrap();
        assert_eq!(m.supply(), Amount::from(60u64));
        let out = m.call(&json!({ "action": "get_supply_limit" })).unwrap();
        assert_eq!(out["supply"], json!(Amount::from(60u64)));
    }
}
