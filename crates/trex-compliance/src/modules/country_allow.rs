//! Receiver's country must be on the allow list.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::{json, Value};
use trex_core::{Address, Amount, CountryCode, TrexError};

use crate::module::{decode_call, ComplianceModule, ModuleContext};

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum CountryAllowCall {
    AddAllowedCountry { country: CountryCode },
    RemoveAllowedCountry { country: CountryCode },
    BatchAllowCountries { countries: Vec<CountryCode> },
    IsCountryAllowed { country: CountryCode },
}

/// Allows transfers only to wallets registered in an allowed country.
/// Unregistered receivers are refused.
#[derive(Debug, Clone, Default)]
pub struct CountryAllowModule {
    allowed: BTreeSet<CountryCode>,
}

impl CountryAllowModule {
    pub fn new(allowed: impl IntoIterator<Item = CountryCode>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn is_country_allowed(&self, country: CountryCode) -> bool {
        self.allowed.contains(&country)
    }
}

impl ComplianceModule for CountryAllowModule {
    fn name(&self) -> &'static str {
        "country_allow"
    }

    fn module_check(
        &self,
        ctx: &ModuleContext<'_>,
        _from: &Address,
        to: &Address,
        _amount: Amount,
    ) -> bool {
        ctx.country_of(to).is_some_and(|c| self.is_country_allowed(c))
    }

    fn call(&mut self, payload: &Value) -> Result<Value, TrexError> {
        match decode_call(self.name(), payload)? {
            CountryAllowCall::AddAllowedCountry { country } => {
                if !self.allowed.insert(country) {
                    return Err(TrexError::already_exists(format!("allowed country {country}")));
                }
                tracing::info!(country = %country, "country allowed");
            }
            CountryAllowCall::RemoveAllowedCountry { country } => {
                if !self.allowed.remove(&country) {
                    return Err(TrexError::not_found(format!("allowed country {country}")));
                }
                tracing::info!(country = %country, "country no longer allowed");
            }
            CountryAllowCall::BatchAllowCountries { countries } => {
                if let Some(dup) = countries.iter().find(|c| self.allowed.contains(c)) {
                    return Err(TrexError::already_exists(format!("allowed country {dup}")));
                }
                self.allowed.extend(countries.iter().copied());
                tracing::info!(count = countries.len(), "countries allowed");
            }
            CountryAllowCall::IsCountryAllowed { country } => {
                return Ok(json!({ "allowed": self.is_country_allowed(country) }));
            }
        }
        Ok(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const US: CountryCode = CountryCode(840);
    const FR: CountryCode = CountryCode(250);

    fn countries() -> HashMap<Address, CountryCode> {
        HashMap::from([(Address([1; 20]), US), (Address([2; 20]), FR)])
    }

    #[test]
    fn receiver_country_must_be_allowed() {
        let table = countries();
        let ctx = ModuleContext { token: None, countries: &table };
        let m = CountryAllowModule::new([US]);
        assert!(m.module_check(&ctx, &Address([2; 20]), &Address([1; 20]), Amount::one()));
        assert!(!m.module_check(&ctx, &Address([1; 20]), &Address([2; 20]), Amount::one()));
        assert!(!m.module_check(&ctx, &Address([1; 20]), &Address([9; 20]), Amount::one()));
    }

    #[test]
    fn configuration_calls() {
        let mut m = CountryAllowModule::default();
        m.call(&json!({ "action": "add_allowed_country", "country": 840 })).unwrap();
        assert!(matches!(
            m.call(&json!({ "action": "add_allowed_country", "country": 840 })),
            Err(TrexError::AlreadyExists { .. })
        ));
        assert_eq!(
            m.call(&json!({ "action": "is_country_allowed", "country": 840 })).unwrap(),
            json!({ "allowed": true })
        );
        m.call(&json!({ "action": "batch_allow_countries", "countries": [250, 276] }))
            .unwrap();
        assert!(m.is_country_allowed(CountryCode(276)));
        m.call(&json!({ "action": "remove_allowed_country", "country": 840 })).unwrap();
        assert!(matches!(
            m.call(&json!({ "action": "remove_allowed_country", "country": 840 })),
            Err(TrexError::NotFound { .. })
        ));
        assert!(matches!(
            m.call(&json!({ "action": "launch" })),
            Err(TrexError::ModuleCall(_))
        ));
    }
}
