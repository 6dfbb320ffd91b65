//! Receiver's country must not be restricted.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::{json, Value};
use trex_core::{Address, Amount, CountryCode, TrexError};

use crate::module::{decode_call, ComplianceModule, ModuleContext};

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum CountryRestrictCall {
    AddCountryRestriction { country: CountryCode },
    RemoveCountryRestriction { country: CountryCode },
    BatchRestrictCountries { countries: Vec<CountryCode> },
    IsCountryRestricted { country: CountryCode },
}

/// Blocks transfers to wallets registered in a restricted country.
/// Unregistered receivers are not blocked by this module.
#[derive(Debug, Clone, Default)]
pub struct CountryRestrictModule {
    restricted: BTreeSet<CountryCode>,
}

impl CountryRestrictModule {
    pub fn new(restricted: impl IntoIterator<Item = CountryCode>) -> Self {
        Self {
            restricted: restricted.into_iter().collect(),
        }
    }

    pub fn is_country_restricted(&self, country: CountryCode) -> bool {
        self.restricted.contains(&country)
    }
}

impl ComplianceModule for CountryRestrictModule {
    fn name(&self) -> &'static str {
        "country_restrict"
    }

    fn module_check(
        &self,
        ctx: &ModuleContext<'_>,
        _from: &Address,
        to: &Address,
        _amount: Amount,
    ) -> bool {
        !ctx.country_of(to).is_some_and(|c| self.is_country_restricted(c))
    }

    fn call(&mut self, payload: &Value) -> Result<Value, TrexError> {
        match decode_call(self.name(), payload)? {
            CountryRestrictCall::AddCountryRestriction { country } => {
                if !self.restricted.insert(country) {
                    return Err(TrexError::already_exists(format!("restricted country {country}")));
                }
                tracing::info!(country = %country, "country restricted");
            }
            CountryRestrictCall::RemoveCountryRestriction { country } => {
                if !self.restricted.remove(&country) {
                    return Err(TrexError::not_found(format!("restricted country {country}")));
                }
                tracing::info!(country = %country, "country restriction lifted");
            }
            CountryRestrictCall::BatchRestrictCountries { countries } => {
                if let Some(dup) = countries.iter().find(|c| self.restricted.contains(c)) {
                    return Err(TrexError::already_exists(format!("restricted country {dup}")));
                }
                self.restricted.extend(countries.iter().copied());
                tracing::info!(count = countries.len(), "countries restricted");
            }
            CountryRestrictCall::IsCountryRestricted { country } => {
                return Ok(json!({ "restricted": self.is_country_restricted(country) }));
            }
        }
        Ok(Value::Null)
    }
}
