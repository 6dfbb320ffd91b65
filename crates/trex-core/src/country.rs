//! # Investor Countries
//!
//! ISO-3166 numeric country codes attached to registry entries, and the
//! read-only lookup compliance modules use to resolve a wallet's country.

use serde::{Deserialize, Serialize};

use crate::identity::Address;

/// ISO-3166-1 numeric country code (e.g. 250 France, 840 United States).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountryCode(pub u16);

impl CountryCode {
    /// Access the numeric code.
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

impl From<u16> for CountryCode {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

/// Resolves the country of a registered wallet.
///
/// Implemented by the identity registry's shared handle and handed to the
/// compliance engine when a token is bound.
pub trait InvestorCountry: Send + Sync {
    /// The wallet's country, or `None` if the wallet is not registered.
    fn investor_country(&self, wallet: &Address) -> Option<CountryCode>;
}

/// Fixed wallet-to-country table, for tests and offline tooling.
impl InvestorCountry for std::collections::HashMap<Address, CountryCode> {
    fn investor_country(&self, wallet: &Address) -> Option<CountryCode> {
        self.get(wallet).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn display_is_zero_padded() {
        assert_eq!(CountryCode(76).to_string(), "076");
        assert_eq!(CountryCode(840).to_string(), "840");
    }

    #[test]
    fn map_lookup() {
        let w = Address([1; 20]);
        let table: HashMap<Address, CountryCode> = [(w, CountryCode(250))].into_iter().collect();
        assert_eq!(table.investor_country(&w), Some(CountryCode(250)));
        assert_eq!(table.investor_country(&Address([2; 20])), None);
    }
}
