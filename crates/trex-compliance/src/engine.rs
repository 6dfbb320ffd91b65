//! # Compliance Engine
//!
//! Ordered set of compliance modules bound to at most one token.
//!
//! ## Evaluation
//!
//! `can_transfer` is the AND of every module's check, in registration
//! order. [`EvaluationMode::Eager`] asks every module (so each verdict is
//! logged); [`EvaluationMode::ShortCircuit`] stops at the first refusal.
//! Both modes return the same answer. No modules means allowed.
//!
//! ## Notifications
//!
//! `transferred`, `created`, `destroyed` run after the token committed the
//! mutation. They are accepted only from the bound token and are forwarded
//! to every module in order. A module that refuses a notification is
//! logged and skipped; the token's mutation stands.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{json, Value};
use trex_core::{
    AccessControl, Address, Amount, CanonicalBytes, ComplianceConfig, EvaluationMode,
    InvestorCountry, Receipt, ReceiptBook, TrexError,
};

use crate::module::{ComplianceModule, ModuleContext, NoCountries};

/// Upper bound on modules per engine.
pub const MAX_MODULES: usize = 25;

/// Shared handle to an engine.
pub type SharedComplianceEngine = Arc<RwLock<ComplianceEngine>>;

struct TokenBinding {
    token: Address,
    countries: Arc<dyn InvestorCountry>,
}

/// Modular compliance for one token.
pub struct ComplianceEngine {
    access: AccessControl,
    modules: Vec<(Address, Box<dyn ComplianceModule>)>,
    binding: Option<TokenBinding>,
    mode: EvaluationMode,
    receipts: ReceiptBook,
}

impl fmt::Debug for ComplianceEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComplianceEngine")
            .field("address", &self.address())
            .field("modules", &self.get_modules())
            .field("token", &self.bound_token())
            .field("mode", &self.mode)
            .finish()
    }
}

impl ComplianceEngine {
    /// An engine at `address`, owned by `owner`, with no modules.
    pub fn new(address: Address, owner: Address, config: ComplianceConfig) -> Self {
        Self {
            access: AccessControl::new(owner),
            modules: Vec::new(),
            binding: None,
            mode: config.mode,
            receipts: ReceiptBook::new(address),
        }
    }

    pub fn address(&self) -> Address {
        self.receipts.contract()
    }

    pub fn owner(&self) -> Address {
        self.access.owner()
    }

    pub fn mode(&self) -> EvaluationMode {
        self.mode
    }

    fn context(&self) -> ModuleContext<'_> {
        match &self.binding {
            Some(b) => ModuleContext {
                token: Some(b.token),
                countries: b.countries.as_ref(),
            },
            None => ModuleContext {
                token: None,
                countries: &NoCountries,
            },
        }
    }

    fn position(&self, module: &Address) -> Option<usize> {
        self.modules.iter().position(|(a, _)| a == module)
    }

    // ── Token binding ──────────────────────────────────────────────────

    /// Bind the engine to `token`. `countries` resolves investor countries
    /// for country-aware modules. Owner-gated; fails `AlreadyBound` while
    /// any token is bound.
    pub fn bind_token(
        &mut self,
        caller: &Address,
        token: Address,
        countries: Arc<dyn InvestorCountry>,
    ) -> Result<Receipt, TrexError> {
        self.access.require_owner(caller)?;
        if token.is_zero() {
            return Err(TrexError::InvalidInput("token cannot be the zero address".into()));
        }
        if let Some(b) = &self.binding {
            return Err(TrexError::AlreadyBound {
                what: format!("engine bound to token {}", b.token),
            });
        }
        let receipt = self
            .receipts
            .issue("bind_token", &json!({ "token": token }))?;
        self.binding = Some(TokenBinding { token, countries });
        tracing::info!(engine = %self.address(), token = %token, "token bound");
        Ok(receipt)
    }

    /// Release the binding to `token`. Owner-gated.
    pub fn unbind_token(&mut self, caller: &Address, token: &Address) -> Result<Receipt, TrexError> {
        self.access.require_owner(caller)?;
        if self.bound_token() != Some(*token) {
            return Err(TrexError::NotBound {
                what: format!("token {token}"),
            });
        }
        let receipt = self
            .receipts
            .issue("unbind_token", &json!({ "token": token }))?;
        self.binding = None;
        tracing::info!(engine = %self.address(), token = %token, "token unbound");
        Ok(receipt)
    }

    /// The bound token.
    pub fn bound_token(&self) -> Option<Address> {
        self.binding.as_ref().map(|b| b.token)
    }

    /// Whether `token` is the bound token.
    pub fn is_token_bound(&self, token: &Address) -> bool {
        self.bound_token() == Some(*token)
    }

    // ── Modules ────────────────────────────────────────────────────────

    /// Append `module` under `address`. Owner-gated.
    pub fn add_module(
        &mut self,
        caller: &Address,
        address: Address,
        module: Box<dyn ComplianceModule>,
    ) -> Result<Receipt, TrexError> {
        self.access.require_owner(caller)?;
        if address.is_zero() {
            return Err(TrexError::InvalidInput("module cannot be the zero address".into()));
        }
        if self.position(&address).is_some() {
            return Err(TrexError::AlreadyBound {
                what: format!("module {address}"),
            });
        }
        if self.modules.len() >= MAX_MODULES {
            return Err(TrexError::LimitExceeded {
                what: "compliance modules".into(),
                limit: MAX_MODULES,
            });
        }
        let name = module.name();
        let receipt = self
            .receipts
            .issue("add_module", &json!({ "module": address, "name": name }))?;
        self.modules.push((address, module));
        tracing::info!(engine = %self.address(), module = %address, name, "module added");
        Ok(receipt)
    }

    /// Remove the module at `address`. Owner-gated.
    pub fn remove_module(&mut self, caller: &Address, address: &Address) -> Result<Receipt, TrexError> {
        self.access.require_owner(caller)?;
        let pos = self.position(address).ok_or_else(|| TrexError::NotBound {
            what: format!("module {address}"),
        })?;
        let receipt = self
            .receipts
            .issue("remove_module", &json!({ "module": address }))?;
        let (_, module) = self.modules.remove(pos);
        tracing::info!(engine = %self.address(), module = %address, name = module.name(), "module removed");
        Ok(receipt)
    }

    /// Module addresses in registration order.
    pub fn get_modules(&self) -> Vec<Address> {
        self.modules.iter().map(|(a, _)| *a).collect()
    }

    pub fn is_module_bound(&self, address: &Address) -> bool {
        self.position(address).is_some()
    }

    /// The module at `address`.
    pub fn module(&self, address: &Address) -> Option<&dyn ComplianceModule> {
        self.position(address).map(|pos| self.modules[pos].1.as_ref())
    }

    /// Forward an owner call to one module.
    pub fn call_module_function(
        &mut self,
        caller: &Address,
        payload: &Value,
        module: &Address,
    ) -> Result<(Value, Receipt), TrexError> {
        self.access.require_owner(caller)?;
        let pos = self.position(module).ok_or_else(|| TrexError::NotBound {
            what: format!("module {module}"),
        })?;
        CanonicalBytes::new(payload)?;
        let output = self.modules[pos].1.call(payload)?;
        let receipt = self.receipts.issue(
            "call_module_function",
            &json!({ "module": module, "payload": payload }),
        )?;
        tracing::info!(engine = %self.address(), module = %module, "module function called");
        Ok((output, receipt))
    }

    // ── Checks ─────────────────────────────────────────────────────────

    /// Whether every module allows moving `amount` from `from` to `to`.
    pub fn can_transfer(&self, from: &Address, to: &Address, amount: Amount) -> bool {
        let ctx = self.context();
        let mut allowed = true;
        for (address, module) in &self.modules {
            let ok = module.module_check(&ctx, from, to, amount);
            tracing::debug!(
                engine = %self.address(),
                module = %address,
                name = module.name(),
                from = %from,
                to = %to,
                allowed = ok,
                "module check"
            );
            if !ok {
                allowed = false;
                if self.mode == EvaluationMode::ShortCircuit {
                    break;
                }
            }
        }
        allowed
    }

    // ── Notifications ──────────────────────────────────────────────────

    fn require_bound_token(&self, caller: &Address) -> Result<(), TrexError> {
        match self.bound_token() {
            None => Err(TrexError::NotBound {
                what: "no token bound".into(),
            }),
            Some(token) if token == *caller => Ok(()),
            Some(_) => Err(TrexError::unauthorized(caller, "bound token")),
        }
    }

    fn notify<F>(&mut self, event: &'static str, mut apply: F)
    where
        F: FnMut(&mut dyn ComplianceModule, &ModuleContext<'_>) -> Result<(), TrexError>,
    {
        let engine = self.receipts.contract();
        let (token, countries): (Option<Address>, Arc<dyn InvestorCountry>) = match &self.binding {
            Some(b) => (Some(b.token), Arc::clone(&b.countries)),
            None => (None, Arc::new(NoCountries)),
        };
        let ctx = ModuleContext {
            token,
            countries: countries.as_ref(),
        };
        for (address, module) in &mut self.modules {
            if let Err(e) = apply(module.as_mut(), &ctx) {
                tracing::warn!(
                    engine = %engine,
                    module = %address,
                    name = module.name(),
                    event,
                    error = %e,
                    "module refused post-commit notification"
                );
            }
        }
    }

    /// A transfer was committed. Only the bound token may call this.
    pub fn transferred(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<Receipt, TrexError> {
        self.require_bound_token(caller)?;
        let receipt = self.receipts.issue(
            "transferred",
            &json!({ "from": from, "to": to, "amount": amount }),
        )?;
        self.notify("transferred", |m, ctx| {
            m.module_transfer_action(ctx, from, to, amount)
        });
        Ok(receipt)
    }

    /// Tokens were minted to `to`. Only the bound token may call this.
    pub fn created(
        &mut self,
        caller: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<Receipt, TrexError> {
        self.require_bound_token(caller)?;
        let receipt = self
            .receipts
            .issue("created", &json!({ "to": to, "amount": amount }))?;
        self.notify("created", |m, ctx| m.module_mint_action(ctx, to, amount));
        Ok(receipt)
    }

    /// Tokens were burned from `from`. Only the bound token may call this.
    pub fn destroyed(
        &mut self,
        caller: &Address,
        from: &Address,
        amount: Amount,
    ) -> Result<Receipt, TrexError> {
        self.require_bound_token(caller)?;
        let receipt = self
            .receipts
            .issue("destroyed", &json!({ "from": from, "amount": amount }))?;
        self.notify("destroyed", |m, ctx| m.module_burn_action(ctx, from, amount));
        Ok(receipt)
    }

    /// Hand the engine to `new_owner`.
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<Receipt, TrexError> {
        self.access.check_transfer_ownership(caller, &new_owner)?;
        let receipt = self
            .receipts
            .issue("transfer_ownership", &json!({ "new_owner": new_owner }))?;
        self.access.transfer_ownership(caller, new_owner)?;
        tracing::info!(engine = %self.address(), owner = %new_owner, "ownership transferred");
        Ok(receipt)
    }
}
