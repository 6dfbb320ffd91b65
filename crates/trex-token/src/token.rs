//! # Permissioned Token
//!
//! In-memory balances gated by the identity registry and the compliance
//! engine.
//!
//! ## Transfer Gate
//!
//! ```text
//! transfer(from, to, amount):
//!   not paused, neither wallet frozen, free balance of `from` ≥ amount
//!   is_verified(from) and is_verified(to)
//!   compliance.can_transfer(from, to, amount)
//!   ── commit ──
//!   compliance.transferred(from, to, amount)
//! ```
//!
//! Mints check the receiver and `can_transfer(0x0, to, amount)`; forced
//! transfers skip the compliance check. Notifications run after the commit;
//! a refused notification is logged and the mutation stands.
//!
//! ## Security Invariant
//!
//! Every check completes before the receipt is issued and balances change.
//! A rejected call leaves balances, supply, and freezes untouched.

use std::collections::{BTreeSet, HashMap};

use serde_json::json;
use trex_compliance::SharedComplianceEngine;
use trex_core::{AccessControl, Address, Amount, Receipt, ReceiptBook, Role, TrexError};
use trex_registry::SharedIdentityRegistry;

/// Name, symbol, decimals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// A permissioned token.
pub struct Token {
    info: TokenInfo,
    access: AccessControl,
    balances: HashMap<Address, Amount>,
    frozen_tokens: HashMap<Address, Amount>,
    frozen_wallets: BTreeSet<Address>,
    total_supply: Amount,
    paused: bool,
    registry: SharedIdentityRegistry,
    compliance: SharedComplianceEngine,
    receipts: ReceiptBook,
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("address", &self.address())
            .field("symbol", &self.info.symbol)
            .field("total_supply", &self.total_supply)
            .field("paused", &self.paused)
            .finish_non_exhaustive()
    }
}

fn insufficient(wallet: &Address, available: Amount, required: Amount) -> TrexError {
    TrexError::InsufficientBalance {
        wallet: wallet.to_string(),
        available: available.to_string(),
        required: required.to_string(),
    }
}

impl Token {
    /// A token at `address`, owned by `owner`. The compliance engine should
    /// be bound to `address` for notifications to be accepted.
    pub fn new(
        address: Address,
        owner: Address,
        info: TokenInfo,
        registry: SharedIdentityRegistry,
        compliance: SharedComplianceEngine,
    ) -> Self {
        Self {
            info,
            access: AccessControl::new(owner),
            balances: HashMap::new(),
            frozen_tokens: HashMap::new(),
            frozen_wallets: BTreeSet::new(),
            total_supply: Amount::zero(),
            paused: false,
            registry,
            compliance,
            receipts: ReceiptBook::new(address),
        }
    }

    pub fn address(&self) -> Address {
        self.receipts.contract()
    }

    pub fn info(&self) -> &TokenInfo {
        &self.info
    }

    pub fn owner(&self) -> Address {
        self.access.owner()
    }

    pub fn identity_registry(&self) -> &SharedIdentityRegistry {
        &self.registry
    }

    pub fn compliance(&self) -> &SharedComplianceEngine {
        &self.compliance
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn balance_of(&self, wallet: &Address) -> Amount {
        self.balances.get(wallet).copied().unwrap_or_default()
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Partially frozen amount of `wallet`.
    pub fn frozen_tokens(&self, wallet: &Address) -> Amount {
        self.frozen_tokens.get(wallet).copied().unwrap_or_default()
    }

    /// Balance minus partially frozen tokens.
    pub fn free_balance(&self, wallet: &Address) -> Amount {
        self.balance_of(wallet)
            .saturating_sub(self.frozen_tokens(wallet))
    }

    /// Whether the whole wallet is frozen.
    pub fn is_frozen(&self, wallet: &Address) -> bool {
        self.frozen_wallets.contains(wallet)
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    // ── Checks ─────────────────────────────────────────────────────────

    fn require_verified(&self, wallet: &Address) -> Result<(), TrexError> {
        if self.registry.is_verified(wallet) {
            Ok(())
        } else {
            Err(TrexError::NotVerified {
                wallet: wallet.to_string(),
            })
        }
    }

    fn require_not_frozen(&self, wallet: &Address) -> Result<(), TrexError> {
        if self.is_frozen(wallet) {
            return Err(TrexError::Frozen {
                wallet: wallet.to_string(),
            });
        }
        Ok(())
    }

    fn require_compliant(&self, from: &Address, to: &Address, amount: Amount) -> Result<(), TrexError> {
        if self.compliance.read().can_transfer(from, to, amount) {
            Ok(())
        } else {
            Err(TrexError::TransferNotCompliant)
        }
    }

    fn require_nonzero(to: &Address) -> Result<(), TrexError> {
        if to.is_zero() {
            return Err(TrexError::InvalidInput("recipient cannot be the zero address".into()));
        }
        Ok(())
    }

    // ── Ledger primitives (infallible, call after checks) ──────────────

    fn debit(&mut self, wallet: &Address, amount: Amount) {
        let balance = self.balance_of(wallet).saturating_sub(amount);
        if balance.is_zero() {
            self.balances.remove(wallet);
        } else {
            self.balances.insert(*wallet, balance);
        }
    }

    fn credit(&mut self, wallet: &Address, amount: Amount) {
        let balance = self.balance_of(wallet).saturating_add(amount);
        self.balances.insert(*wallet, balance);
    }

    fn set_frozen_tokens(&mut self, wallet: &Address, amount: Amount) {
        if amount.is_zero() {
            self.frozen_tokens.remove(wallet);
        } else {
            self.frozen_tokens.insert(*wallet, amount);
        }
    }

    /// Release frozen tokens so `amount` becomes spendable. Returns the
    /// amount released.
    fn release_frozen_for(&mut self, wallet: &Address, amount: Amount) -> Amount {
        let free = self.free_balance(wallet);
        if free >= amount {
            return Amount::zero();
        }
        let needed = amount - free;
        let frozen = self.frozen_tokens(wallet);
        self.set_frozen_tokens(wallet, frozen.saturating_sub(needed));
        needed
    }

    fn notify_transferred(&self, from: &Address, to: &Address, amount: Amount) {
        if let Err(e) = self
            .compliance
            .write()
            .transferred(&self.address(), from, to, amount)
        {
            tracing::warn!(token = %self.address(), error = %e, "compliance refused transfer notification");
        }
    }

    // ── Transfers ──────────────────────────────────────────────────────

    /// Move `amount` from `caller` to `to`.
    pub fn transfer(&mut self, caller: &Address, to: &Address, amount: Amount) -> Result<Receipt, TrexError> {
        let from = *caller;
        Self::require_nonzero(to)?;
        if self.paused {
            return Err(TrexError::Paused);
        }
        self.require_not_frozen(&from)?;
        self.require_not_frozen(to)?;
        let free = self.free_balance(&from);
        if free < amount {
            return Err(insufficient(&from, free, amount));
        }
        self.require_verified(&from)?;
        self.require_verified(to)?;
        self.require_compliant(&from, to, amount)?;

        let receipt = self.receipts.issue(
            "transfer",
            &json!({ "from": from, "to": to, "amount": amount }),
        )?;
        self.debit(&from, amount);
        self.credit(to, amount);
        tracing::info!(token = %self.address(), from = %from, to = %to, amount = %amount, "transfer");
        self.notify_transferred(&from, to, amount);
        Ok(receipt)
    }

    /// Agent transfer that bypasses pause, wallet freezes, and the
    /// compliance check. The receiver must be verified. Frozen tokens are
    /// released as needed.
    pub fn forced_transfer(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<Receipt, TrexError> {
        self.access.require_role(caller, Role::Agent)?;
        Self::require_nonzero(to)?;
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(insufficient(from, balance, amount));
        }
        self.require_verified(to)?;

        let receipt = self.receipts.issue(
            "forced_transfer",
            &json!({ "from": from, "to": to, "amount": amount }),
        )?;
        let released = self.release_frozen_for(from, amount);
        self.debit(from, amount);
        self.credit(to, amount);
        tracing::info!(
            token = %self.address(),
            agent = %caller,
            from = %from,
            to = %to,
            amount = %amount,
            released = %released,
            "forced transfer"
        );
        self.notify_transferred(from, to, amount);
        Ok(receipt)
    }

    /// Create `amount` tokens for `to`. Agent-gated.
    pub fn mint(&mut self, caller: &Address, to: &Address, amount: Amount) -> Result<Receipt, TrexError> {
        self.access.require_role(caller, Role::Agent)?;
        Self::require_nonzero(to)?;
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| TrexError::InvalidInput("total supply overflow".into()))?;
        self.require_verified(to)?;
        self.require_compliant(&Address::ZERO, to, amount)?;

        let receipt = self
            .receipts
            .issue("mint", &json!({ "to": to, "amount": amount }))?;
        self.total_supply = supply;
        self.credit(to, amount);
        tracing::info!(token = %self.address(), to = %to, amount = %amount, "mint");
        if let Err(e) = self
            .compliance
            .write()
            .created(&self.address(), to, amount)
        {
            tracing::warn!(token = %self.address(), error = %e, "compliance refused mint notification");
        }
        Ok(receipt)
    }

    /// Destroy `amount` tokens of `from`. Agent-gated. Frozen tokens are
    /// released as needed.
    pub fn burn(&mut self, caller: &Address, from: &Address, amount: Amount) -> Result<Receipt, TrexError> {
        self.access.require_role(caller, Role::Agent)?;
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(insufficient(from, balance, amount));
        }

        let receipt = self
            .receipts
            .issue("burn", &json!({ "from": from, "amount": amount }))?;
        self.release_frozen_for(from, amount);
        self.debit(from, amount);
        self.total_supply = self.total_supply.saturating_sub(amount);
        tracing::info!(token = %self.address(), from = %from, amount = %amount, "burn");
        if let Err(e) = self
            .compliance
            .write()
            .destroyed(&self.address(), from, amount)
        {
            tracing::warn!(token = %self.address(), error = %e, "compliance refused burn notification");
        }
        Ok(receipt)
    }

    // ── Freezes and pause ──────────────────────────────────────────────

    /// Freeze or unfreeze a whole wallet. Agent-gated.
    pub fn set_address_frozen(
        &mut self,
        caller: &Address,
        wallet: &Address,
        frozen: bool,
    ) -> Result<Receipt, TrexError> {
        self.access.require_role(caller, Role::Agent)?;
        let receipt = self.receipts.issue(
            "set_address_frozen",
            &json!({ "wallet": wallet, "frozen": frozen }),
        )?;
        if frozen {
            self.frozen_wallets.insert(*wallet);
        } else {
            self.frozen_wallets.remove(wallet);
        }
        tracing::info!(token = %self.address(), wallet = %wallet, frozen, "wallet freeze set");
        Ok(receipt)
    }

    /// Freeze part of a wallet's balance. Agent-gated.
    pub fn freeze_partial_tokens(
        &mut self,
        caller: &Address,
        wallet: &Address,
        amount: Amount,
    ) -> Result<Receipt, TrexError> {
        self.access.require_role(caller, Role::Agent)?;
        let free = self.free_balance(wallet);
        if free < amount {
            return Err(insufficient(wallet, free, amount));
        }
        let receipt = self.receipts.issue(
            "freeze_partial_tokens",
            &json!({ "wallet": wallet, "amount": amount }),
        )?;
        let frozen = self.frozen_tokens(wallet) + amount;
        self.set_frozen_tokens(wallet, frozen);
        tracing::info!(token = %self.address(), wallet = %wallet, amount = %amount, "tokens frozen");
        Ok(receipt)
    }

    /// Release part of a wallet's frozen tokens. Agent-gated.
    pub fn unfreeze_partial_tokens(
        &mut self,
        caller: &Address,
        wallet: &Address,
        amount: Amount,
    ) -> Result<Receipt, TrexError> {
        self.access.require_role(caller, Role::Agent)?;
        let frozen = self.frozen_tokens(wallet);
        if frozen < amount {
            return Err(insufficient(wallet, frozen, amount));
        }
        let receipt = self.receipts.issue(
            "unfreeze_partial_tokens",
            &json!({ "wallet": wallet, "amount": amount }),
        )?;
        self.set_frozen_tokens(wallet, frozen - amount);
        tracing::info!(token = %self.address(), wallet = %wallet, amount = %amount, "tokens unfrozen");
        Ok(receipt)
    }

    /// Stop transfers. Agent-gated.
    pub fn pause(&mut self, caller: &Address) -> Result<Receipt, TrexError> {
        self.access.require_role(caller, Role::Agent)?;
        if self.paused {
            return Err(TrexError::Paused);
        }
        let receipt = self.receipts.issue("pause", &json!({}))?;
        self.paused = true;
        tracing::info!(token = %self.address(), "paused");
        Ok(receipt)
    }

    /// Resume transfers. Agent-gated.
    pub fn unpause(&mut self, caller: &Address) -> Result<Receipt, TrexError> {
        self.access.require_role(caller, Role::Agent)?;
        if !self.paused {
            return Err(TrexError::InvalidInput("token is not paused".into()));
        }
        let receipt = self.receipts.issue("unpause", &json!({}))?;
        self.paused = false;
        tracing::info!(token = %self.address(), "unpaused");
        Ok(receipt)
    }

    // ── Roles ──────────────────────────────────────────────────────────

    pub fn is_agent(&self, who: &Address) -> bool {
        self.access.is_agent(who)
    }

    /// Grant the agent role. Owner-gated.
    pub fn add_agent(&mut self, caller: &Address, agent: Address) -> Result<Receipt, TrexError> {
        self.access.check_add_agent(caller, &agent)?;
        let receipt = self.receipts.issue("add_agent", &json!({ "agent": agent }))?;
        self.access.add_agent(caller, agent)?;
        tracing::info!(token = %self.address(), agent = %agent, "agent added");
        Ok(receipt)
    }

    /// Revoke the agent role. Owner-gated.
    pub fn remove_agent(&mut self, caller: &Address, agent: &Address) -> Result<Receipt, TrexError> {
        self.access.check_remove_agent(caller, agent)?;
        let receipt = self
            .receipts
            .issue("remove_agent", &json!({ "agent": agent }))?;
        self.access.remove_agent(caller, agent)?;
        tracing::info!(token = %self.address(), agent = %agent, "agent removed");
        Ok(receipt)
    }

    /// Hand the token to `new_owner`.
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
        tracing::info!(token = %self.address(), owner = %new_owner, "ownership transferred");
        Ok(receipt)
    }
}
