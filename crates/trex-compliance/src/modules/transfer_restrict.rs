//! Sender or receiver must be on an allow list.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::{json, Value};
use trex_core::{Address, Amount, TrexError};

use crate::module::{decode_call, ComplianceModule, ModuleContext};

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum TransferRestrictCall {
    AllowUser { user: Address },
    DisallowUser { user: Address },
    BatchAllowUsers { users: Vec<Address> },
    IsUserAllowed { user: Address },
}

/// Allows a transfer when either party is allow-listed.
#[derive(Debug, Clone, Default)]
pub struct TransferRestrictModule {
    allowed: BTreeSet<Address>,
}

impl TransferRestrictModule {
    pub fn new(allowed: impl IntoIterator<Item = Address>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn is_user_allowed(&self, user: &Address) -> bool {
        self.allowed.contains(user)
    }
}

impl ComplianceModule for TransferRestrictModule {
    fn name(&self) -> &'static str {
        "transfer_restrict"
    }

    fn module_check(
        &self,
        _ctx: &ModuleContext<'_>,
        from: &Address,
        to: &Address,
        _amount: Amount,
    ) -> bool {
        self.is_user_allowed(from) || self.is_user_allowed(to)
    }

    fn call(&mut self, payload: &Value) -> Result<Value, TrexError> {
        match decode_call(self.name(), payload)? {
            TransferRestrictCall::AllowUser { user } => {
                if !self.allowed.insert(user) {
                    return Err(TrexError::already_exists(format!("allowed user {user}")));
                }
                tracing::info!(user = %user, "user allowed");
            }
            TransferRestrictCall::DisallowUser { user } => {
                if !self.allowed.remove(&user) {
                    return Err(TrexError::not_found(format!("allowed user {user}")));
                }
                tracing::info!(user = %user, "user disallowed");
            }
            TransferRestrictCall::BatchAllowUsers { users } => {
                if let Some(dup) = users.iter().find(|u| self.allowed.contains(u)) {
                    return Err(TrexError::already_exists(format!("allowed user {dup}")));
                }
                self.allowed.extend(users.iter().copied());
                tracing::info!(count = users.len(), "users allowed");
            }
            TransferRestrictCall::IsUserAllowed { user } => {
                return Ok(json!({ "allowed": self.is_user_allowed(&user) }));
            }
        }
        Ok(Value::Null)
    }
}
