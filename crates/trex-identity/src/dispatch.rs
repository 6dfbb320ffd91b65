//! # External Call Dispatch
//!
//! An approved execution whose target is not the identity itself is handed
//! to a [`Dispatcher`]: the host execution environment. The core only
//! records what the dispatcher returned.

use parking_lot::Mutex;
use trex_core::{Address, Amount, TrexError};

/// Host hook that performs calls approved by an identity.
pub trait Dispatcher: Send + Sync {
    /// Perform `to.call{value}(data)` on behalf of `from`.
    fn dispatch(
        &self,
        from: &Address,
        to: &Address,
        value: Amount,
        data: &[u8],
    ) -> Result<Vec<u8>, TrexError>;
}

/// Accepts every call and returns no data.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDispatcher;

impl Dispatcher for NullDispatcher {
    fn dispatch(&self, _: &Address, _: &Address, _: Amount, _: &[u8]) -> Result<Vec<u8>, TrexError> {
        Ok(Vec::new())
    }
}

/// A call observed by a [`RecordingDispatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedCall {
    pub from: Address,
    pub to: Address,
    pub value: Amount,
    pub data: Vec<u8>,
}

/// Records every call; optionally fails calls to one target.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    calls: Mutex<Vec<DispatchedCall>>,
    failing_target: Option<Address>,
}

impl RecordingDispatcher {
    /// A dispatcher that accepts every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher that fails calls to `target`.
    pub fn failing_on(target: Address) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing_target: Some(target),
        }
    }

    /// Calls seen so far, in order.
    pub fn calls(&self) -> Vec<DispatchedCall> {
        self.calls.lock().clone()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn dispatch(
        &self,
        from: &Address,
        to: &Address,
        value: Amount,
        data: &[u8],
    ) -> Result<Vec<u8>, TrexError> {
        self.calls.lock().push(DispatchedCall {
            from: *from,
            to: *to,
            value,
            data: data.to_vec(),
        });
        if self.failing_target.as_ref() == Some(to) {
            return Err(TrexError::InvalidInput(format!("call to {to} reverted")));
        }
        Ok(data.len().to_be_bytes().to_vec())
    }
}
