//! # trex-token — Permissioned Token Gate
//!
//! A [`Token`] keeps balances in memory and moves them only when the
//! identity registry verifies both parties and the compliance engine
//! approves. Agents mint, burn, force transfers, pause, and freeze.
//!
//! ## Crate Policy
//!
//! - Balances are `U256` amounts; arithmetic never wraps.
//! - Compliance notifications follow the commit and never undo it.

pub mod token;

pub use token::{Token, TokenInfo};
