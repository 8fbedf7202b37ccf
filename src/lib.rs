//! Hook installation and hook-state ledger primitives.
//!
//! The crate models the part of a replicated ledger that lets an account
//! attach executable hooks and manage the state those hooks own:
//!
//! * [`hooks::definition`] holds reference-counted, content-addressed hook code.
//! * [`hooks::slots`] keeps each account's fixed-length table of hook slots.
//! * [`hooks::state`] stores hook state keyed by account, namespace and key.
//! * [`hooks::reserve`] tracks the minimum balance owed for owned objects.
//! * [`hooks::processor`] validates and applies `SetHook` transactions,
//!   including the `NSDELETE` namespace purge.
//!
//! Every transaction is applied to a clone of a [`ledger::LedgerState`]
//! snapshot; the caller only ever sees the untouched snapshot or the fully
//! applied successor.

pub mod config;
pub mod error;
pub mod hooks;
pub mod ledger;

pub use config::ProtocolConfig;
pub use error::{ErrorCode, SetHookError, TxResult};
pub use hooks::processor::SetHookProcessor;
pub use hooks::wire::SetHookTransaction;
pub use ledger::LedgerState;
