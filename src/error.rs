use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hooks::Namespace;
use crate::ledger::{AccountId, Amount, LedgerError};

/// Result string reported for a committed transaction.
pub const SUCCESS_CODE: &str = "tesSUCCESS";

/// Stable, machine-readable identifier of a rejection reason.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MalformedEntry,
    TooManySlots,
    DefinitionTooLarge,
    InsufficientFee,
    InsufficientReserve,
    ConflictingFlags,
    UnknownAccount,
    NamespaceTooLarge,
    LedgerInvariant,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MalformedEntry => "MALFORMED_ENTRY",
            ErrorCode::TooManySlots => "TOO_MANY_SLOTS",
            ErrorCode::DefinitionTooLarge => "DEFINITION_TOO_LARGE",
            ErrorCode::InsufficientFee => "INSUFFICIENT_FEE",
            ErrorCode::InsufficientReserve => "INSUFFICIENT_RESERVE",
            ErrorCode::ConflictingFlags => "CONFLICTING_FLAGS",
            ErrorCode::UnknownAccount => "UNKNOWN_ACCOUNT",
            ErrorCode::NamespaceTooLarge => "NAMESPACE_TOO_LARGE",
            ErrorCode::LedgerInvariant => "LEDGER_INVARIANT",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn entry_label(index: Option<usize>) -> String {
    match index {
        Some(idx) => format!("hook entry {idx}"),
        None => "transaction".to_string(),
    }
}

/// Why a SetHook transaction was rejected. Every variant is raised before the
/// ledger is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetHookError {
    #[error("malformed {}: {reason}", entry_label(*index))]
    MalformedEntry {
        index: Option<usize>,
        reason: String,
    },
    #[error("{count} hook entries exceed the {max} available slots")]
    TooManySlots { count: usize, max: usize },
    #[error("hook entry {index}: code is {size} bytes, limit {max}")]
    DefinitionTooLarge { index: usize, size: usize, max: usize },
    #[error("fee {declared} below required {required}")]
    InsufficientFee { declared: Amount, required: Amount },
    #[error("account {account} balance {balance} cannot cover required {required}")]
    InsufficientReserve {
        account: AccountId,
        balance: Amount,
        required: Amount,
    },
    #[error("hook entry {index}: CreateCode cannot be combined with NSDELETE")]
    ConflictingFlags { index: usize },
    #[error("unknown account {account}")]
    UnknownAccount { account: AccountId },
    #[error("deleting namespace {namespace} would remove {entries} entries, limit {limit}")]
    NamespaceTooLarge {
        namespace: Namespace,
        entries: usize,
        limit: usize,
    },
    #[error("ledger invariant violated: {0}")]
    LedgerInvariant(String),
}

impl SetHookError {
    pub fn malformed(index: usize, reason: impl Into<String>) -> Self {
        SetHookError::MalformedEntry {
            index: Some(index),
            reason: reason.into(),
        }
    }

    pub fn malformed_tx(reason: impl Into<String>) -> Self {
        SetHookError::MalformedEntry {
            index: None,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SetHookError::MalformedEntry { .. } => ErrorCode::MalformedEntry,
            SetHookError::TooManySlots { .. } => ErrorCode::TooManySlots,
            SetHookError::DefinitionTooLarge { .. } => ErrorCode::DefinitionTooLarge,
            SetHookError::InsufficientFee { .. } => ErrorCode::InsufficientFee,
            SetHookError::InsufficientReserve { .. } => ErrorCode::InsufficientReserve,
            SetHookError::ConflictingFlags { .. } => ErrorCode::ConflictingFlags,
            SetHookError::UnknownAccount { .. } => ErrorCode::UnknownAccount,
            SetHookError::NamespaceTooLarge { .. } => ErrorCode::NamespaceTooLarge,
            SetHookError::LedgerInvariant(_) => ErrorCode::LedgerInvariant,
        }
    }
}

impl From<LedgerError> for SetHookError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UnknownAccount { account } => SetHookError::UnknownAccount { account },
            LedgerError::InsufficientReserve {
                account,
                balance,
                required,
            } => SetHookError::InsufficientReserve {
                account,
                balance,
                required,
            },
            other => SetHookError::LedgerInvariant(other.to_string()),
        }
    }
}

/// Outcome handed back to the submission layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResult {
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TxResult {
    pub fn success() -> Self {
        Self {
            result: SUCCESS_CODE.to_string(),
            reason: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == SUCCESS_CODE
    }
}

impl From<&SetHookError> for TxResult {
    fn from(err: &SetHookError) -> Self {
        Self {
            result: err.code().to_string(),
            reason: Some(err.to_string()),
        }
    }
}

impl<T> From<&Result<T, SetHookError>> for TxResult {
    fn from(outcome: &Result<T, SetHookError>) -> Self {
        match outcome {
            Ok(_) => TxResult::success(),
            Err(err) => err.into(),
        }
    }
}
