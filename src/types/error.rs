//! Error types for the tea ledger
//!
//! Business errors are terminal: they are reported to the caller and never
//! retried by the engine. Storage errors are kept apart because every mutating
//! operation is a single atomic unit, so retrying one is always safe.

use super::ids::{ActorId, OwnerRef, TransferId};
use super::transfer::TransferStatus;
use thiserror::Error;

/// Main error type for the ledger and transfer engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Amount is zero or cannot be represented in minor units
    #[error("Invalid amount '{amount}'")]
    InvalidAmount {
        /// The rejected amount as supplied by the caller
        amount: String,
    },

    /// Source and destination of a transfer are the same owner
    #[error("Cannot transfer from {owner} to itself")]
    SelfTransfer { owner: OwnerRef },

    /// Account is frozen and cannot take part in new transfers or confirmations
    #[error("Account {owner} is frozen: {reason}")]
    AccountFrozen { owner: OwnerRef, reason: String },

    /// Available balance does not cover the requested amount
    #[error("Insufficient funds for {owner}: available {available}, requested {requested}")]
    InsufficientFunds {
        owner: OwnerRef,
        available: u64,
        requested: u64,
    },

    /// Account was never ensured
    #[error("Account {owner} not found")]
    AccountNotFound { owner: OwnerRef },

    /// No transfer with this id
    #[error("Transfer {transfer} not found")]
    TransferNotFound { transfer: TransferId },

    /// Actor lacks the capability for this transfer
    #[error("Actor {actor} is not authorized to {operation} transfer {transfer}")]
    Unauthorized {
        actor: ActorId,
        transfer: TransferId,
        operation: String,
    },

    /// Transfer already reached a terminal state
    #[error("Transfer {transfer} is already finalized ({status})")]
    AlreadyFinalized {
        transfer: TransferId,
        status: TransferStatus,
    },

    /// Transfer passed its expiry before the operation; it has been expired
    #[error("Transfer {transfer} has expired")]
    Expired { transfer: TransferId },

    /// Balance arithmetic would leave the u64 range
    #[error("Arithmetic overflow in {operation} for {owner}")]
    ArithmeticOverflow { operation: String, owner: OwnerRef },

    /// Balance arithmetic would go below zero
    #[error("Arithmetic underflow in {operation} for {owner}")]
    ArithmeticUnderflow { operation: String, owner: OwnerRef },

    /// Malformed input that is not an amount problem
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Storage layer failure (poisoned lock, I/O); safe to retry
    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl LedgerError {
    pub fn invalid_amount(amount: impl ToString) -> Self {
        LedgerError::InvalidAmount {
            amount: amount.to_string(),
        }
    }

    pub fn self_transfer(owner: OwnerRef) -> Self {
        LedgerError::SelfTransfer { owner }
    }

    pub fn account_frozen(owner: OwnerRef, reason: &str) -> Self {
        LedgerError::AccountFrozen {
            owner,
            reason: reason.to_string(),
        }
    }

    pub fn insufficient_funds(owner: OwnerRef, available: u64, requested: u64) -> Self {
        LedgerError::InsufficientFunds {
            owner,
            available,
            requested,
        }
    }

    pub fn account_not_found(owner: OwnerRef) -> Self {
        LedgerError::AccountNotFound { owner }
    }

    pub fn transfer_not_found(transfer: TransferId) -> Self {
        LedgerError::TransferNotFound { transfer }
    }

    pub fn unauthorized(actor: ActorId, transfer: TransferId, operation: &str) -> Self {
        LedgerError::Unauthorized {
            actor,
            transfer,
            operation: operation.to_string(),
        }
    }

    pub fn already_finalized(transfer: TransferId, status: TransferStatus) -> Self {
        LedgerError::AlreadyFinalized { transfer, status }
    }

    pub fn expired(transfer: TransferId) -> Self {
        LedgerError::Expired { transfer }
    }

    pub fn arithmetic_overflow(operation: &str, owner: OwnerRef) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            owner,
        }
    }

    pub fn arithmetic_underflow(operation: &str, owner: OwnerRef) -> Self {
        LedgerError::ArithmeticUnderflow {
            operation: operation.to_string(),
            owner,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        LedgerError::InvalidInput {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        LedgerError::Storage {
            message: message.into(),
        }
    }

    /// Whether the caller may transparently retry the operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Storage { .. })
    }

    /// Stable snake_case code for log fields and CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount { .. } => "invalid_amount",
            LedgerError::SelfTransfer { .. } => "self_transfer",
            LedgerError::AccountFrozen { .. } => "account_frozen",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::AccountNotFound { .. } => "not_found",
            LedgerError::TransferNotFound { .. } => "not_found",
            LedgerError::Unauthorized { .. } => "unauthorized",
            LedgerError::AlreadyFinalized { .. } => "already_finalized",
            LedgerError::Expired { .. } => "expired",
            LedgerError::ArithmeticOverflow { .. } => "arithmetic_overflow",
            LedgerError::ArithmeticUnderflow { .. } => "arithmetic_underflow",
            LedgerError::InvalidInput { .. } => "invalid_input",
            LedgerError::Storage { .. } => "storage",
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for LedgerError {
    fn from(error: std::sync::PoisonError<T>) -> Self {
        LedgerError::storage(format!("lock poisoned: {}", error))
    }
}
