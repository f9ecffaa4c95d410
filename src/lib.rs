//! Tea Ledger Library
//! # Overview
//!
//! This library keeps per-owner balances of tea (users and teams), moves
//! value between owners through a hold / confirm protocol, and records every
//! balance mutation in an append-only ledger.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Account, Transfer, LedgerEntry, ids, errors)
//! - [`core`] - Business logic components:
//!   - [`core::account_store`] - Balances and the hold / settle / release units
//!   - [`core::ledger`] - Append-only ledger and reconciliation
//!   - [`core::approval`] - Who may confirm or reject a transfer
//!   - [`core::engine`] - Transfer state machine
//!   - [`core::sweeper`] - Periodic expiry of past-due transfers
//! - [`config`] - YAML engine configuration
//! - [`io`] - Journal CSV parsing and ledger output
//! - [`replay`] - Journal replay pipeline used by the binary
//! - [`cli`] - CLI arguments parsing
//!
//! # Transfer Lifecycle
//!
//! - **Create**: holds the amount on the source account; status `pending_approval`
//! - **Confirm**: settles (debit source, credit destination); status `completed`
//! - **Reject**: releases the hold; status `rejected`
//! - **Expire**: the sweeper, or a late confirm / reject, releases the hold;
//!   status `expired`
//!
//! # Account States
//!
//! Each account maintains:
//! - `balance`: Total funds owned, in milligrams
//! - `locked_balance`: Portion of `balance` held by pending outgoing transfers
//! - `status`: `normal`, or `frozen` with a reason (blocks new transfers and
//!   confirmations)

pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod logging;
pub mod replay;
pub mod types;

pub use config::EngineConfig;
pub use core::{
    AccountStore, ApprovalGate, Capability, Clock, ExpirySweeper, LedgerRecorder, ManualClock,
    StaticTeamDirectory, SweepReport, SystemClock, TeamDirectory, TransferEngine,
};
pub use io::{write_accounts_csv, write_statement_csv};
pub use types::{
    Account, AccountStatus, ActorId, Amount, EntryType, LedgerEntry, LedgerError, OwnerKind,
    OwnerRef, Page, PageOf, TeamId, Transfer, TransferId, TransferKind, TransferRequest,
    TransferStatus, UserId,
};
