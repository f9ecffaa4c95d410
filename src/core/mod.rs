//! Core business logic module
//!
//! This module contains the ledger and transfer components:
//! - `traits` - Clock and team-membership seams
//! - `ledger` - Append-only ledger of balance mutations
//! - `account_store` - Account state and the hold / settle / release units
//! - `approval` - Who may confirm or reject a transfer
//! - `engine` - Transfer state machine
//! - `sweeper` - Periodic expiry of past-due transfers

pub mod account_store;
pub mod approval;
pub mod engine;
pub mod ledger;
pub mod sweeper;
pub mod traits;

pub use account_store::AccountStore;
pub use approval::{ApprovalGate, Capability};
pub use engine::{SweepReport, TransferEngine};
pub use ledger::LedgerRecorder;
pub use sweeper::ExpirySweeper;
pub use traits::{Clock, ManualClock, StaticTeamDirectory, SystemClock, TeamDirectory};
