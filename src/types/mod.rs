//! Types module
//!
//! Contains core data structures used throughout the ledger:
//! - `ids`: owner, actor, transfer and ledger identifiers
//! - `amount`: integer minor-unit amounts and gram conversion
//! - `account`: account state
//! - `transfer`: transfer rows and the owner-kind pair
//! - `ledger`: immutable ledger entries and pagination
//! - `error`: error taxonomy

pub mod account;
pub mod amount;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod transfer;

pub use account::{Account, AccountStatus};
pub use amount::{format_grams, parse_grams, Amount, MINOR_UNITS_PER_GRAM};
pub use error::LedgerError;
pub use ids::{ActorId, IdSequence, LedgerEntryId, OwnerKind, OwnerRef, TeamId, TransferId, UserId};
pub use ledger::{EntryDraft, EntryType, LedgerEntry, Page, PageOf, MAX_PAGE_SIZE};
pub use transfer::{
    Transfer, TransferKind, TransferRequest, TransferStatus, EXPIRED_REASON,
    MAX_NOTES_CHARS,
};
